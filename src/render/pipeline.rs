use crate::{
    assets::loader::ImageLoader,
    composition::model::{CompositionRequest, CompositionResult, ExportMode},
    foundation::core::Canvas,
    foundation::error::{LayercastError, LayercastResult},
    render::{
        cpu::{Frame, Surface},
        export, layout,
    },
};

/// Options that stay fixed for the lifetime of a [`Compositor`].
#[derive(Clone, Debug, Default)]
pub struct RenderSettings {
    /// Straight RGBA color painted under the base image.
    pub clear_rgba: Option<[u8; 4]>,
}

/// Loads a base image plus overlays and flattens them onto a fixed-size canvas.
#[derive(Clone, Debug)]
pub struct Compositor {
    canvas: Canvas,
    loader: ImageLoader,
    settings: RenderSettings,
}

impl Compositor {
    pub fn new(canvas: Canvas, loader: ImageLoader) -> Self {
        Self {
            canvas,
            loader,
            settings: RenderSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: RenderSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn loader(&self) -> &ImageLoader {
        &self.loader
    }

    /// Run one composition end to end.
    ///
    /// Nothing is exported unless every source loads; a download target is only created once the
    /// PNG has been encoded.
    #[tracing::instrument(skip_all, fields(canvas = %request.canvas, overlays = request.overlays.len()))]
    pub async fn compose(&self, request: CompositionRequest) -> LayercastResult<CompositionResult> {
        let frame = self.render(&request).await?;

        match request.mode {
            ExportMode::Download { path } => {
                let blob = export::encode_png(frame)?;
                let bytes = export::write_download(&path, &blob)?;
                tracing::info!(path = %path.display(), bytes, "wrote composite");
                Ok(CompositionResult::Downloaded { path, bytes })
            }
            ExportMode::Blob => {
                let blob = export::encode_png_blocking(frame).await?;
                tracing::debug!(bytes = blob.len(), "encoded composite blob");
                Ok(CompositionResult::Blob(blob))
            }
            ExportMode::DataUrl => {
                let blob = export::encode_png_blocking(frame).await?;
                Ok(CompositionResult::DataUrl(export::to_data_url(&blob)))
            }
        }
    }

    /// Load, draw and rasterize, without exporting.
    pub async fn render(&self, request: &CompositionRequest) -> LayercastResult<Frame> {
        if request.canvas != self.canvas {
            return Err(LayercastError::validation(format!(
                "request canvas {} differs from compositor canvas {}",
                request.canvas, self.canvas
            )));
        }
        // Fail on an unusable canvas before any source is fetched.
        self.canvas.surface_dims()?;

        let mut images = self.loader.load_all(request.sources()).await?.into_iter();
        let base = images
            .next()
            .ok_or_else(|| LayercastError::validation("base image missing from load results"))?;

        let mut surface = Surface::new(self.canvas)?;
        if let Some(rgba) = self.settings.clear_rgba {
            surface.clear(rgba);
        }

        let fit = layout::cover_fit(base.size(), self.canvas);
        tracing::debug!(scale = fit.scale, dx = fit.offset.x, dy = fit.offset.y, "base cover fit");
        surface.draw_image(&base, fit.dest_rect(base.size()), 1.0)?;

        for (overlay, image) in request.overlays.iter().zip(images) {
            let dest = layout::overlay_rect(overlay.placement(), self.canvas);
            tracing::debug!(
                source = %overlay.source(),
                opacity = overlay.opacity(),
                x = dest.x0,
                y = dest.y0,
                w = dest.width(),
                h = dest.height(),
                "draw overlay"
            );
            surface.draw_image(&image, dest, overlay.opacity())?;
        }

        Ok(surface.finish())
    }
}
