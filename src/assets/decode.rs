use std::sync::Arc;

use anyhow::Context;

use crate::foundation::{
    core::{MAX_SURFACE_DIM, premultiply_rgba8_in_place},
    error::{LayercastError, LayercastResult},
};

/// Decoded raster image in premultiplied RGBA8 form.
#[derive(Clone, Debug)]
pub struct PreparedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes in row-major premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl PreparedImage {
    pub fn size(&self) -> kurbo::Size {
        kurbo::Size::new(f64::from(self.width), f64::from(self.height))
    }
}

// Avoid pathological allocations from hostile SVG headers.
const MAX_SVG_DIM: u32 = 16_384;

/// Decode a raster image, downscaling it to fit the rasterizer if either edge is too long.
pub fn decode_image(bytes: &[u8]) -> LayercastResult<PreparedImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let mut rgba = dyn_img.to_rgba8();
    let (w, h) = rgba.dimensions();
    if w == 0 || h == 0 {
        return Err(LayercastError::validation("decoded image has zero size"));
    }
    if let Some((nw, nh)) = fit_within(w, h, MAX_SURFACE_DIM) {
        tracing::debug!(from_w = w, from_h = h, to_w = nw, to_h = nh, "downscaling oversized image");
        rgba = image::imageops::resize(&rgba, nw, nh, image::imageops::FilterType::Triangle);
    }
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

/// Aspect-preserving size with both edges at most `max`, or `None` if it already fits.
fn fit_within(w: u32, h: u32, max: u32) -> Option<(u32, u32)> {
    if w <= max && h <= max {
        return None;
    }
    let scale = f64::from(max) / f64::from(w.max(h));
    let shrink = |v: u32| ((f64::from(v) * scale).round() as u32).clamp(1, max);
    Some((shrink(w), shrink(h)))
}

/// Parse an SVG document and rasterize it at its intrinsic size.
pub fn rasterize_svg(bytes: &[u8]) -> LayercastResult<PreparedImage> {
    let opts = usvg::Options::default();
    let tree = usvg::Tree::from_data(bytes, &opts).context("parse svg tree")?;

    fn to_px(v: f32) -> LayercastResult<u32> {
        if !v.is_finite() || v <= 0.0 {
            return Err(LayercastError::validation("svg has invalid width/height"));
        }
        Ok((v.ceil() as u32).max(1))
    }
    let width = to_px(tree.size().width())?;
    let height = to_px(tree.size().height())?;
    if width > MAX_SVG_DIM || height > MAX_SVG_DIM {
        return Err(LayercastError::validation(format!(
            "svg raster size too large: {width}x{height} (max {MAX_SVG_DIM}x{MAX_SVG_DIM})"
        )));
    }

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| LayercastError::validation("failed to allocate svg pixmap"))?;
    let sx = (width as f32) / tree.size().width();
    let sy = (height as f32) / tree.size().height();
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::from_scale(sx, sy),
        &mut pixmap.as_mut(),
    );

    // tiny-skia pixmaps are already premultiplied RGBA8.
    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(pixmap.data().to_vec()),
    })
}

/// Decode `bytes`, sniffing SVG documents by content when `svg_hint` is not set.
pub fn decode_any(bytes: &[u8], svg_hint: bool) -> LayercastResult<PreparedImage> {
    if svg_hint || looks_like_svg_document(bytes) {
        rasterize_svg(bytes)
    } else {
        decode_image(bytes)
    }
}

fn looks_like_svg_document(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(512)];
    let Ok(text) = std::str::from_utf8(head) else {
        return false;
    };
    let text = text.trim_start_matches('\u{feff}').trim_start();
    text.starts_with("<svg") || (text.starts_with("<?xml") && text.contains("<svg"))
}
