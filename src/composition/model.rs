use std::path::PathBuf;

use crate::{
    assets::source::ImageSource,
    foundation::core::Canvas,
    foundation::error::{LayercastError, LayercastResult},
};

/// How an overlay is sized and positioned on the canvas.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Placement {
    /// Stretched to exactly fill the canvas, zero offset.
    #[default]
    FullCover,
    /// Fixed absolute size, centered on the canvas.
    Centered { width: f64, height: f64 },
}

impl Placement {
    /// Footprint of the pointer graphic shipped with the built-in presets.
    pub const POINTER: Placement = Placement::Centered {
        width: 450.26,
        height: 479.74,
    };

    fn validate(self) -> LayercastResult<()> {
        match self {
            Placement::FullCover => Ok(()),
            Placement::Centered { width, height } => {
                if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
                    return Err(LayercastError::validation(format!(
                        "centered placement size must be finite and > 0, got {width}x{height}"
                    )));
                }
                Ok(())
            }
        }
    }
}

/// One semi-transparent layer drawn above the base image.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "OverlayFields")]
pub struct Overlay {
    pub(crate) source: ImageSource,
    pub(crate) opacity: f32,
    pub(crate) placement: Placement,
}

#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct OverlayFields {
    source: ImageSource,
    opacity: f32,
    #[serde(default)]
    placement: Placement,
}

impl TryFrom<OverlayFields> for Overlay {
    type Error = LayercastError;

    fn try_from(f: OverlayFields) -> Result<Self, Self::Error> {
        Overlay::new(f.source, f.opacity, f.placement)
    }
}

impl Overlay {
    /// Build an overlay; opacity must be finite and within `[0, 1]`.
    pub fn new(source: ImageSource, opacity: f32, placement: Placement) -> LayercastResult<Self> {
        if !opacity.is_finite() || !(0.0..=1.0).contains(&opacity) {
            return Err(LayercastError::validation(format!(
                "overlay opacity must be within [0, 1], got {opacity} for '{source}'"
            )));
        }
        placement.validate()?;
        Ok(Self {
            source,
            opacity,
            placement,
        })
    }

    pub fn source(&self) -> &ImageSource {
        &self.source
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }
}

/// What to do with the composed canvas.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportMode {
    /// Write a PNG file at `path`.
    Download { path: PathBuf },
    /// Return encoded PNG bytes.
    Blob,
    /// Return a `data:image/png;base64,...` string.
    DataUrl,
}

/// Everything one `compose` call needs. Built fresh per action.
#[derive(Clone, Debug, PartialEq)]
pub struct CompositionRequest {
    pub base: ImageSource,
    pub overlays: Vec<Overlay>,
    pub canvas: Canvas,
    pub mode: ExportMode,
}

impl CompositionRequest {
    pub fn new(base: ImageSource, overlays: Vec<Overlay>, canvas: Canvas) -> Self {
        Self {
            base,
            overlays,
            canvas,
            mode: ExportMode::Blob,
        }
    }

    pub fn with_mode(mut self, mode: ExportMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sources in load order: base first, then overlays in draw order.
    pub fn sources(&self) -> impl Iterator<Item = &ImageSource> {
        std::iter::once(&self.base).chain(self.overlays.iter().map(Overlay::source))
    }
}

/// Encoded PNG bytes of a composed canvas.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PngBlob {
    pub width: u32,
    pub height: u32,
    bytes: Vec<u8>,
}

impl PngBlob {
    pub(crate) fn new(width: u32, height: u32, bytes: Vec<u8>) -> LayercastResult<Self> {
        if bytes.is_empty() {
            return Err(LayercastError::encode("png encoder produced no bytes"));
        }
        Ok(Self {
            width,
            height,
            bytes,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub const MIME: &'static str = "image/png";
}

/// Outcome of one `compose` call, matching the requested [`ExportMode`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompositionResult {
    Downloaded { path: PathBuf, bytes: u64 },
    Blob(PngBlob),
    DataUrl(String),
}

impl CompositionResult {
    pub fn into_blob(self) -> LayercastResult<PngBlob> {
        match self {
            CompositionResult::Blob(b) => Ok(b),
            other => Err(LayercastError::validation(format!(
                "expected a blob result, got {other:?}"
            ))),
        }
    }
}
