//! layercast flattens a base image and a preset stack of translucent overlays into one PNG.
//!
//! # Pipeline overview
//!
//! 1. **Select**: a trigger id picks an ordered overlay list from a [`PresetTable`].
//! 2. **Load**: the base and every overlay are fetched and decoded concurrently; one failure fails
//!    the whole composition ([`ImageLoader::load_all`]).
//! 3. **Draw**: the base is scaled to cover the canvas and centered, then each overlay is drawn in
//!    order at its [`Placement`] with its own opacity ([`Compositor`]).
//! 4. **Export**: PNG file, PNG bytes, or a `data:` URL; bytes can go to an [`ObjectStore`] and come
//!    back as [`ShareLinks`].
//!
//! [`Studio`] ties these together behind the actions a user triggers.
#![forbid(unsafe_code)]

mod assets;
mod composition;
mod config;
mod foundation;
mod render;
mod share;
mod studio;
mod upload;

pub use assets::decode::{PreparedImage, decode_any, decode_image, rasterize_svg};
pub use assets::loader::{ImageLoader, decode_data_url};
pub use assets::source::{ImageSource, normalize_rel_path};
pub use composition::model::{
    CompositionRequest, CompositionResult, ExportMode, Overlay, Placement, PngBlob,
};
pub use composition::presets::{
    DEFAULT_BASE, OverlaySelection, POINTER_SOURCE, Preset, PresetTable, TINT_SOURCE,
};
pub use config::{
    ENV_ASSETS_ROOT, ENV_UPLOAD_ENDPOINT, ENV_UPLOAD_TOKEN, StudioConfig, UploadConfig,
};
pub use foundation::core::{Affine, Canvas, Point, Rect, Vec2};
pub use foundation::error::{LayercastError, LayercastResult};
pub use render::cpu::{Frame, Surface};
pub use render::export::{encode_png, to_data_url, write_download};
pub use render::layout::{CoverFit, cover_fit, overlay_rect};
pub use render::pipeline::{Compositor, RenderSettings};
pub use share::{ShareLinks, mint_link, post_link};
pub use studio::{Published, Studio};
pub use upload::{DirObjectStore, HttpObjectStore, ObjectStore, object_key};
