use std::{
    io::Cursor,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use base64::Engine as _;

use crate::{
    composition::model::PngBlob,
    foundation::error::{LayercastError, LayercastResult},
    render::cpu::Frame,
};

/// Encode a rasterized frame as PNG.
pub fn encode_png(frame: Frame) -> LayercastResult<PngBlob> {
    let (w, h) = (frame.width(), frame.height());
    let img = frame.into_rgba_image()?;
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| LayercastError::encode(format!("png encode {w}x{h}: {e}")))?;
    PngBlob::new(w, h, buf)
}

/// Encode on the blocking pool so the caller's task keeps yielding.
pub async fn encode_png_blocking(frame: Frame) -> LayercastResult<PngBlob> {
    tokio::task::spawn_blocking(move || encode_png(frame))
        .await
        .map_err(|e| LayercastError::encode(format!("encode task failed: {e}")))?
}

pub fn to_data_url(blob: &PngBlob) -> String {
    format!(
        "data:{};base64,{}",
        PngBlob::MIME,
        base64::engine::general_purpose::STANDARD.encode(blob.as_bytes())
    )
}

/// Write `blob` to `path` through a sibling partial file that is renamed into place.
///
/// The partial file never outlives this call: it is either renamed or removed.
pub fn write_download(path: &Path, blob: &PngBlob) -> LayercastResult<u64> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    let partial = PartialFile::new(path);
    std::fs::write(&partial.path, blob.as_bytes())
        .with_context(|| format!("write png '{}'", partial.path.display()))?;
    partial.commit(path)?;
    Ok(blob.len() as u64)
}

struct PartialFile {
    path: PathBuf,
    committed: bool,
}

impl PartialFile {
    fn new(target: &Path) -> Self {
        let mut name = target
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "combined-image.png".into());
        name.push(format!(".{}.partial", std::process::id()));
        Self {
            path: target.with_file_name(name),
            committed: false,
        }
    }

    fn commit(mut self, target: &Path) -> LayercastResult<()> {
        std::fs::rename(&self.path, target)
            .with_context(|| format!("move png into place at '{}'", target.display()))?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
