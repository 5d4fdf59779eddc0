use std::path::{Path, PathBuf};

use crate::foundation::error::{LayercastError, LayercastResult};

/// Where an image comes from.
///
/// Parsed from the strings users and preset tables supply. Web-root style paths (`/arrow.png`)
/// resolve under the configured assets root; anything that must escape the root has to be given
/// as a `file://` URL or built with [`ImageSource::file`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ImageSource {
    /// Remote image fetched over HTTP(S) without credentials.
    Url(url::Url),
    /// Inline `data:` URL, kept verbatim.
    DataUrl(String),
    /// Absolute local file, typically a user-selected upload.
    File(PathBuf),
    /// Normalized path relative to the assets root.
    Asset(String),
}

impl ImageSource {
    pub fn parse(raw: &str) -> LayercastResult<Self> {
        let s = raw.trim();
        if s.is_empty() {
            return Err(LayercastError::validation("image source must be non-empty"));
        }

        let lower = s.get(..8).unwrap_or(s).to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            let url = url::Url::parse(s)
                .map_err(|e| LayercastError::validation(format!("invalid url '{s}': {e}")))?;
            return Ok(Self::Url(url));
        }
        if lower.starts_with("data:") {
            return Ok(Self::DataUrl(s.to_string()));
        }
        if lower.starts_with("file://") {
            let url = url::Url::parse(s)
                .map_err(|e| LayercastError::validation(format!("invalid file url '{s}': {e}")))?;
            let path = url.to_file_path().map_err(|_| {
                LayercastError::validation(format!("file url '{s}' is not a local path"))
            })?;
            return Ok(Self::File(path));
        }

        let rel = s.strip_prefix('/').unwrap_or(s);
        Ok(Self::Asset(normalize_rel_path(rel)?))
    }

    /// Local file source; relative paths are made absolute against the working directory.
    pub fn file(path: impl AsRef<Path>) -> LayercastResult<Self> {
        let abs = std::path::absolute(path.as_ref()).map_err(|e| {
            LayercastError::validation(format!(
                "cannot resolve '{}': {e}",
                path.as_ref().display()
            ))
        })?;
        Ok(Self::File(abs))
    }

    /// Short label for logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Url(_) => "url",
            Self::DataUrl(_) => "data-url",
            Self::File(_) => "file",
            Self::Asset(_) => "asset",
        }
    }

    /// Whether this source names an SVG document rather than a raster image.
    pub fn looks_like_svg(&self) -> bool {
        match self {
            Self::Url(u) => u.path().to_ascii_lowercase().ends_with(".svg"),
            Self::DataUrl(d) => d.get(..18).unwrap_or(d).eq_ignore_ascii_case("data:image/svg+xml"),
            Self::File(p) => p
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("svg")),
            Self::Asset(p) => p.to_ascii_lowercase().ends_with(".svg"),
        }
    }
}

impl std::str::FromStr for ImageSource {
    type Err = LayercastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ImageSource {
    type Error = LayercastError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ImageSource> for String {
    fn from(value: ImageSource) -> Self {
        value.to_string()
    }
}

impl std::fmt::Display for ImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Url(u) => f.write_str(u.as_str()),
            Self::DataUrl(d) => f.write_str(d),
            Self::File(p) => match url::Url::from_file_path(p) {
                Ok(u) => f.write_str(u.as_str()),
                Err(()) => write!(f, "{}", p.display()),
            },
            Self::Asset(p) => write!(f, "/{p}"),
        }
    }
}

/// Normalize and validate assets-root-relative paths.
///
/// The normalized result uses `/` separators, removes `.` segments, and rejects absolute paths or
/// parent traversals (`..`).
pub fn normalize_rel_path(source: &str) -> LayercastResult<String> {
    let s = source.replace('\\', "/");
    if s.starts_with('/') {
        return Err(LayercastError::validation("asset paths must be relative"));
    }
    if s.is_empty() {
        return Err(LayercastError::validation("asset path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(LayercastError::validation(
                "asset paths must not contain '..'",
            ));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(LayercastError::validation(
            "asset path must contain a file name",
        ));
    }

    Ok(out.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_classifies_sources() {
        assert!(matches!(
            ImageSource::parse("https://cdn.example.com/a.png").unwrap(),
            ImageSource::Url(_)
        ));
        assert!(matches!(
            ImageSource::parse("data:image/png;base64,AAAA").unwrap(),
            ImageSource::DataUrl(_)
        ));
        assert_eq!(
            ImageSource::parse("/arrow.png").unwrap(),
            ImageSource::Asset("arrow.png".to_string())
        );
        assert_eq!(
            ImageSource::parse("./thumbs\\1.png").unwrap(),
            ImageSource::Asset("thumbs/1.png".to_string())
        );
    }

    #[test]
    fn parse_rejects_empty_and_traversal() {
        assert!(ImageSource::parse("   ").is_err());
        assert!(ImageSource::parse("/../etc/passwd").is_err());
        assert!(ImageSource::parse("https://").is_err());
    }

    #[test]
    fn asset_display_is_web_root_path() {
        let src = ImageSource::parse("green_overlay.png").unwrap();
        assert_eq!(src.to_string(), "/green_overlay.png");
        let json = serde_json::to_string(&src).unwrap();
        assert_eq!(json, "\"/green_overlay.png\"");
        let back: ImageSource = serde_json::from_str(&json).unwrap();
        assert_eq!(back, src);
    }

    #[test]
    fn svg_detection_uses_extension_or_mime() {
        assert!(ImageSource::parse("/logo.SVG").unwrap().looks_like_svg());
        assert!(
            ImageSource::parse("data:image/svg+xml;base64,PHN2Zy8+")
                .unwrap()
                .looks_like_svg()
        );
        assert!(!ImageSource::parse("/arrow.png").unwrap().looks_like_svg());
    }

    #[test]
    fn normalize_path_cross_platform() {
        assert_eq!(normalize_rel_path("a/b.png").unwrap(), "a/b.png");
        assert_eq!(normalize_rel_path("a\\b.png").unwrap(), "a/b.png");
        assert!(normalize_rel_path("../x.png").is_err());
        assert!(normalize_rel_path("./").is_err());
    }
}
