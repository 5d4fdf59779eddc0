use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use base64::Engine as _;

use crate::{
    assets::{
        decode::{PreparedImage, decode_any},
        source::ImageSource,
    },
    foundation::error::{LayercastError, LayercastResult},
};

/// Fetches and decodes image sources.
///
/// Remote sources are requested anonymously: the client keeps no cookie store and sends no
/// credentials, so whatever it gets back is safe to read pixels from.
#[derive(Clone, Debug)]
pub struct ImageLoader {
    http: reqwest::Client,
    assets_root: PathBuf,
    timeout: Option<Duration>,
}

impl ImageLoader {
    pub fn new(assets_root: impl Into<PathBuf>) -> LayercastResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("layercast/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| anyhow::anyhow!("build http client: {e}"))?;
        Ok(Self::with_client(http, assets_root))
    }

    pub fn with_client(http: reqwest::Client, assets_root: impl Into<PathBuf>) -> Self {
        Self {
            http,
            assets_root: assets_root.into(),
            timeout: None,
        }
    }

    /// Per-source deadline. `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn assets_root(&self) -> &Path {
        &self.assets_root
    }

    #[tracing::instrument(skip_all, fields(kind = source.kind(), source = %label(source)))]
    pub async fn load(&self, source: &ImageSource) -> LayercastResult<PreparedImage> {
        let bytes = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.fetch_bytes(source))
                .await
                .map_err(|_| {
                    LayercastError::load(label(source), format!("timed out after {limit:?}"))
                })??,
            None => self.fetch_bytes(source).await?,
        };

        let len = bytes.len();
        let svg_hint = source.looks_like_svg();
        let image = tokio::task::spawn_blocking(move || decode_any(&bytes, svg_hint))
            .await
            .map_err(|e| LayercastError::load(label(source), format!("decode task failed: {e}")))?
            .map_err(|e| LayercastError::load(label(source), e))?;
        tracing::debug!(
            width = image.width,
            height = image.height,
            bytes = len,
            "loaded image"
        );
        Ok(image)
    }

    /// Load every source concurrently; resolves in input order or with the first failure.
    ///
    /// Loads still in flight when one fails are dropped.
    pub async fn load_all<'a>(
        &self,
        sources: impl IntoIterator<Item = &'a ImageSource>,
    ) -> LayercastResult<Vec<PreparedImage>> {
        futures::future::try_join_all(sources.into_iter().map(|s| self.load(s))).await
    }

    async fn fetch_bytes(&self, source: &ImageSource) -> LayercastResult<Vec<u8>> {
        let fail = |e: &dyn std::fmt::Display| LayercastError::load(label(source), e);
        match source {
            ImageSource::Url(url) => {
                let resp = self
                    .http
                    .get(url.clone())
                    .send()
                    .await
                    .map_err(|e| fail(&e))?
                    .error_for_status()
                    .map_err(|e| fail(&e))?;
                let body = resp.bytes().await.map_err(|e| fail(&e))?;
                Ok(body.to_vec())
            }
            ImageSource::DataUrl(d) => decode_data_url(d).map_err(|e| fail(&e)),
            ImageSource::File(path) => tokio::fs::read(path).await.map_err(|e| fail(&e)),
            ImageSource::Asset(rel) => {
                let path = self.assets_root.join(Path::new(rel));
                tokio::fs::read(&path)
                    .await
                    .map_err(|e| fail(&format!("read '{}': {e}", path.display())))
            }
        }
    }
}

/// Payload bytes of a `data:` URL (base64 or percent-encoded).
pub fn decode_data_url(s: &str) -> LayercastResult<Vec<u8>> {
    let rest = s
        .strip_prefix("data:")
        .or_else(|| s.strip_prefix("DATA:"))
        .ok_or_else(|| LayercastError::validation("data url must start with 'data:'"))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| LayercastError::validation("data url is missing ','"))?;

    if meta
        .rsplit(';')
        .next()
        .is_some_and(|p| p.eq_ignore_ascii_case("base64"))
    {
        base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| LayercastError::validation(format!("invalid base64 in data url: {e}")))
    } else {
        Ok(percent_encoding::percent_decode_str(payload).collect())
    }
}

/// Source rendered for logs and errors. Inline `data:` payloads are cut short; every other
/// source is kept as given.
fn label(source: &ImageSource) -> String {
    const MAX: usize = 64;
    let s = source.to_string();
    if !matches!(source, ImageSource::DataUrl(_)) || s.len() <= MAX {
        return s;
    }
    let mut end = MAX;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn png_bytes(w: u32, h: u32, rgba: [u8; 4]) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(w, h, image::Rgba(rgba));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "layercast_{name}_{}_{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn data_url_base64_and_plain() {
        let png = png_bytes(1, 1, [1, 2, 3, 255]);
        let b64 = base64::engine::general_purpose::STANDARD.encode(&png);
        assert_eq!(
            decode_data_url(&format!("data:image/png;base64,{b64}")).unwrap(),
            png
        );
        assert_eq!(
            decode_data_url("data:text/plain,a%20b").unwrap(),
            b"a b".to_vec()
        );
        assert!(decode_data_url("data:image/png;base64").is_err());
        assert_eq!(decode_data_url("data:,%zz%41").unwrap(), b"%zzA".to_vec());
    }

    #[test]
    fn label_truncates_inline_payloads() {
        let src = ImageSource::DataUrl(format!("data:image/png;base64,{}", "A".repeat(500)));
        let l = label(&src);
        assert!(l.len() <= 67);
        assert!(l.ends_with("..."));
    }

    #[test]
    fn label_keeps_long_urls_whole() {
        let url = format!("https://cdn.example.com/{}/img.png", "a".repeat(120));
        let src = ImageSource::parse(&url).unwrap();
        assert_eq!(label(&src), url);

        let asset = ImageSource::parse(&format!("/{}.png", "b".repeat(100))).unwrap();
        assert_eq!(label(&asset), asset.to_string());
    }

    #[tokio::test]
    async fn loads_assets_relative_to_root() {
        let dir = temp_dir("loader_asset");
        std::fs::write(dir.join("arrow.png"), png_bytes(3, 2, [9, 9, 9, 255])).unwrap();

        let loader = ImageLoader::new(&dir).unwrap();
        let img = loader
            .load(&ImageSource::parse("/arrow.png").unwrap())
            .await
            .unwrap();
        assert_eq!((img.width, img.height), (3, 2));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn load_all_keeps_order_and_fails_as_a_unit() {
        let dir = temp_dir("loader_all");
        std::fs::write(dir.join("a.png"), png_bytes(1, 1, [0, 0, 0, 255])).unwrap();
        std::fs::write(dir.join("b.png"), png_bytes(2, 1, [0, 0, 0, 255])).unwrap();
        let loader = ImageLoader::new(&dir).unwrap();

        let a = ImageSource::parse("a.png").unwrap();
        let b = ImageSource::parse("b.png").unwrap();
        let missing = ImageSource::parse("missing.png").unwrap();

        let ok = loader.load_all([&b, &a]).await.unwrap();
        assert_eq!(
            ok.iter().map(|i| i.width).collect::<Vec<_>>(),
            [2, 1]
        );

        let err = loader.load_all([&a, &missing, &b]).await.unwrap_err();
        match err {
            LayercastError::Load { source_ref, .. } => assert_eq!(source_ref, "/missing.png"),
            other => panic!("expected load error, got {other:?}"),
        }

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn undecodable_file_is_a_load_error() {
        let dir = temp_dir("loader_garbage");
        std::fs::write(dir.join("bad.png"), b"nope").unwrap();
        let loader = ImageLoader::new(&dir).unwrap();
        let err = loader
            .load(&ImageSource::parse("bad.png").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, LayercastError::Load { .. }));
        std::fs::remove_dir_all(&dir).ok();
    }
}
