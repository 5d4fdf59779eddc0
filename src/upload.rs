//! Object-store uploads of composed PNGs.
//!
//! Each upload is a single attempt. Callers decide how to report failures.

use std::{
    future::Future,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use anyhow::Context as _;
use url::Url;

use crate::{
    composition::model::PngBlob,
    foundation::error::{LayercastError, LayercastResult},
};

/// Something that stores bytes under a key and hands back a public URL.
pub trait ObjectStore {
    fn store(
        &self,
        key: &str,
        blob: &PngBlob,
    ) -> impl Future<Output = LayercastResult<Url>> + Send;
}

/// `images/<unix millis>-image.png`
pub fn object_key(now: SystemTime) -> String {
    let millis = now
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    format!("images/{millis}-image.png")
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// PUTs the PNG to `<endpoint>/<key>` and reads `{"url": ...}` back.
#[derive(Clone, Debug)]
pub struct HttpObjectStore {
    http: reqwest::Client,
    endpoint: Url,
    token: Option<String>,
}

#[derive(serde::Deserialize)]
struct PutResponse {
    #[serde(default)]
    url: Option<String>,
}

impl HttpObjectStore {
    pub fn new(endpoint: Url, token: Option<String>) -> LayercastResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("layercast/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| anyhow::anyhow!("build http client: {e}"))?;
        Ok(Self {
            http,
            endpoint: with_trailing_slash(endpoint),
            token,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl ObjectStore for HttpObjectStore {
    #[tracing::instrument(skip(self, blob), fields(bytes = blob.len()))]
    async fn store(&self, key: &str, blob: &PngBlob) -> LayercastResult<Url> {
        let target = self
            .endpoint
            .join(key)
            .map_err(|e| LayercastError::validation(format!("invalid object key '{key}': {e}")))?;

        let mut req = self
            .http
            .put(target.clone())
            .header(reqwest::header::CONTENT_TYPE, PngBlob::MIME)
            .header("x-access", "public")
            .body(blob.as_bytes().to_vec());
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| LayercastError::upload(format!("PUT {target}: {e}")))?
            .error_for_status()
            .map_err(|e| LayercastError::upload(format!("PUT {target}: {e}")))?;
        let body: PutResponse = resp
            .json()
            .await
            .map_err(|e| LayercastError::upload(format!("read upload response: {e}")))?;

        let url = body
            .url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| LayercastError::upload("upload failed: store returned no url"))?;
        let url = Url::parse(&url)
            .map_err(|e| LayercastError::upload(format!("store returned invalid url '{url}': {e}")))?;
        tracing::info!(%url, "uploaded composite");
        Ok(url)
    }
}

/// Writes objects under a local directory. Useful offline and in tests.
#[derive(Clone, Debug)]
pub struct DirObjectStore {
    root: PathBuf,
    public_base: Option<Url>,
}

impl DirObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            public_base: None,
        }
    }

    /// Report URLs under `base` instead of `file://` URLs.
    pub fn with_public_base(mut self, base: Url) -> Self {
        self.public_base = Some(with_trailing_slash(base));
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ObjectStore for DirObjectStore {
    #[tracing::instrument(skip(self, blob), fields(bytes = blob.len()))]
    async fn store(&self, key: &str, blob: &PngBlob) -> LayercastResult<Url> {
        let rel = crate::assets::source::normalize_rel_path(key)?;
        let path = self.root.join(Path::new(&rel));
        let write = async {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("create '{}'", parent.display()))?;
            }
            tokio::fs::write(&path, blob.as_bytes())
                .await
                .with_context(|| format!("write '{}'", path.display()))
        };
        write
            .await
            .map_err(|e| LayercastError::upload(format!("{e:#}")))?;

        match &self.public_base {
            Some(base) => base
                .join(&rel)
                .map_err(|e| LayercastError::upload(format!("join public url: {e}"))),
            None => {
                let abs = std::path::absolute(&path)
                    .with_context(|| format!("resolve '{}'", path.display()))?;
                Url::from_file_path(&abs).map_err(|()| {
                    LayercastError::upload(format!("'{}' has no file url", abs.display()))
                })
            }
        }
    }
}
