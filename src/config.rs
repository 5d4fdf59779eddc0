use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context as _;
use url::Url;

use crate::{
    assets::{loader::ImageLoader, source::ImageSource},
    composition::presets::{DEFAULT_BASE, PresetTable},
    foundation::core::Canvas,
    foundation::error::{LayercastError, LayercastResult},
    render::pipeline::{Compositor, RenderSettings},
    upload::HttpObjectStore,
};

pub const ENV_ASSETS_ROOT: &str = "LAYERCAST_ASSETS_ROOT";
pub const ENV_UPLOAD_ENDPOINT: &str = "LAYERCAST_UPLOAD_ENDPOINT";
pub const ENV_UPLOAD_TOKEN: &str = "LAYERCAST_UPLOAD_TOKEN";

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadConfig {
    pub endpoint: Option<Url>,
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub public_base: Option<Url>,
}

/// Everything a [`crate::Studio`] needs, loadable from JSON with every field optional.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StudioConfig {
    pub canvas: Canvas,
    pub assets_root: PathBuf,
    pub default_base: ImageSource,
    pub presets: PresetTable,
    /// Overrides the preset table's own default trigger.
    pub default_trigger: Option<String>,
    pub background_rgba: Option<[u8; 4]>,
    pub load_timeout_ms: Option<u64>,
    pub upload: UploadConfig,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            canvas: Canvas::default(),
            assets_root: PathBuf::from("."),
            default_base: ImageSource::Asset(DEFAULT_BASE.trim_start_matches('/').to_string()),
            presets: PresetTable::builtin(),
            default_trigger: None,
            background_rgba: None,
            load_timeout_ms: None,
            upload: UploadConfig::default(),
        }
    }
}

impl StudioConfig {
    pub fn from_json_path(path: &Path) -> LayercastResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_str(&text).map_err(|e| {
            LayercastError::validation(format!("parse config '{}': {e}", path.display()))
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply `LAYERCAST_*` environment overrides.
    pub fn apply_env(self) -> LayercastResult<Self> {
        self.apply_env_from(|k| std::env::var(k).ok())
    }

    pub fn apply_env_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> LayercastResult<Self> {
        let get = |k: &str| lookup(k).filter(|v| !v.trim().is_empty());

        if let Some(root) = get(ENV_ASSETS_ROOT) {
            self.assets_root = PathBuf::from(root);
        }
        if let Some(endpoint) = get(ENV_UPLOAD_ENDPOINT) {
            let url = Url::parse(endpoint.trim()).map_err(|e| {
                LayercastError::validation(format!("{ENV_UPLOAD_ENDPOINT} is not a url: {e}"))
            })?;
            self.upload.endpoint = Some(url);
        }
        if let Some(token) = get(ENV_UPLOAD_TOKEN) {
            self.upload.token = Some(token);
        }
        Ok(self)
    }

    pub fn validate(&self) -> LayercastResult<()> {
        self.canvas.surface_dims()?;
        self.presets.get(self.default_trigger())?;
        Ok(())
    }

    pub fn default_trigger(&self) -> &str {
        self.default_trigger
            .as_deref()
            .unwrap_or_else(|| self.presets.default_trigger())
    }

    pub fn load_timeout(&self) -> Option<Duration> {
        self.load_timeout_ms.map(Duration::from_millis)
    }

    pub fn build_compositor(&self) -> LayercastResult<Compositor> {
        let loader = ImageLoader::new(&self.assets_root)?.with_timeout(self.load_timeout());
        Ok(Compositor::new(self.canvas, loader).with_settings(RenderSettings {
            clear_rgba: self.background_rgba,
        }))
    }

    /// HTTP store if an endpoint is configured.
    pub fn http_store(&self) -> LayercastResult<Option<HttpObjectStore>> {
        self.upload
            .endpoint
            .clone()
            .map(|endpoint| HttpObjectStore::new(endpoint, self.upload.token.clone()))
            .transpose()
    }
}
