use std::{
    future::Future,
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, Ordering},
    time::SystemTime,
};

use crate::{
    assets::source::ImageSource,
    composition::model::{CompositionRequest, CompositionResult, ExportMode, PngBlob},
    composition::presets::{OverlaySelection, PresetTable},
    config::StudioConfig,
    foundation::error::{LayercastError, LayercastResult},
    render::pipeline::Compositor,
    share::ShareLinks,
    upload::{ObjectStore, object_key},
};

/// Session state plus the user-facing actions: download, data URL, publish.
///
/// One action runs at a time. The busy flag is raised for the duration of an action and dropped on
/// every exit path, including errors.
pub struct Studio {
    config: StudioConfig,
    compositor: Compositor,
    base: ImageSource,
    selection: OverlaySelection,
    busy: AtomicBool,
}

/// Result of a successful publish.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Published {
    pub key: String,
    pub bytes: usize,
    pub links: ShareLinks,
}

impl Studio {
    pub fn new(config: StudioConfig) -> LayercastResult<Self> {
        config.validate()?;
        let compositor = config.build_compositor()?;
        let selection = OverlaySelection::select(&config.presets, config.default_trigger())?;
        Ok(Self {
            base: config.default_base.clone(),
            compositor,
            selection,
            config,
            busy: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    pub fn presets(&self) -> &PresetTable {
        &self.config.presets
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    pub fn base(&self) -> &ImageSource {
        &self.base
    }

    pub fn selection(&self) -> &OverlaySelection {
        &self.selection
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Set the base from a pasted URL or path; blank input restores the default placeholder.
    pub fn set_base_input(&mut self, input: &str) -> LayercastResult<()> {
        self.base = if input.trim().is_empty() {
            self.config.default_base.clone()
        } else {
            ImageSource::parse(input)?
        };
        Ok(())
    }

    /// Set the base to a local file chosen by the user.
    pub fn set_base_file(&mut self, path: impl AsRef<Path>) -> LayercastResult<()> {
        self.base = ImageSource::file(path)?;
        Ok(())
    }

    /// Switch to the preset for `trigger`, replacing the current overlays wholesale.
    pub fn select(&mut self, trigger: &str) -> LayercastResult<()> {
        self.selection = OverlaySelection::select(&self.config.presets, trigger)?;
        tracing::debug!(trigger, overlays = self.selection.overlays().len(), "selected preset");
        Ok(())
    }

    pub fn request(&self, mode: ExportMode) -> CompositionRequest {
        CompositionRequest::new(
            self.base.clone(),
            self.selection.overlays().to_vec(),
            self.compositor.canvas(),
        )
        .with_mode(mode)
    }

    pub async fn download(&self, path: impl Into<PathBuf>) -> LayercastResult<PathBuf> {
        let mode = ExportMode::Download { path: path.into() };
        self.run("download", async {
            match self.compositor.compose(self.request(mode)).await? {
                CompositionResult::Downloaded { path, .. } => Ok(path),
                other => Err(unexpected(other)),
            }
        })
        .await
    }

    pub async fn data_url(&self) -> LayercastResult<String> {
        self.run("data-url", async {
            match self.compositor.compose(self.request(ExportMode::DataUrl)).await? {
                CompositionResult::DataUrl(s) => Ok(s),
                other => Err(unexpected(other)),
            }
        })
        .await
    }

    pub async fn blob(&self) -> LayercastResult<PngBlob> {
        self.run("blob", async {
            self.compositor
                .compose(self.request(ExportMode::Blob))
                .await?
                .into_blob()
        })
        .await
    }

    /// Compose, upload once, and build share links around the stored URL.
    pub async fn publish<S: ObjectStore>(&self, store: &S) -> LayercastResult<Published> {
        self.run("publish", async {
            let blob = self
                .compositor
                .compose(self.request(ExportMode::Blob))
                .await?
                .into_blob()?;
            let key = object_key(SystemTime::now());
            let url = store.store(&key, &blob).await?;
            Ok(Published {
                key,
                bytes: blob.len(),
                links: ShareLinks::for_image(&url)?,
            })
        })
        .await
    }

    async fn run<T>(
        &self,
        action: &'static str,
        fut: impl Future<Output = LayercastResult<T>>,
    ) -> LayercastResult<T> {
        let _busy = BusyGuard::acquire(&self.busy)?;
        let out = fut.await;
        if let Err(err) = &out {
            tracing::error!(action, error = %err, "action failed");
        }
        out
    }
}

fn unexpected(result: CompositionResult) -> LayercastError {
    LayercastError::validation(format!("unexpected composition result {result:?}"))
}

struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> LayercastResult<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| LayercastError::validation("another action is already running"))?;
        Ok(Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_guard_is_exclusive_and_released_on_drop() {
        let flag = AtomicBool::new(false);
        {
            let _g = BusyGuard::acquire(&flag).unwrap();
            assert!(flag.load(Ordering::Acquire));
            assert!(BusyGuard::acquire(&flag).is_err());
        }
        assert!(!flag.load(Ordering::Acquire));
    }

    #[test]
    fn new_studio_preselects_default_trigger() {
        let studio = Studio::new(StudioConfig::default()).unwrap();
        assert_eq!(studio.selection().trigger(), "pointer");
        assert_eq!(studio.base().to_string(), "/default.png");
        assert!(!studio.is_busy());
    }

    #[test]
    fn blank_base_input_restores_placeholder() {
        let mut studio = Studio::new(StudioConfig::default()).unwrap();
        studio
            .set_base_input("https://example.com/me.jpg")
            .unwrap();
        assert_eq!(studio.base().kind(), "url");
        studio.set_base_input("  ").unwrap();
        assert_eq!(studio.base().to_string(), "/default.png");
    }

    #[test]
    fn request_reflects_selection() {
        let mut studio = Studio::new(StudioConfig::default()).unwrap();
        studio.select("tinted-pointer").unwrap();
        let req = studio.request(ExportMode::Blob);
        assert_eq!(req.overlays.len(), 2);
        assert_eq!(req.canvas, studio.compositor().canvas());
        assert!(studio.select("nope").is_err());
        assert_eq!(studio.selection().trigger(), "tinted-pointer");
    }

    #[tokio::test]
    async fn failed_action_clears_busy() {
        let dir = std::env::temp_dir().join(format!("layercast_studio_empty_{}", std::process::id()));
        let cfg = StudioConfig {
            assets_root: dir.clone(),
            ..StudioConfig::default()
        };
        let studio = Studio::new(cfg).unwrap();
        let err = studio.download(dir.join("out.png")).await.unwrap_err();
        assert!(matches!(err, LayercastError::Load { .. }));
        assert!(!studio.is_busy());
        assert!(!dir.join("out.png").exists());
    }
}
