use crate::{
    assets::source::ImageSource,
    composition::model::{Overlay, Placement},
    foundation::error::{LayercastError, LayercastResult},
};

/// Placeholder base image used when no user source is set.
pub const DEFAULT_BASE: &str = "/default.png";
/// Directional pointer graphic.
pub const POINTER_SOURCE: &str = "/arrow.png";
/// Full-canvas tint graphic.
pub const TINT_SOURCE: &str = "/green_overlay.png";

/// One selectable overlay combination.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Preset {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<ImageSource>,
    pub overlays: Vec<Overlay>,
}

/// Trigger id -> ordered overlay list, plus the trigger preselected at startup.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "PresetTableFields")]
pub struct PresetTable {
    default_trigger: String,
    presets: Vec<Preset>,
}

#[derive(serde::Deserialize)]
struct PresetTableFields {
    default_trigger: String,
    presets: Vec<Preset>,
}

impl TryFrom<PresetTableFields> for PresetTable {
    type Error = LayercastError;

    fn try_from(f: PresetTableFields) -> Result<Self, Self::Error> {
        PresetTable::new(f.presets, f.default_trigger)
    }
}

impl Default for PresetTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PresetTable {
    pub fn new(presets: Vec<Preset>, default_trigger: impl Into<String>) -> LayercastResult<Self> {
        let default_trigger = default_trigger.into();
        if presets.is_empty() {
            return Err(LayercastError::validation(
                "preset table must contain at least one trigger",
            ));
        }
        for (i, p) in presets.iter().enumerate() {
            if p.id.trim().is_empty() {
                return Err(LayercastError::validation("preset id must be non-empty"));
            }
            if presets[..i].iter().any(|q| q.id == p.id) {
                return Err(LayercastError::validation(format!(
                    "duplicate preset id '{}'",
                    p.id
                )));
            }
        }
        if !presets.iter().any(|p| p.id == default_trigger) {
            return Err(LayercastError::validation(format!(
                "default trigger '{default_trigger}' is not in the preset table"
            )));
        }
        Ok(Self {
            default_trigger,
            presets,
        })
    }

    /// The four shipped presets: pointer, tinted pointer, solid pointer, tinted solid pointer.
    pub fn builtin() -> Self {
        fn src(s: &str) -> ImageSource {
            ImageSource::Asset(s.trim_start_matches('/').to_string())
        }
        fn pointer(opacity: f32) -> Overlay {
            Overlay {
                source: src(POINTER_SOURCE),
                opacity,
                placement: Placement::POINTER,
            }
        }
        fn tint() -> Overlay {
            Overlay {
                source: src(TINT_SOURCE),
                opacity: 0.6,
                placement: Placement::FullCover,
            }
        }
        let preset = |id: &str, thumb: &str, overlays: Vec<Overlay>| Preset {
            id: id.to_string(),
            thumbnail: Some(src(thumb)),
            overlays,
        };

        Self {
            default_trigger: "pointer".to_string(),
            presets: vec![
                preset("pointer", "/1.png", vec![pointer(0.6)]),
                preset("tinted-pointer", "/2.png", vec![tint(), pointer(0.6)]),
                preset("pointer-solid", "/3.png", vec![pointer(1.0)]),
                preset("tinted-pointer-solid", "/4.png", vec![tint(), pointer(1.0)]),
            ],
        }
    }

    pub fn default_trigger(&self) -> &str {
        &self.default_trigger
    }

    pub fn get(&self, trigger: &str) -> LayercastResult<&Preset> {
        self.presets
            .iter()
            .find(|p| p.id == trigger)
            .ok_or_else(|| {
                LayercastError::validation(format!(
                    "unknown trigger '{trigger}' (known: {})",
                    self.ids().collect::<Vec<_>>().join(", ")
                ))
            })
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.presets.iter().map(|p| p.id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Preset> {
        self.presets.iter()
    }

    pub fn from_json_str(s: &str) -> LayercastResult<Self> {
        serde_json::from_str(s)
            .map_err(|e| LayercastError::validation(format!("parse preset table JSON: {e}")))
    }
}

/// The overlay list currently in effect and the trigger that produced it.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlaySelection {
    trigger: String,
    overlays: Vec<Overlay>,
}

impl OverlaySelection {
    pub fn initial(table: &PresetTable) -> LayercastResult<Self> {
        Self::select(table, table.default_trigger())
    }

    /// Replace the selection wholesale with the preset for `trigger`.
    pub fn select(table: &PresetTable, trigger: &str) -> LayercastResult<Self> {
        let preset = table.get(trigger)?;
        Ok(Self {
            trigger: preset.id.clone(),
            overlays: preset.overlays.clone(),
        })
    }

    pub fn trigger(&self) -> &str {
        &self.trigger
    }

    pub fn overlays(&self) -> &[Overlay] {
        &self.overlays
    }
}
