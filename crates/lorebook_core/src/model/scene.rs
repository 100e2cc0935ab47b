//! Scene domain model and atmosphere settings.
//!
//! # Invariants
//! - `note_ids` is mirrored by each linked note's `scene_ids`.
//! - `atmosphere.background_color` is always a `#RRGGBB` hex string.

use crate::model::{
    dedup_ids, epoch_ms_now, normalize_tags, require_non_empty, ValidationError,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

static HEX_COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("valid hex color regex"));

/// Stable identifier for a scene.
pub type SceneId = Uuid;

/// Lighting treatment applied by the immersive reading view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightingEffect {
    Daylight,
    Dusk,
    Candlelight,
    Moonlight,
    Neon,
}

impl LightingEffect {
    pub(crate) fn as_db(self) -> &'static str {
        match self {
            Self::Daylight => "daylight",
            Self::Dusk => "dusk",
            Self::Candlelight => "candlelight",
            Self::Moonlight => "moonlight",
            Self::Neon => "neon",
        }
    }

    pub(crate) fn parse_db(value: &str) -> Option<Self> {
        match value {
            "daylight" => Some(Self::Daylight),
            "dusk" => Some(Self::Dusk),
            "candlelight" => Some(Self::Candlelight),
            "moonlight" => Some(Self::Moonlight),
            "neon" => Some(Self::Neon),
            _ => None,
        }
    }
}

/// Optional ambient particle overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticleEffect {
    Rain,
    Snow,
    Fireflies,
    Embers,
    Dust,
}

impl ParticleEffect {
    pub(crate) fn as_db(self) -> &'static str {
        match self {
            Self::Rain => "rain",
            Self::Snow => "snow",
            Self::Fireflies => "fireflies",
            Self::Embers => "embers",
            Self::Dust => "dust",
        }
    }

    pub(crate) fn parse_db(value: &str) -> Option<Self> {
        match value {
            "rain" => Some(Self::Rain),
            "snow" => Some(Self::Snow),
            "fireflies" => Some(Self::Fireflies),
            "embers" => Some(Self::Embers),
            "dust" => Some(Self::Dust),
            _ => None,
        }
    }
}

/// Visual mood of a scene in the immersive view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Atmosphere {
    /// `#RRGGBB` hex string.
    pub background_color: String,
    pub lighting: LightingEffect,
    #[serde(default)]
    pub particle: Option<ParticleEffect>,
}

impl Default for Atmosphere {
    fn default() -> Self {
        Self {
            background_color: "#1C1C2E".to_string(),
            lighting: LightingEffect::Daylight,
            particle: None,
        }
    }
}

/// Canonical scene record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    pub uuid: SceneId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Relative attachment file name of the cover image, if any.
    #[serde(default)]
    pub cover_file: Option<String>,
    /// Relative attachment file name of the ambient audio loop, if any.
    #[serde(default)]
    pub ambient_audio_file: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub atmosphere: Atmosphere,
    /// Ids of notes linked to this scene. Mirrored by each note.
    #[serde(default)]
    pub note_ids: Vec<Uuid>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Scene {
    /// Creates a new scene with a generated stable ID and default atmosphere.
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), title, description)
    }

    /// Creates a scene with a caller-provided stable ID (restore path).
    pub fn with_id(uuid: SceneId, title: impl Into<String>, description: impl Into<String>) -> Self {
        let now = epoch_ms_now();
        Self {
            uuid,
            title: title.into(),
            description: description.into(),
            cover_file: None,
            ambient_audio_file: None,
            tags: Vec::new(),
            atmosphere: Atmosphere::default(),
            note_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Checks field-level invariants before persistence.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty(&self.title, "scene", "title")?;
        if !HEX_COLOR_RE.is_match(&self.atmosphere.background_color) {
            return Err(ValidationError::InvalidColor(
                self.atmosphere.background_color.clone(),
            ));
        }
        Ok(())
    }

    /// Re-establishes list hygiene: normalized tags, duplicate-free ids.
    pub fn normalize(&mut self) {
        self.tags = normalize_tags(&self.tags);
        dedup_ids(&mut self.note_ids);
    }
}

#[cfg(test)]
mod tests {
    use super::Scene;
    use crate::model::ValidationError;

    #[test]
    fn default_atmosphere_passes_validation() {
        let scene = Scene::new("Harbor at dusk", "");
        assert!(scene.validate().is_ok());
    }

    #[test]
    fn malformed_background_color_is_rejected() {
        let mut scene = Scene::new("Harbor at dusk", "");
        scene.atmosphere.background_color = "midnight-blue".to_string();
        assert_eq!(
            scene.validate(),
            Err(ValidationError::InvalidColor("midnight-blue".to_string()))
        );
    }
}
