//! Character domain model.
//!
//! # Responsibility
//! - Define the canonical character record with its relationship lists.
//!
//! # Invariants
//! - `uuid` is stable and never reused for another character.
//! - `note_ids`/`scene_ids` hold no duplicates; ordering is caller-visible.
//! - Owned audio attachments reference this character via their own rows.

use crate::model::{
    dedup_ids, epoch_ms_now, normalize_tags, require_non_empty, ValidationError,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a character.
pub type CharacterId = Uuid;

/// Canonical character record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    /// Stable global ID used for linking and archive identity.
    pub uuid: CharacterId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Relative attachment file name of the avatar image, if any.
    #[serde(default)]
    pub avatar_file: Option<String>,
    /// Normalized tag set: lowercase, deduplicated, sorted.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Ids of notes linked to this character. Mirrored by each note.
    #[serde(default)]
    pub note_ids: Vec<Uuid>,
    /// Ids of scenes this character appears in. Scenes store no mirror list.
    #[serde(default)]
    pub scene_ids: Vec<Uuid>,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds.
    pub updated_at: i64,
}

impl Character {
    /// Creates a new character with a generated stable ID and empty links.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), name, description)
    }

    /// Creates a character with a caller-provided stable ID.
    ///
    /// Used by restore paths where identity already exists in an archive.
    pub fn with_id(
        uuid: CharacterId,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let now = epoch_ms_now();
        Self {
            uuid,
            name: name.into(),
            description: description.into(),
            avatar_file: None,
            tags: Vec::new(),
            note_ids: Vec::new(),
            scene_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Checks field-level invariants before persistence.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty(&self.name, "character", "name")
    }

    /// Re-establishes list hygiene: normalized tags, duplicate-free ids.
    pub fn normalize(&mut self) {
        self.tags = normalize_tags(&self.tags);
        dedup_ids(&mut self.note_ids);
        dedup_ids(&mut self.scene_ids);
    }
}
