//! Note domain model.
//!
//! # Invariants
//! - `character_ids` and `scene_ids` are mirrored by the opposite entity
//!   after every completed store operation.
//! - Relationship lists hold no duplicates.

use crate::model::{
    dedup_ids, epoch_ms_now, normalize_tags, require_non_empty, ValidationError,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a note.
pub type NoteId = Uuid;

/// Canonical note record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub uuid: NoteId,
    pub title: String,
    #[serde(default)]
    pub content: String,
    /// Ids of characters this note is linked to. Mirrored by each character.
    #[serde(default)]
    pub character_ids: Vec<Uuid>,
    /// Ids of scenes this note is linked to. Mirrored by each scene.
    #[serde(default)]
    pub scene_ids: Vec<Uuid>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Note {
    /// Creates a new note with a generated stable ID and empty links.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), title, content)
    }

    /// Creates a note with a caller-provided stable ID (restore path).
    pub fn with_id(uuid: NoteId, title: impl Into<String>, content: impl Into<String>) -> Self {
        let now = epoch_ms_now();
        Self {
            uuid,
            title: title.into(),
            content: content.into(),
            character_ids: Vec::new(),
            scene_ids: Vec::new(),
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Checks field-level invariants before persistence.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty(&self.title, "note", "title")
    }

    /// Re-establishes list hygiene: normalized tags, duplicate-free ids.
    pub fn normalize(&mut self) {
        self.tags = normalize_tags(&self.tags);
        dedup_ids(&mut self.character_ids);
        dedup_ids(&mut self.scene_ids);
    }
}
