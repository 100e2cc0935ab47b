//! Audio attachment record and attachment reference types.
//!
//! # Invariants
//! - `file_name` is relative to the attachment namespace, never absolute.
//! - An audio attachment is owned by at most one character.

use crate::model::{epoch_ms_now, require_non_empty, ValidationError};
use crate::model::character::CharacterId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for an audio attachment.
pub type AudioId = Uuid;

/// Reference to one binary file in the attachment namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub id: Uuid,
    /// Relative file name inside the attachment namespace (`{id}.{ext}`).
    pub file_name: String,
}

/// Voice memo or reading recorded against one character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioAttachment {
    pub uuid: AudioId,
    pub title: String,
    /// Relative file name inside the attachment namespace.
    pub file_name: String,
    /// Owning character, or `None` while unattached.
    #[serde(default)]
    pub owner_uuid: Option<CharacterId>,
    pub created_at: i64,
}

impl AudioAttachment {
    /// Creates a new record owned by `owner`.
    pub fn new(
        owner: CharacterId,
        title: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            title: title.into(),
            file_name: file_name.into(),
            owner_uuid: Some(owner),
            created_at: epoch_ms_now(),
        }
    }

    /// Checks field-level invariants before persistence.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty(&self.title, "audio attachment", "title")?;
        require_non_empty(&self.file_name, "audio attachment", "file_name")
    }

    /// Reference to this attachment's file in the namespace.
    pub fn to_ref(&self) -> AttachmentRef {
        AttachmentRef {
            id: self.uuid,
            file_name: self.file_name.clone(),
        }
    }
}
