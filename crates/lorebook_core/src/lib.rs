//! Core domain logic for Lorebook.
//! This crate is the single source of truth for business invariants:
//! relationship-consistent persistence of characters, notes and scenes,
//! the attachment namespace, and whole-store backup/restore/export.

pub mod attach;
pub mod backup;
pub mod db;
pub mod export;
pub mod logging;
pub mod model;
pub mod paths;
pub mod relation;
pub mod repo;
pub mod service;
mod stamp;
pub mod task;

pub use attach::{AttachError, AttachmentStore};
pub use backup::{
    BackupCodec, BackupError, BackupHandle, BackupResult, RestoreReport, ARCHIVE_EXT,
    ARCHIVE_VERSION,
};
pub use export::{
    ExportDocument, ExportError, ExportFormat, ExportRequest, ExportResult, Exporter, APP_LABEL,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::attachment::{AttachmentRef, AudioAttachment, AudioId};
pub use model::character::{Character, CharacterId};
pub use model::note::{Note, NoteId};
pub use model::scene::{Atmosphere, LightingEffect, ParticleEffect, Scene, SceneId};
pub use model::ValidationError;
pub use paths::StorePaths;
pub use repo::audio_repo::{AudioRepository, SqliteAudioRepository};
pub use repo::character_repo::{CharacterRepository, SqliteCharacterRepository};
pub use repo::note_repo::{NoteRepository, SqliteNoteRepository};
pub use repo::scene_repo::{SceneRepository, SqliteSceneRepository};
pub use repo::settings_repo::{SettingsRepository, SqliteSettingsRepository};
pub use repo::{RepoError, RepoResult};
pub use service::character_service::CharacterService;
pub use service::cleanup::{CleanupReport, CleanupScope, CleanupService};
pub use service::note_service::NoteService;
pub use service::scene_service::SceneService;
pub use service::{ServiceError, ServiceResult};
pub use task::{MaintenanceWorker, TaskHandle, WorkerGone};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
