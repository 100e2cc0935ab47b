//! Versioned whole-store backup archives and their restore path.
//!
//! # Responsibility
//! - Snapshot every entity, settings pair and referenced attachment file
//!   into one relocatable archive.
//! - Restore an archive into the live store, preserving original ids so
//!   relationship lists stay valid.
//!
//! # Invariants
//! - Archive naming: `{name}_{yyyyMMdd_HHmmss}.lorebook`, attachment files
//!   in a sibling `{stem}_files/` directory keyed by attachment id.
//! - A failed snapshot never leaves a partially written visible archive.
//! - Restore validates version and payload before touching any live data:
//!   validate, then cleanup, then write. Never cleanup first.
//! - Restore refuses archives whose major version differs from the
//!   supported schema, reported distinctly from malformed payloads.

use crate::attach::AttachmentStore;
use crate::db::DbError;
use crate::model::attachment::AudioAttachment;
use crate::model::character::Character;
use crate::model::note::Note;
use crate::model::scene::Scene;
use crate::repo::audio_repo::{AudioRepository, SqliteAudioRepository};
use crate::repo::character_repo::{CharacterRepository, SqliteCharacterRepository};
use crate::repo::note_repo::{NoteRepository, SqliteNoteRepository};
use crate::repo::scene_repo::{SceneRepository, SqliteSceneRepository};
use crate::repo::settings_repo::{SettingsRepository, SqliteSettingsRepository};
use crate::repo::{ensure_schema_ready, RepoError};
use crate::stamp::{current_rfc3339, filename_stamp};
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::PathBuf;

/// Archive payload version written by this binary.
pub const ARCHIVE_VERSION: &str = "1.0.0";
/// Archive file extension.
pub const ARCHIVE_EXT: &str = "lorebook";

const FILES_DIR_SUFFIX: &str = "_files";

static ARCHIVE_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<name>.+)_(?P<stamp>\d{8}_\d{6})\.lorebook$").expect("valid archive name regex")
});

pub type BackupResult<T> = Result<T, BackupError>;

/// Error taxonomy for backup and restore operations.
#[derive(Debug)]
pub enum BackupError {
    /// Caller-provided archive name is unusable.
    InvalidName(String),
    /// Filesystem read/write failed. Never retried automatically.
    Io(io::Error),
    Db(DbError),
    Repo(RepoError),
    /// Snapshot-to-JSON or JSON-to-snapshot encoding failed.
    Serialization(serde_json::Error),
    /// Payload decoded but violates the archive contract.
    Malformed(String),
    /// An entity references an attachment file that does not exist.
    MissingAttachment { file_name: String },
    /// Archive major version differs from the supported schema.
    VersionIncompatible {
        archive_version: String,
        supported_version: &'static str,
    },
}

impl Display for BackupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName(name) => write!(f, "invalid backup name `{name}`"),
            Self::Io(err) => write!(f, "backup I/O error: {err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Serialization(err) => write!(f, "archive serialization failed: {err}"),
            Self::Malformed(message) => write!(f, "malformed archive: {message}"),
            Self::MissingAttachment { file_name } => {
                write!(f, "archive references missing attachment file `{file_name}`")
            }
            Self::VersionIncompatible {
                archive_version,
                supported_version,
            } => write!(
                f,
                "archive version {archive_version} is incompatible with supported {supported_version}"
            ),
        }
    }
}

impl Error for BackupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Serialization(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for BackupError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<DbError> for BackupError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<RepoError> for BackupError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<serde_json::Error> for BackupError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

impl From<rusqlite::Error> for BackupError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// One character snapshot with its owned audio attachment records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ArchiveCharacter {
    #[serde(flatten)]
    character: Character,
    #[serde(default)]
    audio_attachments: Vec<AudioAttachment>,
}

/// Versioned whole-store snapshot, the archive file payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ArchivePayload {
    version: String,
    timestamp: String,
    characters: Vec<ArchiveCharacter>,
    scenes: Vec<Scene>,
    notes: Vec<Note>,
    settings: BTreeMap<String, String>,
}

/// Locator of one archive file in the backup namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupHandle {
    pub path: PathBuf,
    pub file_name: String,
    /// `yyyyMMdd_HHmmss` stamp parsed from the file name.
    pub stamp: String,
}

impl BackupHandle {
    /// Builds a handle from an archive path; `None` when the file name does
    /// not follow the archive naming scheme.
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let file_name = path.file_name()?.to_str()?.to_string();
        let captures = ARCHIVE_NAME_RE.captures(&file_name)?;
        let stamp = captures.name("stamp")?.as_str().to_string();
        Some(Self {
            path,
            file_name,
            stamp,
        })
    }

    /// Sibling directory holding this archive's attachment files.
    pub fn files_dir(&self) -> PathBuf {
        let stem = self
            .file_name
            .strip_suffix(&format!(".{ARCHIVE_EXT}"))
            .unwrap_or(&self.file_name);
        self.path
            .with_file_name(format!("{stem}{FILES_DIR_SUFFIX}"))
    }
}

/// Counters reported by a completed restore.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub characters: usize,
    pub scenes: usize,
    pub notes: usize,
    pub audio_attachments: usize,
    pub attachment_files: usize,
}

/// Whole-store archive codec over one backup namespace directory.
pub struct BackupCodec<'a> {
    conn: &'a mut Connection,
    files: &'a AttachmentStore,
    backups_dir: PathBuf,
}

impl<'a> BackupCodec<'a> {
    /// Constructs a codec over a migrated connection.
    pub fn try_new(
        conn: &'a mut Connection,
        files: &'a AttachmentStore,
        backups_dir: impl Into<PathBuf>,
    ) -> BackupResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self {
            conn,
            files,
            backups_dir: backups_dir.into(),
        })
    }

    /// Snapshots the whole store into a new archive.
    ///
    /// Serializes first and writes through a temp-file rename, so a failed
    /// snapshot never leaves a partially written visible archive.
    pub fn create_backup(&mut self, name: &str) -> BackupResult<BackupHandle> {
        let name = name.trim();
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            return Err(BackupError::InvalidName(name.to_string()));
        }

        let payload = self.snapshot()?;
        let referenced = referenced_files(&payload);
        for file_name in &referenced {
            if !self.files.contains(file_name) {
                return Err(BackupError::MissingAttachment {
                    file_name: file_name.clone(),
                });
            }
        }
        let bytes = serde_json::to_vec_pretty(&payload)?;

        fs::create_dir_all(&self.backups_dir)?;
        let stem = format!("{name}_{}", filename_stamp());
        let archive_path = self.backups_dir.join(format!("{stem}.{ARCHIVE_EXT}"));
        let temp_path = self.backups_dir.join(format!(".{stem}.tmp"));

        fs::write(&temp_path, &bytes)?;
        fs::rename(&temp_path, &archive_path)?;

        let handle = BackupHandle::from_path(&archive_path)
            .ok_or_else(|| BackupError::Malformed("archive name did not round-trip".to_string()))?;

        if let Err(err) = self.copy_files_out(&handle, &referenced) {
            remove_partial_archive(&handle);
            return Err(err);
        }

        info!(
            "event=backup_create module=backup status=ok archive={} characters={} scenes={} notes={} files={}",
            handle.file_name,
            payload.characters.len(),
            payload.scenes.len(),
            payload.notes.len(),
            referenced.len()
        );
        Ok(handle)
    }

    /// Restores the store from an archive, replacing all current data.
    ///
    /// Ordering is validate, then cleanup, then write: on version mismatch
    /// or malformed payload nothing is mutated. Entity rows are replaced in
    /// one transaction; the attachment namespace is swapped afterwards.
    pub fn restore_from_backup(&mut self, handle: &BackupHandle) -> BackupResult<RestoreReport> {
        let bytes = fs::read(&handle.path)?;
        let value: serde_json::Value = serde_json::from_slice(&bytes)
            .map_err(|err| BackupError::Malformed(format!("payload is not JSON: {err}")))?;

        let archive_version = value
            .get("version")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| BackupError::Malformed("missing `version` field".to_string()))?
            .to_string();
        check_version_compatible(&archive_version)?;

        let payload: ArchivePayload = serde_json::from_value(value)
            .map_err(|err| BackupError::Malformed(format!("payload decode failed: {err}")))?;

        let files_dir = handle.files_dir();
        let referenced = referenced_files(&payload);
        for file_name in &referenced {
            if !files_dir.join(file_name).is_file() {
                return Err(BackupError::MissingAttachment {
                    file_name: file_name.clone(),
                });
            }
        }

        // Validation passed; replace entity rows atomically.
        let mut report = RestoreReport::default();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        {
            tx.execute("DELETE FROM audio_attachments;", [])?;
            tx.execute("DELETE FROM characters;", [])?;
            tx.execute("DELETE FROM scenes;", [])?;
            tx.execute("DELETE FROM notes;", [])?;

            let character_repo = SqliteCharacterRepository::new(&tx);
            let audio_repo = SqliteAudioRepository::new(&tx);
            for entry in &payload.characters {
                character_repo.create_character(&entry.character)?;
                report.characters += 1;
                for attachment in &entry.audio_attachments {
                    audio_repo.create_audio(attachment)?;
                    report.audio_attachments += 1;
                }
            }

            let scene_repo = SqliteSceneRepository::new(&tx);
            for scene in &payload.scenes {
                scene_repo.create_scene(scene)?;
                report.scenes += 1;
            }

            let note_repo = SqliteNoteRepository::new(&tx);
            for note in &payload.notes {
                note_repo.create_note(note)?;
                report.notes += 1;
            }

            SqliteSettingsRepository::new(&tx).replace_settings(&payload.settings)?;
        }
        tx.commit().map_err(RepoError::from)?;

        // Swap the attachment namespace. No rollback for the filesystem
        // side; failures here surface as IO errors against committed rows.
        if let Err(err) = self.files.wipe() {
            warn!("event=attachment_wipe module=backup status=warn error={err}");
        }
        fs::create_dir_all(self.files.root())?;
        for file_name in &referenced {
            fs::copy(files_dir.join(file_name), self.files.root().join(file_name))?;
            report.attachment_files += 1;
        }

        info!(
            "event=backup_restore module=backup status=ok archive={} characters={} scenes={} notes={} files={}",
            handle.file_name,
            report.characters,
            report.scenes,
            report.notes,
            report.attachment_files
        );
        Ok(report)
    }

    /// Enumerates archives in the backup namespace, newest first.
    pub fn list_backups(&self) -> BackupResult<Vec<BackupHandle>> {
        if !self.backups_dir.exists() {
            return Ok(Vec::new());
        }

        let mut handles = Vec::new();
        for entry in fs::read_dir(&self.backups_dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if let Some(handle) = BackupHandle::from_path(path) {
                handles.push(handle);
            }
        }

        handles.sort_by(|a, b| b.stamp.cmp(&a.stamp).then(b.file_name.cmp(&a.file_name)));
        Ok(handles)
    }

    fn snapshot(&self) -> BackupResult<ArchivePayload> {
        let character_repo = SqliteCharacterRepository::new(self.conn);
        let audio_repo = SqliteAudioRepository::new(self.conn);

        let mut characters = Vec::new();
        for character in character_repo.list_characters()? {
            let audio_attachments = audio_repo.list_audio_for_owner(character.uuid)?;
            characters.push(ArchiveCharacter {
                character,
                audio_attachments,
            });
        }

        Ok(ArchivePayload {
            version: ARCHIVE_VERSION.to_string(),
            timestamp: current_rfc3339(),
            characters,
            scenes: SqliteSceneRepository::new(self.conn).list_scenes()?,
            notes: SqliteNoteRepository::new(self.conn).list_notes()?,
            settings: SqliteSettingsRepository::new(self.conn).all_settings()?,
        })
    }

    fn copy_files_out(&self, handle: &BackupHandle, referenced: &[String]) -> BackupResult<()> {
        let files_dir = handle.files_dir();
        fs::create_dir_all(&files_dir)?;
        for file_name in referenced {
            fs::copy(self.files.path_of(file_name), files_dir.join(file_name))?;
        }
        Ok(())
    }
}

fn referenced_files(payload: &ArchivePayload) -> Vec<String> {
    let mut names = Vec::new();
    for entry in &payload.characters {
        names.extend(entry.character.avatar_file.iter().cloned());
        for attachment in &entry.audio_attachments {
            names.push(attachment.file_name.clone());
        }
    }
    for scene in &payload.scenes {
        names.extend(scene.cover_file.iter().cloned());
        names.extend(scene.ambient_audio_file.iter().cloned());
    }
    names.sort();
    names.dedup();
    names
}

fn remove_partial_archive(handle: &BackupHandle) {
    if let Err(err) = fs::remove_file(&handle.path) {
        warn!(
            "event=backup_create module=backup status=warn archive={} error={err}",
            handle.file_name
        );
    }
    let files_dir = handle.files_dir();
    if files_dir.exists() {
        if let Err(err) = fs::remove_dir_all(&files_dir) {
            warn!(
                "event=backup_create module=backup status=warn archive={} error={err}",
                handle.file_name
            );
        }
    }
}

/// Checks the archive's major version against the supported schema.
fn check_version_compatible(archive_version: &str) -> BackupResult<()> {
    let archive_major = version_major(archive_version).ok_or_else(|| {
        BackupError::Malformed(format!("unparseable version `{archive_version}`"))
    })?;
    let supported_major =
        version_major(ARCHIVE_VERSION).expect("supported archive version is well-formed");

    if archive_major != supported_major {
        return Err(BackupError::VersionIncompatible {
            archive_version: archive_version.to_string(),
            supported_version: ARCHIVE_VERSION,
        });
    }
    Ok(())
}

fn version_major(version: &str) -> Option<u32> {
    version.split('.').next()?.parse().ok()
}
