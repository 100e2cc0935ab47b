//! Bulk deletion by entity kind or of the whole store.
//!
//! # Responsibility
//! - Implement the user-facing data wipe and the restore pre-step.
//!
//! # Invariants
//! - Row deletion per scope is all-or-nothing (one transaction).
//! - Single-kind scopes route through the relationship maintainer, so
//!   remaining entities hold no dangling ids.
//! - Attachment file removal happens after commit and degrades to warnings;
//!   the filesystem side has no rollback.

use crate::attach::AttachmentStore;
use crate::relation;
use crate::repo::audio_repo::{AudioRepository, SqliteAudioRepository};
use crate::repo::character_repo::{CharacterRepository, SqliteCharacterRepository};
use crate::repo::note_repo::{NoteRepository, SqliteNoteRepository};
use crate::repo::scene_repo::{SceneRepository, SqliteSceneRepository};
use crate::repo::{ensure_schema_ready, RepoError};
use crate::service::ServiceResult;
use log::{info, warn};
use rusqlite::{Connection, TransactionBehavior};
use std::fmt::{Display, Formatter};

/// Deletion scope selected by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupScope {
    All,
    Characters,
    Scenes,
    Notes,
}

impl Display for CleanupScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::All => "all",
            Self::Characters => "characters",
            Self::Scenes => "scenes",
            Self::Notes => "notes",
        };
        write!(f, "{label}")
    }
}

/// Row counts removed by one cleanup call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub characters: usize,
    pub scenes: usize,
    pub notes: usize,
    pub audio_attachments: usize,
}

/// Bulk deletion service used directly and as the restore pre-step.
pub struct CleanupService<'a> {
    conn: &'a mut Connection,
    files: &'a AttachmentStore,
}

impl<'a> CleanupService<'a> {
    /// Constructs a service over a migrated connection.
    pub fn try_new(conn: &'a mut Connection, files: &'a AttachmentStore) -> ServiceResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn, files })
    }

    /// Deletes every entity of the selected scope.
    pub fn cleanup(&mut self, scope: CleanupScope) -> ServiceResult<CleanupReport> {
        let report = match scope {
            CleanupScope::All => self.cleanup_all()?,
            CleanupScope::Characters => self.cleanup_characters()?,
            CleanupScope::Scenes => self.cleanup_scenes()?,
            CleanupScope::Notes => self.cleanup_notes()?,
        };

        info!(
            "event=cleanup module=service status=ok scope={scope} characters={} scenes={} notes={} audio={}",
            report.characters, report.scenes, report.notes, report.audio_attachments
        );
        Ok(report)
    }

    fn cleanup_all(&mut self) -> ServiceResult<CleanupReport> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        // Relationship maintenance is moot once every kind goes away.
        let audio_attachments = tx.execute("DELETE FROM audio_attachments;", [])?;
        let characters = tx.execute("DELETE FROM characters;", [])?;
        let scenes = tx.execute("DELETE FROM scenes;", [])?;
        let notes = tx.execute("DELETE FROM notes;", [])?;

        tx.commit().map_err(RepoError::from)?;

        match self.files.wipe() {
            Ok(removed) => {
                info!("event=attachment_wipe module=service status=ok removed={removed}");
            }
            Err(err) => {
                warn!("event=attachment_wipe module=service status=warn error={err}");
            }
        }

        Ok(CleanupReport {
            characters,
            scenes,
            notes,
            audio_attachments,
        })
    }

    fn cleanup_characters(&mut self) -> ServiceResult<CleanupReport> {
        let mut doomed_files: Vec<String> = Vec::new();
        let mut report = CleanupReport::default();

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        {
            let repo = SqliteCharacterRepository::new(&tx);
            let audio_repo = SqliteAudioRepository::new(&tx);

            for character in repo.list_characters()? {
                relation::detach_character(&tx, &character)?;

                for attachment in audio_repo.list_audio_for_owner(character.uuid)? {
                    audio_repo.delete_audio(attachment.uuid)?;
                    doomed_files.push(attachment.file_name);
                    report.audio_attachments += 1;
                }
                doomed_files.extend(character.avatar_file.iter().cloned());

                repo.delete_character(character.uuid)?;
                report.characters += 1;
            }
        }
        tx.commit().map_err(RepoError::from)?;

        self.delete_files_best_effort(&doomed_files);
        Ok(report)
    }

    fn cleanup_scenes(&mut self) -> ServiceResult<CleanupReport> {
        let mut doomed_files: Vec<String> = Vec::new();
        let mut report = CleanupReport::default();

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        {
            let repo = SqliteSceneRepository::new(&tx);
            for scene in repo.list_scenes()? {
                relation::detach_scene(&tx, &scene)?;
                doomed_files.extend(scene.cover_file.iter().cloned());
                doomed_files.extend(scene.ambient_audio_file.iter().cloned());
                repo.delete_scene(scene.uuid)?;
                report.scenes += 1;
            }
        }
        tx.commit().map_err(RepoError::from)?;

        self.delete_files_best_effort(&doomed_files);
        Ok(report)
    }

    fn cleanup_notes(&mut self) -> ServiceResult<CleanupReport> {
        let mut report = CleanupReport::default();

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        {
            let repo = SqliteNoteRepository::new(&tx);
            for note in repo.list_notes()? {
                relation::detach_note(&tx, &note)?;
                repo.delete_note(note.uuid)?;
                report.notes += 1;
            }
        }
        tx.commit().map_err(RepoError::from)?;

        Ok(report)
    }

    fn delete_files_best_effort(&self, file_names: &[String]) {
        for file_name in file_names {
            if let Err(err) = self.files.delete(file_name) {
                warn!(
                    "event=attachment_delete module=service status=warn file={file_name} error={err}"
                );
            }
        }
    }
}
