//! Character use-case service.
//!
//! # Responsibility
//! - Provide character CRUD plus avatar and audio attachment management.
//! - Route every relationship-affecting write through the relationship
//!   maintainer inside one transaction.
//!
//! # Invariants
//! - A deleted character leaves no id behind in any note's list and no
//!   orphaned audio row or file.
//! - Attachment files are removed only after the owning row mutation
//!   committed; file removal failures degrade to warnings.

use crate::attach::AttachmentStore;
use crate::model::attachment::{AttachmentRef, AudioAttachment, AudioId};
use crate::model::character::{Character, CharacterId};
use crate::model::epoch_ms_now;
use crate::relation;
use crate::repo::audio_repo::{AudioRepository, SqliteAudioRepository};
use crate::repo::character_repo::{CharacterRepository, SqliteCharacterRepository};
use crate::repo::{ensure_schema_ready, RepoError};
use crate::service::{ServiceError, ServiceResult};
use log::warn;
use rusqlite::{Connection, TransactionBehavior};
use uuid::Uuid;

/// Character service facade over the repository layer.
pub struct CharacterService<'a> {
    conn: &'a mut Connection,
    files: &'a AttachmentStore,
}

impl<'a> CharacterService<'a> {
    /// Constructs a service over a migrated connection.
    pub fn try_new(
        conn: &'a mut Connection,
        files: &'a AttachmentStore,
    ) -> ServiceResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn, files })
    }

    /// Creates a character with normalized tags and empty link lists.
    pub fn create(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        tags: Vec<String>,
    ) -> ServiceResult<Character> {
        let mut character = Character::new(name, description);
        character.tags = tags;
        character.normalize();

        SqliteCharacterRepository::new(self.conn).create_character(&character)?;
        Ok(character)
    }

    /// Gets one character by id. Missing rows yield `None`, never an error.
    pub fn get(&self, id: CharacterId) -> ServiceResult<Option<Character>> {
        Ok(SqliteCharacterRepository::new(self.conn).get_character(id)?)
    }

    /// Lists all characters ordered by name.
    pub fn list(&self) -> ServiceResult<Vec<Character>> {
        Ok(SqliteCharacterRepository::new(self.conn).list_characters()?)
    }

    /// Updates a character and mirrors note-list changes onto the notes.
    ///
    /// Returns the stored version (normalized lists, bumped `updated_at`).
    pub fn update(&mut self, character: &Character) -> ServiceResult<Character> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let repo = SqliteCharacterRepository::new(&tx);
        let previous = repo
            .get_character(character.uuid)?
            .ok_or(ServiceError::NotFound(character.uuid))?;

        let mut current = character.clone();
        current.normalize();
        current.updated_at = epoch_ms_now();

        repo.update_character(&current)?;
        relation::apply_character_links(&tx, Some(&previous), &current)?;

        tx.commit().map_err(RepoError::from)?;
        Ok(current)
    }

    /// Deletes a character, cascading out of every note list and removing
    /// solely-owned attachments (avatar, audio recordings).
    pub fn delete(&mut self, id: CharacterId) -> ServiceResult<()> {
        let mut doomed_files: Vec<String> = Vec::new();

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        {
            let repo = SqliteCharacterRepository::new(&tx);
            let character = repo
                .get_character(id)?
                .ok_or(ServiceError::NotFound(id))?;

            relation::detach_character(&tx, &character)?;

            let audio_repo = SqliteAudioRepository::new(&tx);
            for attachment in audio_repo.list_audio_for_owner(id)? {
                audio_repo.delete_audio(attachment.uuid)?;
                doomed_files.push(attachment.file_name);
            }

            if let Some(avatar) = &character.avatar_file {
                doomed_files.push(avatar.clone());
            }

            repo.delete_character(id)?;
        }
        tx.commit().map_err(RepoError::from)?;

        self.delete_files_best_effort(&doomed_files);
        Ok(())
    }

    /// Stores avatar bytes and points the character at the new file.
    pub fn set_avatar(
        &mut self,
        id: CharacterId,
        ext: &str,
        bytes: &[u8],
    ) -> ServiceResult<AttachmentRef> {
        let repo = SqliteCharacterRepository::new(self.conn);
        let mut character = repo.get_character(id)?.ok_or(ServiceError::NotFound(id))?;

        let stored = self.files.store(Uuid::new_v4(), ext, bytes)?;
        let replaced = character.avatar_file.replace(stored.file_name.clone());
        character.updated_at = epoch_ms_now();
        repo.update_character(&character)?;

        if let Some(old) = replaced {
            self.delete_files_best_effort(&[old]);
        }
        Ok(stored)
    }

    /// Drops the avatar reference and removes its file.
    pub fn clear_avatar(&mut self, id: CharacterId) -> ServiceResult<()> {
        let repo = SqliteCharacterRepository::new(self.conn);
        let mut character = repo.get_character(id)?.ok_or(ServiceError::NotFound(id))?;

        let Some(old) = character.avatar_file.take() else {
            return Ok(());
        };
        character.updated_at = epoch_ms_now();
        repo.update_character(&character)?;

        self.delete_files_best_effort(&[old]);
        Ok(())
    }

    /// Records an audio attachment owned by `owner` and stores its bytes.
    pub fn attach_audio(
        &mut self,
        owner: CharacterId,
        title: impl Into<String>,
        ext: &str,
        bytes: &[u8],
    ) -> ServiceResult<AudioAttachment> {
        let repo = SqliteCharacterRepository::new(self.conn);
        if repo.get_character(owner)?.is_none() {
            return Err(ServiceError::NotFound(owner));
        }

        let audio_id = Uuid::new_v4();
        let stored = self.files.store(audio_id, ext, bytes)?;
        let mut attachment = AudioAttachment::new(owner, title, stored.file_name);
        attachment.uuid = audio_id;

        if let Err(err) = SqliteAudioRepository::new(self.conn).create_audio(&attachment) {
            // Row insert failed: do not leave an unreferenced file behind.
            self.delete_files_best_effort(&[attachment.file_name.clone()]);
            return Err(err.into());
        }
        Ok(attachment)
    }

    /// Deletes one audio attachment row and its file.
    pub fn remove_audio(&mut self, id: AudioId) -> ServiceResult<()> {
        let repo = SqliteAudioRepository::new(self.conn);
        let attachment = repo.get_audio(id)?.ok_or(ServiceError::NotFound(id))?;

        repo.delete_audio(id)?;
        self.delete_files_best_effort(&[attachment.file_name]);
        Ok(())
    }

    /// Lists every attachment reference owned by one character: the avatar
    /// (if set) followed by audio recordings in creation order.
    pub fn list_attachments(&self, owner: CharacterId) -> ServiceResult<Vec<AttachmentRef>> {
        let character = SqliteCharacterRepository::new(self.conn)
            .get_character(owner)?
            .ok_or(ServiceError::NotFound(owner))?;

        let mut refs = Vec::new();
        if let Some(avatar) = &character.avatar_file {
            if let Some(avatar_ref) = ref_from_file_name(avatar) {
                refs.push(avatar_ref);
            }
        }
        for attachment in SqliteAudioRepository::new(self.conn).list_audio_for_owner(owner)? {
            refs.push(attachment.to_ref());
        }
        Ok(refs)
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

/// Rebuilds an attachment reference from a `{id}.{ext}` namespace name.
fn ref_from_file_name(file_name: &str) -> Option<AttachmentRef> {
    let stem = file_name.split('.').next()?;
    let id = Uuid::parse_str(stem).ok()?;
    Some(AttachmentRef {
        id,
        file_name: file_name.to_string(),
    })
}
