//! Note use-case service.
//!
//! # Responsibility
//! - Provide note CRUD entry points for core callers.
//! - Mirror note link edits onto characters and scenes atomically.
//!
//! # Invariants
//! - After any committed call, `N.uuid ∈ C.note_ids ⇔ C.uuid ∈
//!   N.character_ids`, and likewise for scenes.
//! - Applying the same update twice produces the same final state.
//! - Note↔Character and Note↔Scene links are independent of each other.

use crate::model::epoch_ms_now;
use crate::model::note::{Note, NoteId};
use crate::relation;
use crate::repo::note_repo::{NoteRepository, SqliteNoteRepository};
use crate::repo::{ensure_schema_ready, RepoError};
use crate::service::{ServiceError, ServiceResult};
use rusqlite::{Connection, TransactionBehavior};
use uuid::Uuid;

/// Note service facade over the repository layer.
pub struct NoteService<'a> {
    conn: &'a mut Connection,
}

impl<'a> NoteService<'a> {
    /// Constructs a service over a migrated connection.
    pub fn try_new(conn: &'a mut Connection) -> ServiceResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }

    /// Creates a note, linking it to the given characters and scenes.
    ///
    /// The opposite sides gain this note's id in the same transaction.
    pub fn create(
        &mut self,
        title: impl Into<String>,
        content: impl Into<String>,
        character_ids: Vec<Uuid>,
        scene_ids: Vec<Uuid>,
        tags: Vec<String>,
    ) -> ServiceResult<Note> {
        let mut note = Note::new(title, content);
        note.character_ids = character_ids;
        note.scene_ids = scene_ids;
        note.tags = tags;
        note.normalize();

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        SqliteNoteRepository::new(&tx).create_note(&note)?;
        relation::apply_note_links(&tx, None, &note)?;

        tx.commit().map_err(RepoError::from)?;
        Ok(note)
    }

    /// Gets one note by id. Missing rows yield `None`, never an error.
    pub fn get(&self, id: NoteId) -> ServiceResult<Option<Note>> {
        Ok(SqliteNoteRepository::new(self.conn).get_note(id)?)
    }

    /// Lists all notes, most recently updated first.
    pub fn list(&self) -> ServiceResult<Vec<Note>> {
        Ok(SqliteNoteRepository::new(self.conn).list_notes()?)
    }

    /// Updates a note and mirrors link-list changes onto both sides.
    ///
    /// Returns the stored version (normalized lists, bumped `updated_at`).
    pub fn update(&mut self, note: &Note) -> ServiceResult<Note> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let repo = SqliteNoteRepository::new(&tx);
        let previous = repo
            .get_note(note.uuid)?
            .ok_or(ServiceError::NotFound(note.uuid))?;

        let mut current = note.clone();
        current.normalize();
        current.updated_at = epoch_ms_now();

        repo.update_note(&current)?;
        relation::apply_note_links(&tx, Some(&previous), &current)?;

        tx.commit().map_err(RepoError::from)?;
        Ok(current)
    }

    /// Deletes a note, removing its id from every character and scene.
    pub fn delete(&mut self, id: NoteId) -> ServiceResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let repo = SqliteNoteRepository::new(&tx);
        let note = repo.get_note(id)?.ok_or(ServiceError::NotFound(id))?;

        relation::detach_note(&tx, &note)?;
        repo.delete_note(id)?;

        tx.commit().map_err(RepoError::from)?;
        Ok(())
    }
}
