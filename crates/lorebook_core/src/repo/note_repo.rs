//! Note repository contract and SQLite implementation.
//!
//! # Invariants
//! - Write paths call `Note::validate()` before SQL mutations.
//! - Note list ordering is deterministic: `updated_at DESC, uuid ASC`.

use crate::model::note::{Note, NoteId};
use crate::repo::{
    decode_id_list, decode_string_list, encode_id_list, encode_string_list, parse_uuid,
    RepoError, RepoResult,
};
use rusqlite::{params, Connection, Row};

const NOTE_SELECT_SQL: &str = "SELECT
    uuid,
    title,
    content,
    character_ids,
    scene_ids,
    tags,
    created_at,
    updated_at
FROM notes";

/// Repository interface for note CRUD operations.
pub trait NoteRepository {
    fn create_note(&self, note: &Note) -> RepoResult<NoteId>;
    fn update_note(&self, note: &Note) -> RepoResult<()>;
    fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>>;
    fn list_notes(&self) -> RepoResult<Vec<Note>>;
    fn delete_note(&self, id: NoteId) -> RepoResult<()>;
}

/// SQLite-backed note repository.
pub struct SqliteNoteRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNoteRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl NoteRepository for SqliteNoteRepository<'_> {
    fn create_note(&self, note: &Note) -> RepoResult<NoteId> {
        note.validate()?;

        self.conn.execute(
            "INSERT INTO notes (
                uuid, title, content, character_ids, scene_ids,
                tags, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                note.uuid.to_string(),
                note.title.as_str(),
                note.content.as_str(),
                encode_id_list(&note.character_ids)?,
                encode_id_list(&note.scene_ids)?,
                encode_string_list(&note.tags)?,
                note.created_at,
                note.updated_at,
            ],
        )?;

        Ok(note.uuid)
    }

    fn update_note(&self, note: &Note) -> RepoResult<()> {
        note.validate()?;

        let changed = self.conn.execute(
            "UPDATE notes
             SET
                title = ?1,
                content = ?2,
                character_ids = ?3,
                scene_ids = ?4,
                tags = ?5,
                updated_at = ?6
             WHERE uuid = ?7;",
            params![
                note.title.as_str(),
                note.content.as_str(),
                encode_id_list(&note.character_ids)?,
                encode_id_list(&note.scene_ids)?,
                encode_string_list(&note.tags)?,
                note.updated_at,
                note.uuid.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(note.uuid));
        }

        Ok(())
    }

    fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NOTE_SELECT_SQL} WHERE uuid = ?1;"))?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_note_row(row)?));
        }

        Ok(None)
    }

    fn list_notes(&self) -> RepoResult<Vec<Note>> {
        let mut stmt = self.conn.prepare(&format!(
            "{NOTE_SELECT_SQL} ORDER BY updated_at DESC, uuid ASC;"
        ))?;

        let mut rows = stmt.query([])?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(parse_note_row(row)?);
        }

        Ok(notes)
    }

    fn delete_note(&self, id: NoteId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM notes WHERE uuid = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }
}

fn parse_note_row(row: &Row<'_>) -> RepoResult<Note> {
    let uuid_text: String = row.get("uuid")?;

    Ok(Note {
        uuid: parse_uuid("notes.uuid", &uuid_text)?,
        title: row.get("title")?,
        content: row.get("content")?,
        character_ids: decode_id_list("notes.character_ids", row.get("character_ids")?)?,
        scene_ids: decode_id_list("notes.scene_ids", row.get("scene_ids")?)?,
        tags: decode_string_list("notes.tags", row.get("tags")?)?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
