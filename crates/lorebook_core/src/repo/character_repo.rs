//! Character repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide stable CRUD APIs over the `characters` table.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths call `Character::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::model::character::{Character, CharacterId};
use crate::repo::{
    decode_id_list, decode_string_list, encode_id_list, encode_string_list, parse_uuid,
    RepoError, RepoResult,
};
use rusqlite::{params, Connection, Row};

const CHARACTER_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    description,
    avatar_file,
    tags,
    note_ids,
    scene_ids,
    created_at,
    updated_at
FROM characters";

/// Repository interface for character CRUD operations.
pub trait CharacterRepository {
    fn create_character(&self, character: &Character) -> RepoResult<CharacterId>;
    fn update_character(&self, character: &Character) -> RepoResult<()>;
    fn get_character(&self, id: CharacterId) -> RepoResult<Option<Character>>;
    fn list_characters(&self) -> RepoResult<Vec<Character>>;
    fn delete_character(&self, id: CharacterId) -> RepoResult<()>;
}

/// SQLite-backed character repository.
///
/// Borrows a migrated connection; also works inside an open transaction
/// because `Transaction` derefs to `Connection`.
pub struct SqliteCharacterRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCharacterRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CharacterRepository for SqliteCharacterRepository<'_> {
    fn create_character(&self, character: &Character) -> RepoResult<CharacterId> {
        character.validate()?;

        self.conn.execute(
            "INSERT INTO characters (
                uuid, name, description, avatar_file,
                tags, note_ids, scene_ids, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                character.uuid.to_string(),
                character.name.as_str(),
                character.description.as_str(),
                character.avatar_file.as_deref(),
                encode_string_list(&character.tags)?,
                encode_id_list(&character.note_ids)?,
                encode_id_list(&character.scene_ids)?,
                character.created_at,
                character.updated_at,
            ],
        )?;

        Ok(character.uuid)
    }

    fn update_character(&self, character: &Character) -> RepoResult<()> {
        character.validate()?;

        let changed = self.conn.execute(
            "UPDATE characters
             SET
                name = ?1,
                description = ?2,
                avatar_file = ?3,
                tags = ?4,
                note_ids = ?5,
                scene_ids = ?6,
                updated_at = ?7
             WHERE uuid = ?8;",
            params![
                character.name.as_str(),
                character.description.as_str(),
                character.avatar_file.as_deref(),
                encode_string_list(&character.tags)?,
                encode_id_list(&character.note_ids)?,
                encode_id_list(&character.scene_ids)?,
                character.updated_at,
                character.uuid.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(character.uuid));
        }

        Ok(())
    }

    fn get_character(&self, id: CharacterId) -> RepoResult<Option<Character>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CHARACTER_SELECT_SQL} WHERE uuid = ?1;"))?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_character_row(row)?));
        }

        Ok(None)
    }

    fn list_characters(&self) -> RepoResult<Vec<Character>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CHARACTER_SELECT_SQL} ORDER BY name ASC, uuid ASC;"))?;

        let mut rows = stmt.query([])?;
        let mut characters = Vec::new();
        while let Some(row) = rows.next()? {
            characters.push(parse_character_row(row)?);
        }

        Ok(characters)
    }

    fn delete_character(&self, id: CharacterId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM characters WHERE uuid = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }
}

fn parse_character_row(row: &Row<'_>) -> RepoResult<Character> {
    let uuid_text: String = row.get("uuid")?;

    Ok(Character {
        uuid: parse_uuid("characters.uuid", &uuid_text)?,
        name: row.get("name")?,
        description: row.get("description")?,
        avatar_file: row.get("avatar_file")?,
        tags: decode_string_list("characters.tags", row.get("tags")?)?,
        note_ids: decode_id_list("characters.note_ids", row.get("note_ids")?)?,
        scene_ids: decode_id_list("characters.scene_ids", row.get("scene_ids")?)?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
