//! Audio attachment repository contract and SQLite implementation.
//!
//! # Invariants
//! - An attachment row references at most one owning character.
//! - Owner-scoped listing is deterministic: `created_at ASC, uuid ASC`.

use crate::model::attachment::{AudioAttachment, AudioId};
use crate::model::character::CharacterId;
use crate::repo::{parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const AUDIO_SELECT_SQL: &str = "SELECT
    uuid,
    title,
    file_name,
    owner_uuid,
    created_at
FROM audio_attachments";

/// Repository interface for audio attachment rows.
pub trait AudioRepository {
    fn create_audio(&self, attachment: &AudioAttachment) -> RepoResult<AudioId>;
    fn get_audio(&self, id: AudioId) -> RepoResult<Option<AudioAttachment>>;
    fn list_audio(&self) -> RepoResult<Vec<AudioAttachment>>;
    fn list_audio_for_owner(&self, owner: CharacterId) -> RepoResult<Vec<AudioAttachment>>;
    fn delete_audio(&self, id: AudioId) -> RepoResult<()>;
}

/// SQLite-backed audio attachment repository.
pub struct SqliteAudioRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAudioRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl AudioRepository for SqliteAudioRepository<'_> {
    fn create_audio(&self, attachment: &AudioAttachment) -> RepoResult<AudioId> {
        attachment.validate()?;

        self.conn.execute(
            "INSERT INTO audio_attachments (
                uuid, title, file_name, owner_uuid, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                attachment.uuid.to_string(),
                attachment.title.as_str(),
                attachment.file_name.as_str(),
                attachment.owner_uuid.map(|owner| owner.to_string()),
                attachment.created_at,
            ],
        )?;

        Ok(attachment.uuid)
    }

    fn get_audio(&self, id: AudioId) -> RepoResult<Option<AudioAttachment>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{AUDIO_SELECT_SQL} WHERE uuid = ?1;"))?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_audio_row(row)?));
        }

        Ok(None)
    }

    fn list_audio(&self) -> RepoResult<Vec<AudioAttachment>> {
        let mut stmt = self.conn.prepare(&format!(
            "{AUDIO_SELECT_SQL} ORDER BY created_at ASC, uuid ASC;"
        ))?;

        let mut rows = stmt.query([])?;
        let mut attachments = Vec::new();
        while let Some(row) = rows.next()? {
            attachments.push(parse_audio_row(row)?);
        }

        Ok(attachments)
    }

    fn list_audio_for_owner(&self, owner: CharacterId) -> RepoResult<Vec<AudioAttachment>> {
        let mut stmt = self.conn.prepare(&format!(
            "{AUDIO_SELECT_SQL} WHERE owner_uuid = ?1 ORDER BY created_at ASC, uuid ASC;"
        ))?;

        let mut rows = stmt.query([owner.to_string()])?;
        let mut attachments = Vec::new();
        while let Some(row) = rows.next()? {
            attachments.push(parse_audio_row(row)?);
        }

        Ok(attachments)
    }

    fn delete_audio(&self, id: AudioId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM audio_attachments WHERE uuid = ?1;",
            [id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }
}

fn parse_audio_row(row: &Row<'_>) -> RepoResult<AudioAttachment> {
    let uuid_text: String = row.get("uuid")?;

    let owner_uuid = match row.get::<_, Option<String>>("owner_uuid")? {
        Some(text) => Some(parse_uuid("audio_attachments.owner_uuid", &text)?),
        None => None,
    };

    Ok(AudioAttachment {
        uuid: parse_uuid("audio_attachments.uuid", &uuid_text)?,
        title: row.get("title")?,
        file_name: row.get("file_name")?,
        owner_uuid,
        created_at: row.get("created_at")?,
    })
}
