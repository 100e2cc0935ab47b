//! Scene repository contract and SQLite implementation.
//!
//! # Invariants
//! - Write paths call `Scene::validate()` before SQL mutations.
//! - Lighting/particle enum tokens are rejected on read when unknown.

use crate::model::scene::{Atmosphere, LightingEffect, ParticleEffect, Scene, SceneId};
use crate::repo::{
    decode_id_list, decode_string_list, encode_id_list, encode_string_list, parse_uuid,
    RepoError, RepoResult,
};
use rusqlite::{params, Connection, Row};

const SCENE_SELECT_SQL: &str = "SELECT
    uuid,
    title,
    description,
    cover_file,
    ambient_audio_file,
    background_color,
    lighting,
    particle,
    tags,
    note_ids,
    created_at,
    updated_at
FROM scenes";

/// Repository interface for scene CRUD operations.
pub trait SceneRepository {
    fn create_scene(&self, scene: &Scene) -> RepoResult<SceneId>;
    fn update_scene(&self, scene: &Scene) -> RepoResult<()>;
    fn get_scene(&self, id: SceneId) -> RepoResult<Option<Scene>>;
    fn list_scenes(&self) -> RepoResult<Vec<Scene>>;
    fn delete_scene(&self, id: SceneId) -> RepoResult<()>;
}

/// SQLite-backed scene repository.
pub struct SqliteSceneRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSceneRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl SceneRepository for SqliteSceneRepository<'_> {
    fn create_scene(&self, scene: &Scene) -> RepoResult<SceneId> {
        scene.validate()?;

        self.conn.execute(
            "INSERT INTO scenes (
                uuid, title, description, cover_file, ambient_audio_file,
                background_color, lighting, particle, tags, note_ids,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12);",
            params![
                scene.uuid.to_string(),
                scene.title.as_str(),
                scene.description.as_str(),
                scene.cover_file.as_deref(),
                scene.ambient_audio_file.as_deref(),
                scene.atmosphere.background_color.as_str(),
                scene.atmosphere.lighting.as_db(),
                scene.atmosphere.particle.map(ParticleEffect::as_db),
                encode_string_list(&scene.tags)?,
                encode_id_list(&scene.note_ids)?,
                scene.created_at,
                scene.updated_at,
            ],
        )?;

        Ok(scene.uuid)
    }

    fn update_scene(&self, scene: &Scene) -> RepoResult<()> {
        scene.validate()?;

        let changed = self.conn.execute(
            "UPDATE scenes
             SET
                title = ?1,
                description = ?2,
                cover_file = ?3,
                ambient_audio_file = ?4,
                background_color = ?5,
                lighting = ?6,
                particle = ?7,
                tags = ?8,
                note_ids = ?9,
                updated_at = ?10
             WHERE uuid = ?11;",
            params![
                scene.title.as_str(),
                scene.description.as_str(),
                scene.cover_file.as_deref(),
                scene.ambient_audio_file.as_deref(),
                scene.atmosphere.background_color.as_str(),
                scene.atmosphere.lighting.as_db(),
                scene.atmosphere.particle.map(ParticleEffect::as_db),
                encode_string_list(&scene.tags)?,
                encode_id_list(&scene.note_ids)?,
                scene.updated_at,
                scene.uuid.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(scene.uuid));
        }

        Ok(())
    }

    fn get_scene(&self, id: SceneId) -> RepoResult<Option<Scene>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SCENE_SELECT_SQL} WHERE uuid = ?1;"))?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_scene_row(row)?));
        }

        Ok(None)
    }

    fn list_scenes(&self) -> RepoResult<Vec<Scene>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SCENE_SELECT_SQL} ORDER BY title ASC, uuid ASC;"))?;

        let mut rows = stmt.query([])?;
        let mut scenes = Vec::new();
        while let Some(row) = rows.next()? {
            scenes.push(parse_scene_row(row)?);
        }

        Ok(scenes)
    }

    fn delete_scene(&self, id: SceneId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM scenes WHERE uuid = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }
}

fn parse_scene_row(row: &Row<'_>) -> RepoResult<Scene> {
    let uuid_text: String = row.get("uuid")?;

    let lighting_text: String = row.get("lighting")?;
    let lighting = LightingEffect::parse_db(&lighting_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid lighting value `{lighting_text}` in scenes.lighting"
        ))
    })?;

    let particle = match row.get::<_, Option<String>>("particle")? {
        Some(value) => Some(ParticleEffect::parse_db(&value).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid particle value `{value}` in scenes.particle"))
        })?),
        None => None,
    };

    Ok(Scene {
        uuid: parse_uuid("scenes.uuid", &uuid_text)?,
        title: row.get("title")?,
        description: row.get("description")?,
        cover_file: row.get("cover_file")?,
        ambient_audio_file: row.get("ambient_audio_file")?,
        tags: decode_string_list("scenes.tags", row.get("tags")?)?,
        atmosphere: Atmosphere {
            background_color: row.get("background_color")?,
            lighting,
            particle,
        },
        note_ids: decode_id_list("scenes.note_ids", row.get("note_ids")?)?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
