//! Scene use-case service.
//!
//! # Responsibility
//! - Provide scene CRUD plus cover image and ambient audio management.
//! - Mirror scene note-list edits onto the notes atomically.
//!
//! # Invariants
//! - Deleting a scene removes its id from every note's `scene_ids` and
//!   from every character's `scene_ids`.
//! - Cover/ambient files are removed only after the row mutation committed.

use crate::attach::AttachmentStore;
use crate::model::attachment::AttachmentRef;
use crate::model::epoch_ms_now;
use crate::model::scene::{Atmosphere, Scene, SceneId};
use crate::relation;
use crate::repo::scene_repo::{SceneRepository, SqliteSceneRepository};
use crate::repo::{ensure_schema_ready, RepoError};
use crate::service::{ServiceError, ServiceResult};
use log::warn;
use rusqlite::{Connection, TransactionBehavior};
use uuid::Uuid;

/// Scene service facade over the repository layer.
pub struct SceneService<'a> {
    conn: &'a mut Connection,
    files: &'a AttachmentStore,
}

impl<'a> SceneService<'a> {
    /// Constructs a service over a migrated connection.
    pub fn try_new(conn: &'a mut Connection, files: &'a AttachmentStore) -> ServiceResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn, files })
    }

    /// Creates a scene with the given atmosphere and empty link lists.
    pub fn create(
        &mut self,
        title: impl Into<String>,
        description: impl Into<String>,
        atmosphere: Atmosphere,
        tags: Vec<String>,
    ) -> ServiceResult<Scene> {
        let mut scene = Scene::new(title, description);
        scene.atmosphere = atmosphere;
        scene.tags = tags;
        scene.normalize();

        SqliteSceneRepository::new(self.conn).create_scene(&scene)?;
        Ok(scene)
    }

    /// Gets one scene by id. Missing rows yield `None`, never an error.
    pub fn get(&self, id: SceneId) -> ServiceResult<Option<Scene>> {
        Ok(SqliteSceneRepository::new(self.conn).get_scene(id)?)
    }

    /// Lists all scenes ordered by title.
    pub fn list(&self) -> ServiceResult<Vec<Scene>> {
        Ok(SqliteSceneRepository::new(self.conn).list_scenes()?)
    }

    /// Updates a scene and mirrors note-list changes onto the notes.
    ///
    /// Returns the stored version (normalized lists, bumped `updated_at`).
    pub fn update(&mut self, scene: &Scene) -> ServiceResult<Scene> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let repo = SqliteSceneRepository::new(&tx);
        let previous = repo
            .get_scene(scene.uuid)?
            .ok_or(ServiceError::NotFound(scene.uuid))?;

        let mut current = scene.clone();
        current.normalize();
        current.updated_at = epoch_ms_now();

        repo.update_scene(&current)?;
        relation::apply_scene_links(&tx, Some(&previous), &current)?;

        tx.commit().map_err(RepoError::from)?;
        Ok(current)
    }

    /// Deletes a scene, cascading out of note and character lists and
    /// removing its cover/ambient files.
    pub fn delete(&mut self, id: SceneId) -> ServiceResult<()> {
        let mut doomed_files: Vec<String> = Vec::new();

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        {
            let repo = SqliteSceneRepository::new(&tx);
            let scene = repo.get_scene(id)?.ok_or(ServiceError::NotFound(id))?;

            relation::detach_scene(&tx, &scene)?;

            doomed_files.extend(scene.cover_file.iter().cloned());
            doomed_files.extend(scene.ambient_audio_file.iter().cloned());

            repo.delete_scene(id)?;
        }
        tx.commit().map_err(RepoError::from)?;

        self.delete_files_best_effort(&doomed_files);
        Ok(())
    }

    /// Stores cover image bytes and points the scene at the new file.
    pub fn set_cover(
        &mut self,
        id: SceneId,
        ext: &str,
        bytes: &[u8],
    ) -> ServiceResult<AttachmentRef> {
        let repo = SqliteSceneRepository::new(self.conn);
        let mut scene = repo.get_scene(id)?.ok_or(ServiceError::NotFound(id))?;

        let stored = self.files.store(Uuid::new_v4(), ext, bytes)?;
        let replaced = scene.cover_file.replace(stored.file_name.clone());
        scene.updated_at = epoch_ms_now();
        repo.update_scene(&scene)?;

        if let Some(old) = replaced {
            self.delete_files_best_effort(&[old]);
        }
        Ok(stored)
    }

    /// Stores ambient audio bytes and points the scene at the new file.
    pub fn set_ambient_audio(
        &mut self,
        id: SceneId,
        ext: &str,
        bytes: &[u8],
    ) -> ServiceResult<AttachmentRef> {
        let repo = SqliteSceneRepository::new(self.conn);
        let mut scene = repo.get_scene(id)?.ok_or(ServiceError::NotFound(id))?;

        let stored = self.files.store(Uuid::new_v4(), ext, bytes)?;
        let replaced = scene.ambient_audio_file.replace(stored.file_name.clone());
        scene.updated_at = epoch_ms_now();
        repo.update_scene(&scene)?;

        if let Some(old) = replaced {
            self.delete_files_best_effort(&[old]);
        }
        Ok(stored)
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
