//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level functions to Dart via FRB.
//! - Keep error semantics simple for the UI: empty string means success,
//!   a non-empty string carries the failure message.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Entity ids cross the boundary as UUID strings.
//! - Maintenance operations (backup/restore/export/cleanup) run on the
//!   core's single-writer worker, so they never overlap.

use lorebook_core::db::open_db;
use lorebook_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    AttachmentStore, BackupHandle, CharacterService, CleanupScope, ExportFormat, ExportRequest,
    MaintenanceWorker, NoteService, SceneService, StorePaths,
};
use std::path::Path;
use std::sync::OnceLock;
use uuid::Uuid;

static STORE: OnceLock<StoreState> = OnceLock::new();

struct StoreState {
    paths: StorePaths,
    worker: MaintenanceWorker,
}

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Sync call; may perform small file-system setup work.
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on
///   failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Initializes the store under an absolute root directory.
///
/// Runs migrations and spawns the maintenance worker. Repeated calls with
/// the same root are idempotent; a different root is rejected.
///
/// # FFI contract
/// - Sync call; performs database open and migration work.
/// - Never panics; returns empty string on success.
#[flutter_rust_bridge::frb(sync)]
pub fn store_init(root_dir: String) -> String {
    let trimmed = root_dir.trim();
    if trimmed.is_empty() || !Path::new(trimmed).is_absolute() {
        return format!("store root `{trimmed}` must be an absolute directory");
    }
    let paths = StorePaths::under_root(trimmed);

    if let Some(state) = STORE.get() {
        if state.paths == paths {
            return String::new();
        }
        return format!(
            "store already initialized at `{}`; refusing to switch to `{trimmed}`",
            state.paths.db_file.display()
        );
    }

    // Open once eagerly so migration failures surface here, not on first use.
    if let Err(err) = open_db(&paths.db_file) {
        return err.to_string();
    }
    let worker = match MaintenanceWorker::spawn(paths.clone()) {
        Ok(worker) => worker,
        Err(err) => return err.to_string(),
    };

    match STORE.set(StoreState { paths, worker }) {
        Ok(()) => {
            log::info!("event=store_init module=ffi status=ok root={trimmed}");
            String::new()
        }
        Err(_) => "store already initialized concurrently".to_string(),
    }
}

/// Response envelope for entity creation calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityCreateResponse {
    /// Created entity id in UUID string form; empty on failure.
    pub id: String,
    /// Empty on success.
    pub error: String,
}

/// Response envelope for entity counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityCounts {
    pub characters: u32,
    pub scenes: u32,
    pub notes: u32,
}

/// Response envelope for document-producing calls (backup, export).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentResponse {
    /// Absolute path of the produced file; empty on failure.
    pub path: String,
    /// Empty on success.
    pub error: String,
}

/// Creates a character with empty relationship lists.
///
/// # FFI contract
/// - Sync call; single-row write.
/// - Never panics; failure carried in `error`.
#[flutter_rust_bridge::frb(sync)]
pub fn character_create(name: String, description: String) -> EntityCreateResponse {
    create_entity(|conn, files| {
        let mut service = CharacterService::try_new(conn, files).map_err(|err| err.to_string())?;
        let character = service
            .create(name, description, Vec::new())
            .map_err(|err| err.to_string())?;
        Ok(character.uuid.to_string())
    })
}

/// Creates a scene with the default atmosphere.
///
/// # FFI contract
/// - Sync call; single-row write.
/// - Never panics; failure carried in `error`.
#[flutter_rust_bridge::frb(sync)]
pub fn scene_create(title: String, description: String) -> EntityCreateResponse {
    create_entity(|conn, files| {
        let mut service = SceneService::try_new(conn, files).map_err(|err| err.to_string())?;
        let scene = service
            .create(title, description, Default::default(), Vec::new())
            .map_err(|err| err.to_string())?;
        Ok(scene.uuid.to_string())
    })
}

/// Creates a note linked to the given characters and scenes.
///
/// Opposite-side relationship lists are updated in the same transaction.
///
/// # FFI contract
/// - Sync call; transactional write.
/// - Never panics; failure carried in `error`.
#[flutter_rust_bridge::frb(sync)]
pub fn note_create(
    title: String,
    content: String,
    character_ids: Vec<String>,
    scene_ids: Vec<String>,
) -> EntityCreateResponse {
    create_entity(|conn, _files| {
        let character_ids = parse_ids(&character_ids)?;
        let scene_ids = parse_ids(&scene_ids)?;
        let mut service = NoteService::try_new(conn).map_err(|err| err.to_string())?;
        let note = service
            .create(title, content, character_ids, scene_ids, Vec::new())
            .map_err(|err| err.to_string())?;
        Ok(note.uuid.to_string())
    })
}

/// Replaces a note's relationship lists with the given ids.
///
/// # FFI contract
/// - Sync call; transactional write mirrored onto both sides.
/// - Never panics; returns empty string on success.
#[flutter_rust_bridge::frb(sync)]
pub fn note_set_links(
    note_id: String,
    character_ids: Vec<String>,
    scene_ids: Vec<String>,
) -> String {
    let result = with_store(|conn, _files| {
        let note_id = parse_id(&note_id)?;
        let character_ids = parse_ids(&character_ids)?;
        let scene_ids = parse_ids(&scene_ids)?;

        let mut service = NoteService::try_new(conn).map_err(|err| err.to_string())?;
        let mut note = service
            .get(note_id)
            .map_err(|err| err.to_string())?
            .ok_or_else(|| format!("note not found: {note_id}"))?;
        note.character_ids = character_ids;
        note.scene_ids = scene_ids;
        service.update(&note).map_err(|err| err.to_string())?;
        Ok(())
    });

    match result {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Counts stored entities per kind.
///
/// # FFI contract
/// - Sync call, read-only.
/// - Never panics; returns zero counts when the store is unreachable.
#[flutter_rust_bridge::frb(sync)]
pub fn entity_counts() -> EntityCounts {
    let counts = with_store(|conn, files| {
        let characters = CharacterService::try_new(conn, files)
            .and_then(|service| service.list())
            .map_err(|err| err.to_string())?
            .len() as u32;
        let notes = NoteService::try_new(conn)
            .and_then(|service| service.list())
            .map_err(|err| err.to_string())?
            .len() as u32;
        let scenes = SceneService::try_new(conn, files)
            .and_then(|service| service.list())
            .map_err(|err| err.to_string())?
            .len() as u32;
        Ok(EntityCounts {
            characters,
            scenes,
            notes,
        })
    });

    counts.unwrap_or(EntityCounts {
        characters: 0,
        scenes: 0,
        notes: 0,
    })
}

/// Snapshots the whole store into a named backup archive.
///
/// # FFI contract
/// - Sync call; blocks while the maintenance worker runs the backup.
/// - Never panics; failure carried in `error`.
#[flutter_rust_bridge::frb(sync)]
pub fn backup_create(name: String) -> DocumentResponse {
    let Some(state) = STORE.get() else {
        return DocumentResponse {
            path: String::new(),
            error: "store is not initialized".to_string(),
        };
    };

    match state.worker.create_backup(name).wait() {
        Ok(Ok(handle)) => DocumentResponse {
            path: handle.path.display().to_string(),
            error: String::new(),
        },
        Ok(Err(err)) => DocumentResponse {
            path: String::new(),
            error: err.to_string(),
        },
        Err(err) => DocumentResponse {
            path: String::new(),
            error: err.to_string(),
        },
    }
}

/// Restores the store from a backup archive path, replacing current data.
///
/// # FFI contract
/// - Sync call; blocks while the maintenance worker validates and restores.
/// - Never panics; returns empty string on success.
#[flutter_rust_bridge::frb(sync)]
pub fn backup_restore(archive_path: String) -> String {
    let Some(state) = STORE.get() else {
        return "store is not initialized".to_string();
    };
    let Some(handle) = BackupHandle::from_path(archive_path.as_str()) else {
        return format!("`{archive_path}` is not a Lorebook archive");
    };

    match state.worker.restore_from_backup(handle).wait() {
        Ok(Ok(_report)) => String::new(),
        Ok(Err(err)) => err.to_string(),
        Err(err) => err.to_string(),
    }
}

/// Lists backup archive paths, newest first.
///
/// # FFI contract
/// - Sync call, read-only.
/// - Never panics; returns an empty list when the store is unreachable.
#[flutter_rust_bridge::frb(sync)]
pub fn backup_list() -> Vec<String> {
    let Some(state) = STORE.get() else {
        return Vec::new();
    };

    match state.worker.list_backups().wait() {
        Ok(Ok(handles)) => handles
            .into_iter()
            .map(|handle| handle.path.display().to_string())
            .collect(),
        _ => Vec::new(),
    }
}

/// Exports selected entity kinds into a `txt|json|pdf` document.
///
/// # FFI contract
/// - Sync call; blocks while the maintenance worker renders the document.
/// - Never panics; failure carried in `error`.
#[flutter_rust_bridge::frb(sync)]
pub fn export_document(
    format: String,
    include_characters: bool,
    include_scenes: bool,
    include_notes: bool,
) -> DocumentResponse {
    let Some(state) = STORE.get() else {
        return DocumentResponse {
            path: String::new(),
            error: "store is not initialized".to_string(),
        };
    };
    let Some(format) = ExportFormat::parse(&format) else {
        return DocumentResponse {
            path: String::new(),
            error: format!("unsupported export format `{format}`"),
        };
    };

    let request = ExportRequest {
        format,
        include_characters,
        include_scenes,
        include_notes,
    };
    match state.worker.export(request).wait() {
        Ok(Ok(document)) => DocumentResponse {
            path: document.path.display().to_string(),
            error: String::new(),
        },
        Ok(Err(err)) => DocumentResponse {
            path: String::new(),
            error: err.to_string(),
        },
        Err(err) => DocumentResponse {
            path: String::new(),
            error: err.to_string(),
        },
    }
}

/// Deletes every entity of one scope: `all|characters|scenes|notes`.
///
/// # FFI contract
/// - Sync call; blocks while the maintenance worker deletes.
/// - Never panics; returns empty string on success.
#[flutter_rust_bridge::frb(sync)]
pub fn cleanup_scope(scope: String) -> String {
    let Some(state) = STORE.get() else {
        return "store is not initialized".to_string();
    };
    let scope = match scope.trim().to_lowercase().as_str() {
        "all" => CleanupScope::All,
        "characters" => CleanupScope::Characters,
        "scenes" => CleanupScope::Scenes,
        "notes" => CleanupScope::Notes,
        other => return format!("unsupported cleanup scope `{other}`"),
    };

    match state.worker.cleanup(scope).wait() {
        Ok(Ok(_report)) => String::new(),
        Ok(Err(err)) => err.to_string(),
        Err(err) => err.to_string(),
    }
}

fn with_store<T>(
    operate: impl FnOnce(&mut rusqlite::Connection, &AttachmentStore) -> Result<T, String>,
) -> Result<T, String> {
    let state = STORE.get().ok_or("store is not initialized")?;
    let mut conn = open_db(&state.paths.db_file).map_err(|err| err.to_string())?;
    let files = AttachmentStore::new(state.paths.attachments_dir.clone());
    operate(&mut conn, &files)
}

fn create_entity(
    operate: impl FnOnce(&mut rusqlite::Connection, &AttachmentStore) -> Result<String, String>,
) -> EntityCreateResponse {
    match with_store(operate) {
        Ok(id) => EntityCreateResponse {
            id,
            error: String::new(),
        },
        Err(err) => EntityCreateResponse {
            id: String::new(),
            error: err,
        },
    }
}

fn parse_id(text: &str) -> Result<Uuid, String> {
    Uuid::parse_str(text.trim()).map_err(|_| format!("invalid entity id `{text}`"))
}

fn parse_ids(texts: &[String]) -> Result<Vec<Uuid>, String> {
    texts.iter().map(|text| parse_id(text)).collect()
}
