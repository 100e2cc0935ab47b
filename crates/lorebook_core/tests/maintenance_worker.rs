use lorebook_core::db::open_db;
use lorebook_core::{
    AttachmentStore, CharacterService, CleanupScope, ExportFormat, ExportRequest,
    MaintenanceWorker, NoteService, StorePaths,
};

fn spawn_worker() -> (tempfile::TempDir, StorePaths, MaintenanceWorker) {
    let root = tempfile::tempdir().unwrap();
    let paths = StorePaths::under_root(root.path());
    let worker = MaintenanceWorker::spawn(paths.clone()).unwrap();
    (root, paths, worker)
}

fn populate(paths: &StorePaths) {
    let mut conn = open_db(&paths.db_file).unwrap();
    let files = AttachmentStore::new(paths.attachments_dir.clone());

    let alice = CharacterService::try_new(&mut conn, &files)
        .unwrap()
        .create("Alice", "", vec![])
        .unwrap();
    NoteService::try_new(&mut conn)
        .unwrap()
        .create("Meeting", "", vec![alice.uuid], vec![], vec![])
        .unwrap();
}

#[test]
fn backup_cleanup_restore_round_trip_through_the_worker() {
    let (_root, paths, worker) = spawn_worker();
    populate(&paths);

    let handle = worker
        .create_backup("worker")
        .wait()
        .unwrap()
        .unwrap();

    let report = worker.cleanup(CleanupScope::All).wait().unwrap().unwrap();
    assert_eq!(report.characters, 1);
    assert_eq!(report.notes, 1);

    let restore = worker
        .restore_from_backup(handle)
        .wait()
        .unwrap()
        .unwrap();
    assert_eq!(restore.characters, 1);
    assert_eq!(restore.notes, 1);

    let mut conn = open_db(&paths.db_file).unwrap();
    let files = AttachmentStore::new(paths.attachments_dir.clone());
    let characters = CharacterService::try_new(&mut conn, &files)
        .unwrap()
        .list()
        .unwrap();
    assert_eq!(characters.len(), 1);
    assert_eq!(characters[0].name, "Alice");
}

#[test]
fn submitted_jobs_complete_in_submission_order() {
    let (_root, paths, worker) = spawn_worker();
    populate(&paths);

    // Submit before waiting on any: the single worker thread serializes.
    let backup = worker.create_backup("ordered");
    let cleanup = worker.cleanup(CleanupScope::All);
    let listing = worker.list_backups();

    let handle = backup.wait().unwrap().unwrap();
    let report = cleanup.wait().unwrap().unwrap();
    let listed = listing.wait().unwrap().unwrap();

    // The backup ran before the wipe, so it captured the entities.
    assert_eq!(report.characters, 1);
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].file_name, handle.file_name);

    let restore = worker
        .restore_from_backup(handle)
        .wait()
        .unwrap()
        .unwrap();
    assert_eq!(restore.characters, 1);
}

#[test]
fn export_jobs_run_on_the_worker() {
    let (_root, _paths, worker) = spawn_worker();

    let document = worker
        .export(ExportRequest {
            format: ExportFormat::Json,
            include_characters: true,
            include_scenes: false,
            include_notes: false,
        })
        .wait()
        .unwrap()
        .unwrap();

    let value: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&document.path).unwrap()).unwrap();
    assert!(value.get("characters").is_some());
    assert!(value.get("notes").is_none());
}

#[test]
fn try_wait_eventually_observes_completion() {
    let (_root, _paths, worker) = spawn_worker();

    let listing = worker.list_backups();
    let mut result = None;
    for _ in 0..200 {
        if let Some(done) = listing.try_wait().unwrap() {
            result = Some(done);
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(10));
    }
    assert!(result.unwrap().unwrap().is_empty());
}
