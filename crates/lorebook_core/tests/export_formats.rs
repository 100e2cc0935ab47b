use lorebook_core::db::open_db_in_memory;
use lorebook_core::{
    Atmosphere, AttachmentStore, CharacterService, ExportFormat, ExportRequest, Exporter,
    NoteService, SceneService, APP_LABEL,
};

fn populate(conn: &mut rusqlite::Connection, files: &AttachmentStore) {
    let alice = CharacterService::try_new(conn, files)
        .unwrap()
        .create("Alice", "keeper of the lighthouse", vec!["keeper".into()])
        .unwrap();
    let scene = SceneService::try_new(conn, files)
        .unwrap()
        .create("Lighthouse", "stone tower", Atmosphere::default(), vec![])
        .unwrap();
    NoteService::try_new(conn)
        .unwrap()
        .create(
            "First Meeting",
            "Alice at the door.",
            vec![alice.uuid],
            vec![scene.uuid],
            vec![],
        )
        .unwrap();
}

fn request(format: ExportFormat, characters: bool, scenes: bool, notes: bool) -> ExportRequest {
    ExportRequest {
        format,
        include_characters: characters,
        include_scenes: scenes,
        include_notes: notes,
    }
}

#[test]
fn notes_only_json_has_exactly_the_notes_key() {
    let mut conn = open_db_in_memory().unwrap();
    let (_files_dir, files) = scratch_files();
    populate(&mut conn, &files);

    let out_dir = tempfile::tempdir().unwrap();
    let exporter = Exporter::try_new(&conn, out_dir.path()).unwrap();
    let document = exporter
        .export(&request(ExportFormat::Json, false, false, true))
        .unwrap();

    let value: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&document.path).unwrap()).unwrap();
    let object = value.as_object().unwrap();
    assert!(object.contains_key("version"));
    assert!(object.contains_key("timestamp"));
    assert!(object.contains_key("notes"));
    assert!(!object.contains_key("characters"));
    assert!(!object.contains_key("scenes"));
    assert_eq!(object["notes"].as_array().unwrap().len(), 1);
}

#[test]
fn full_json_carries_all_three_kinds() {
    let mut conn = open_db_in_memory().unwrap();
    let (_files_dir, files) = scratch_files();
    populate(&mut conn, &files);

    let out_dir = tempfile::tempdir().unwrap();
    let exporter = Exporter::try_new(&conn, out_dir.path()).unwrap();
    let document = exporter
        .export(&request(ExportFormat::Json, true, true, true))
        .unwrap();

    let value: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&document.path).unwrap()).unwrap();
    let object = value.as_object().unwrap();
    assert_eq!(object["characters"].as_array().unwrap().len(), 1);
    assert_eq!(object["scenes"].as_array().unwrap().len(), 1);
    assert_eq!(object["notes"].as_array().unwrap().len(), 1);
}

#[test]
fn text_export_contains_selected_sections_only() {
    let mut conn = open_db_in_memory().unwrap();
    let (_files_dir, files) = scratch_files();
    populate(&mut conn, &files);

    let out_dir = tempfile::tempdir().unwrap();
    let exporter = Exporter::try_new(&conn, out_dir.path()).unwrap();
    let document = exporter
        .export(&request(ExportFormat::Text, true, false, false))
        .unwrap();

    let text = std::fs::read_to_string(&document.path).unwrap();
    assert!(text.contains("CHARACTERS (1)"));
    assert!(text.contains("Alice"));
    assert!(!text.contains("SCENES"));
    assert!(!text.contains("NOTES"));
}

#[test]
fn pdf_export_writes_a_pdf_file() {
    let mut conn = open_db_in_memory().unwrap();
    let (_files_dir, files) = scratch_files();
    populate(&mut conn, &files);

    let out_dir = tempfile::tempdir().unwrap();
    let exporter = Exporter::try_new(&conn, out_dir.path()).unwrap();
    let document = exporter
        .export(&request(ExportFormat::Pdf, true, true, true))
        .unwrap();

    let bytes = std::fs::read(&document.path).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

#[test]
fn document_names_follow_the_label_and_stamp_pattern() {
    let mut conn = open_db_in_memory().unwrap();
    let (_files_dir, files) = scratch_files();
    populate(&mut conn, &files);

    let out_dir = tempfile::tempdir().unwrap();
    let exporter = Exporter::try_new(&conn, out_dir.path()).unwrap();

    for (format, ext) in [
        (ExportFormat::Text, "txt"),
        (ExportFormat::Json, "json"),
        (ExportFormat::Pdf, "pdf"),
    ] {
        let document = exporter.export(&request(format, true, true, true)).unwrap();
        let name_re =
            regex::Regex::new(&format!(r"^{APP_LABEL}_\d{{8}}_\d{{6}}\.{ext}$")).unwrap();
        assert!(
            name_re.is_match(&document.file_name),
            "unexpected document name {}",
            document.file_name
        );
    }
}

#[test]
fn export_does_not_mutate_the_store() {
    let mut conn = open_db_in_memory().unwrap();
    let (_files_dir, files) = scratch_files();
    populate(&mut conn, &files);

    let before_characters = CharacterService::try_new(&mut conn, &files)
        .unwrap()
        .list()
        .unwrap();
    let before_notes = NoteService::try_new(&mut conn).unwrap().list().unwrap();

    let out_dir = tempfile::tempdir().unwrap();
    let exporter = Exporter::try_new(&conn, out_dir.path()).unwrap();
    exporter
        .export(&request(ExportFormat::Json, true, true, true))
        .unwrap();
    drop(exporter);

    assert_eq!(
        CharacterService::try_new(&mut conn, &files)
            .unwrap()
            .list()
            .unwrap(),
        before_characters
    );
    assert_eq!(
        NoteService::try_new(&mut conn).unwrap().list().unwrap(),
        before_notes
    );
}

fn scratch_files() -> (tempfile::TempDir, AttachmentStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = AttachmentStore::new(dir.path());
    (dir, store)
}
