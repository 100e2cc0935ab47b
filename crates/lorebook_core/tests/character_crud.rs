use lorebook_core::db::open_db_in_memory;
use lorebook_core::{AttachmentStore, CharacterService, ServiceError};
use std::collections::HashSet;
use uuid::Uuid;

#[test]
fn create_and_get_roundtrip() {
    let mut conn = open_db_in_memory().unwrap();
    let (_files_dir, files) = scratch_files();
    let mut service = CharacterService::try_new(&mut conn, &files).unwrap();

    let created = service
        .create("Alice", "Cartographer of the drowned coast", vec![])
        .unwrap();

    let loaded = service.get(created.uuid).unwrap().unwrap();
    assert_eq!(loaded, created);
    assert!(loaded.note_ids.is_empty());
    assert!(loaded.scene_ids.is_empty());
    assert!(loaded.avatar_file.is_none());
}

#[test]
fn get_of_unknown_id_returns_none() {
    let mut conn = open_db_in_memory().unwrap();
    let (_files_dir, files) = scratch_files();
    let service = CharacterService::try_new(&mut conn, &files).unwrap();

    assert!(service.get(Uuid::new_v4()).unwrap().is_none());
}

#[test]
fn hundred_tags_survive_as_exact_set() {
    let mut conn = open_db_in_memory().unwrap();
    let (_files_dir, files) = scratch_files();
    let mut service = CharacterService::try_new(&mut conn, &files).unwrap();

    let tags: Vec<String> = (0..100).map(|n| format!("trait{n:03}")).collect();
    let created = service.create("Bob", "", tags.clone()).unwrap();

    let loaded = service.get(created.uuid).unwrap().unwrap();
    let loaded_set: HashSet<&str> = loaded.tags.iter().map(String::as_str).collect();
    let expected_set: HashSet<&str> = tags.iter().map(String::as_str).collect();
    assert_eq!(loaded.tags.len(), 100);
    assert_eq!(loaded_set, expected_set);
}

#[test]
fn tags_are_normalized_and_deduplicated() {
    let mut conn = open_db_in_memory().unwrap();
    let (_files_dir, files) = scratch_files();
    let mut service = CharacterService::try_new(&mut conn, &files).unwrap();

    let created = service
        .create(
            "Maeve",
            "",
            vec![
                "Smuggler".to_string(),
                "SMUGGLER".to_string(),
                " captain ".to_string(),
            ],
        )
        .unwrap();

    assert_eq!(created.tags, vec!["captain", "smuggler"]);
}

#[test]
fn update_replaces_fields_and_bumps_updated_at() {
    let mut conn = open_db_in_memory().unwrap();
    let (_files_dir, files) = scratch_files();
    let mut service = CharacterService::try_new(&mut conn, &files).unwrap();

    let mut character = service.create("Draft", "first pass", vec![]).unwrap();
    character.name = "Final".to_string();
    character.description = "second pass".to_string();

    let updated = service.update(&character).unwrap();
    assert!(updated.updated_at >= character.updated_at);

    let loaded = service.get(character.uuid).unwrap().unwrap();
    assert_eq!(loaded.name, "Final");
    assert_eq!(loaded.description, "second pass");
}

#[test]
fn empty_name_is_rejected() {
    let mut conn = open_db_in_memory().unwrap();
    let (_files_dir, files) = scratch_files();
    let mut service = CharacterService::try_new(&mut conn, &files).unwrap();

    let result = service.create("   ", "", vec![]);
    assert!(matches!(result, Err(ServiceError::Validation(_))));
}

#[test]
fn update_of_unknown_character_reports_not_found() {
    let mut conn = open_db_in_memory().unwrap();
    let (_files_dir, files) = scratch_files();
    let mut service = CharacterService::try_new(&mut conn, &files).unwrap();

    let mut character = service.create("Ghost", "", vec![]).unwrap();
    service.delete(character.uuid).unwrap();

    character.name = "Still gone".to_string();
    match service.update(&character) {
        Err(ServiceError::NotFound(id)) => assert_eq!(id, character.uuid),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn delete_of_unknown_character_reports_not_found() {
    let mut conn = open_db_in_memory().unwrap();
    let (_files_dir, files) = scratch_files();
    let mut service = CharacterService::try_new(&mut conn, &files).unwrap();

    let missing = Uuid::new_v4();
    match service.delete(missing) {
        Err(ServiceError::NotFound(id)) => assert_eq!(id, missing),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn list_is_ordered_by_name() {
    let mut conn = open_db_in_memory().unwrap();
    let (_files_dir, files) = scratch_files();
    let mut service = CharacterService::try_new(&mut conn, &files).unwrap();

    service.create("Zed", "", vec![]).unwrap();
    service.create("Anna", "", vec![]).unwrap();
    service.create("Mira", "", vec![]).unwrap();

    let names: Vec<String> = service
        .list()
        .unwrap()
        .into_iter()
        .map(|character| character.name)
        .collect();
    assert_eq!(names, vec!["Anna", "Mira", "Zed"]);
}

fn scratch_files() -> (tempfile::TempDir, AttachmentStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = AttachmentStore::new(dir.path());
    (dir, store)
}
