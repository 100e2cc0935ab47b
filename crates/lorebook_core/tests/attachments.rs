use lorebook_core::db::open_db_in_memory;
use lorebook_core::{AttachError, AttachmentStore, CharacterService};
use uuid::Uuid;

#[test]
fn store_read_delete_roundtrip() {
    let (_files_dir, files) = scratch_files();

    let id = Uuid::new_v4();
    let stored = files.store(id, "png", b"avatar-bytes").unwrap();
    assert_eq!(stored.file_name, format!("{id}.png"));

    assert_eq!(files.read(&stored.file_name).unwrap(), b"avatar-bytes");
    assert!(files.contains(&stored.file_name));

    files.delete(&stored.file_name).unwrap();
    assert!(!files.contains(&stored.file_name));
    // Deleting again is a no-op.
    files.delete(&stored.file_name).unwrap();
}

#[test]
fn absolute_or_traversing_names_are_rejected() {
    let (_files_dir, files) = scratch_files();

    assert!(matches!(
        files.read("../outside.png"),
        Err(AttachError::InvalidName(_))
    ));
    assert!(matches!(
        files.read("nested/inside.png"),
        Err(AttachError::InvalidName(_))
    ));
}

#[test]
fn avatar_replacement_drops_the_previous_file() {
    let mut conn = open_db_in_memory().unwrap();
    let (_files_dir, files) = scratch_files();
    let mut service = CharacterService::try_new(&mut conn, &files).unwrap();

    let alice = service.create("Alice", "", vec![]).unwrap();
    let first = service.set_avatar(alice.uuid, "png", b"first").unwrap();
    let second = service.set_avatar(alice.uuid, "png", b"second").unwrap();

    assert!(!files.contains(&first.file_name));
    assert!(files.contains(&second.file_name));

    let loaded = service.get(alice.uuid).unwrap().unwrap();
    assert_eq!(loaded.avatar_file.as_deref(), Some(second.file_name.as_str()));
}

#[test]
fn audio_attachment_rows_and_files_stay_paired() {
    let mut conn = open_db_in_memory().unwrap();
    let (_files_dir, files) = scratch_files();
    let mut service = CharacterService::try_new(&mut conn, &files).unwrap();

    let alice = service.create("Alice", "", vec![]).unwrap();
    let memo = service
        .attach_audio(alice.uuid, "Harbor reading", "m4a", b"waveform")
        .unwrap();

    assert_eq!(memo.owner_uuid, Some(alice.uuid));
    assert!(files.contains(&memo.file_name));
    assert_eq!(files.read(&memo.file_name).unwrap(), b"waveform");

    service.remove_audio(memo.uuid).unwrap();
    assert!(!files.contains(&memo.file_name));
}

#[test]
fn attaching_audio_to_a_missing_character_fails() {
    let mut conn = open_db_in_memory().unwrap();
    let (_files_dir, files) = scratch_files();
    let mut service = CharacterService::try_new(&mut conn, &files).unwrap();

    let result = service.attach_audio(Uuid::new_v4(), "memo", "m4a", b"bytes");
    assert!(result.is_err());
    assert!(files.file_names().unwrap().is_empty());
}

#[test]
fn list_attachments_returns_avatar_then_audio() {
    let mut conn = open_db_in_memory().unwrap();
    let (_files_dir, files) = scratch_files();
    let mut service = CharacterService::try_new(&mut conn, &files).unwrap();

    let alice = service.create("Alice", "", vec![]).unwrap();
    let avatar = service.set_avatar(alice.uuid, "png", b"face").unwrap();
    let first = service
        .attach_audio(alice.uuid, "Reading one", "m4a", b"one")
        .unwrap();
    let second = service
        .attach_audio(alice.uuid, "Reading two", "m4a", b"two")
        .unwrap();

    let refs = service.list_attachments(alice.uuid).unwrap();
    let names: Vec<&str> = refs.iter().map(|r| r.file_name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            avatar.file_name.as_str(),
            first.file_name.as_str(),
            second.file_name.as_str()
        ]
    );
}

#[test]
fn deleting_a_character_deletes_solely_owned_attachments() {
    let mut conn = open_db_in_memory().unwrap();
    let (_files_dir, files) = scratch_files();
    let mut service = CharacterService::try_new(&mut conn, &files).unwrap();

    let alice = service.create("Alice", "", vec![]).unwrap();
    let avatar = service.set_avatar(alice.uuid, "png", b"face").unwrap();
    let memo = service
        .attach_audio(alice.uuid, "Reading", "m4a", b"bytes")
        .unwrap();

    service.delete(alice.uuid).unwrap();

    assert!(!files.contains(&avatar.file_name));
    assert!(!files.contains(&memo.file_name));
    assert!(files.file_names().unwrap().is_empty());
}

fn scratch_files() -> (tempfile::TempDir, AttachmentStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = AttachmentStore::new(dir.path());
    (dir, store)
}
