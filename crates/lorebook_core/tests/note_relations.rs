use lorebook_core::db::open_db_in_memory;
use lorebook_core::{
    AttachmentStore, CharacterRepository, CharacterService, NoteRepository, NoteService,
    SqliteCharacterRepository, SqliteNoteRepository,
};
use rusqlite::Connection;

#[test]
fn creating_a_linked_note_mirrors_onto_the_character() {
    let mut conn = open_db_in_memory().unwrap();
    let (_files_dir, files) = scratch_files();

    let alice = CharacterService::try_new(&mut conn, &files)
        .unwrap()
        .create("Alice", "", vec![])
        .unwrap();

    let note = NoteService::try_new(&mut conn)
        .unwrap()
        .create(
            "First Meeting",
            "Alice arrives at the lighthouse.",
            vec![alice.uuid],
            vec![],
            vec![],
        )
        .unwrap();

    let alice_after = CharacterService::try_new(&mut conn, &files)
        .unwrap()
        .get(alice.uuid)
        .unwrap()
        .unwrap();
    assert!(alice_after.note_ids.contains(&note.uuid));
}

#[test]
fn deleting_a_note_removes_it_from_the_character() {
    let mut conn = open_db_in_memory().unwrap();
    let (_files_dir, files) = scratch_files();

    let alice = CharacterService::try_new(&mut conn, &files)
        .unwrap()
        .create("Alice", "", vec![])
        .unwrap();
    let note = NoteService::try_new(&mut conn)
        .unwrap()
        .create("First Meeting", "", vec![alice.uuid], vec![], vec![])
        .unwrap();

    NoteService::try_new(&mut conn)
        .unwrap()
        .delete(note.uuid)
        .unwrap();

    let alice_after = CharacterService::try_new(&mut conn, &files)
        .unwrap()
        .get(alice.uuid)
        .unwrap()
        .unwrap();
    assert!(!alice_after.note_ids.contains(&note.uuid));
}

#[test]
fn unlinking_a_character_via_note_update_removes_both_sides() {
    let mut conn = open_db_in_memory().unwrap();
    let (_files_dir, files) = scratch_files();

    let (alice, bob) = {
        let mut characters = CharacterService::try_new(&mut conn, &files).unwrap();
        (
            characters.create("Alice", "", vec![]).unwrap(),
            characters.create("Bob", "", vec![]).unwrap(),
        )
    };

    let mut note = NoteService::try_new(&mut conn)
        .unwrap()
        .create("Meeting", "", vec![alice.uuid, bob.uuid], vec![], vec![])
        .unwrap();

    note.character_ids = vec![bob.uuid];
    NoteService::try_new(&mut conn)
        .unwrap()
        .update(&note)
        .unwrap();

    let characters = CharacterService::try_new(&mut conn, &files).unwrap();
    let alice_after = characters.get(alice.uuid).unwrap().unwrap();
    let bob_after = characters.get(bob.uuid).unwrap().unwrap();
    assert!(!alice_after.note_ids.contains(&note.uuid));
    assert!(bob_after.note_ids.contains(&note.uuid));
    assert_symmetric(&conn);
}

#[test]
fn applying_the_same_update_twice_is_idempotent() {
    let mut conn = open_db_in_memory().unwrap();
    let (_files_dir, files) = scratch_files();

    let alice = CharacterService::try_new(&mut conn, &files)
        .unwrap()
        .create("Alice", "", vec![])
        .unwrap();
    let mut note = NoteService::try_new(&mut conn)
        .unwrap()
        .create("Meeting", "", vec![], vec![], vec![])
        .unwrap();

    note.character_ids = vec![alice.uuid];
    NoteService::try_new(&mut conn)
        .unwrap()
        .update(&note)
        .unwrap();
    NoteService::try_new(&mut conn)
        .unwrap()
        .update(&note)
        .unwrap();

    let alice_after = CharacterService::try_new(&mut conn, &files)
        .unwrap()
        .get(alice.uuid)
        .unwrap()
        .unwrap();
    assert_eq!(
        alice_after
            .note_ids
            .iter()
            .filter(|id| **id == note.uuid)
            .count(),
        1
    );
    assert_symmetric(&conn);
}

#[test]
fn duplicate_ids_in_the_request_are_collapsed() {
    let mut conn = open_db_in_memory().unwrap();
    let (_files_dir, files) = scratch_files();

    let alice = CharacterService::try_new(&mut conn, &files)
        .unwrap()
        .create("Alice", "", vec![])
        .unwrap();

    let note = NoteService::try_new(&mut conn)
        .unwrap()
        .create(
            "Meeting",
            "",
            vec![alice.uuid, alice.uuid, alice.uuid],
            vec![],
            vec![],
        )
        .unwrap();

    assert_eq!(note.character_ids, vec![alice.uuid]);
    assert_symmetric(&conn);
}

#[test]
fn linking_a_missing_character_is_skipped_not_fatal() {
    let mut conn = open_db_in_memory().unwrap();
    let (_files_dir, files) = scratch_files();

    let alice = CharacterService::try_new(&mut conn, &files)
        .unwrap()
        .create("Alice", "", vec![])
        .unwrap();
    let ghost = uuid::Uuid::new_v4();

    // The orphaned reference must not block the note's save.
    let note = NoteService::try_new(&mut conn)
        .unwrap()
        .create("Meeting", "", vec![alice.uuid, ghost], vec![], vec![])
        .unwrap();

    let alice_after = CharacterService::try_new(&mut conn, &files)
        .unwrap()
        .get(alice.uuid)
        .unwrap()
        .unwrap();
    assert!(alice_after.note_ids.contains(&note.uuid));
}

#[test]
fn deleting_a_character_removes_it_from_every_note() {
    let mut conn = open_db_in_memory().unwrap();
    let (_files_dir, files) = scratch_files();

    let alice = CharacterService::try_new(&mut conn, &files)
        .unwrap()
        .create("Alice", "", vec![])
        .unwrap();
    let first = NoteService::try_new(&mut conn)
        .unwrap()
        .create("First", "", vec![alice.uuid], vec![], vec![])
        .unwrap();
    let second = NoteService::try_new(&mut conn)
        .unwrap()
        .create("Second", "", vec![alice.uuid], vec![], vec![])
        .unwrap();

    CharacterService::try_new(&mut conn, &files)
        .unwrap()
        .delete(alice.uuid)
        .unwrap();

    let notes = NoteService::try_new(&mut conn).unwrap();
    assert!(notes
        .get(first.uuid)
        .unwrap()
        .unwrap()
        .character_ids
        .is_empty());
    assert!(notes
        .get(second.uuid)
        .unwrap()
        .unwrap()
        .character_ids
        .is_empty());
}

#[test]
fn linking_from_the_character_side_mirrors_onto_the_note() {
    let mut conn = open_db_in_memory().unwrap();
    let (_files_dir, files) = scratch_files();

    let mut alice = CharacterService::try_new(&mut conn, &files)
        .unwrap()
        .create("Alice", "", vec![])
        .unwrap();
    let note = NoteService::try_new(&mut conn)
        .unwrap()
        .create("Meeting", "", vec![], vec![], vec![])
        .unwrap();

    alice.note_ids = vec![note.uuid];
    CharacterService::try_new(&mut conn, &files)
        .unwrap()
        .update(&alice)
        .unwrap();

    let note_after = NoteService::try_new(&mut conn)
        .unwrap()
        .get(note.uuid)
        .unwrap()
        .unwrap();
    assert!(note_after.character_ids.contains(&alice.uuid));
    assert_symmetric(&conn);
}

/// Whole-store symmetry check: `N ∈ C.note_ids ⇔ C ∈ N.character_ids`.
fn assert_symmetric(conn: &Connection) {
    let characters = SqliteCharacterRepository::new(conn)
        .list_characters()
        .unwrap();
    let notes = SqliteNoteRepository::new(conn).list_notes().unwrap();

    for character in &characters {
        for note_id in &character.note_ids {
            let note = notes
                .iter()
                .find(|note| note.uuid == *note_id)
                .unwrap_or_else(|| panic!("dangling note id {note_id} on {}", character.name));
            assert!(
                note.character_ids.contains(&character.uuid),
                "note {} does not mirror character {}",
                note.uuid,
                character.uuid
            );
        }
    }
    for note in &notes {
        for character_id in &note.character_ids {
            let character = characters
                .iter()
                .find(|character| character.uuid == *character_id)
                .unwrap_or_else(|| panic!("dangling character id {character_id} on note"));
            assert!(
                character.note_ids.contains(&note.uuid),
                "character {} does not mirror note {}",
                character.uuid,
                note.uuid
            );
        }
    }
}

fn scratch_files() -> (tempfile::TempDir, AttachmentStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = AttachmentStore::new(dir.path());
    (dir, store)
}
