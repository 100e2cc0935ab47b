use lorebook_core::db::open_db_in_memory;
use lorebook_core::{
    Atmosphere, AttachmentStore, CharacterService, LightingEffect, NoteService, ParticleEffect,
    SceneService, ServiceError,
};

#[test]
fn linking_a_note_to_a_scene_mirrors_both_sides() {
    let mut conn = open_db_in_memory().unwrap();
    let (_files_dir, files) = scratch_files();

    let scene = SceneService::try_new(&mut conn, &files)
        .unwrap()
        .create("Lighthouse", "", Atmosphere::default(), vec![])
        .unwrap();

    let note = NoteService::try_new(&mut conn)
        .unwrap()
        .create("Storm night", "", vec![], vec![scene.uuid], vec![])
        .unwrap();

    let scene_after = SceneService::try_new(&mut conn, &files)
        .unwrap()
        .get(scene.uuid)
        .unwrap()
        .unwrap();
    assert!(scene_after.note_ids.contains(&note.uuid));
}

#[test]
fn linking_a_scene_does_not_propagate_its_characters_to_the_note() {
    let mut conn = open_db_in_memory().unwrap();
    let (_files_dir, files) = scratch_files();

    // A character already appearing in the scene.
    let mut alice = CharacterService::try_new(&mut conn, &files)
        .unwrap()
        .create("Alice", "", vec![])
        .unwrap();
    let scene = SceneService::try_new(&mut conn, &files)
        .unwrap()
        .create("Lighthouse", "", Atmosphere::default(), vec![])
        .unwrap();
    alice.scene_ids = vec![scene.uuid];
    CharacterService::try_new(&mut conn, &files)
        .unwrap()
        .update(&alice)
        .unwrap();

    // Linking the note to the scene leaves the note's character list alone.
    let note = NoteService::try_new(&mut conn)
        .unwrap()
        .create("Storm night", "", vec![], vec![scene.uuid], vec![])
        .unwrap();

    let note_after = NoteService::try_new(&mut conn)
        .unwrap()
        .get(note.uuid)
        .unwrap()
        .unwrap();
    assert!(note_after.character_ids.is_empty());
    assert_eq!(note_after.scene_ids, vec![scene.uuid]);
}

#[test]
fn scene_side_note_edits_mirror_onto_notes() {
    let mut conn = open_db_in_memory().unwrap();
    let (_files_dir, files) = scratch_files();

    let mut scene = SceneService::try_new(&mut conn, &files)
        .unwrap()
        .create("Harbor", "", Atmosphere::default(), vec![])
        .unwrap();
    let note = NoteService::try_new(&mut conn)
        .unwrap()
        .create("Arrival", "", vec![], vec![], vec![])
        .unwrap();

    scene.note_ids = vec![note.uuid];
    SceneService::try_new(&mut conn, &files)
        .unwrap()
        .update(&scene)
        .unwrap();

    let note_after = NoteService::try_new(&mut conn)
        .unwrap()
        .get(note.uuid)
        .unwrap()
        .unwrap();
    assert!(note_after.scene_ids.contains(&scene.uuid));

    scene.note_ids = vec![];
    SceneService::try_new(&mut conn, &files)
        .unwrap()
        .update(&scene)
        .unwrap();

    let note_after = NoteService::try_new(&mut conn)
        .unwrap()
        .get(note.uuid)
        .unwrap()
        .unwrap();
    assert!(note_after.scene_ids.is_empty());
}

#[test]
fn deleting_a_scene_cascades_out_of_notes_and_characters() {
    let mut conn = open_db_in_memory().unwrap();
    let (_files_dir, files) = scratch_files();

    let scene = SceneService::try_new(&mut conn, &files)
        .unwrap()
        .create("Harbor", "", Atmosphere::default(), vec![])
        .unwrap();
    let note = NoteService::try_new(&mut conn)
        .unwrap()
        .create("Arrival", "", vec![], vec![scene.uuid], vec![])
        .unwrap();
    let mut alice = CharacterService::try_new(&mut conn, &files)
        .unwrap()
        .create("Alice", "", vec![])
        .unwrap();
    alice.scene_ids = vec![scene.uuid];
    CharacterService::try_new(&mut conn, &files)
        .unwrap()
        .update(&alice)
        .unwrap();

    SceneService::try_new(&mut conn, &files)
        .unwrap()
        .delete(scene.uuid)
        .unwrap();

    let note_after = NoteService::try_new(&mut conn)
        .unwrap()
        .get(note.uuid)
        .unwrap()
        .unwrap();
    let alice_after = CharacterService::try_new(&mut conn, &files)
        .unwrap()
        .get(alice.uuid)
        .unwrap()
        .unwrap();
    assert!(note_after.scene_ids.is_empty());
    assert!(alice_after.scene_ids.is_empty());
}

#[test]
fn atmosphere_round_trips_through_the_row() {
    let mut conn = open_db_in_memory().unwrap();
    let (_files_dir, files) = scratch_files();

    let atmosphere = Atmosphere {
        background_color: "#2E294E".to_string(),
        lighting: LightingEffect::Moonlight,
        particle: Some(ParticleEffect::Fireflies),
    };
    let scene = SceneService::try_new(&mut conn, &files)
        .unwrap()
        .create("Night market", "lanterns over the canal", atmosphere.clone(), vec![])
        .unwrap();

    let loaded = SceneService::try_new(&mut conn, &files)
        .unwrap()
        .get(scene.uuid)
        .unwrap()
        .unwrap();
    assert_eq!(loaded.atmosphere, atmosphere);
}

#[test]
fn invalid_background_color_is_rejected() {
    let mut conn = open_db_in_memory().unwrap();
    let (_files_dir, files) = scratch_files();

    let atmosphere = Atmosphere {
        background_color: "blue".to_string(),
        lighting: LightingEffect::Daylight,
        particle: None,
    };
    let result = SceneService::try_new(&mut conn, &files)
        .unwrap()
        .create("Harbor", "", atmosphere, vec![]);
    assert!(matches!(result, Err(ServiceError::Validation(_))));
}

fn scratch_files() -> (tempfile::TempDir, AttachmentStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = AttachmentStore::new(dir.path());
    (dir, store)
}
