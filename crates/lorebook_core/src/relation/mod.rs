//! Bidirectional relationship maintenance across entity kinds.
//!
//! # Responsibility
//! - Keep the mirrored link lists (Note↔Character, Note↔Scene) in agreement
//!   after every create, update or delete.
//! - Cascade id removal out of every relationship list on entity deletion.
//!
//! # Invariants
//! - Runs inside the caller's transaction: a committed operation never
//!   leaves an asymmetric link state.
//! - Idempotent: adding a present id or removing an absent id is a no-op.
//! - A missing opposite entity is skipped with a warning, never an error;
//!   an orphaned reference must not block the primary entity's save.
//! - Note↔Character and Note↔Scene links are independent; linking a note to
//!   a scene does not touch the note's character list.

use crate::model::character::Character;
use crate::model::note::Note;
use crate::model::scene::Scene;
use crate::repo::character_repo::{CharacterRepository, SqliteCharacterRepository};
use crate::repo::note_repo::{NoteRepository, SqliteNoteRepository};
use crate::repo::scene_repo::{SceneRepository, SqliteSceneRepository};
use crate::repo::RepoResult;
use log::warn;
use rusqlite::Connection;
use uuid::Uuid;

/// Adds `id` unless already present. Returns whether the list changed.
pub(crate) fn link(list: &mut Vec<Uuid>, id: Uuid) -> bool {
    if list.contains(&id) {
        return false;
    }
    list.push(id);
    true
}

/// Removes `id` if present. Returns whether the list changed.
pub(crate) fn unlink(list: &mut Vec<Uuid>, id: Uuid) -> bool {
    let before = list.len();
    list.retain(|existing| *existing != id);
    list.len() != before
}

fn added_ids(previous: &[Uuid], current: &[Uuid]) -> Vec<Uuid> {
    current
        .iter()
        .filter(|id| !previous.contains(id))
        .copied()
        .collect()
}

/// Mirrors a note's link lists onto the referenced characters and scenes.
///
/// `previous` is the stored version before this mutation (`None` on create).
/// Newly referenced entities gain the note id; dropped references lose it.
pub fn apply_note_links(
    conn: &Connection,
    previous: Option<&Note>,
    current: &Note,
) -> RepoResult<()> {
    let empty: &[Uuid] = &[];
    let prev_characters = previous.map_or(empty, |note| note.character_ids.as_slice());
    let prev_scenes = previous.map_or(empty, |note| note.scene_ids.as_slice());

    for character_id in added_ids(prev_characters, &current.character_ids) {
        add_note_to_character(conn, character_id, current.uuid)?;
    }
    for character_id in added_ids(&current.character_ids, prev_characters) {
        remove_note_from_character(conn, character_id, current.uuid)?;
    }

    for scene_id in added_ids(prev_scenes, &current.scene_ids) {
        add_note_to_scene(conn, scene_id, current.uuid)?;
    }
    for scene_id in added_ids(&current.scene_ids, prev_scenes) {
        remove_note_from_scene(conn, scene_id, current.uuid)?;
    }

    Ok(())
}

/// Removes a deleted note's id from every character and scene that held it.
pub fn detach_note(conn: &Connection, note: &Note) -> RepoResult<()> {
    for character_id in &note.character_ids {
        remove_note_from_character(conn, *character_id, note.uuid)?;
    }
    for scene_id in &note.scene_ids {
        remove_note_from_scene(conn, *scene_id, note.uuid)?;
    }

    Ok(())
}

/// Mirrors a character's note list onto the referenced notes.
///
/// The character's scene list has no mirror (scenes store no character
/// list), so only the note side is maintained here.
pub fn apply_character_links(
    conn: &Connection,
    previous: Option<&Character>,
    current: &Character,
) -> RepoResult<()> {
    let empty: &[Uuid] = &[];
    let prev_notes = previous.map_or(empty, |character| character.note_ids.as_slice());

    for note_id in added_ids(prev_notes, &current.note_ids) {
        add_character_to_note(conn, note_id, current.uuid)?;
    }
    for note_id in added_ids(&current.note_ids, prev_notes) {
        remove_character_from_note(conn, note_id, current.uuid)?;
    }

    Ok(())
}

/// Removes a deleted character's id from every note that held it.
pub fn detach_character(conn: &Connection, character: &Character) -> RepoResult<()> {
    for note_id in &character.note_ids {
        remove_character_from_note(conn, *note_id, character.uuid)?;
    }

    Ok(())
}

/// Mirrors a scene's note list onto the referenced notes.
pub fn apply_scene_links(
    conn: &Connection,
    previous: Option<&Scene>,
    current: &Scene,
) -> RepoResult<()> {
    let empty: &[Uuid] = &[];
    let prev_notes = previous.map_or(empty, |scene| scene.note_ids.as_slice());

    for note_id in added_ids(prev_notes, &current.note_ids) {
        add_scene_to_note(conn, note_id, current.uuid)?;
    }
    for note_id in added_ids(&current.note_ids, prev_notes) {
        remove_scene_from_note(conn, note_id, current.uuid)?;
    }

    Ok(())
}

/// Removes a deleted scene's id from every note and character that held it.
///
/// Characters hold scene ids without a mirror list on the scene, so the
/// character side is found by scanning all character rows.
pub fn detach_scene(conn: &Connection, scene: &Scene) -> RepoResult<()> {
    for note_id in &scene.note_ids {
        remove_scene_from_note(conn, *note_id, scene.uuid)?;
    }

    let characters = SqliteCharacterRepository::new(conn);
    for mut character in characters.list_characters()? {
        if unlink(&mut character.scene_ids, scene.uuid) {
            characters.update_character(&character)?;
        }
    }

    Ok(())
}

fn add_note_to_character(conn: &Connection, character_id: Uuid, note_id: Uuid) -> RepoResult<()> {
    let repo = SqliteCharacterRepository::new(conn);
    match repo.get_character(character_id)? {
        Some(mut character) => {
            if link(&mut character.note_ids, note_id) {
                repo.update_character(&character)?;
            }
            Ok(())
        }
        None => {
            skip_missing("character", character_id, note_id);
            Ok(())
        }
    }
}

fn remove_note_from_character(
    conn: &Connection,
    character_id: Uuid,
    note_id: Uuid,
) -> RepoResult<()> {
    let repo = SqliteCharacterRepository::new(conn);
    match repo.get_character(character_id)? {
        Some(mut character) => {
            if unlink(&mut character.note_ids, note_id) {
                repo.update_character(&character)?;
            }
            Ok(())
        }
        None => {
            skip_missing("character", character_id, note_id);
            Ok(())
        }
    }
}

fn add_note_to_scene(conn: &Connection, scene_id: Uuid, note_id: Uuid) -> RepoResult<()> {
    let repo = SqliteSceneRepository::new(conn);
    match repo.get_scene(scene_id)? {
        Some(mut scene) => {
            if link(&mut scene.note_ids, note_id) {
                repo.update_scene(&scene)?;
            }
            Ok(())
        }
        None => {
            skip_missing("scene", scene_id, note_id);
            Ok(())
        }
    }
}

fn remove_note_from_scene(conn: &Connection, scene_id: Uuid, note_id: Uuid) -> RepoResult<()> {
    let repo = SqliteSceneRepository::new(conn);
    match repo.get_scene(scene_id)? {
        Some(mut scene) => {
            if unlink(&mut scene.note_ids, note_id) {
                repo.update_scene(&scene)?;
            }
            Ok(())
        }
        None => {
            skip_missing("scene", scene_id, note_id);
            Ok(())
        }
    }
}

fn add_character_to_note(conn: &Connection, note_id: Uuid, character_id: Uuid) -> RepoResult<()> {
    let repo = SqliteNoteRepository::new(conn);
    match repo.get_note(note_id)? {
        Some(mut note) => {
            if link(&mut note.character_ids, character_id) {
                repo.update_note(&note)?;
            }
            Ok(())
        }
        None => {
            skip_missing("note", note_id, character_id);
            Ok(())
        }
    }
}

fn remove_character_from_note(
    conn: &Connection,
    note_id: Uuid,
    character_id: Uuid,
) -> RepoResult<()> {
    let repo = SqliteNoteRepository::new(conn);
    match repo.get_note(note_id)? {
        Some(mut note) => {
            if unlink(&mut note.character_ids, character_id) {
                repo.update_note(&note)?;
            }
            Ok(())
        }
        None => {
            skip_missing("note", note_id, character_id);
            Ok(())
        }
    }
}

fn add_scene_to_note(conn: &Connection, note_id: Uuid, scene_id: Uuid) -> RepoResult<()> {
    let repo = SqliteNoteRepository::new(conn);
    match repo.get_note(note_id)? {
        Some(mut note) => {
            if link(&mut note.scene_ids, scene_id) {
                repo.update_note(&note)?;
            }
            Ok(())
        }
        None => {
            skip_missing("note", note_id, scene_id);
            Ok(())
        }
    }
}

fn remove_scene_from_note(conn: &Connection, note_id: Uuid, scene_id: Uuid) -> RepoResult<()> {
    let repo = SqliteNoteRepository::new(conn);
    match repo.get_note(note_id)? {
        Some(mut note) => {
            if unlink(&mut note.scene_ids, scene_id) {
                repo.update_note(&note)?;
            }
            Ok(())
        }
        None => {
            skip_missing("note", note_id, scene_id);
            Ok(())
        }
    }
}

fn skip_missing(kind: &str, missing: Uuid, source: Uuid) {
    warn!(
        "event=relation_skip module=relation status=warn kind={kind} missing={missing} source={source}"
    );
}

#[cfg(test)]
mod tests {
    use super::{link, unlink};
    use uuid::Uuid;

    #[test]
    fn link_is_idempotent() {
        let id = Uuid::new_v4();
        let mut list = Vec::new();
        assert!(link(&mut list, id));
        assert!(!link(&mut list, id));
        assert_eq!(list, vec![id]);
    }

    #[test]
    fn unlink_of_absent_id_is_noop() {
        let id = Uuid::new_v4();
        let mut list = vec![id];
        assert!(unlink(&mut list, id));
        assert!(!unlink(&mut list, id));
        assert!(list.is_empty());
    }
}
