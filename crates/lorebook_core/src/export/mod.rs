//! One-way export documents: plain text, JSON and paginated PDF.
//!
//! # Responsibility
//! - Render a read-only snapshot of selected entity kinds for sharing.
//!
//! # Invariants
//! - Export never mutates the live store.
//! - JSON output carries top-level keys `version` and `timestamp` plus only
//!   the toggled-on entity kinds.
//! - Document naming: `Lorebook_{yyyyMMdd_HHmmss}.{ext}`.

use crate::model::character::Character;
use crate::model::note::Note;
use crate::model::scene::Scene;
use crate::repo::character_repo::{CharacterRepository, SqliteCharacterRepository};
use crate::repo::note_repo::{NoteRepository, SqliteNoteRepository};
use crate::repo::scene_repo::{SceneRepository, SqliteSceneRepository};
use crate::repo::{ensure_schema_ready, RepoError};
use crate::stamp::{current_rfc3339, filename_stamp};
use log::info;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::PathBuf;

mod pdf;

/// Label prefixing every export document file name.
pub const APP_LABEL: &str = "Lorebook";

pub type ExportResult<T> = Result<T, ExportError>;

/// Error taxonomy for export operations.
#[derive(Debug)]
pub enum ExportError {
    Io(io::Error),
    Repo(RepoError),
    Serialization(serde_json::Error),
    /// PDF renderer failure, carried as a message.
    Pdf(String),
}

impl Display for ExportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "export I/O error: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Serialization(err) => write!(f, "export serialization failed: {err}"),
            Self::Pdf(message) => write!(f, "PDF rendering failed: {message}"),
        }
    }
}

impl Error for ExportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Serialization(err) => Some(err),
            Self::Pdf(_) => None,
        }
    }
}

impl From<io::Error> for ExportError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<RepoError> for ExportError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

/// Output format of one export document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Text,
    Json,
    Pdf,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Json => "json",
            Self::Pdf => "pdf",
        }
    }

    /// Parses a caller-facing format token (`txt|json|pdf`).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "txt" | "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }
}

/// Export parameters: format plus independent per-kind toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportRequest {
    pub format: ExportFormat,
    pub include_characters: bool,
    pub include_scenes: bool,
    pub include_notes: bool,
}

/// A written export document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDocument {
    pub path: PathBuf,
    pub file_name: String,
    pub format: ExportFormat,
}

struct ExportSelection {
    characters: Option<Vec<Character>>,
    scenes: Option<Vec<Scene>>,
    notes: Option<Vec<Note>>,
}

/// Read-only document renderer over one export namespace directory.
pub struct Exporter<'conn> {
    conn: &'conn Connection,
    exports_dir: PathBuf,
}

impl<'conn> Exporter<'conn> {
    /// Constructs an exporter over a migrated connection.
    pub fn try_new(conn: &'conn Connection, exports_dir: impl Into<PathBuf>) -> ExportResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self {
            conn,
            exports_dir: exports_dir.into(),
        })
    }

    /// Renders the selected entity kinds into a new document file.
    pub fn export(&self, request: &ExportRequest) -> ExportResult<ExportDocument> {
        let selection = self.select(request)?;
        let timestamp = current_rfc3339();

        let bytes = match request.format {
            ExportFormat::Json => render_json(&selection, &timestamp)?,
            ExportFormat::Text => render_text(&selection, &timestamp).into_bytes(),
            ExportFormat::Pdf => {
                pdf::render(&collect_lines(&selection, &timestamp)).map_err(ExportError::Pdf)?
            }
        };

        fs::create_dir_all(&self.exports_dir)?;
        let file_name = format!(
            "{APP_LABEL}_{}.{}",
            filename_stamp(),
            request.format.extension()
        );
        let path = self.exports_dir.join(&file_name);
        fs::write(&path, bytes)?;

        info!(
            "event=export module=export status=ok document={file_name} characters={} scenes={} notes={}",
            selection.characters.as_ref().map_or(0, Vec::len),
            selection.scenes.as_ref().map_or(0, Vec::len),
            selection.notes.as_ref().map_or(0, Vec::len)
        );
        Ok(ExportDocument {
            path,
            file_name,
            format: request.format,
        })
    }

    fn select(&self, request: &ExportRequest) -> ExportResult<ExportSelection> {
        let characters = if request.include_characters {
            Some(SqliteCharacterRepository::new(self.conn).list_characters()?)
        } else {
            None
        };
        let scenes = if request.include_scenes {
            Some(SqliteSceneRepository::new(self.conn).list_scenes()?)
        } else {
            None
        };
        let notes = if request.include_notes {
            Some(SqliteNoteRepository::new(self.conn).list_notes()?)
        } else {
            None
        };
        Ok(ExportSelection {
            characters,
            scenes,
            notes,
        })
    }
}

/// Renders the versioned JSON document with only the toggled-on keys.
fn render_json(selection: &ExportSelection, timestamp: &str) -> ExportResult<Vec<u8>> {
    let mut document = serde_json::Map::new();
    document.insert("version".to_string(), crate::backup::ARCHIVE_VERSION.into());
    document.insert("timestamp".to_string(), timestamp.into());

    if let Some(characters) = &selection.characters {
        document.insert("characters".to_string(), serde_json::to_value(characters)?);
    }
    if let Some(scenes) = &selection.scenes {
        document.insert("scenes".to_string(), serde_json::to_value(scenes)?);
    }
    if let Some(notes) = &selection.notes {
        document.insert("notes".to_string(), serde_json::to_value(notes)?);
    }

    Ok(serde_json::to_vec_pretty(&serde_json::Value::Object(
        document,
    ))?)
}

fn render_text(selection: &ExportSelection, timestamp: &str) -> String {
    let mut text = collect_lines(selection, timestamp).join("\n");
    text.push('\n');
    text
}

/// Shared line layout consumed by the text and PDF renderers.
fn collect_lines(selection: &ExportSelection, timestamp: &str) -> Vec<String> {
    let mut lines = vec![format!("{APP_LABEL} export"), format!("Created {timestamp}")];

    if let Some(characters) = &selection.characters {
        lines.push(String::new());
        lines.push(format!("CHARACTERS ({})", characters.len()));
        for character in characters {
            lines.push(format!("- {}", character.name));
            push_wrapped(&mut lines, &character.description);
            if !character.tags.is_empty() {
                lines.push(format!("  tags: {}", character.tags.join(", ")));
            }
            lines.push(format!(
                "  linked notes: {}, linked scenes: {}",
                character.note_ids.len(),
                character.scene_ids.len()
            ));
        }
    }

    if let Some(scenes) = &selection.scenes {
        lines.push(String::new());
        lines.push(format!("SCENES ({})", scenes.len()));
        for scene in scenes {
            lines.push(format!("- {}", scene.title));
            push_wrapped(&mut lines, &scene.description);
            if !scene.tags.is_empty() {
                lines.push(format!("  tags: {}", scene.tags.join(", ")));
            }
            lines.push(format!(
                "  atmosphere: {} / {:?} lighting{}",
                scene.atmosphere.background_color,
                scene.atmosphere.lighting,
                scene
                    .atmosphere
                    .particle
                    .map(|particle| format!(", {particle:?} particles"))
                    .unwrap_or_default()
            ));
        }
    }

    if let Some(notes) = &selection.notes {
        lines.push(String::new());
        lines.push(format!("NOTES ({})", notes.len()));
        for note in notes {
            lines.push(format!("- {}", note.title));
            push_wrapped(&mut lines, &note.content);
            if !note.tags.is_empty() {
                lines.push(format!("  tags: {}", note.tags.join(", ")));
            }
        }
    }

    lines
}

fn push_wrapped(lines: &mut Vec<String>, body: &str) {
    for line in body.lines() {
        let trimmed = line.trim_end();
        if !trimmed.is_empty() {
            lines.push(format!("  {trimmed}"));
        }
    }
}
