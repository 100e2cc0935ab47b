//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts per entity kind.
//! - Isolate SQLite query details from service/business orchestration.
//! - Own the JSON-encoded relationship-list column codec.
//!
//! # Invariants
//! - Repository writes enforce model `validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.
//! - NULL or absent list columns decode as the empty list.

use crate::db::migrations::{latest_version, schema_version};
use crate::db::DbError;
use crate::model::ValidationError;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod audio_repo;
pub mod character_repo;
pub mod note_repo;
pub mod scene_repo;
pub mod settings_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for entity persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    NotFound(Uuid),
    /// Connection schema is not at the version this binary was built for.
    SchemaMismatch {
        expected_version: u32,
        actual_version: u32,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "entity not found: {id}"),
            Self::SchemaMismatch {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Verifies the connection is migrated to the version this binary expects.
///
/// Called once by service constructors so individual row operations can
/// assume a ready schema.
pub fn ensure_schema_ready(conn: &Connection) -> RepoResult<()> {
    let actual = schema_version(conn)?;
    let expected = latest_version();
    if actual != expected {
        return Err(RepoError::SchemaMismatch {
            expected_version: expected,
            actual_version: actual,
        });
    }
    Ok(())
}

/// Encodes an id list into its JSON TEXT column representation.
pub(crate) fn encode_id_list(ids: &[Uuid]) -> RepoResult<String> {
    let texts: Vec<String> = ids.iter().map(Uuid::to_string).collect();
    serde_json::to_string(&texts)
        .map_err(|err| RepoError::InvalidData(format!("id list encoding failed: {err}")))
}

/// Decodes a JSON TEXT column into an id list.
///
/// `None` (NULL column) decodes as the empty list.
pub(crate) fn decode_id_list(column: &str, raw: Option<String>) -> RepoResult<Vec<Uuid>> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    let texts: Vec<String> = serde_json::from_str(&raw)
        .map_err(|err| RepoError::InvalidData(format!("bad JSON list in {column}: {err}")))?;
    texts
        .iter()
        .map(|text| {
            Uuid::parse_str(text).map_err(|_| {
                RepoError::InvalidData(format!("invalid uuid value `{text}` in {column}"))
            })
        })
        .collect()
}

/// Encodes a tag set into its JSON TEXT column representation.
pub(crate) fn encode_string_list(values: &[String]) -> RepoResult<String> {
    serde_json::to_string(values)
        .map_err(|err| RepoError::InvalidData(format!("string list encoding failed: {err}")))
}

/// Decodes a JSON TEXT column into a string list; NULL decodes as empty.
pub(crate) fn decode_string_list(column: &str, raw: Option<String>) -> RepoResult<Vec<String>> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    serde_json::from_str(&raw)
        .map_err(|err| RepoError::InvalidData(format!("bad JSON list in {column}: {err}")))
}

pub(crate) fn parse_uuid(column: &str, text: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(text)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{text}` in {column}")))
}

#[cfg(test)]
mod tests {
    use super::{decode_id_list, decode_string_list, encode_id_list};
    use uuid::Uuid;

    #[test]
    fn null_list_columns_decode_as_empty() {
        assert_eq!(
            decode_id_list("notes.scene_ids", None).unwrap(),
            Vec::<Uuid>::new()
        );
        assert_eq!(
            decode_string_list("notes.tags", None).unwrap(),
            Vec::<String>::new()
        );
    }

    #[test]
    fn id_list_round_trips_through_json_column() {
        let ids = vec![Uuid::new_v4(), Uuid::new_v4()];
        let encoded = encode_id_list(&ids).unwrap();
        assert_eq!(decode_id_list("x", Some(encoded)).unwrap(), ids);
    }

    #[test]
    fn malformed_list_column_is_reported_not_masked() {
        let err = decode_id_list("characters.note_ids", Some("not-json".to_string()));
        assert!(err.is_err());
    }
}
