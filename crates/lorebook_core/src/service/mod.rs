//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Run every relationship-affecting mutation inside one transaction
//!   together with the relationship maintenance pass.
//! - Keep UI/FFI layers decoupled from storage details.

use crate::attach::AttachError;
use crate::model::ValidationError;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod character_service;
pub mod cleanup;
pub mod note_service;
pub mod scene_service;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error shared by all entity use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Target entity does not exist.
    NotFound(Uuid),
    /// Field-level invariant violated by caller input.
    Validation(ValidationError),
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Attachment namespace failure.
    File(AttachError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "entity not found: {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::File(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotFound(_) => None,
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::File(err) => Some(err),
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<AttachError> for ServiceError {
    fn from(value: AttachError) -> Self {
        Self::File(value)
    }
}

impl From<rusqlite::Error> for ServiceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(RepoError::from(value))
    }
}
