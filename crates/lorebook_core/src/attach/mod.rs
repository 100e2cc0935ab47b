//! Binary attachment namespace on the filesystem.
//!
//! # Responsibility
//! - Store avatar images, cover images and audio recordings as files keyed
//!   by the attachment's own id.
//!
//! # Invariants
//! - File names are relative (`{id}.{ext}`); no absolute path is ever
//!   persisted, so the namespace can be relocated or copied wholesale.
//! - Names containing path separators or parent components are rejected.
//! - Deleting an absent file is a no-op, mirroring relationship semantics.

use crate::model::attachment::AttachmentRef;
use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Error for attachment file operations.
#[derive(Debug)]
pub enum AttachError {
    Io(io::Error),
    /// Relative-name invariant violated by the caller.
    InvalidName(String),
}

impl Display for AttachError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "attachment I/O error: {err}"),
            Self::InvalidName(name) => {
                write!(f, "invalid attachment file name `{name}`")
            }
        }
    }
}

impl Error for AttachError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::InvalidName(_) => None,
        }
    }
}

impl From<io::Error> for AttachError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// File store for one attachment namespace directory.
#[derive(Debug, Clone)]
pub struct AttachmentStore {
    root: PathBuf,
}

impl AttachmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Namespace directory this store writes into.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes attachment bytes under `{id}.{ext}` and returns the reference.
    ///
    /// The extension is normalized to lowercase alphanumerics; anything
    /// unusable falls back to `bin`.
    pub fn store(&self, id: Uuid, ext: &str, bytes: &[u8]) -> Result<AttachmentRef, AttachError> {
        let file_name = format!("{id}.{}", normalize_ext(ext));
        fs::create_dir_all(&self.root)?;
        fs::write(self.path_of(&file_name), bytes)?;
        Ok(AttachmentRef { id, file_name })
    }

    /// Reads the bytes of one attachment file.
    pub fn read(&self, file_name: &str) -> Result<Vec<u8>, AttachError> {
        check_relative(file_name)?;
        Ok(fs::read(self.path_of(file_name))?)
    }

    /// Returns whether the named file exists in the namespace.
    pub fn contains(&self, file_name: &str) -> bool {
        check_relative(file_name).is_ok() && self.path_of(file_name).is_file()
    }

    /// Removes one attachment file. Missing files are a logged no-op.
    pub fn delete(&self, file_name: &str) -> Result<(), AttachError> {
        check_relative(file_name)?;
        match fs::remove_file(self.path_of(file_name)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                warn!(
                    "event=attachment_delete module=attach status=warn file={file_name} error_code=missing"
                );
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Lists every file name in the namespace, sorted.
    pub fn file_names(&self) -> Result<Vec<String>, AttachError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.path().is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Deletes every file in the namespace. Returns the number removed.
    pub fn wipe(&self) -> Result<usize, AttachError> {
        let names = self.file_names()?;
        for name in &names {
            fs::remove_file(self.path_of(name))?;
        }
        Ok(names.len())
    }

    /// Absolute path of one namespace file; crate-internal for archive copy.
    pub(crate) fn path_of(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }
}

fn normalize_ext(ext: &str) -> String {
    let normalized: String = ext
        .trim()
        .trim_start_matches('.')
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase();
    if normalized.is_empty() {
        "bin".to_string()
    } else {
        normalized
    }
}

fn check_relative(file_name: &str) -> Result<(), AttachError> {
    let suspicious = file_name.is_empty()
        || file_name.contains('/')
        || file_name.contains('\\')
        || file_name.contains("..");
    if suspicious {
        return Err(AttachError::InvalidName(file_name.to_string()));
    }
    Ok(())
}
