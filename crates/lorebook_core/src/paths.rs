//! Store directory layout under one relocatable root.
//!
//! # Responsibility
//! - Derive every namespace (database file, attachments, backups, exports)
//!   from a single storage root chosen by the embedding app.
//!
//! # Invariants
//! - Entities reference attachments by relative file name only, so moving
//!   the root directory keeps every stored reference valid.

use std::path::{Path, PathBuf};

const DB_FILE_NAME: &str = "lorebook.sqlite3";
const ATTACHMENTS_DIR: &str = "attachments";
const BACKUPS_DIR: &str = "backups";
const EXPORTS_DIR: &str = "exports";

/// Resolved filesystem namespaces of one store instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    /// SQLite database file holding all entity rows and settings.
    pub db_file: PathBuf,
    /// Directory of binary attachment files keyed by attachment id.
    pub attachments_dir: PathBuf,
    /// Directory receiving backup archives and their file namespaces.
    pub backups_dir: PathBuf,
    /// Directory receiving one-way export documents.
    pub exports_dir: PathBuf,
}

impl StorePaths {
    /// Lays out all namespaces under the given root directory.
    pub fn under_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            db_file: root.join(DB_FILE_NAME),
            attachments_dir: root.join(ATTACHMENTS_DIR),
            backups_dir: root.join(BACKUPS_DIR),
            exports_dir: root.join(EXPORTS_DIR),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::StorePaths;
    use std::path::Path;

    #[test]
    fn all_namespaces_live_under_the_root() {
        let paths = StorePaths::under_root("/data/lorebook");
        assert_eq!(paths.db_file, Path::new("/data/lorebook/lorebook.sqlite3"));
        assert_eq!(
            paths.attachments_dir,
            Path::new("/data/lorebook/attachments")
        );
        assert_eq!(paths.backups_dir, Path::new("/data/lorebook/backups"));
        assert_eq!(paths.exports_dir, Path::new("/data/lorebook/exports"));
    }
}
