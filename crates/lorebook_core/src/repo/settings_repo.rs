//! Persisted settings repository.
//!
//! # Responsibility
//! - Store the flat string-keyed preference map included in backups.
//!
//! # Invariants
//! - Values are opaque to the store; no schema validation on write or read.
//! - Unknown keys restored from an archive pass through untouched.

use crate::repo::RepoResult;
use rusqlite::{params, Connection};
use std::collections::BTreeMap;

/// Repository interface for the settings key-value map.
pub trait SettingsRepository {
    fn get_setting(&self, key: &str) -> RepoResult<Option<String>>;
    fn set_setting(&self, key: &str, value: &str) -> RepoResult<()>;
    fn all_settings(&self) -> RepoResult<BTreeMap<String, String>>;
    /// Replaces the whole map; used by restore.
    fn replace_settings(&self, settings: &BTreeMap<String, String>) -> RepoResult<()>;
}

/// SQLite-backed settings repository.
pub struct SqliteSettingsRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSettingsRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl SettingsRepository for SqliteSettingsRepository<'_> {
    fn get_setting(&self, key: &str) -> RepoResult<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM settings WHERE key = ?1;")?;

        let mut rows = stmt.query([key])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(row.get(0)?));
        }

        Ok(None)
    }

    fn set_setting(&self, key: &str, value: &str) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT (key) DO UPDATE SET value = excluded.value;",
            params![key, value],
        )?;

        Ok(())
    }

    fn all_settings(&self) -> RepoResult<BTreeMap<String, String>> {
        let mut stmt = self.conn.prepare("SELECT key, value FROM settings;")?;

        let mut rows = stmt.query([])?;
        let mut settings = BTreeMap::new();
        while let Some(row) = rows.next()? {
            settings.insert(row.get(0)?, row.get(1)?);
        }

        Ok(settings)
    }

    fn replace_settings(&self, settings: &BTreeMap<String, String>) -> RepoResult<()> {
        self.conn.execute("DELETE FROM settings;", [])?;
        for (key, value) in settings {
            self.set_setting(key, value)?;
        }

        Ok(())
    }
}
