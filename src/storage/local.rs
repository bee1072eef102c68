use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Result as SqliteResult};
use thiserror::Error;

use crate::calendar::filter::CustomFilter;
use crate::calendar::EventError;

pub const CUSTOM_FILTERS_KEY: &str = "oiaa-custom-filters";

#[derive(Debug, Error)]
pub enum LocalStorageError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Failed to create storage directory: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Invalid filter: {0}")]
    InvalidFilter(#[from] EventError),
}

/// Client-local key/value store, the terminal counterpart of browser storage.
pub struct LocalStorage {
    conn: Connection,
}

impl LocalStorage {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn open(path: &Path) -> Result<Self, LocalStorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let storage = Self::new(Connection::open(path)?);
        storage.initialize()?;
        Ok(storage)
    }

    pub fn in_memory() -> Result<Self, LocalStorageError> {
        let storage = Self::new(Connection::open_in_memory()?);
        storage.initialize()?;
        Ok(storage)
    }

    pub fn initialize(&self) -> Result<(), LocalStorageError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS local_storage (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    pub fn get_item(&self, key: &str) -> Result<Option<String>, LocalStorageError> {
        let value = self
            .conn
            .query_row("SELECT value FROM local_storage WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    pub fn set_item(&self, key: &str, value: &str) -> Result<(), LocalStorageError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO local_storage (key, value) VALUES (?1, ?2)",
            [key, value],
        )?;
        Ok(())
    }

    pub fn remove_item(&self, key: &str) -> Result<(), LocalStorageError> {
        self.conn.execute("DELETE FROM local_storage WHERE key = ?1", [key])?;
        Ok(())
    }

    pub fn table_exists(&self, table_name: &str) -> bool {
        let result: SqliteResult<i32> = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
            [table_name],
            |row| row.get(0),
        );
        result.unwrap_or(0) > 0
    }

    /// A stored list that no longer parses is treated as empty.
    pub fn load_custom_filters(&self) -> Result<Vec<CustomFilter>, LocalStorageError> {
        let Some(raw) = self.get_item(CUSTOM_FILTERS_KEY)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(filters) => Ok(filters),
            Err(e) => {
                tracing::warn!("Ignoring unreadable custom filters: {}", e);
                Ok(Vec::new())
            }
        }
    }

    pub fn save_custom_filters(&self, filters: &[CustomFilter]) -> Result<(), LocalStorageError> {
        let json = serde_json::to_string(filters)?;
        self.set_item(CUSTOM_FILTERS_KEY, &json)
    }

    pub fn add_custom_filter(
        &self,
        name: &str,
        color: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<CustomFilter>, LocalStorageError> {
        let filter = CustomFilter::new(name, color, now)?;
        let mut filters = self.load_custom_filters()?;
        filters.push(filter);
        self.save_custom_filters(&filters)?;
        Ok(filters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::filter::DEFAULT_FILTER_COLOR;
    use tempfile::TempDir;

    fn create_test_storage() -> LocalStorage {
        LocalStorage::in_memory().unwrap()
    }

    #[test]
    fn creates_database_schema() {
        let storage = LocalStorage::new(Connection::open_in_memory().unwrap());

        storage.initialize().unwrap();

        assert!(storage.table_exists("local_storage"));
    }

    #[test]
    fn set_item_replaces_previous_value() {
        let storage = create_test_storage();

        storage.set_item("k", "one").unwrap();
        storage.set_item("k", "two").unwrap();

        assert_eq!(storage.get_item("k").unwrap(), Some("two".to_string()));
    }

    #[test]
    fn missing_item_is_none() {
        let storage = create_test_storage();
        assert_eq!(storage.get_item("nope").unwrap(), None);
    }

    #[test]
    fn removes_item() {
        let storage = create_test_storage();
        storage.set_item("k", "v").unwrap();

        storage.remove_item("k").unwrap();

        assert_eq!(storage.get_item("k").unwrap(), None);
    }

    #[test]
    fn custom_filters_start_empty() {
        let storage = create_test_storage();
        assert!(storage.load_custom_filters().unwrap().is_empty());
    }

    #[test]
    fn added_filters_are_appended_and_persisted() {
        let storage = create_test_storage();

        storage.add_custom_filter("Visa", DEFAULT_FILTER_COLOR, Utc::now()).unwrap();
        let filters = storage.add_custom_filter("Housing", "#22c55e", Utc::now()).unwrap();

        let names: Vec<&str> = filters.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Visa", "Housing"]);
        assert_eq!(storage.load_custom_filters().unwrap(), filters);
    }

    #[test]
    fn invalid_filter_is_not_stored() {
        let storage = create_test_storage();

        let result = storage.add_custom_filter("   ", DEFAULT_FILTER_COLOR, Utc::now());

        assert!(matches!(result, Err(LocalStorageError::InvalidFilter(_))));
        assert_eq!(storage.get_item(CUSTOM_FILTERS_KEY).unwrap(), None);
    }

    #[test]
    fn corrupt_filter_list_reads_as_empty() {
        let storage = create_test_storage();
        storage.set_item(CUSTOM_FILTERS_KEY, "not json").unwrap();

        assert!(storage.load_custom_filters().unwrap().is_empty());
    }

    #[test]
    fn filters_survive_reopening_the_database() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("local.db");

        LocalStorage::open(&path)
            .unwrap()
            .add_custom_filter("Visa", DEFAULT_FILTER_COLOR, Utc::now())
            .unwrap();

        let reopened = LocalStorage::open(&path).unwrap();
        assert_eq!(reopened.load_custom_filters().unwrap().len(), 1);
    }
}
