//! File-backed slot storage
//!
//! Provides a `DiskStore` that keeps each slot as a JSON file in an
//! XDG-compliant data directory.

use directories::ProjectDirs;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{SlotStorage, StoreError};

/// Stores each slot as `<key>.json` inside a data directory
///
/// Uses `~/.local/share/wxfav/` on Linux, or the equivalent platform data
/// directory elsewhere. Writes go to a temporary sibling file that is then
/// renamed over the slot, so an interrupted write leaves the previous
/// contents in place.
#[derive(Debug, Clone)]
pub struct DiskStore {
    /// Directory where slot files are stored
    data_dir: PathBuf,
}

impl DiskStore {
    /// Creates a new DiskStore using the platform data directory
    ///
    /// Returns `None` if the directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "wxfav")?;
        let data_dir = project_dirs.data_dir().to_path_buf();
        Some(Self { data_dir })
    }

    /// Creates a new DiskStore rooted at a custom directory
    pub fn with_dir(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Directory holding the slot files
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Returns the path to the file backing `key`
    pub fn slot_path(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", key))
    }

    fn ensure_dir(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.data_dir)
    }
}

impl SlotStorage for DiskStore {
    fn read_raw(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.slot_path(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_raw(&self, key: &str, contents: &str) -> Result<(), StoreError> {
        self.ensure_dir()?;

        let path = self.slot_path(key);
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, contents)?;
        fs::rename(&tmp_path, &path)?;

        tracing::trace!(path = ?path, bytes = contents.len(), "Slot written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (DiskStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = DiskStore::with_dir(temp_dir.path().to_path_buf());
        (store, temp_dir)
    }

    #[test]
    fn test_write_creates_file_in_data_directory() {
        let (store, temp_dir) = create_test_store();

        store
            .write_raw("favorites", "[]")
            .expect("Write should succeed");

        let expected_path = temp_dir.path().join("favorites.json");
        assert!(expected_path.exists(), "Slot file should exist");
        assert_eq!(fs::read_to_string(expected_path).unwrap(), "[]");
    }

    #[test]
    fn test_read_returns_none_for_missing_key() {
        let (store, _temp_dir) = create_test_store();

        let result = store.read_raw("nonexistent_key").expect("Read should succeed");

        assert!(result.is_none(), "Should return None for missing key");
    }

    #[test]
    fn test_write_creates_directory_if_missing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let nested_path = temp_dir.path().join("nested").join("data").join("dir");
        let store = DiskStore::with_dir(nested_path.clone());

        store.write_raw("nested_key", "{}").expect("Write should succeed");

        assert!(nested_path.exists(), "Nested directory should be created");
        assert!(nested_path.join("nested_key.json").exists());
    }

    #[test]
    fn test_write_leaves_no_temporary_file() {
        let (store, temp_dir) = create_test_store();

        store.write_raw("favorites", "[1]").expect("Write should succeed");

        assert!(!temp_dir.path().join("favorites.json.tmp").exists());
    }

    #[test]
    fn test_overwrite_existing_slot() {
        let (store, _temp_dir) = create_test_store();

        store.write_raw("overwrite_key", "first").unwrap();
        store.write_raw("overwrite_key", "second").unwrap();

        let result = store.read_raw("overwrite_key").unwrap();
        assert_eq!(result.as_deref(), Some("second"));
    }

    #[test]
    fn test_read_error_other_than_missing_is_reported() {
        let (store, temp_dir) = create_test_store();
        // A directory where the slot file should be cannot be read as a string
        fs::create_dir_all(temp_dir.path().join("blocked.json")).unwrap();

        assert!(store.read_raw("blocked").is_err());
    }

    #[test]
    fn test_new_creates_xdg_compliant_path() {
        if let Some(store) = DiskStore::new() {
            let path_str = store.data_dir().to_string_lossy();
            assert!(path_str.contains("wxfav"), "Data path should contain project name");
        }
        // Test passes if new() returns None (e.g., no home directory in CI)
    }
}
