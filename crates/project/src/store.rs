//! String preference storage.

use crate::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Named string values with explicit commit.
///
/// `save` only stages a value. It is durable once `flush` has returned `Ok`.
pub trait KeyValueStore {
    fn load(&self, key: &str) -> Option<String>;

    fn load_or(&self, key: &str, default: &str) -> String {
        self.load(key).unwrap_or_else(|| default.to_string())
    }

    fn save(&mut self, key: &str, value: String);

    /// Stage the removal of `key`.
    fn remove(&mut self, key: &str);

    fn flush(&mut self) -> Result<(), StoreError>;
}

/// In-process store, mainly for tests and headless sessions.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
    flushes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `flush` has been called.
    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn save(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        self.flushes += 1;
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PreferencesFile {
    #[serde(default)]
    values: BTreeMap<String, String>,
}

/// Preferences persisted as a JSON file.
///
/// Writes are staged in memory. `flush` writes the whole map to a sibling
/// temporary file, syncs it and renames it over the target, so an
/// interrupted flush leaves the previous file intact.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    prefs: PreferencesFile,
    dirty: bool,
}

impl FileStore {
    /// Open the preferences file at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let prefs = if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            serde_json::from_reader(reader)?
        } else {
            PreferencesFile::default()
        };

        Ok(Self {
            path,
            prefs,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether there are staged writes not yet flushed.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write the whole map to `temp`, sync it and move it over the target.
    fn write_to(&self, temp: &Path) -> Result<(), StoreError> {
        let mut writer = BufWriter::new(File::create(temp)?);
        serde_json::to_writer_pretty(&mut writer, &self.prefs)?;
        writer.flush()?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        drop(file);
        fs::rename(temp, &self.path)?;
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl KeyValueStore for FileStore {
    fn load(&self, key: &str) -> Option<String> {
        self.prefs.values.get(key).cloned()
    }

    fn save(&mut self, key: &str, value: String) {
        self.prefs.values.insert(key.to_string(), value);
        self.dirty = true;
    }

    fn remove(&mut self, key: &str) {
        if self.prefs.values.remove(key).is_some() {
            self.dirty = true;
        }
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        if !self.dirty {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp = self.temp_path();
        if let Err(e) = self.write_to(&temp) {
            let _ = fs::remove_file(&temp);
            return Err(e);
        }

        log::debug!(
            "flushed {} preferences to {}",
            self.prefs.values.len(),
            self.path.display()
        );
        self.dirty = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_memory_store_upsert() {
        let mut store = MemoryStore::new();
        store.save("a", "1".to_string());
        store.save("a", "2".to_string());

        assert_eq!(store.load("a").as_deref(), Some("2"));
        assert_eq!(store.len(), 1);
        store.remove("a");
        assert!(store.is_empty());
        assert_eq!(store.load_or("missing", "fallback"), "fallback");
    }

    #[test]
    fn test_memory_store_counts_flushes() {
        let mut store = MemoryStore::new();
        store.flush().expect("flush");
        store.flush().expect("flush");

        assert_eq!(store.flush_count(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn test_file_store_missing_file_is_empty() {
        let dir = tempdir().expect("tempdir");
        let store = FileStore::open(dir.path().join("prefs.json")).expect("open");

        assert!(store.load("anything").is_none());
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_file_store_persists_after_flush() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("prefs.json");

        let mut store = FileStore::open(&path).expect("open");
        store.save("PREF-x.0", "value".to_string());
        assert!(store.is_dirty());
        store.flush().expect("flush");
        assert!(!store.is_dirty());
        assert!(path.exists());
        assert!(!store.temp_path().exists());

        let reopened = FileStore::open(&path).expect("reopen");
        assert_eq!(reopened.load("PREF-x.0").as_deref(), Some("value"));
    }

    #[test]
    fn test_file_store_unflushed_writes_are_not_persisted() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("prefs.json");

        let mut store = FileStore::open(&path).expect("open");
        store.save("k", "v".to_string());
        drop(store);

        let reopened = FileStore::open(&path).expect("reopen");
        assert!(reopened.load("k").is_none());
    }

    #[test]
    fn test_file_store_remove_is_persisted() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("prefs.json");

        let mut store = FileStore::open(&path).expect("open");
        store.save("a", "1".to_string());
        store.save("b", "2".to_string());
        store.flush().expect("flush");
        store.remove("a");
        assert!(store.is_dirty());
        store.flush().expect("flush");

        let reopened = FileStore::open(&path).expect("reopen");
        assert!(reopened.load("a").is_none());
        assert_eq!(reopened.load("b").as_deref(), Some("2"));
    }

    #[test]
    fn test_failed_flush_removes_temp_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("prefs.json");

        let mut store = FileStore::open(&path).expect("open");
        // a non-empty directory at the target makes the final rename fail
        std::fs::create_dir(&path).expect("create dir");
        std::fs::write(path.join("keep"), b"x").expect("write");

        store.save("k", "v".to_string());
        assert!(matches!(store.flush(), Err(StoreError::Io(_))));
        assert!(!store.temp_path().exists());
        assert!(store.is_dirty());
    }

    #[test]
    fn test_file_store_rejects_malformed_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, b"not json").expect("write");

        let result = FileStore::open(&path);
        assert!(matches!(result, Err(StoreError::Format(_))));
    }
}
