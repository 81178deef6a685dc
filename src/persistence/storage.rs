// Key/value storage media for snapshots

use fd_lock::RwLock;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

use super::PersistenceError;

/// Durable client-side store addressed by string keys. Values are JSON text.
#[cfg_attr(test, mockall::automock)]
pub trait KeyValueStorage: Send {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError>;

    /// Removing a missing key is not an error
    fn remove(&self, key: &str) -> Result<(), PersistenceError>;
}

/// In-memory storage. Clones share the same underlying map, so a test can
/// keep a handle and inspect what the store wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        self.lock().remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    directory: PathBuf,
}

impl FileStorage {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.directory.join(format!("{key}.json"))
    }

    fn lock_path(&self) -> PathBuf {
        self.directory.join(".lock")
    }

    /// Run `f` while holding an exclusive lock on the storage directory
    fn with_write_lock<T>(
        &self,
        f: impl FnOnce() -> Result<T, PersistenceError>,
    ) -> Result<T, PersistenceError> {
        fs::create_dir_all(&self.directory)?;
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path())?;
        let mut lock = RwLock::new(lock_file);
        let _guard = lock.write().map_err(|e| PersistenceError::Lock {
            reason: e.to_string(),
        })?;
        f()
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let target = self.path_for(key);
        self.with_write_lock(|| {
            // Write to temporary file first, then rename
            let temp = target.with_extension("json.tmp");
            fs::write(&temp, value)?;
            fs::rename(&temp, &target)?;
            debug!(file = ?target, bytes = value.len(), "Wrote storage key");
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        let target = self.path_for(key);
        self.with_write_lock(|| match fs::remove_file(&target) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_storage_clones_share_entries() {
        let storage = MemoryStorage::new();
        let handle = storage.clone();
        storage.set("wspAppState", "{}").unwrap();

        assert_eq!(handle.get("wspAppState").unwrap().as_deref(), Some("{}"));
        handle.remove("wspAppState").unwrap();
        assert!(storage.get("wspAppState").unwrap().is_none());
    }

    #[test]
    fn test_file_storage_round_trip_and_missing_keys() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path().join("nested"));

        assert!(storage.get("absent").unwrap().is_none());
        storage.remove("absent").unwrap();

        storage.set("wspConfig", r#"{"steps":3,"users":2}"#).unwrap();
        assert_eq!(
            storage.get("wspConfig").unwrap().as_deref(),
            Some(r#"{"steps":3,"users":2}"#)
        );
        assert!(!dir.path().join("nested/wspConfig.json.tmp").exists());

        storage.remove("wspConfig").unwrap();
        assert!(storage.get("wspConfig").unwrap().is_none());
    }
}
