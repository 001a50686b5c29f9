//! Byte-string key-value backends
//!
//! The persistence adapter only needs get/set/delete on opaque bytes. Two
//! backends are provided: an in-memory map for tests and ephemeral sessions,
//! and a directory of files for real use.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::trace;

use super::error::{PersistenceError, PersistenceResult};

/// Durable byte-string slots addressed by name
pub trait KeyValueStore: Send + Sync {
    /// Read a slot; `None` when it was never written or has been deleted
    fn get(&self, key: &str) -> PersistenceResult<Option<Vec<u8>>>;

    /// Overwrite a slot. Must be durable once this returns `Ok`.
    fn set(&self, key: &str, value: &[u8]) -> PersistenceResult<()>;

    /// Remove a slot. Deleting a missing slot is not an error.
    fn delete(&self, key: &str) -> PersistenceResult<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> PersistenceResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> PersistenceResult<()> {
        (**self).set(key, value)
    }

    fn delete(&self, key: &str) -> PersistenceResult<()> {
        (**self).delete(key)
    }
}

/// In-memory backend. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    slots: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all written slots, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self
            .slots
            .lock()
            .map(|slots| slots.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    fn with_slots<T>(
        &self,
        f: impl FnOnce(&mut HashMap<String, Vec<u8>>) -> T,
    ) -> PersistenceResult<T> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| PersistenceError::unavailable("memory store lock poisoned"))?;
        Ok(f(&mut slots))
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> PersistenceResult<Option<Vec<u8>>> {
        self.with_slots(|slots| slots.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> PersistenceResult<()> {
        self.with_slots(|slots| {
            slots.insert(key.to_string(), value.to_vec());
        })
    }

    fn delete(&self, key: &str) -> PersistenceResult<()> {
        self.with_slots(|slots| {
            slots.remove(key);
        })
    }
}

/// One file per slot under a base directory
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    root: PathBuf,
}

impl FileKeyValueStore {
    /// Open (creating if needed) a store rooted at `root`
    pub fn open(root: impl Into<PathBuf>) -> PersistenceResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PersistenceResult<PathBuf> {
        let valid = !key.is_empty()
            && key != "."
            && key != ".."
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

        if !valid {
            return Err(PersistenceError::invalid_key(key));
        }

        Ok(self.root.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> PersistenceResult<Option<Vec<u8>>> {
        let path = self.path_for(key)?;

        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> PersistenceResult<()> {
        let final_file = self.path_for(key)?;
        let temp_file = final_file.with_extension("json.tmp");

        // Write and sync the temp file, then atomic rename
        let mut file = fs::File::create(&temp_file)?;
        file.write_all(value)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&temp_file, &final_file)?;

        trace!("Wrote {} bytes to {}", value.len(), final_file.display());
        Ok(())
    }

    fn delete(&self, key: &str) -> PersistenceResult<()> {
        let path = self.path_for(key)?;

        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_set_get_delete() {
        let store = MemoryKeyValueStore::new();

        assert_eq!(store.get("storage").unwrap(), None);
        store.set("storage", b"abc").unwrap();
        assert_eq!(store.get("storage").unwrap(), Some(b"abc".to_vec()));

        store.delete("storage").unwrap();
        store.delete("storage").unwrap();
        assert_eq!(store.get("storage").unwrap(), None);
    }

    #[test]
    fn test_memory_store_clones_share_slots() {
        let store = MemoryKeyValueStore::new();
        let other = store.clone();

        store.set("a", b"1").unwrap();
        assert_eq!(other.get("a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(other.keys(), vec!["a".to_string()]);
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let temp_dir = TempDir::new().unwrap();

        {
            let store = FileKeyValueStore::open(temp_dir.path()).unwrap();
            store.set("storage", br#"{"version":5}"#).unwrap();
        }

        let store = FileKeyValueStore::open(temp_dir.path()).unwrap();
        assert_eq!(
            store.get("storage").unwrap(),
            Some(br#"{"version":5}"#.to_vec())
        );
        assert!(!temp_dir.path().join("storage.json.tmp").exists());
    }

    #[test]
    fn test_file_store_overwrite_replaces_contents() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::open(temp_dir.path()).unwrap();

        store.set("storage", b"a much longer first value").unwrap();
        store.set("storage", b"short").unwrap();

        let on_disk = fs::read(temp_dir.path().join("storage.json")).unwrap();
        assert_eq!(on_disk, b"short".to_vec());
        assert!(!temp_dir.path().join("storage.json.tmp").exists());
    }

    #[test]
    fn test_file_store_missing_and_delete() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::open(temp_dir.path().join("nested")).unwrap();

        assert_eq!(store.get("nothing").unwrap(), None);
        store.delete("nothing").unwrap();

        store.set("slot", b"x").unwrap();
        store.delete("slot").unwrap();
        assert_eq!(store.get("slot").unwrap(), None);
    }

    #[test]
    fn test_file_store_rejects_path_like_keys() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::open(temp_dir.path()).unwrap();

        for key in ["", "..", "../escape", "a/b", "a\\b"] {
            assert!(matches!(
                store.set(key, b"x"),
                Err(PersistenceError::InvalidKey(_))
            ));
        }
    }
}
