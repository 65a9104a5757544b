//! File-snapshot storage backend.
//!
//! The whole collection lives in memory, sorted; `flush` serializes it back
//! to a single snapshot file as one checksummed frame, overwriting the
//! previous snapshot in full. A missing file at open is the recoverable
//! "no data" state (the facade seeds and performs an initial flush); a file
//! that exists but fails checksum or decode is corruption and aborts the
//! open.
//!
//! Flushes rewrite the file in place with no atomic rename; a crash
//! mid-flush can corrupt the snapshot. That weakness is inherited from the
//! source design and accepted here.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::storage::codec;
use crate::storage::ordered::OrderedVec;
use crate::storage::traits::{Record, RecordStore};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::Backend(format!("poisoned lock: {context}"))
}

/// A store persisted as one whole-collection snapshot file.
#[derive(Debug)]
pub struct SnapshotStore<T> {
    path: PathBuf,
    had_data: bool,
    state: RwLock<OrderedVec<T>>,
}

impl<T: Record + Serialize + DeserializeOwned> SnapshotStore<T> {
    /// Opens the store, loading the snapshot at `path` if it exists.
    ///
    /// # Errors
    /// - `Corrupt` when the file exists but cannot be read back
    /// - `Backend` on other I/O failures
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| StorageError::Backend(format!("cannot create {}: {e}", parent.display())))?;
        }

        match Self::load(&path) {
            Ok(collection) => {
                debug!(path = %path.display(), records = collection.len(), "snapshot loaded");
                Ok(Self {
                    path,
                    had_data: true,
                    state: RwLock::new(collection),
                })
            }
            Err(e) if e.is_no_data() => {
                warn!(path = %path.display(), "snapshot missing, starting empty");
                Ok(Self {
                    path,
                    had_data: false,
                    state: RwLock::new(OrderedVec::new()),
                })
            }
            Err(e) => Err(e),
        }
    }

    fn load(path: &Path) -> Result<OrderedVec<T>, StorageError> {
        if !path.exists() {
            return Err(StorageError::NoData(path.to_path_buf()));
        }
        let file = File::open(path)
            .map_err(|e| StorageError::Backend(format!("cannot open {}: {e}", path.display())))?;
        let records: Vec<T> =
            codec::read_frame(&mut BufReader::new(file)).map_err(|e| StorageError::Corrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        OrderedVec::from_unsorted(records).map_err(|e| StorageError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    fn write_snapshot(&self, records: &[T]) -> Result<(), StorageError> {
        let mut file = File::create(&self.path)
            .map_err(|e| StorageError::Backend(format!("cannot create {}: {e}", self.path.display())))?;
        codec::write_frame(&mut file, &records.to_vec())
            .map_err(|e| StorageError::Backend(format!("cannot write {}: {e}", self.path.display())))
    }
}

impl<T: Record + Serialize + DeserializeOwned> RecordStore<T> for SnapshotStore<T> {
    fn find(&self, key: &str) -> Result<Option<T>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("snapshot.find"))?;
        Ok(state.find(key).cloned())
    }

    fn insert(&self, record: T) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("snapshot.insert"))?;
        state.insert(record)
    }

    fn remove(&self, key: &str) -> Result<T, StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("snapshot.remove"))?;
        state.remove(key)
    }

    fn replace(&self, record: T) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("snapshot.replace"))?;
        state.replace(record)
    }

    fn list(&self) -> Result<Vec<T>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("snapshot.list"))?;
        Ok(state.as_slice().to_vec())
    }

    fn find_prefix(&self, prefix: &str) -> Result<Vec<T>, StorageError> {
        let state = self
            .state
            .read()
            .map_err(|_| lock_err("snapshot.find_prefix"))?;
        Ok(state.prefix_range(prefix).to_vec())
    }

    fn has_data(&self) -> Result<bool, StorageError> {
        Ok(self.had_data)
    }

    fn flush(&self) -> Result<(), StorageError> {
        let state = self.state.read().map_err(|_| lock_err("snapshot.flush"))?;
        self.write_snapshot(state.as_slice())
    }

    fn close(&self) -> Result<(), StorageError> {
        self.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::tempdir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        key: String,
        value: u32,
    }

    impl Record for Item {
        fn key(&self) -> &str {
            &self.key
        }
        fn absorb(&mut self, other: Self) {
            self.value = other.value;
        }
    }

    fn item(key: &str, value: u32) -> Item {
        Item {
            key: key.to_string(),
            value,
        }
    }

    #[test]
    fn missing_file_means_no_data() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::<Item>::open(dir.path().join("items.dat")).unwrap();
        assert!(!store.has_data().unwrap());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn flush_then_reopen_reproduces_the_collection() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("items.dat");

        {
            let store = SnapshotStore::open(&path).unwrap();
            store.insert(item("B", 1)).unwrap();
            store.insert(item("A", 2)).unwrap();
            store.insert(item("C", 3)).unwrap();
            store.close().unwrap();
        }

        let store = SnapshotStore::<Item>::open(&path).unwrap();
        assert!(store.has_data().unwrap());
        let listed = store.list().unwrap();
        assert_eq!(listed, vec![item("A", 2), item("B", 1), item("C", 3)]);
    }

    #[test]
    fn corrupt_file_fails_open_instead_of_seeding() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("items.dat");

        {
            let store = SnapshotStore::open(&path).unwrap();
            store.insert(item("A", 1)).unwrap();
            store.close().unwrap();
        }

        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        fs::write(&path, bytes).unwrap();

        let err = SnapshotStore::<Item>::open(&path).unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { .. }));
    }

    #[test]
    fn flush_is_a_full_rewrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("items.dat");

        {
            let store = SnapshotStore::open(&path).unwrap();
            store.insert(item("A", 1)).unwrap();
            store.insert(item("B", 2)).unwrap();
            store.flush().unwrap();
            store.remove("A").unwrap();
            store.flush().unwrap();
        }

        let store = SnapshotStore::<Item>::open(&path).unwrap();
        assert_eq!(store.list().unwrap(), vec![item("B", 2)]);
    }
}
