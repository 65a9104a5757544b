//! Embedded object database backend.
//!
//! Unlike the snapshot backend there is no resident collection: every
//! `insert`/`remove`/`replace` is written through to disk immediately, and
//! every `find` issues a keyed lookup against the database files. The sort
//! invariant therefore lives only in `list`, which orders results on the way
//! out; the database itself guarantees a unique match per key, not an order.
//!
//! Layout: one directory per entity namespace, one checksummed record file
//! per key. File names are the blake3 hash of the normalized key, which
//! keeps arbitrary key text (emails, composite IDs) filesystem-safe while
//! preserving case-insensitive identity.

use std::fs;
use std::io::BufReader;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::StorageError;
use crate::storage::codec;
use crate::storage::traits::{key_cmp, key_starts_with, normalize_key, Record, RecordStore};

/// Extension of record files inside a namespace directory.
const RECORD_EXT: &str = "rec";

/// Handle to one embedded database directory, shared by every store backed
/// by it.
#[derive(Debug)]
pub struct ObjectDb {
    root: PathBuf,
    // One writer at a time across all namespaces; check-then-write sequences
    // (insert, replace) must not interleave.
    write_lock: Mutex<()>,
}

impl ObjectDb {
    /// Opens (creating if needed) the database directory.
    ///
    /// # Errors
    /// Returns `Backend` when the directory cannot be created.
    pub fn open(root: impl AsRef<Path>) -> Result<Arc<Self>, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .map_err(|e| StorageError::Backend(format!("cannot create {}: {e}", root.display())))?;
        debug!(root = %root.display(), "object database opened");
        Ok(Arc::new(Self {
            root,
            write_lock: Mutex::new(()),
        }))
    }

    fn guard(&self) -> Result<MutexGuard<'_, ()>, StorageError> {
        self.write_lock
            .lock()
            .map_err(|_| StorageError::Backend("poisoned lock: object_db.write".to_string()))
    }

    fn namespace_dir(&self, namespace: &str) -> PathBuf {
        self.root.join(namespace)
    }

    fn record_path(&self, namespace: &str, key: &str) -> PathBuf {
        let digest = blake3::hash(normalize_key(key).as_bytes());
        self.namespace_dir(namespace)
            .join(format!("{}.{RECORD_EXT}", digest.to_hex()))
    }

    fn read_path<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
        if !path.exists() {
            return Ok(None);
        }
        let file = fs::File::open(path)
            .map_err(|e| StorageError::Backend(format!("cannot open {}: {e}", path.display())))?;
        let value = codec::read_frame(&mut BufReader::new(file)).map_err(|e| StorageError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Some(value))
    }

    pub(crate) fn read<T: DeserializeOwned>(
        &self,
        namespace: &str,
        key: &str,
    ) -> Result<Option<T>, StorageError> {
        Self::read_path(&self.record_path(namespace, key))
    }

    pub(crate) fn write<T: Serialize>(
        &self,
        namespace: &str,
        key: &str,
        value: &T,
    ) -> Result<(), StorageError> {
        let dir = self.namespace_dir(namespace);
        fs::create_dir_all(&dir)
            .map_err(|e| StorageError::Backend(format!("cannot create {}: {e}", dir.display())))?;
        let path = self.record_path(namespace, key);
        let mut file = fs::File::create(&path)
            .map_err(|e| StorageError::Backend(format!("cannot create {}: {e}", path.display())))?;
        codec::write_frame(&mut file, value)
            .map_err(|e| StorageError::Backend(format!("cannot write {}: {e}", path.display())))
    }

    pub(crate) fn delete(&self, namespace: &str, key: &str) -> Result<(), StorageError> {
        let path = self.record_path(namespace, key);
        fs::remove_file(&path)
            .map_err(|e| StorageError::Backend(format!("cannot delete {}: {e}", path.display())))
    }

    /// Decodes every record in a namespace, in directory order.
    pub(crate) fn scan<T: DeserializeOwned>(&self, namespace: &str) -> Result<Vec<T>, StorageError> {
        let dir = self.namespace_dir(namespace);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&dir)
            .map_err(|e| StorageError::Backend(format!("cannot read {}: {e}", dir.display())))?;

        let mut records = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|e| StorageError::Backend(format!("cannot read {}: {e}", dir.display())))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXT) {
                continue;
            }
            if let Some(record) = Self::read_path(&path)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    pub(crate) fn namespace_has_records(&self, namespace: &str) -> Result<bool, StorageError> {
        let dir = self.namespace_dir(namespace);
        if !dir.exists() {
            return Ok(false);
        }
        let mut entries = fs::read_dir(&dir)
            .map_err(|e| StorageError::Backend(format!("cannot read {}: {e}", dir.display())))?;
        Ok(entries.any(|e| {
            e.is_ok_and(|e| e.path().extension().and_then(|x| x.to_str()) == Some(RECORD_EXT))
        }))
    }
}

/// One entity store inside an [`ObjectDb`].
#[derive(Debug)]
pub struct ObjectDbStore<T> {
    db: Arc<ObjectDb>,
    namespace: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ObjectDbStore<T> {
    /// Binds a store to a namespace of the shared database.
    #[must_use]
    pub fn new(db: Arc<ObjectDb>, namespace: &'static str) -> Self {
        Self {
            db,
            namespace,
            _marker: PhantomData,
        }
    }
}

impl<T: Record + Serialize + DeserializeOwned> RecordStore<T> for ObjectDbStore<T> {
    fn find(&self, key: &str) -> Result<Option<T>, StorageError> {
        self.db.read(self.namespace, key)
    }

    fn insert(&self, record: T) -> Result<(), StorageError> {
        let _guard = self.db.guard()?;
        if self.db.read::<T>(self.namespace, record.key())?.is_some() {
            return Err(StorageError::AlreadyExists(record.key().to_string()));
        }
        self.db.write(self.namespace, record.key(), &record)
    }

    fn remove(&self, key: &str) -> Result<T, StorageError> {
        let _guard = self.db.guard()?;
        let record: T = self
            .db
            .read(self.namespace, key)?
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        self.db.delete(self.namespace, key)?;
        Ok(record)
    }

    fn replace(&self, record: T) -> Result<(), StorageError> {
        let _guard = self.db.guard()?;
        let mut stored: T = self
            .db
            .read(self.namespace, record.key())?
            .ok_or_else(|| StorageError::NotFound(record.key().to_string()))?;
        stored.absorb(record);
        self.db.write(self.namespace, stored.key(), &stored)
    }

    fn list(&self) -> Result<Vec<T>, StorageError> {
        let mut records: Vec<T> = self.db.scan(self.namespace)?;
        records.sort_by(|a, b| key_cmp(a.key(), b.key()));
        Ok(records)
    }

    fn find_prefix(&self, prefix: &str) -> Result<Vec<T>, StorageError> {
        let mut records = self.list()?;
        records.retain(|r| key_starts_with(r.key(), prefix));
        Ok(records)
    }

    fn has_data(&self) -> Result<bool, StorageError> {
        self.db.namespace_has_records(self.namespace)
    }

    fn flush(&self) -> Result<(), StorageError> {
        // Every mutation is already written through.
        Ok(())
    }

    fn close(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
