//! Transient in-memory storage backend.
//!
//! Used for ephemeral and demo runs, and as the reference implementation in
//! tests. Nothing survives the process: `flush` and `close` are no-ops and
//! the backend always reports "no data" at open, so the facade seeds it.

use std::sync::RwLock;

use crate::error::StorageError;
use crate::storage::ordered::OrderedVec;
use crate::storage::traits::{Record, RecordStore};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::Backend(format!("poisoned lock: {context}"))
}

/// Thread-safe transient store over a sorted collection.
#[derive(Debug, Default)]
pub struct MemoryStore<T> {
    state: RwLock<OrderedVec<T>>,
}

impl<T: Record> MemoryStore<T> {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(OrderedVec::new()),
        }
    }
}

impl<T: Record> RecordStore<T> for MemoryStore<T> {
    fn find(&self, key: &str) -> Result<Option<T>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("memory.find"))?;
        Ok(state.find(key).cloned())
    }

    fn insert(&self, record: T) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("memory.insert"))?;
        state.insert(record)
    }

    fn remove(&self, key: &str) -> Result<T, StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("memory.remove"))?;
        state.remove(key)
    }

    fn replace(&self, record: T) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("memory.replace"))?;
        state.replace(record)
    }

    fn list(&self) -> Result<Vec<T>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("memory.list"))?;
        Ok(state.as_slice().to_vec())
    }

    fn find_prefix(&self, prefix: &str) -> Result<Vec<T>, StorageError> {
        let state = self
            .state
            .read()
            .map_err(|_| lock_err("memory.find_prefix"))?;
        Ok(state.prefix_range(prefix).to_vec())
    }

    fn has_data(&self) -> Result<bool, StorageError> {
        // Transient stores never come up with persisted data.
        Ok(false)
    }

    fn flush(&self) -> Result<(), StorageError> {
        Ok(())
    }

    fn close(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
