//! Abstract storage traits.
//!
//! These define the contract every storage backend must implement. Using a
//! trait lets the facade swap the transient, snapshot and object-database
//! adapters without the caller noticing.

use std::cmp::Ordering;

use crate::error::StorageError;

/// A record with a natural string key.
///
/// Keys are compared case-insensitively and must stay stable for the life of
/// the record: [`Record::absorb`] copies every mutable field from another
/// record while leaving the key untouched, which is exactly the `replace`
/// semantics stores need.
pub trait Record: Clone + Send + Sync {
    /// The natural key.
    fn key(&self) -> &str;

    /// Copies all mutable fields from `other` onto `self`, never the key.
    fn absorb(&mut self, other: Self);
}

/// Case-insensitive lexicographic key comparison.
///
/// This single definition governs lookups, insertion points and listing
/// order across every store.
#[must_use]
pub fn key_cmp(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

/// Case-insensitive prefix test consistent with [`key_cmp`].
#[must_use]
pub fn key_starts_with(key: &str, prefix: &str) -> bool {
    let mut key_chars = key.chars().flat_map(char::to_lowercase);
    prefix
        .chars()
        .flat_map(char::to_lowercase)
        .all(|p| key_chars.next() == Some(p))
}

/// Normalized form used as a map key by the identity index.
#[must_use]
pub fn normalize_key(s: &str) -> String {
    s.trim().to_uppercase()
}

/// Storage contract shared by all three persistence adapters.
///
/// Implementations are safe for shared use across threads; each store guards
/// its state with one lock held for the duration of a search-and-mutate
/// sequence.
pub trait RecordStore<T: Record>: Send + Sync {
    /// Look up a record by natural key.
    fn find(&self, key: &str) -> Result<Option<T>, StorageError>;

    /// Insert a new record. Fails with `AlreadyExists` on key collision.
    fn insert(&self, record: T) -> Result<(), StorageError>;

    /// Remove a record by key, returning it. Fails with `NotFound` if absent.
    fn remove(&self, key: &str) -> Result<T, StorageError>;

    /// Copy the mutable fields of `record` onto the stored record with the
    /// same key. Fails with `NotFound` if absent.
    fn replace(&self, record: T) -> Result<(), StorageError>;

    /// Snapshot listing of all records in key order. Non-destructive.
    fn list(&self) -> Result<Vec<T>, StorageError>;

    /// All records whose key starts with `prefix` (case-insensitive), in key
    /// order.
    fn find_prefix(&self, prefix: &str) -> Result<Vec<T>, StorageError>;

    /// True once the backend holds any persisted record. Fresh backends
    /// (missing snapshot file, empty database namespace) report false, which
    /// is the facade's cue to seed baseline data.
    fn has_data(&self) -> Result<bool, StorageError>;

    /// Persist the current collection. No-op for transient and write-through
    /// backends.
    fn flush(&self) -> Result<(), StorageError>;

    /// Final flush at shutdown.
    fn close(&self) -> Result<(), StorageError>;

    /// Convenience overload: extract the key from `record` and forward to
    /// [`RecordStore::find`].
    fn find_record(&self, record: &T) -> Result<Option<T>, StorageError> {
        self.find(record.key())
    }
}
