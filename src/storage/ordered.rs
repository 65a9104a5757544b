//! The binary-searched sorted collection.
//!
//! [`OrderedVec`] keeps records totally ordered by case-insensitive natural
//! key with no duplicates, at all times. Lookup and insertion-point
//! determination both use midpoint binary search (`(lo + hi) / 2`); mutation
//! shifts the backing vector, which is O(n) but fine at in-memory scale.
//!
//! Only the transient and snapshot backends use this type. The object
//! database queries per call and never materializes the collection.

use crate::error::StorageError;
use crate::storage::traits::{key_cmp, key_starts_with, Record};

/// A vector of records kept sorted by case-insensitive key.
#[derive(Debug, Clone, Default)]
pub struct OrderedVec<T> {
    items: Vec<T>,
}

impl<T: Record> OrderedVec<T> {
    /// Creates an empty collection.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Builds a collection from unsorted records, e.g. a loaded snapshot.
    ///
    /// # Errors
    /// Returns `Backend` when two records share a key: a snapshot that
    /// violates uniqueness was not produced by this crate and must not be
    /// repaired silently.
    pub fn from_unsorted(mut records: Vec<T>) -> Result<Self, StorageError> {
        records.sort_by(|a, b| key_cmp(a.key(), b.key()));
        for pair in records.windows(2) {
            if key_cmp(pair[0].key(), pair[1].key()).is_eq() {
                return Err(StorageError::Backend(format!(
                    "duplicate key in loaded data: {}",
                    pair[0].key()
                )));
            }
        }
        Ok(Self { items: records })
    }

    /// Binary search for `key`. `Ok` holds the matching index, `Err` the
    /// insertion point that keeps the collection sorted.
    fn locate(&self, key: &str) -> Result<usize, usize> {
        let mut lo = 0;
        let mut hi = self.items.len();
        while lo < hi {
            let mid = (lo + hi) / 2;
            match key_cmp(self.items[mid].key(), key) {
                std::cmp::Ordering::Equal => return Ok(mid),
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
            }
        }
        Err(lo)
    }

    /// Looks up a record by key. O(log n).
    #[must_use]
    pub fn find(&self, key: &str) -> Option<&T> {
        self.locate(key).ok().map(|i| &self.items[i])
    }

    /// Inserts at the computed insertion point so order is preserved.
    ///
    /// # Errors
    /// Returns `AlreadyExists` on key collision; the collection is unchanged.
    pub fn insert(&mut self, record: T) -> Result<(), StorageError> {
        match self.locate(record.key()) {
            Ok(_) => Err(StorageError::AlreadyExists(record.key().to_string())),
            Err(at) => {
                self.items.insert(at, record);
                Ok(())
            }
        }
    }

    /// Removes and returns the record with `key`.
    ///
    /// # Errors
    /// Returns `NotFound` if absent; the collection is unchanged.
    pub fn remove(&mut self, key: &str) -> Result<T, StorageError> {
        match self.locate(key) {
            Ok(at) => Ok(self.items.remove(at)),
            Err(_) => Err(StorageError::NotFound(key.to_string())),
        }
    }

    /// Copies the mutable fields of `record` onto the stored record with the
    /// same key.
    ///
    /// # Errors
    /// Returns `NotFound` if absent; the collection is unchanged.
    pub fn replace(&mut self, record: T) -> Result<(), StorageError> {
        match self.locate(record.key()) {
            Ok(at) => {
                self.items[at].absorb(record);
                Ok(())
            }
            Err(_) => Err(StorageError::NotFound(record.key().to_string())),
        }
    }

    /// All records whose key starts with `prefix`, located by binary search
    /// for the left edge of the run, then a bounded forward walk.
    #[must_use]
    pub fn prefix_range(&self, prefix: &str) -> &[T] {
        // With case-insensitive ordering every key starting with `prefix`
        // sorts at or after `prefix` itself, and the run is contiguous.
        let start = match self.locate(prefix) {
            Ok(i) | Err(i) => i,
        };
        let mut end = start;
        while end < self.items.len() && key_starts_with(self.items[end].key(), prefix) {
            end += 1;
        }
        &self.items[start..end]
    }

    /// The records in sort order.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        key: String,
        value: u32,
    }

    impl Item {
        fn new(key: &str, value: u32) -> Self {
            Self {
                key: key.to_string(),
                value,
            }
        }
    }

    impl Record for Item {
        fn key(&self) -> &str {
            &self.key
        }
        fn absorb(&mut self, other: Self) {
            self.value = other.value;
        }
    }

    fn keys(v: &OrderedVec<Item>) -> Vec<&str> {
        v.as_slice().iter().map(|i| i.key.as_str()).collect()
    }

    #[test]
    fn insert_keeps_sort_order() {
        // Scenario: keys arrive as B, A, C; listing must come back A, B, C.
        let mut v = OrderedVec::new();
        v.insert(Item::new("B", 1)).unwrap();
        v.insert(Item::new("A", 2)).unwrap();
        v.insert(Item::new("C", 3)).unwrap();
        assert_eq!(keys(&v), ["A", "B", "C"]);
    }

    #[test]
    fn duplicate_insert_fails_and_leaves_collection_unchanged() {
        let mut v = OrderedVec::new();
        v.insert(Item::new("Demo", 1)).unwrap();
        let err = v.insert(Item::new("demo", 2)).unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));
        assert_eq!(v.len(), 1);
        assert_eq!(v.find("DEMO").unwrap().value, 1);
    }

    #[test]
    fn remove_and_replace_absent_keys_fail() {
        let mut v = OrderedVec::new();
        v.insert(Item::new("A", 1)).unwrap();

        assert!(matches!(v.remove("B"), Err(StorageError::NotFound(_))));
        assert!(matches!(
            v.replace(Item::new("B", 9)),
            Err(StorageError::NotFound(_))
        ));
        assert_eq!(v.len(), 1);

        let removed = v.remove("a").unwrap();
        assert_eq!(removed.value, 1);
        assert!(v.is_empty());
    }

    #[test]
    fn replace_copies_fields_onto_stored_record() {
        let mut v = OrderedVec::new();
        v.insert(Item::new("A", 1)).unwrap();
        v.replace(Item::new("a", 42)).unwrap();
        assert_eq!(v.find("A").unwrap().value, 42);
        // The stored key keeps its original casing.
        assert_eq!(v.find("A").unwrap().key, "A");
    }

    #[test]
    fn from_unsorted_sorts_and_rejects_duplicates() {
        let v = OrderedVec::from_unsorted(vec![
            Item::new("c", 3),
            Item::new("A", 1),
            Item::new("b", 2),
        ])
        .unwrap();
        assert_eq!(keys(&v), ["A", "b", "c"]);

        let err = OrderedVec::from_unsorted(vec![Item::new("x", 1), Item::new("X", 2)]);
        assert!(err.is_err());
    }

    #[test]
    fn prefix_range_walks_the_contiguous_run() {
        let mut v = OrderedVec::new();
        for key in ["AL:1", "PLP5L:1", "PLP5L:2", "PLP5L:3", "Z:9"] {
            v.insert(Item::new(key, 0)).unwrap();
        }

        let run: Vec<&str> = v
            .prefix_range("plp5l:")
            .iter()
            .map(|i| i.key.as_str())
            .collect();
        assert_eq!(run, ["PLP5L:1", "PLP5L:2", "PLP5L:3"]);

        assert!(v.prefix_range("missing:").is_empty());
        // Whole-collection prefix at the edges.
        assert_eq!(v.prefix_range("").len(), 5);
        assert_eq!(v.prefix_range("z").len(), 1);
        assert_eq!(v.prefix_range("a").len(), 1);
    }
}
