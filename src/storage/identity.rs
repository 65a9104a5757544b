//! Secondary index from any account identifier to the canonical account ID.
//!
//! Every registered account contributes exactly three entries: its own ID,
//! its national ID and its email, all mapping to the canonical ID. Lookups
//! normalize the probe the same way the entries were normalized, so any of
//! the three spellings resolves regardless of case or surrounding blanks.
//!
//! Durability follows the backend of the account store it sits next to:
//! transient (nothing written), snapshot (whole map rewritten on flush) or
//! embedded database (whole map written through on every mutation).

use std::collections::HashMap;
use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use crate::account::Account;
use crate::error::StorageError;
use crate::storage::codec;
use crate::storage::object_db::ObjectDb;
use crate::storage::traits::normalize_key;

/// Database namespace holding the serialized index.
const DB_NAMESPACE: &str = "identity";
/// Key of the single index record inside that namespace.
const DB_KEY: &str = "index";

fn lock_err(context: &'static str) -> StorageError {
    StorageError::Backend(format!("poisoned lock: {context}"))
}

#[derive(Debug)]
enum Durability {
    Transient,
    Snapshot { path: PathBuf },
    Db { db: Arc<ObjectDb> },
}

/// Identifier-to-canonical-ID index for accounts.
#[derive(Debug)]
pub struct IdentityIndex {
    map: RwLock<HashMap<String, String>>,
    durability: Durability,
}

impl IdentityIndex {
    /// Builds an index with no durability. Used with the in-memory backend.
    #[must_use]
    pub fn open_transient() -> Self {
        Self {
            map: RwLock::new(HashMap::new()),
            durability: Durability::Transient,
        }
    }

    /// Loads the index from a snapshot file, starting empty when the file
    /// does not exist yet.
    ///
    /// # Errors
    /// Returns [`StorageError::Corrupt`] when the file exists but cannot be
    /// decoded, and `Backend` on other I/O failures.
    pub fn open_snapshot(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                StorageError::Backend(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        let map = if path.exists() {
            let file = fs::File::open(&path).map_err(|e| {
                StorageError::Backend(format!("cannot open {}: {e}", path.display()))
            })?;
            let map: HashMap<String, String> = codec::read_frame(&mut BufReader::new(file))
                .map_err(|e| StorageError::Corrupt {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
            debug!(path = %path.display(), entries = map.len(), "identity index loaded");
            map
        } else {
            warn!(path = %path.display(), "identity index file missing, starting empty");
            HashMap::new()
        };

        Ok(Self {
            map: RwLock::new(map),
            durability: Durability::Snapshot { path },
        })
    }

    /// Loads the index from the embedded database, starting empty when the
    /// index record is absent.
    ///
    /// # Errors
    /// Returns [`StorageError::Corrupt`] when the stored record cannot be
    /// decoded.
    pub fn open_db(db: Arc<ObjectDb>) -> Result<Self, StorageError> {
        let map: HashMap<String, String> = db.read(DB_NAMESPACE, DB_KEY)?.unwrap_or_default();
        Ok(Self {
            map: RwLock::new(map),
            durability: Durability::Db { db },
        })
    }

    /// Resolves any known identifier (ID, national ID or email, any case) to
    /// the canonical account ID.
    ///
    /// # Errors
    /// Returns `Backend` when the index lock is poisoned.
    pub fn resolve(&self, identifier: &str) -> Result<Option<String>, StorageError> {
        let map = self.map.read().map_err(|_| lock_err("identity.read"))?;
        Ok(map.get(&normalize_key(identifier)).cloned())
    }

    /// Checks that none of an account's three identifiers is already mapped
    /// to a different account. `prior` carries the stored version during an
    /// update, whose own entries do not count as conflicts.
    ///
    /// # Errors
    /// Returns [`StorageError::AlreadyExists`] naming the first conflicting
    /// identifier.
    pub fn ensure_available(
        &self,
        account: &Account,
        prior: Option<&Account>,
    ) -> Result<(), StorageError> {
        let map = self.map.read().map_err(|_| lock_err("identity.read"))?;
        let own = prior.map_or_else(|| normalize_key(&account.id), |p| normalize_key(&p.id));
        for identifier in Self::identifiers(account) {
            if let Some(owner) = map.get(&normalize_key(&identifier)) {
                if normalize_key(owner) != own {
                    return Err(StorageError::AlreadyExists(identifier));
                }
            }
        }
        Ok(())
    }

    /// Adds the three entries for a newly stored account.
    ///
    /// # Errors
    /// Returns `Backend` on lock or write-through failure.
    pub fn register(&self, account: &Account) -> Result<(), StorageError> {
        {
            let mut map = self.map.write().map_err(|_| lock_err("identity.write"))?;
            // Only the map key is normalized; the value is the ID as stored,
            // so callers get the canonical spelling back.
            for identifier in Self::identifiers(account) {
                map.insert(normalize_key(&identifier), account.id.clone());
            }
        }
        self.write_through()
    }

    /// Drops the three entries of a removed account.
    ///
    /// # Errors
    /// Returns `Backend` on lock or write-through failure.
    pub fn unregister(&self, account: &Account) -> Result<(), StorageError> {
        {
            let mut map = self.map.write().map_err(|_| lock_err("identity.write"))?;
            for identifier in Self::identifiers(account) {
                map.remove(&normalize_key(&identifier));
            }
        }
        self.write_through()
    }

    /// Repoints the entries after an update. Identifiers the update did not
    /// change stay in place; a changed national ID or email drops its old
    /// entry and gains a new one, so the account keeps exactly three.
    ///
    /// # Errors
    /// Returns `Backend` on lock or write-through failure.
    pub fn reassign(&self, prior: &Account, current: &Account) -> Result<(), StorageError> {
        {
            let mut map = self.map.write().map_err(|_| lock_err("identity.write"))?;
            for old in Self::identifiers(prior) {
                map.remove(&normalize_key(&old));
            }
            for identifier in Self::identifiers(current) {
                map.insert(normalize_key(&identifier), current.id.clone());
            }
        }
        self.write_through()
    }

    /// Replaces every entry with the ones derived from `accounts` and
    /// persists the result. Used to reconcile an index that fell out of step
    /// with its account store, e.g. a snapshot file lost between flushes.
    ///
    /// # Errors
    /// Returns `Backend` on lock or persistence failure.
    pub fn rebuild(&self, accounts: &[Account]) -> Result<(), StorageError> {
        {
            let mut map = self.map.write().map_err(|_| lock_err("identity.write"))?;
            map.clear();
            for account in accounts {
                for identifier in Self::identifiers(account) {
                    map.insert(normalize_key(&identifier), account.id.clone());
                }
            }
        }
        self.write_through()?;
        self.flush()
    }

    /// Number of entries, for diagnostics.
    ///
    /// # Errors
    /// Returns `Backend` when the index lock is poisoned.
    pub fn len(&self) -> Result<usize, StorageError> {
        let map = self.map.read().map_err(|_| lock_err("identity.read"))?;
        Ok(map.len())
    }

    /// Whether the index holds no entries.
    ///
    /// # Errors
    /// Returns `Backend` when the index lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }

    /// Persists the index according to its durability mode.
    ///
    /// # Errors
    /// Returns `Backend` when the snapshot or database write fails.
    pub fn flush(&self) -> Result<(), StorageError> {
        match &self.durability {
            Durability::Transient | Durability::Db { .. } => Ok(()),
            Durability::Snapshot { path } => {
                let map = self.map.read().map_err(|_| lock_err("identity.read"))?;
                let mut file = fs::File::create(path).map_err(|e| {
                    StorageError::Backend(format!("cannot create {}: {e}", path.display()))
                })?;
                codec::write_frame(&mut file, &*map).map_err(|e| {
                    StorageError::Backend(format!("cannot write {}: {e}", path.display()))
                })?;
                debug!(path = %path.display(), entries = map.len(), "identity index flushed");
                Ok(())
            }
        }
    }

    fn write_through(&self) -> Result<(), StorageError> {
        if let Durability::Db { db } = &self.durability {
            let map = self.map.read().map_err(|_| lock_err("identity.read"))?;
            db.write(DB_NAMESPACE, DB_KEY, &*map)?;
        }
        Ok(())
    }

    fn identifiers(account: &Account) -> [String; 3] {
        [
            account.id.clone(),
            account.national_id.as_str().to_string(),
            account.email.as_str().to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{Address, Email, NationalId, Password, Role};
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn account(id: &str, nid: &str, email: &str) -> Account {
        Account::new(
            id,
            NationalId::parse(nid).unwrap(),
            Email::parse(email).unwrap(),
            "Pepe",
            "López Pérez",
            Address::new("28000", "Mayor", "1", "Madrid", "España"),
            NaiveDate::from_ymd_opt(1990, 3, 12).unwrap(),
            NaiveDate::from_ymd_opt(2016, 6, 5).unwrap(),
            Password::new("Miau#0").unwrap(),
            Role::Normal,
        )
        .unwrap()
    }

    #[test]
    fn three_identifiers_resolve_to_canonical_id() {
        let index = IdentityIndex::open_transient();
        index.register(&account("PLP5L", "12345675L", "pepe@gmail.com")).unwrap();

        assert_eq!(index.resolve("PLP5L").unwrap().as_deref(), Some("PLP5L"));
        assert_eq!(index.resolve(" plp5l ").unwrap().as_deref(), Some("PLP5L"));
        assert_eq!(index.resolve("12345675l").unwrap().as_deref(), Some("PLP5L"));
        assert_eq!(index.resolve("PEPE@GMAIL.COM").unwrap().as_deref(), Some("PLP5L"));
        assert_eq!(index.resolve("unknown").unwrap(), None);
        assert_eq!(index.len().unwrap(), 3);
    }

    #[test]
    fn conflicting_identifiers_are_rejected() {
        let index = IdentityIndex::open_transient();
        let first = account("PLP5L", "12345675L", "pepe@gmail.com");
        index.register(&first).unwrap();

        // Same email on a different account.
        let clash = account("XX9Z", "87654321Z", "Pepe@Gmail.com");
        assert!(matches!(
            index.ensure_available(&clash, None),
            Err(StorageError::AlreadyExists(_))
        ));

        // An account's own identifiers never conflict with itself.
        let updated = account("PLP5L", "12345675L", "pepe@gmail.com");
        index.ensure_available(&updated, Some(&first)).unwrap();
    }

    #[test]
    fn reassign_keeps_exactly_three_entries() {
        let index = IdentityIndex::open_transient();
        let prior = account("PLP5L", "12345675L", "pepe@gmail.com");
        index.register(&prior).unwrap();

        let current = account("PLP5L", "12345675L", "pepe.lopez@gmail.com");
        index.reassign(&prior, &current).unwrap();

        assert_eq!(index.len().unwrap(), 3);
        assert_eq!(index.resolve("pepe@gmail.com").unwrap(), None);
        assert_eq!(
            index.resolve("pepe.lopez@gmail.com").unwrap().as_deref(),
            Some("PLP5L")
        );
        assert_eq!(index.resolve("12345675L").unwrap().as_deref(), Some("PLP5L"));
    }

    #[test]
    fn resolved_id_keeps_its_stored_case() {
        let index = IdentityIndex::open_transient();
        index.register(&account("bb1b", "12345675L", "bea@gmail.com")).unwrap();
        assert_eq!(index.resolve("BB1B").unwrap().as_deref(), Some("bb1b"));
        assert_eq!(index.resolve("bea@gmail.com").unwrap().as_deref(), Some("bb1b"));
    }

    #[test]
    fn rebuild_replaces_stale_entries() {
        let index = IdentityIndex::open_transient();
        index.register(&account("GONE", "87654321Z", "gone@gmail.com")).unwrap();

        let current = account("PLP5L", "12345675L", "pepe@gmail.com");
        index.rebuild(std::slice::from_ref(&current)).unwrap();

        assert_eq!(index.len().unwrap(), 3);
        assert_eq!(index.resolve("gone@gmail.com").unwrap(), None);
        assert_eq!(index.resolve("pepe@gmail.com").unwrap().as_deref(), Some("PLP5L"));
    }

    #[test]
    fn unregister_drops_all_entries() {
        let index = IdentityIndex::open_transient();
        let acc = account("PLP5L", "12345675L", "pepe@gmail.com");
        index.register(&acc).unwrap();
        index.unregister(&acc).unwrap();
        assert!(index.is_empty().unwrap());
    }

    #[test]
    fn snapshot_round_trip_and_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("identity.dat");

        {
            let index = IdentityIndex::open_snapshot(&path).unwrap();
            assert!(index.is_empty().unwrap());
            index.register(&account("PLP5L", "12345675L", "pepe@gmail.com")).unwrap();
            index.flush().unwrap();
        }

        let reopened = IdentityIndex::open_snapshot(&path).unwrap();
        assert_eq!(reopened.len().unwrap(), 3);
        assert_eq!(reopened.resolve("12345675L").unwrap().as_deref(), Some("PLP5L"));
    }

    #[test]
    fn corrupt_snapshot_is_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("identity.dat");
        fs::write(&path, b"not a frame").unwrap();
        assert!(matches!(
            IdentityIndex::open_snapshot(&path),
            Err(StorageError::Corrupt { .. })
        ));
    }

    #[test]
    fn db_durability_writes_through() {
        let dir = tempdir().unwrap();
        let db = ObjectDb::open(dir.path()).unwrap();
        {
            let index = IdentityIndex::open_db(Arc::clone(&db)).unwrap();
            index.register(&account("PLP5L", "12345675L", "pepe@gmail.com")).unwrap();
            // No flush: the mutation itself persisted.
        }
        let reopened = IdentityIndex::open_db(db).unwrap();
        assert_eq!(reopened.resolve("pepe@gmail.com").unwrap().as_deref(), Some("PLP5L"));
    }
}
