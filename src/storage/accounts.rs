//! Account store composed with the identity index.
//!
//! Every mutation of the underlying account store is mirrored into the
//! [`IdentityIndex`], and lookups accept any of the three identifiers. The
//! fallible uniqueness check runs before the store is touched, so a rejected
//! insert or update leaves both structures unchanged.

use tracing::warn;

use crate::account::Account;
use crate::error::StorageError;
use crate::storage::identity::IdentityIndex;
use crate::storage::traits::RecordStore;

/// Accounts plus their identifier index, kept in step.
pub struct AccountDirectory {
    store: Box<dyn RecordStore<Account>>,
    index: IdentityIndex,
}

impl AccountDirectory {
    /// Pairs an account store with its index. The two are expected to share
    /// a durability mode; the caller builds them from the same backend.
    #[must_use]
    pub fn new(store: Box<dyn RecordStore<Account>>, index: IdentityIndex) -> Self {
        Self { store, index }
    }

    /// Rebuilds the index from the stored accounts when the two disagree.
    /// Every live account owns exactly three entries, so any other count
    /// means the index was lost or truncated, e.g. a crash between the
    /// account flush and the index flush, or a deleted index file.
    ///
    /// # Errors
    /// Propagates store and index failures.
    pub fn reconcile(&self) -> Result<(), StorageError> {
        let accounts = self.store.list()?;
        if self.index.len()? != accounts.len() * 3 {
            warn!(accounts = accounts.len(), "identity index out of step, rebuilding");
            self.index.rebuild(&accounts)?;
        }
        Ok(())
    }

    /// Resolves an identifier (ID, national ID or email) to the canonical
    /// account ID, when known.
    ///
    /// # Errors
    /// Propagates index access failures.
    pub fn resolve(&self, identifier: &str) -> Result<Option<String>, StorageError> {
        self.index.resolve(identifier)
    }

    /// Looks up an account by any of its identifiers. An identifier unknown
    /// to the index is retried as a literal account ID, which covers a store
    /// populated before its index existed.
    ///
    /// # Errors
    /// Propagates store and index failures.
    pub fn find(&self, identifier: &str) -> Result<Option<Account>, StorageError> {
        match self.index.resolve(identifier)? {
            Some(id) => self.store.find(&id),
            None => self.store.find(identifier),
        }
    }

    /// Stores a new account and registers its identifiers.
    ///
    /// # Errors
    /// Returns [`StorageError::AlreadyExists`] when the ID or either
    /// alternate identifier is already taken.
    pub fn insert(&self, account: Account) -> Result<(), StorageError> {
        self.index.ensure_available(&account, None)?;
        self.store.insert(account.clone())?;
        self.index.register(&account)
    }

    /// Removes an account found by any identifier, dropping its index
    /// entries, and returns the removed record.
    ///
    /// # Errors
    /// Returns [`StorageError::NotFound`] when no account matches.
    pub fn remove(&self, identifier: &str) -> Result<Account, StorageError> {
        let id = self
            .index
            .resolve(identifier)?
            .unwrap_or_else(|| identifier.to_string());
        let removed = self.store.remove(&id)?;
        self.index.unregister(&removed)?;
        Ok(removed)
    }

    /// Replaces the stored account with the same ID, repointing index
    /// entries for any identifier the update changed.
    ///
    /// # Errors
    /// Returns [`StorageError::NotFound`] when the ID is unknown, and
    /// [`StorageError::AlreadyExists`] when a changed identifier collides
    /// with another account.
    pub fn replace(&self, account: Account) -> Result<(), StorageError> {
        let prior = self
            .store
            .find(&account.id)?
            .ok_or_else(|| StorageError::NotFound(account.id.clone()))?;
        self.index.ensure_available(&account, Some(&prior))?;
        self.store.replace(account.clone())?;
        self.index.reassign(&prior, &account)
    }

    /// All accounts in canonical key order.
    ///
    /// # Errors
    /// Propagates store failures.
    pub fn list(&self) -> Result<Vec<Account>, StorageError> {
        self.store.list()
    }

    /// Whether the underlying store already held data when opened.
    ///
    /// # Errors
    /// Propagates store failures.
    pub fn has_data(&self) -> Result<bool, StorageError> {
        self.store.has_data()
    }

    /// Persists both the store and the index.
    ///
    /// # Errors
    /// Propagates the first persistence failure.
    pub fn flush(&self) -> Result<(), StorageError> {
        self.store.flush()?;
        self.index.flush()
    }

    /// Flushes and releases both structures.
    ///
    /// # Errors
    /// Propagates the first persistence failure.
    pub fn close(&self) -> Result<(), StorageError> {
        self.store.close()?;
        self.index.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{Address, Email, NationalId, Password, Role};
    use crate::storage::memory::MemoryStore;
    use chrono::NaiveDate;

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

    fn directory() -> AccountDirectory {
        AccountDirectory::new(
            Box::new(MemoryStore::new()),
            IdentityIndex::open_transient(),
        )
    }

    #[test]
    fn find_by_any_identifier() {
        let dir = directory();
        dir.insert(account("PLP5L", "12345675L", "pepe@gmail.com")).unwrap();

        for probe in ["PLP5L", "plp5l", "12345675L", "PEPE@GMAIL.COM"] {
            let found = dir.find(probe).unwrap().unwrap();
            assert_eq!(found.id, "PLP5L");
        }
        assert!(dir.find("nobody@gmail.com").unwrap().is_none());
    }

    #[test]
    fn duplicate_alternate_identifier_rejected_without_side_effects() {
        let dir = directory();
        dir.insert(account("PLP5L", "12345675L", "pepe@gmail.com")).unwrap();

        // Different ID and national ID, same email.
        let clash = account("MM1Z", "87654321Z", "pepe@gmail.com");
        assert!(matches!(
            dir.insert(clash),
            Err(StorageError::AlreadyExists(_))
        ));

        // Neither store nor index picked anything up.
        assert_eq!(dir.list().unwrap().len(), 1);
        assert_eq!(dir.resolve("87654321Z").unwrap(), None);
    }

    #[test]
    fn replace_repoints_changed_identifiers() {
        let dir = directory();
        dir.insert(account("PLP5L", "12345675L", "pepe@gmail.com")).unwrap();

        dir.replace(account("PLP5L", "12345675L", "pepe.lopez@gmail.com")).unwrap();

        assert!(dir.find("pepe@gmail.com").unwrap().is_none());
        let found = dir.find("pepe.lopez@gmail.com").unwrap().unwrap();
        assert_eq!(found.id, "PLP5L");
    }

    #[test]
    fn replace_cannot_steal_another_accounts_identifier() {
        let dir = directory();
        dir.insert(account("PLP5L", "12345675L", "pepe@gmail.com")).unwrap();
        dir.insert(account("MM1Z", "87654321Z", "maria@gmail.com")).unwrap();

        let theft = account("MM1Z", "87654321Z", "pepe@gmail.com");
        assert!(matches!(
            dir.replace(theft),
            Err(StorageError::AlreadyExists(_))
        ));

        // Unchanged on failure.
        assert_eq!(dir.find("maria@gmail.com").unwrap().unwrap().id, "MM1Z");
    }

    #[test]
    fn reconcile_rebuilds_a_lost_index() {
        let store = MemoryStore::new();
        store.insert(account("PLP5L", "12345675L", "pepe@gmail.com")).unwrap();
        let dir = AccountDirectory::new(Box::new(store), IdentityIndex::open_transient());

        // The index never saw the stored account.
        assert_eq!(dir.resolve("pepe@gmail.com").unwrap(), None);

        dir.reconcile().unwrap();
        assert_eq!(dir.resolve("pepe@gmail.com").unwrap().as_deref(), Some("PLP5L"));
        assert_eq!(dir.resolve("12345675L").unwrap().as_deref(), Some("PLP5L"));

        // Already consistent: reconcile changes nothing.
        dir.reconcile().unwrap();
        assert_eq!(dir.find("PLP5L").unwrap().unwrap().id, "PLP5L");
    }

    #[test]
    fn resolve_returns_the_id_as_stored() {
        let dir = directory();
        dir.insert(account("bb1b", "87654321Z", "bea@gmail.com")).unwrap();

        for probe in ["BB1B", "bb1b", "BEA@GMAIL.COM", "87654321z"] {
            assert_eq!(dir.resolve(probe).unwrap().as_deref(), Some("bb1b"));
        }
    }

    #[test]
    fn remove_by_alternate_identifier_clears_index() {
        let dir = directory();
        dir.insert(account("PLP5L", "12345675L", "pepe@gmail.com")).unwrap();

        let removed = dir.remove("12345675l").unwrap();
        assert_eq!(removed.id, "PLP5L");
        assert!(dir.find("PLP5L").unwrap().is_none());
        assert_eq!(dir.resolve("pepe@gmail.com").unwrap(), None);
        assert!(matches!(
            dir.remove("PLP5L"),
            Err(StorageError::NotFound(_))
        ));
    }
}
