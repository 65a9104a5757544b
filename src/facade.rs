//! The database facade.
//!
//! [`LifeDb`] composes the five record stores behind one surface: accounts
//! (with their identity index), worlds, patterns, sessions and simulation
//! runs, all backed by the adapter the configuration selects. Opening the
//! database seeds any store that starts without data, so a fresh directory
//! or a plain in-memory instance always comes up with the same defaults.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::account::Account;
use crate::config::{BackendKind, DataConfig};
use crate::error::{LifeResult, StorageError};
use crate::pattern::Pattern;
use crate::seed;
use crate::session::{self, Session};
use crate::simulation::SimulationRun;
use crate::storage::accounts::AccountDirectory;
use crate::storage::identity::IdentityIndex;
use crate::storage::memory::MemoryStore;
use crate::storage::object_db::{ObjectDb, ObjectDbStore};
use crate::storage::snapshot::SnapshotStore;
use crate::storage::{Record, RecordStore};
use crate::world::World;

/// Facade over the five stores. All methods take `&self`; interior locking
/// lives in the stores themselves.
pub struct LifeDb {
    config: DataConfig,
    accounts: AccountDirectory,
    worlds: Box<dyn RecordStore<World>>,
    patterns: Box<dyn RecordStore<Pattern>>,
    sessions: Box<dyn RecordStore<Session>>,
    simulations: Box<dyn RecordStore<SimulationRun>>,
}

fn build_store<T>(
    config: &DataConfig,
    db: Option<&Arc<ObjectDb>>,
    file: &str,
    namespace: &'static str,
) -> Result<Box<dyn RecordStore<T>>, StorageError>
where
    T: Record + Serialize + DeserializeOwned + 'static,
{
    Ok(match config.backend {
        BackendKind::Memory => Box::new(MemoryStore::new()),
        BackendKind::Snapshot => Box::new(SnapshotStore::open(config.snapshot_path(file))?),
        BackendKind::ObjectDb => {
            // `db` is always built first for this backend.
            let db = db.ok_or_else(|| {
                StorageError::Backend("object database handle missing".to_string())
            })?;
            Box::new(ObjectDbStore::new(Arc::clone(db), namespace))
        }
    })
}

impl LifeDb {
    /// Opens the database described by `config`, building every store on
    /// the selected backend and seeding those that hold no data yet.
    ///
    /// # Errors
    /// Returns a configuration error for inconsistent settings, `Corrupt`
    /// for undecodable persisted data, and `Backend` for I/O failures.
    pub fn open(config: DataConfig) -> LifeResult<Self> {
        let config = config.validate()?;
        info!(backend = ?config.backend, data_dir = %config.data_dir.display(), "opening database");

        let db = match config.backend {
            BackendKind::ObjectDb => Some(ObjectDb::open(&config.data_dir)?),
            _ => None,
        };

        let index = match config.backend {
            BackendKind::Memory => IdentityIndex::open_transient(),
            BackendKind::Snapshot => {
                IdentityIndex::open_snapshot(config.snapshot_path(&config.identity_file))?
            }
            BackendKind::ObjectDb => match &db {
                Some(db) => IdentityIndex::open_db(Arc::clone(db))?,
                None => IdentityIndex::open_transient(),
            },
        };

        let accounts = AccountDirectory::new(
            build_store(&config, db.as_ref(), &config.accounts_file, "accounts")?,
            index,
        );
        let worlds = build_store(&config, db.as_ref(), &config.worlds_file, "worlds")?;
        let patterns = build_store(&config, db.as_ref(), &config.patterns_file, "patterns")?;
        let sessions = build_store(&config, db.as_ref(), &config.sessions_file, "sessions")?;
        let simulations =
            build_store(&config, db.as_ref(), &config.simulations_file, "simulations")?;

        let this = Self {
            config,
            accounts,
            worlds,
            patterns,
            sessions,
            simulations,
        };
        this.accounts.reconcile()?;
        this.seed_missing()?;
        Ok(this)
    }

    /// Seeds every store that came up empty. Accounts go first so the
    /// baseline session and run reference an existing owner.
    fn seed_missing(&self) -> LifeResult<()> {
        if !self.accounts.has_data()? && self.accounts.list()?.is_empty() {
            debug!("seeding default accounts");
            self.accounts.insert(seed::admin_account(&self.config)?)?;
            self.accounts.insert(seed::guest_account(&self.config)?)?;
            self.accounts.flush()?;
        }
        if !self.worlds.has_data()? && self.worlds.list()?.is_empty() {
            debug!("seeding demo world");
            self.worlds.insert(seed::demo_world()?)?;
            self.worlds.flush()?;
        }
        if !self.patterns.has_data()? && self.patterns.list()?.is_empty() {
            debug!("seeding glider pattern");
            self.patterns.insert(seed::glider_pattern()?)?;
            self.patterns.flush()?;
        }
        if !self.sessions.has_data()? && self.sessions.list()?.is_empty() {
            debug!("seeding baseline session");
            self.sessions.insert(seed::baseline_session(&self.config)?)?;
            self.sessions.flush()?;
        }
        if !self.simulations.has_data()? && self.simulations.list()?.is_empty() {
            debug!("seeding baseline run");
            self.simulations.insert(seed::baseline_run(&self.config)?)?;
            self.simulations.flush()?;
        }
        Ok(())
    }

    /// The configuration the database was opened with.
    #[must_use]
    pub fn config(&self) -> &DataConfig {
        &self.config
    }

    // --- accounts ---

    /// Stores a new account.
    ///
    /// # Errors
    /// `AlreadyExists` when the ID, national ID or email is taken.
    pub fn create_account(&self, account: Account) -> LifeResult<()> {
        self.accounts.insert(account)?;
        Ok(())
    }

    /// Looks up an account by ID, national ID or email, any case.
    ///
    /// # Errors
    /// Propagates store failures; an unknown identifier is `Ok(None)`.
    pub fn read_account(&self, identifier: &str) -> LifeResult<Option<Account>> {
        Ok(self.accounts.find(identifier)?)
    }

    /// Replaces the stored account with the same ID.
    ///
    /// # Errors
    /// `NotFound` for an unknown ID, `AlreadyExists` when a changed
    /// identifier collides with another account.
    pub fn update_account(&self, account: Account) -> LifeResult<()> {
        self.accounts.replace(account)?;
        Ok(())
    }

    /// Removes an account by any identifier and returns it.
    ///
    /// # Errors
    /// `NotFound` when no account matches.
    pub fn delete_account(&self, identifier: &str) -> LifeResult<Account> {
        Ok(self.accounts.remove(identifier)?)
    }

    /// One line per account, in canonical key order.
    ///
    /// # Errors
    /// Propagates store failures.
    pub fn list_accounts(&self) -> LifeResult<String> {
        Ok(join_lines(&self.accounts.list()?))
    }

    /// Resolves any account identifier to its canonical ID.
    ///
    /// # Errors
    /// Propagates index failures.
    pub fn resolve_identifier(&self, identifier: &str) -> LifeResult<Option<String>> {
        Ok(self.accounts.resolve(identifier)?)
    }

    // --- worlds ---

    /// Stores a new world.
    ///
    /// # Errors
    /// `AlreadyExists` when the name is taken.
    pub fn create_world(&self, world: World) -> LifeResult<()> {
        self.worlds.insert(world)?;
        Ok(())
    }

    /// Looks up a world by name.
    ///
    /// # Errors
    /// Propagates store failures; an unknown name is `Ok(None)`.
    pub fn read_world(&self, name: &str) -> LifeResult<Option<World>> {
        Ok(self.worlds.find(name)?)
    }

    /// Replaces the stored world with the same name.
    ///
    /// # Errors
    /// `NotFound` for an unknown name.
    pub fn update_world(&self, world: World) -> LifeResult<()> {
        self.worlds.replace(world)?;
        Ok(())
    }

    /// Removes a world by name and returns it.
    ///
    /// # Errors
    /// `NotFound` when no world matches.
    pub fn delete_world(&self, name: &str) -> LifeResult<World> {
        Ok(self.worlds.remove(name)?)
    }

    /// One line per world, in name order.
    ///
    /// # Errors
    /// Propagates store failures.
    pub fn list_worlds(&self) -> LifeResult<String> {
        Ok(join_lines(&self.worlds.list()?))
    }

    // --- patterns ---

    /// Stores a new pattern.
    ///
    /// # Errors
    /// `AlreadyExists` when the name is taken.
    pub fn create_pattern(&self, pattern: Pattern) -> LifeResult<()> {
        self.patterns.insert(pattern)?;
        Ok(())
    }

    /// Looks up a pattern by name.
    ///
    /// # Errors
    /// Propagates store failures; an unknown name is `Ok(None)`.
    pub fn read_pattern(&self, name: &str) -> LifeResult<Option<Pattern>> {
        Ok(self.patterns.find(name)?)
    }

    /// Replaces the stored pattern with the same name.
    ///
    /// # Errors
    /// `NotFound` for an unknown name.
    pub fn update_pattern(&self, pattern: Pattern) -> LifeResult<()> {
        self.patterns.replace(pattern)?;
        Ok(())
    }

    /// Removes a pattern by name and returns it.
    ///
    /// # Errors
    /// `NotFound` when no pattern matches.
    pub fn delete_pattern(&self, name: &str) -> LifeResult<Pattern> {
        Ok(self.patterns.remove(name)?)
    }

    /// One line per pattern, in name order.
    ///
    /// # Errors
    /// Propagates store failures.
    pub fn list_patterns(&self) -> LifeResult<String> {
        Ok(join_lines(&self.patterns.list()?))
    }

    // --- sessions ---

    /// Stores a new session after checking its owner exists.
    ///
    /// # Errors
    /// `NotFound` when the owner is unknown, `AlreadyExists` when a session
    /// with the same owner and timestamp is already stored.
    pub fn create_session(&self, session: Session) -> LifeResult<()> {
        self.require_account(&session.account_id)?;
        self.sessions.insert(session)?;
        Ok(())
    }

    /// Looks up a session by its composite key.
    ///
    /// # Errors
    /// Propagates store failures; an unknown key is `Ok(None)`.
    pub fn read_session(&self, id: &str) -> LifeResult<Option<Session>> {
        Ok(self.sessions.find(id)?)
    }

    /// Replaces the stored session with the same key.
    ///
    /// # Errors
    /// `NotFound` for an unknown key.
    pub fn update_session(&self, session: Session) -> LifeResult<()> {
        self.sessions.replace(session)?;
        Ok(())
    }

    /// Removes a session by key and returns it.
    ///
    /// # Errors
    /// `NotFound` when no session matches.
    pub fn delete_session(&self, id: &str) -> LifeResult<Session> {
        Ok(self.sessions.remove(id)?)
    }

    /// One line per session, in key order.
    ///
    /// # Errors
    /// Propagates store failures.
    pub fn list_sessions(&self) -> LifeResult<String> {
        Ok(join_lines(&self.sessions.list()?))
    }

    /// All sessions owned by one account, in timestamp order. The owner may
    /// be given by any identifier.
    ///
    /// # Errors
    /// Propagates store failures; an unknown owner yields an empty list.
    pub fn sessions_of(&self, identifier: &str) -> LifeResult<Vec<Session>> {
        let owner = self.canonical_owner(identifier)?;
        Ok(self.sessions.find_prefix(&session::owner_prefix(&owner))?)
    }

    // --- simulation runs ---

    /// Stores a new run after checking its owner and world exist.
    ///
    /// # Errors
    /// `NotFound` when the owner or world is unknown, `AlreadyExists` when a
    /// run with the same owner and timestamp is already stored.
    pub fn create_simulation(&self, run: SimulationRun) -> LifeResult<()> {
        self.require_account(&run.account_id)?;
        if self.worlds.find(&run.world)?.is_none() {
            return Err(StorageError::NotFound(run.world.clone()).into());
        }
        self.simulations.insert(run)?;
        Ok(())
    }

    /// Looks up a run by its composite key.
    ///
    /// # Errors
    /// Propagates store failures; an unknown key is `Ok(None)`.
    pub fn read_simulation(&self, id: &str) -> LifeResult<Option<SimulationRun>> {
        Ok(self.simulations.find(id)?)
    }

    /// Replaces the stored run with the same key.
    ///
    /// # Errors
    /// `NotFound` for an unknown key.
    pub fn update_simulation(&self, run: SimulationRun) -> LifeResult<()> {
        self.simulations.replace(run)?;
        Ok(())
    }

    /// Removes a run by key and returns it.
    ///
    /// # Errors
    /// `NotFound` when no run matches.
    pub fn delete_simulation(&self, id: &str) -> LifeResult<SimulationRun> {
        Ok(self.simulations.remove(id)?)
    }

    /// One line per run, in key order.
    ///
    /// # Errors
    /// Propagates store failures.
    pub fn list_simulations(&self) -> LifeResult<String> {
        Ok(join_lines(&self.simulations.list()?))
    }

    /// All runs owned by one account, in timestamp order. The owner may be
    /// given by any identifier.
    ///
    /// # Errors
    /// Propagates store failures; an unknown owner yields an empty list.
    pub fn runs_of(&self, identifier: &str) -> LifeResult<Vec<SimulationRun>> {
        let owner = self.canonical_owner(identifier)?;
        Ok(self
            .simulations
            .find_prefix(&session::owner_prefix(&owner))?)
    }

    // --- lifecycle ---

    /// Persists every store without closing anything.
    ///
    /// # Errors
    /// Propagates the first persistence failure.
    pub fn flush(&self) -> LifeResult<()> {
        self.accounts.flush()?;
        self.worlds.flush()?;
        self.patterns.flush()?;
        self.sessions.flush()?;
        self.simulations.flush()?;
        Ok(())
    }

    /// Flushes and releases every store.
    ///
    /// # Errors
    /// Propagates the first persistence failure.
    pub fn close(&self) -> LifeResult<()> {
        info!("closing database");
        self.accounts.close()?;
        self.worlds.close()?;
        self.patterns.close()?;
        self.sessions.close()?;
        self.simulations.close()?;
        Ok(())
    }

    fn canonical_owner(&self, identifier: &str) -> LifeResult<String> {
        Ok(self
            .accounts
            .resolve(identifier)?
            .unwrap_or_else(|| identifier.trim().to_string()))
    }

    fn require_account(&self, identifier: &str) -> LifeResult<()> {
        if self.accounts.find(identifier)?.is_none() {
            return Err(StorageError::NotFound(identifier.to_string()).into());
        }
        Ok(())
    }
}

fn join_lines<T: std::fmt::Display>(records: &[T]) -> String {
    records
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
