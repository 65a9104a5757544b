//! Persistence core for a Game of Life simulation and accounts application.
//!
//! The crate stores five record types (accounts, worlds, patterns, sessions
//! and simulation runs) behind one facade, [`LifeDb`]. Each store keeps its
//! records sorted by a case-insensitive natural key and is backed by one of
//! three interchangeable adapters:
//!
//! - in-memory, for tests and throwaway instances;
//! - snapshot files, one checksummed file per entity type;
//! - an embedded object database, write-through per mutation.
//!
//! Accounts additionally carry a secondary index so any of their three
//! identifiers (ID, national ID, email) resolves to the same record. A
//! freshly opened database seeds every empty store with fixed defaults: an
//! administrator, a guest, a demo world, a glider pattern and one baseline
//! session and run.
//!
//! ```no_run
//! use lifedb::{DataConfig, LifeDb};
//!
//! # fn main() -> lifedb::LifeResult<()> {
//! let db = LifeDb::open(DataConfig::default())?;
//! let admin = db.read_account("jv.admin@gmail.com")?;
//! assert!(admin.is_some());
//! db.close()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_panics_doc)]

pub mod account;
pub mod config;
pub mod error;
pub mod facade;
pub mod grid;
pub mod pattern;
pub mod seed;
pub mod session;
pub mod simulation;
pub mod storage;
pub mod world;

pub use account::{Account, Address, Email, NationalId, Password, Role};
pub use config::{BackendKind, DataConfig};
pub use error::{LifeError, LifeResult, StorageError, ValidationError};
pub use facade::LifeDb;
pub use grid::Grid;
pub use pattern::Pattern;
pub use session::{Session, SessionStatus};
pub use simulation::{RunStatus, SimulationRun};
pub use storage::{Record, RecordStore};
pub use world::{Placement, World};
