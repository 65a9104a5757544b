//! Storage contracts and the three interchangeable backends.
//!
//! One [`RecordStore`] trait, three implementations selected by
//! configuration:
//! - [`memory::MemoryStore`]: transient, in-process only
//! - [`snapshot::SnapshotStore`]: whole-collection file snapshots
//! - [`object_db::ObjectDbStore`]: embedded write-through object database
//!
//! The first two share the binary-searched sorted collection in
//! [`ordered::OrderedVec`]; the database backend relies on keyed lookup
//! instead and never holds a resident collection.

mod traits;

pub mod accounts;
pub mod codec;
pub mod identity;
pub mod memory;
pub mod object_db;
pub mod ordered;
pub mod snapshot;

pub use traits::{key_cmp, key_starts_with, normalize_key, Record, RecordStore};
