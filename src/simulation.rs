//! Simulation runs.
//!
//! A run references its owning account and the world it executes over. Its
//! key is generated the same way as a session key: owner plus creation
//! timestamp.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::session::compose_key;
use crate::storage::Record;

/// Lifecycle of a simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Configured but not started.
    Prepared,
    /// Executing.
    Running,
    /// Completed.
    Finished,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prepared => write!(f, "prepared"),
            Self::Running => write!(f, "running"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

/// One simulation run. The natural key is the generated `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationRun {
    /// Generated composite key.
    id: String,
    /// Owning account ID.
    pub account_id: String,
    /// Name of the world the run executes over.
    pub world: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Current lifecycle state.
    pub status: RunStatus,
}

impl SimulationRun {
    /// Builds a run and generates its key from owner and timestamp.
    ///
    /// # Errors
    /// Returns [`ValidationError::EmptyKey`] when `account_id` or `world` is blank.
    pub fn new(
        account_id: &str,
        world: &str,
        created_at: DateTime<Utc>,
        status: RunStatus,
    ) -> Result<Self, ValidationError> {
        let id = compose_key(account_id, created_at)?;
        let world = world.trim();
        if world.is_empty() {
            return Err(ValidationError::EmptyKey { field: "world" });
        }
        Ok(Self {
            id,
            account_id: account_id.trim().to_string(),
            world: world.to_string(),
            created_at,
            status,
        })
    }

    /// The generated composite key.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Record for SimulationRun {
    fn key(&self) -> &str {
        &self.id
    }

    fn absorb(&mut self, other: Self) {
        self.world = other.world;
        self.status = other.status;
    }
}

impl fmt::Display for SimulationRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SimulationRun [id={}, account={}, world={}, created={}, status={}]",
            self.id,
            self.account_id,
            self.world,
            self.created_at.format("%Y-%m-%d %H:%M:%S"),
            self.status
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn key_matches_session_key_layout() {
        let at = Utc.with_ymd_and_hms(2016, 6, 5, 12, 0, 0).unwrap();
        let r = SimulationRun::new("PLP5L", "Demo0", at, RunStatus::Prepared).unwrap();
        assert_eq!(r.id(), "PLP5L:20160605120000");
    }

    #[test]
    fn blank_world_is_rejected() {
        assert!(SimulationRun::new("PLP5L", " ", Utc::now(), RunStatus::Prepared).is_err());
    }

    #[test]
    fn absorb_copies_world_and_status() {
        let at = Utc.with_ymd_and_hms(2016, 6, 5, 12, 0, 0).unwrap();
        let mut r = SimulationRun::new("PLP5L", "Demo0", at, RunStatus::Prepared).unwrap();
        let done = SimulationRun::new("PLP5L", "Demo1", at, RunStatus::Finished).unwrap();
        r.absorb(done);
        assert_eq!(r.world, "Demo1");
        assert_eq!(r.status, RunStatus::Finished);
        assert_eq!(r.id(), "PLP5L:20160605120000");
    }
}
