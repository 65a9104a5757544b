//! Login sessions.
//!
//! A session's key is generated, never supplied: the owning account ID plus
//! the creation timestamp, joined with `:`. The delimiter keeps prefix scans
//! for "all sessions of one account" unambiguous even when one account ID is
//! a prefix of another.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::storage::Record;

/// Timestamp layout used inside composite keys.
pub const KEY_STAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Builds the composite key `account_id:timestamp` shared by sessions and
/// simulation runs.
///
/// # Errors
/// Returns [`ValidationError::EmptyKey`] when `account_id` is blank.
pub fn compose_key(account_id: &str, at: DateTime<Utc>) -> Result<String, ValidationError> {
    let account_id = account_id.trim();
    if account_id.is_empty() {
        return Err(ValidationError::EmptyKey { field: "account_id" });
    }
    Ok(format!("{account_id}:{}", at.format(KEY_STAMP_FORMAT)))
}

/// Key prefix selecting every session or run owned by `account_id`.
#[must_use]
pub fn owner_prefix(account_id: &str) -> String {
    format!("{}:", account_id.trim())
}

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Created, credentials not yet verified.
    InPreparation,
    /// Logged in.
    Active,
    /// Logged out.
    Closed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InPreparation => write!(f, "in_preparation"),
            Self::Active => write!(f, "active"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// A login session. The natural key is the generated `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Generated composite key.
    id: String,
    /// Owning account ID.
    pub account_id: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Current lifecycle state.
    pub status: SessionStatus,
}

impl Session {
    /// Builds a session and generates its key from owner and timestamp.
    ///
    /// # Errors
    /// Returns [`ValidationError::EmptyKey`] when `account_id` is blank.
    pub fn new(
        account_id: &str,
        created_at: DateTime<Utc>,
        status: SessionStatus,
    ) -> Result<Self, ValidationError> {
        let id = compose_key(account_id, created_at)?;
        Ok(Self {
            id,
            account_id: account_id.trim().to_string(),
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

impl Record for Session {
    fn key(&self) -> &str {
        &self.id
    }

    fn absorb(&mut self, other: Self) {
        self.status = other.status;
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Session [id={}, account={}, created={}, status={}]",
            self.id,
            self.account_id,
            self.created_at.format("%Y-%m-%d %H:%M:%S"),
            self.status
        )
    }
}
