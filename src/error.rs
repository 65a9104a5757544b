//! Error types for lifedb.
//!
//! All errors are strongly typed using thiserror. This enables pattern
//! matching on specific error conditions and provides clear error messages.

use std::path::PathBuf;

use thiserror::Error;

/// Validation errors that occur while constructing entity records.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A national ID did not match the expected format.
    #[error("Invalid national ID: '{text}'")]
    InvalidNationalId {
        /// The rejected text.
        text: String,
    },

    /// An email address did not match the expected format.
    #[error("Invalid email address: '{text}'")]
    InvalidEmail {
        /// The rejected text.
        text: String,
    },

    /// A password did not satisfy the accepted format.
    #[error("Password does not satisfy the accepted format")]
    InvalidPassword,

    /// A natural key was empty or whitespace-only.
    #[error("Field '{field}' must not be empty")]
    EmptyKey {
        /// The offending field name.
        field: &'static str,
    },

    /// A grid was requested with a degenerate or inconsistent shape.
    #[error("Invalid grid shape: {rows}x{cols}")]
    InvalidGridShape {
        /// Requested row count.
        rows: usize,
        /// Requested column count.
        cols: usize,
    },

    /// A pattern placement does not fit inside the target grid.
    #[error("Pattern '{pattern}' does not fit at ({row}, {col})")]
    PlacementOutOfBounds {
        /// Name of the pattern being placed.
        pattern: String,
        /// Requested row.
        row: usize,
        /// Requested column.
        col: usize,
    },
}

/// Errors raised by storage backends and the stores built on them.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Insert collided with an existing natural key.
    #[error("Record already exists: {0}")]
    AlreadyExists(String),

    /// The requested natural key is not stored.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// The snapshot file does not exist yet. Recoverable: the caller seeds
    /// baseline data and performs an initial flush.
    #[error("No data available at {}", .0.display())]
    NoData(PathBuf),

    /// A persisted file exists but failed checksum or decode. Fatal; never
    /// treated as "empty".
    #[error("Corrupt data in {}: {reason}", .path.display())]
    Corrupt {
        /// The unreadable file.
        path: PathBuf,
        /// What failed while reading it.
        reason: String,
    },

    /// Backend failure (I/O, poisoned lock).
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StorageError {
    /// True for the "missing snapshot" signal that triggers seeding.
    #[must_use]
    pub const fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData(_))
    }
}

/// Top-level error type for lifedb.
#[derive(Debug, Error)]
pub enum LifeError {
    /// Entity validation failed.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Storage operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration could not be loaded or is inconsistent.
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description.
        message: String,
    },
}

impl LifeError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if the caller can recover by changing its request or by
    /// seeding baseline data. Corrupt files and backend failures are not
    /// recoverable.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::Validation(_) => true,
            Self::Storage(e) => matches!(
                e,
                StorageError::AlreadyExists(_)
                    | StorageError::NotFound(_)
                    | StorageError::NoData(_)
            ),
            Self::Config { .. } => false,
        }
    }
}

/// Result type alias for lifedb operations.
pub type LifeResult<T> = Result<T, LifeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_messages() {
        let err = ValidationError::InvalidNationalId {
            text: "99X".to_string(),
        };
        assert!(err.to_string().contains("99X"));

        let err = ValidationError::EmptyKey { field: "name" };
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn storage_error_no_data_flag() {
        let err = StorageError::NoData(PathBuf::from("/tmp/accounts.dat"));
        assert!(err.is_no_data());
        assert!(err.to_string().contains("accounts.dat"));

        let err = StorageError::Corrupt {
            path: PathBuf::from("/tmp/worlds.dat"),
            reason: "CRC mismatch".to_string(),
        };
        assert!(!err.is_no_data());
        assert!(err.to_string().contains("CRC mismatch"));
    }

    #[test]
    fn life_error_recoverability() {
        let err: LifeError = StorageError::AlreadyExists("AA0A".to_string()).into();
        assert!(err.is_recoverable());

        let err: LifeError = StorageError::Corrupt {
            path: PathBuf::from("x"),
            reason: "bad".to_string(),
        }
        .into();
        assert!(!err.is_recoverable());

        let err: LifeError = ValidationError::InvalidPassword.into();
        assert!(err.is_validation());
        assert!(err.is_recoverable());

        let err = LifeError::config("missing data dir");
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("missing data dir"));
    }
}
