//! Configuration for store construction.
//!
//! The core only requires that these values resolve before any store is
//! built; the console layer reads the same file for its own settings (login
//! attempt limit, default identifiers).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LifeError, LifeResult};

/// Which persistence adapter backs every store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// In-process only; flush and close are no-ops.
    #[default]
    Memory,
    /// Whole-collection snapshot file per entity type.
    Snapshot,
    /// Embedded object database, write-through per mutation.
    ObjectDb,
}

/// Configuration consumed by [`crate::LifeDb::open`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Selected persistence adapter.
    pub backend: BackendKind,
    /// Directory holding snapshot files or the object database.
    pub data_dir: PathBuf,
    /// Snapshot file name for accounts.
    pub accounts_file: String,
    /// Snapshot file name for the identity index.
    pub identity_file: String,
    /// Snapshot file name for worlds.
    pub worlds_file: String,
    /// Snapshot file name for patterns.
    pub patterns_file: String,
    /// Snapshot file name for sessions.
    pub sessions_file: String,
    /// Snapshot file name for simulation runs.
    pub simulations_file: String,
    /// Canonical ID of the seeded administrator account.
    pub admin_id: String,
    /// Canonical ID of the seeded guest account.
    pub guest_id: String,
    /// Plain-text default password for seeded accounts.
    pub default_password: String,
    /// Console login attempt limit (consumed by the session controller).
    pub login_attempt_limit: u32,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Memory,
            data_dir: PathBuf::from("data"),
            accounts_file: "accounts.dat".to_string(),
            identity_file: "identity.dat".to_string(),
            worlds_file: "worlds.dat".to_string(),
            patterns_file: "patterns.dat".to_string(),
            sessions_file: "sessions.dat".to_string(),
            simulations_file: "simulations.dat".to_string(),
            admin_id: "AA0A".to_string(),
            guest_id: "GG0I".to_string(),
            default_password: "Miau#0".to_string(),
            login_attempt_limit: 3,
        }
    }
}

impl DataConfig {
    /// Loads configuration from a JSON file. Absent fields take defaults.
    ///
    /// # Errors
    /// Returns a configuration error when the file cannot be read or parsed,
    /// or when the resulting values are inconsistent.
    pub fn from_file(path: impl AsRef<Path>) -> LifeResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| LifeError::config(format!("cannot read {}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| LifeError::config(format!("cannot parse {}: {e}", path.display())))?;
        config.validate()
    }

    /// Checks internal consistency and returns the validated configuration.
    ///
    /// # Errors
    /// Returns a configuration error for blank identifiers or file names, a
    /// zero attempt limit, or an invalid default password.
    pub fn validate(self) -> LifeResult<Self> {
        for (field, value) in [
            ("accounts_file", &self.accounts_file),
            ("identity_file", &self.identity_file),
            ("worlds_file", &self.worlds_file),
            ("patterns_file", &self.patterns_file),
            ("sessions_file", &self.sessions_file),
            ("simulations_file", &self.simulations_file),
            ("admin_id", &self.admin_id),
            ("guest_id", &self.guest_id),
        ] {
            if value.trim().is_empty() {
                return Err(LifeError::config(format!("{field} must not be empty")));
            }
        }

        if self
            .admin_id
            .trim()
            .eq_ignore_ascii_case(self.guest_id.trim())
        {
            return Err(LifeError::config("admin_id and guest_id must differ"));
        }

        if self.login_attempt_limit == 0 {
            return Err(LifeError::config("login_attempt_limit must be at least 1"));
        }

        crate::account::Password::new(&self.default_password)
            .map_err(|e| LifeError::config(format!("default_password rejected: {e}")))?;

        Ok(self)
    }

    /// Full path of a snapshot file inside the data directory.
    #[must_use]
    pub fn snapshot_path(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let cfg = DataConfig::default().validate().unwrap();
        assert_eq!(cfg.backend, BackendKind::Memory);
        assert_eq!(cfg.admin_id, "AA0A");
        assert_eq!(cfg.login_attempt_limit, 3);
    }

    #[test]
    fn rejects_inconsistent_values() {
        let mut cfg = DataConfig::default();
        cfg.login_attempt_limit = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = DataConfig::default();
        cfg.guest_id = "aa0a".to_string();
        assert!(cfg.validate().is_err());

        let mut cfg = DataConfig::default();
        cfg.default_password = "no".to_string();
        assert!(cfg.validate().is_err());

        let mut cfg = DataConfig::default();
        cfg.worlds_file = " ".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn loads_partial_json_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lifedb.json");
        std::fs::write(&path, r#"{"backend": "snapshot", "admin_id": "ROOT1"}"#).unwrap();

        let cfg = DataConfig::from_file(&path).unwrap();
        assert_eq!(cfg.backend, BackendKind::Snapshot);
        assert_eq!(cfg.admin_id, "ROOT1");
        assert_eq!(cfg.accounts_file, "accounts.dat");

        std::fs::write(&path, "{ not json").unwrap();
        assert!(DataConfig::from_file(&path).is_err());
        assert!(DataConfig::from_file(dir.path().join("missing.json")).is_err());
    }
}
