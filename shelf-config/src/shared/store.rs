use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

const fn default_create_if_missing() -> bool {
    SqliteStoreConfig::DEFAULT_CREATE_IF_MISSING
}

/// Durable store backing the catalog.
///
/// In YAML either `store: memory` or
///
/// ```yaml
/// store:
///   sqlite:
///     path: data/shelf.db
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreConfig {
    /// Records live in process memory and are lost on exit.
    Memory,
    /// Records live in a SQLite database file.
    Sqlite(SqliteStoreConfig),
}

impl StoreConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            StoreConfig::Memory => Ok(()),
            StoreConfig::Sqlite(config) => config.validate(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Memory
    }
}

/// Location of the SQLite database file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteStoreConfig {
    pub path: PathBuf,
    /// Create the file when it does not exist yet.
    #[serde(default = "default_create_if_missing")]
    pub create_if_missing: bool,
}

impl SqliteStoreConfig {
    pub const DEFAULT_CREATE_IF_MISSING: bool = true;

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.path.as_os_str().is_empty() {
            return Err(ValidationError::EmptySqlitePath);
        }

        Ok(())
    }
}
