use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::Config;
use crate::shared::{StoreConfig, ValidationError};

/// Complete configuration of the `shelf` binary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShelfConfig {
    /// Where the catalog records are kept.
    #[serde(default)]
    pub store: StoreConfig,
    /// Seed document ingested by `shelf seed` when no file is given on the command line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_file: Option<PathBuf>,
}

impl ShelfConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.store.validate()?;

        if let Some(seed_file) = &self.seed_file {
            if seed_file.as_os_str().is_empty() {
                return Err(ValidationError::EmptySeedFile);
            }
        }

        Ok(())
    }
}

impl Config for ShelfConfig {
    type ValidationError = ValidationError;

    fn validate(&self) -> Result<(), Self::ValidationError> {
        ShelfConfig::validate(self)
    }
}
