use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The SQLite store needs a database file.
    #[error("`store.sqlite.path` cannot be empty")]
    EmptySqlitePath,
    /// A configured seed file needs a path.
    #[error("`seed_file` cannot be empty when set")]
    EmptySeedFile,
}
