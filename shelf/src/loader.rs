//! Seed documents for bulk-loading a catalog.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CatalogResult;
use crate::types::{NewBook, User};

/// Books and users to ingest into a catalog.
///
/// The JSON form is `{ "books": [...], "users": [...] }`; either list may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub books: Vec<NewBook>,
    #[serde(default)]
    pub users: Vec<User>,
}

impl CatalogSeed {
    pub fn new(
        books: impl IntoIterator<Item = impl Into<NewBook>>,
        users: impl IntoIterator<Item = impl Into<User>>,
    ) -> Self {
        Self {
            books: books.into_iter().map(Into::into).collect(),
            users: users.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses a seed document from its JSON text.
    pub fn from_json(json: &str) -> CatalogResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Outcome of [`crate::catalog::Catalog::ingest`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub books_added: usize,
    pub books_skipped: usize,
    pub users_added: usize,
    pub users_skipped: usize,
}

/// Reads and parses the seed document at `path`.
pub async fn load_seed_file(path: impl AsRef<Path>) -> CatalogResult<CatalogSeed> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path).await?;
    let seed = CatalogSeed::from_json(&contents)?;

    debug!(
        path = %path.display(),
        books = seed.books.len(),
        users = seed.users.len(),
        "seed file loaded"
    );

    Ok(seed)
}
