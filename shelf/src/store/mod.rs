//! Durable catalog storage.
//!
//! [`CatalogStore`] is the source of truth; [`MemoryStore`] and [`SqliteStore`] implement it.

mod base;
mod memory;
mod sqlite;

pub use base::CatalogStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
