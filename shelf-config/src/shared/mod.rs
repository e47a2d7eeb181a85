//! Configuration types shared by the catalog library and the `shelf` binary.

mod base;
mod shelf;
mod store;

pub use base::ValidationError;
pub use shelf::ShelfConfig;
pub use store::{SqliteStoreConfig, StoreConfig};
