//! A lending-library catalog.
//!
//! Books, users and lending transactions are persisted by a [`store::CatalogStore`] and mirrored
//! by an in-memory [`index::CatalogIndex`] for fast lookups. [`catalog::Catalog`] ties both
//! together and implements the borrow and return rules.
//!
//! ```rust,no_run
//! use shelf::catalog::Catalog;
//! use shelf::store::MemoryStore;
//! use shelf::types::{BookId, UserId};
//!
//! # async fn example() -> shelf::error::CatalogResult<()> {
//! let mut catalog = Catalog::open_with_system_clock(MemoryStore::new()).await?;
//! catalog.add_book((1, "1984", "George Orwell", "9780451524935")).await?;
//! catalog.add_user((101, "Alice", "alice@gmail.com")).await?;
//!
//! let loan = catalog.borrow(UserId::new(101), BookId::new(1)).await?;
//! catalog.return_book(loan.transaction_id).await?;
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod clock;
pub mod error;
pub mod failpoints;
pub mod index;
pub mod loader;
mod macros;
pub mod store;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;
