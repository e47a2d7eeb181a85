//! Helpers for testing code built on the catalog.
//!
//! - [`fixtures`] holds the sample library and constructors for catalogs over either store,
//!   driven by a [`crate::clock::ManualClock`].
//! - [`fault_store`] wraps a store and fails chosen writes, to check that a failed mutation
//!   leaves the catalog untouched.
//! - [`failpoints`] scopes `fail` crate configuration to a test.

pub mod failpoints;
pub mod fault_store;
pub mod fixtures;
