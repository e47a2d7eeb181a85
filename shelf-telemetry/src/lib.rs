//! Logging setup shared by the `shelf` binary and the test suites.

pub mod tracing;
