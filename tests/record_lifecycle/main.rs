//! Record Lifecycle Tests
//!
//! End-to-end tests through the public `sealbook` API:
//! - Lifecycle properties of create, read, mark-accessed, delete
//! - Query output shape over the public partition
//! - Concurrent sessions sharing one ledger
//! - Configuration files and shipped index definitions

mod common;

mod concurrency;
mod configuration;
mod properties;
