//! Storage layer for sealbook
//!
//! This crate implements an in-memory ledger backend with:
//! - MemoryLedger: collection-partitioned BTreeMap state behind a RwLock
//! - LedgerTransaction: staged writes, read-your-writes, and optimistic
//!   read-set validation at commit
//! - Snapshot cursors with open-cursor accounting
//! - RichQuery: a selector-based query engine (CouchDB Mango subset)
//! - IndexDefinition: loader for declarative index definition files
//! - Fault injection for exercising partial-failure paths in tests

#![warn(missing_docs)]
#![warn(clippy::all)]

mod cursor;
pub mod index_def;
pub mod ledger;
pub mod query;
pub mod testing;
pub mod transaction;

pub use index_def::{load_index_dir, IndexDefinition, IndexField, IndexSpec, SortDirection};
pub use ledger::{MemoryLedger, QueryCapability};
pub use query::RichQuery;
pub use testing::Fault;
pub use transaction::LedgerTransaction;
