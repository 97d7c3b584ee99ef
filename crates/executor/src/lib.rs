//! # Sealbook Executor
//!
//! Record lifecycle operations over a shared ledger.
//!
//! A record has a public summary and a private detail, stored in separate
//! partitions under the same name, plus an `authorization~name` composite
//! index entry. This crate provides:
//! - [`Session`] - one committed unit of work per [`Invocation`]
//! - [`Executor`] - the operation table and dispatch
//! - [`TransientMap`] - transaction-scoped sensitive input
//! - [`LedgerConfig`] - partition collection names and logging options
//!
//! ## Quick Start
//!
//! ```
//! use sealbook_executor::{Invocation, Session};
//! use sealbook_storage::MemoryLedger;
//!
//! let session = Session::new(MemoryLedger::new());
//!
//! let create = Invocation::new("create-record").transient(
//!     "record-create",
//!     br#"{"name":"t1","description":"d","originator":"alice","recipient":"bob",
//!          "authorization":"a1","location":"loc","key-material":"k"}"#.to_vec(),
//! );
//! assert!(session.invoke(&create).is_ok());
//!
//! let read = session.invoke(&Invocation::new("read-record").arg("t1"));
//! assert!(read.is_ok());
//! ```
//!
//! ## Operations
//!
//! | Operation | Arguments | Transient key |
//! |-----------|-----------|---------------|
//! | `create-record` | - | `record-create` |
//! | `read-record` | name | - |
//! | `read-record-detail` | name | - |
//! | `mark-accessed` | - | `record-access` |
//! | `delete-record` | - | `record-delete` |
//! | `query-records-by-originator` | originator | - |
//! | `query-records` | query | - |
//! | `records-by-authorization` | authorization | - |
//! | `records-by-range` | start, end | - |

#![warn(missing_docs)]

mod config;
mod error;
mod executor;
pub mod index;
pub mod query;
mod output;
mod session;
mod store;
mod transient;
mod types;

// Handler modules
pub mod handlers;

// Test modules
#[cfg(test)]
mod tests;

// =============================================================================
// Public API - Everything users need is re-exported here
// =============================================================================

pub use config::{LedgerConfig, PartitionConfig, CONFIG_FILE_NAME};
pub use error::Error;
pub use executor::Executor;
pub use handlers::{Context, Handler};
pub use output::Output;
pub use session::{Response, Session, STATUS_ERROR, STATUS_OK};
pub use store::RecordStore;
pub use transient::{decode, TransientInput, TransientMap};
pub use types::*;

/// Result type for executor operations
pub type Result<T> = std::result::Result<T, Error>;
