//! Sealbook - dual-partition record store for shared ledgers
//!
//! A record is split in two: a public summary visible to every query, and a
//! private detail readable only by name. Records are grouped through an
//! `authorization~name` composite index and can be found with rich selector
//! queries, index scans, or key ranges.
//!
//! # Quick Start
//!
//! ```
//! use sealbook::{Invocation, MemoryLedger, Session};
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
//! let found = session.invoke(&Invocation::new("records-by-authorization").arg("a1"));
//! assert!(String::from_utf8(found.payload).unwrap().contains(r#""Key":"t1""#));
//! ```
//!
//! # Architecture
//!
//! All operations go through the [`Executor`] dispatch table. A [`Session`]
//! wraps each invocation in its own ledger transaction. The in-memory
//! [`MemoryLedger`] is the bundled backend; any [`StateStore`] can host the
//! executor.

// Re-export the public API from sealbook-executor
pub use sealbook_executor::*;

pub use sealbook_core::{KeyValue, ResultsIterator, StateStore, StoreError};
pub use sealbook_storage::{Fault, MemoryLedger, QueryCapability};
