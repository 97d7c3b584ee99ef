//! Core types and traits for sealbook
//!
//! This crate defines the contract between the record layer and the ledger
//! backend that hosts it:
//! - StateStore: per-transaction access to collection-scoped key-value state
//! - ResultsIterator: lazy, closeable cursor over range and rich-query results
//! - Composite keys: order-preserving key encoding used for secondary indexes
//! - StoreError: backend error hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod iterator;
pub mod key;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use iterator::{Cursor, KeyValue, ResultsIterator};
pub use key::{
    create_composite_key, is_composite_key, partial_composite_key, split_composite_key,
    validate_simple_key, KeyError, COMPOSITE_KEY_NAMESPACE, MIN_SIMPLE_KEY,
};
pub use traits::{Savepoint, StateStore};
