//! Error types for ledger backends
//!
//! Every backend operation reports failures through [`StoreError`].
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use crate::key::KeyError;
use thiserror::Error;

/// Result type alias for backend operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Error types raised by a ledger backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Opaque failure reported by the underlying state database
    #[error("backend error: {0}")]
    Backend(String),

    /// Key rejected by the key encoding rules
    #[error("invalid key: {0}")]
    InvalidKey(#[from] KeyError),

    /// The state database cannot evaluate rich queries
    #[error("rich queries are not supported by the state database (collection '{collection}')")]
    QueryUnsupported {
        /// Collection the query targeted
        collection: String,
    },

    /// The query string could not be parsed or uses unsupported clauses
    #[error("malformed query: {0}")]
    MalformedQuery(String),

    /// A result cursor failed while being advanced
    #[error("cursor error: {0}")]
    Cursor(String),

    /// Another transaction changed state this transaction read
    #[error("transaction conflict on key {key:?} in collection '{collection}'")]
    Conflict {
        /// Collection holding the key
        collection: String,
        /// Key whose version changed
        key: String,
    },

    /// An index definition file could not be read or parsed
    #[error("invalid index definition: {0}")]
    InvalidIndexDefinition(String),
}

impl StoreError {
    /// Build a [`StoreError::Backend`] from any message
    pub fn backend(message: impl Into<String>) -> Self {
        StoreError::Backend(message.into())
    }

    /// Whether this error originated on the query path
    ///
    /// Query-path errors are surfaced to callers verbatim as query failures.
    pub fn is_query_error(&self) -> bool {
        matches!(
            self,
            StoreError::QueryUnsupported { .. }
                | StoreError::MalformedQuery(_)
                | StoreError::Cursor(_)
        )
    }
}
