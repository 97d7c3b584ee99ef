//! Error types for record operations.
//!
//! All errors from invocation handling are represented by the [`Error`] enum.
//! These errors are:
//! - **Structured**: Each variant has typed fields for error details
//! - **Serializable**: Can be converted to/from JSON
//! - **Redacted**: Messages never contain transient input contents

use serde::{Deserialize, Serialize};

use sealbook_core::StoreError;

/// Invocation errors.
///
/// Every error is terminal for the current invocation: the unit of work is
/// discarded and the error is returned to the caller.
///
/// # Categories
///
/// | Category | Variants | Description |
/// |----------|----------|-------------|
/// | Input | `MissingTransientKey`, `MalformedInput`, `Validation`, `InvalidArguments` | Bad request |
/// | State | `AlreadyExists`, `NotFound` | Record lifecycle precondition failed |
/// | Dispatch | `UnknownOperation` | No handler registered under the name |
/// | Query | `Query` | Iterator failure, malformed or unsupported query |
/// | Consistency | `PartialWrite`, `Inconsistent`, `Conflict` | Multi-write or commit hazards |
/// | System | `Backend`, `Serialization`, `Config` | Infrastructure errors |
///
/// # Example
///
/// ```
/// use sealbook_executor::Error;
///
/// let err = Error::NotFound { what: "record".into(), name: "t1".into() };
/// assert_eq!(err.to_payload(), br#"{"Error":"record does not exist: t1"}"#.to_vec());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum Error {
    // ==================== Input Errors ====================
    /// Required transient entry is absent
    #[error("transient map must contain a '{key}' entry")]
    MissingTransientKey { key: String },

    /// Transient entry is empty or not JSON of the expected shape
    #[error("malformed transient input under '{key}': {reason}")]
    MalformedInput { key: String, reason: String },

    /// A required field is missing, empty or otherwise invalid
    #[error("validation failed: {reason}")]
    Validation { reason: String },

    /// Wrong number of positional arguments
    #[error("incorrect number of arguments for '{operation}': expected {expected}, got {actual}")]
    InvalidArguments {
        operation: String,
        expected: usize,
        actual: usize,
    },

    // ==================== State Errors ====================
    /// A record with this name is already live
    #[error("record already exists: {name}")]
    AlreadyExists { name: String },

    /// The requested record or detail is absent
    #[error("{what} does not exist: {name}")]
    NotFound { what: String, name: String },

    // ==================== Dispatch Errors ====================
    /// No handler is registered under the operation name
    #[error("unknown operation: '{operation}'")]
    UnknownOperation { operation: String },

    // ==================== Query Errors ====================
    /// Query failed; the backend message is kept verbatim
    #[error("query failed: {reason}")]
    Query { reason: String },

    // ==================== Consistency Errors ====================
    /// A multi-write sequence failed after some writes were issued
    #[error(
        "partial write during {operation} of '{name}': {failed} failed after [{}]: {reason}",
        .completed.join(", ")
    )]
    PartialWrite {
        operation: String,
        name: String,
        completed: Vec<String>,
        failed: String,
        reason: String,
    },

    /// Stored state violates a cross-entry invariant
    #[error("inconsistent state: {reason}")]
    Inconsistent { reason: String },

    /// The host rejected the unit of work at commit
    #[error("conflict: {reason}")]
    Conflict { reason: String },

    // ==================== System Errors ====================
    /// Opaque failure passed through from the store
    #[error("backend error: {reason}")]
    Backend { reason: String },

    /// Stored bytes could not be decoded or a value could not be encoded
    #[error("serialization error: {reason}")]
    Serialization { reason: String },

    /// Configuration could not be loaded or is invalid
    #[error("configuration error: {reason}")]
    Config { reason: String },
}

/// Wire form of an error response
#[derive(Serialize)]
struct ErrorPayload<'a> {
    #[serde(rename = "Error")]
    error: &'a str,
}

impl Error {
    /// Render as the `{"Error": "<message>"}` response payload
    pub fn to_payload(&self) -> Vec<u8> {
        let message = self.to_string();
        serde_json::to_vec(&ErrorPayload { error: &message })
            .unwrap_or_else(|_| br#"{"Error":"unrenderable error"}"#.to_vec())
    }

    pub(crate) fn validation(reason: impl Into<String>) -> Self {
        Error::Validation {
            reason: reason.into(),
        }
    }

    pub(crate) fn serialization(reason: impl Into<String>) -> Self {
        Error::Serialization {
            reason: reason.into(),
        }
    }
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        if e.is_query_error() {
            return Error::Query {
                reason: e.to_string(),
            };
        }
        match e {
            StoreError::Backend(reason) => Error::Backend { reason },
            StoreError::InvalidKey(k) => Error::Validation {
                reason: format!("invalid key: {}", k),
            },
            conflict @ StoreError::Conflict { .. } => Error::Conflict {
                reason: conflict.to_string(),
            },
            other => Error::Backend {
                reason: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealbook_core::KeyError;

    #[test]
    fn test_payload_shape() {
        let err = Error::UnknownOperation {
            operation: "frobnicate".into(),
        };
        let value: serde_json::Value = serde_json::from_slice(&err.to_payload()).unwrap();
        assert_eq!(value["Error"], "unknown operation: 'frobnicate'");
        assert_eq!(value.as_object().unwrap().len(), 1);
    }

    #[test]
    fn test_payload_escapes_message() {
        let err = Error::NotFound {
            what: "record".into(),
            name: "a\"b".into(),
        };
        let value: serde_json::Value = serde_json::from_slice(&err.to_payload()).unwrap();
        assert_eq!(value["Error"], "record does not exist: a\"b");
    }

    #[test]
    fn test_partial_write_message_lists_steps() {
        let err = Error::PartialWrite {
            operation: "delete-record".into(),
            name: "t1".into(),
            completed: vec!["record".into(), "index entry".into()],
            failed: "detail".into(),
            reason: "disk".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("[record, index entry]"));
        assert!(msg.contains("detail failed"));
    }

    #[test]
    fn test_query_store_errors_kept_verbatim() {
        let store = StoreError::QueryUnsupported {
            collection: "collectionRecords".into(),
        };
        let expected = store.to_string();
        match Error::from(store) {
            Error::Query { reason } => assert_eq!(reason, expected),
            other => panic!("expected Query, got {:?}", other),
        }
    }

    #[test]
    fn test_store_error_mapping() {
        assert_eq!(
            Error::from(StoreError::backend("boom")),
            Error::Backend {
                reason: "boom".into()
            }
        );
        assert!(matches!(
            Error::from(StoreError::InvalidKey(KeyError::Empty)),
            Error::Validation { .. }
        ));
        assert!(matches!(
            Error::from(StoreError::Conflict {
                collection: "c".into(),
                key: "k".into()
            }),
            Error::Conflict { .. }
        ));
    }

    #[test]
    fn test_error_serde_round_trip() {
        let err = Error::InvalidArguments {
            operation: "read-record".into(),
            expected: 1,
            actual: 0,
        };
        let json = serde_json::to_string(&err).unwrap();
        let back: Error = serde_json::from_str(&json).unwrap();
        assert_eq!(err, back);
    }
}
