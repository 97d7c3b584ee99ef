//! Output enum for handler results.
//!
//! Every operation produces exactly one output shape: write operations
//! return [`Output::Unit`], reads and queries return the response bytes.

use serde::{Deserialize, Serialize};

/// Successful handler results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Output {
    /// No return value (create, delete, mark-accessed)
    Unit,

    /// Raw stored JSON bytes, or a serialized query result array
    Payload(Vec<u8>),
}

impl Output {
    /// Response body bytes; empty for [`Output::Unit`]
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Output::Unit => Vec::new(),
            Output::Payload(bytes) => bytes,
        }
    }

    /// Borrow the payload, if any
    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            Output::Unit => None,
            Output::Payload(bytes) => Some(bytes),
        }
    }
}
