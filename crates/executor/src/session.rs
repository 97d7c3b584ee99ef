//! Session: one unit of work per invocation.
//!
//! The [`Session`] binds an [`Executor`] to a [`MemoryLedger`]. Each call to
//! [`Session::invoke`] opens a ledger transaction, dispatches the invocation,
//! then commits on success or discards every staged write on failure. This
//! is the host-side commit boundary the record operations rely on.
//!
//! # Usage
//!
//! ```
//! use sealbook_executor::{Invocation, Session};
//! use sealbook_storage::MemoryLedger;
//!
//! let session = Session::new(MemoryLedger::new());
//!
//! let response = session.invoke(&Invocation::new("read-record").arg("t1"));
//! assert_eq!(response.status, 500);
//! assert_eq!(response.payload, br#"{"Error":"record does not exist: t1"}"#.to_vec());
//! ```

use std::path::Path;

use tracing::{debug, info_span, warn};
use uuid::Uuid;

use sealbook_storage::{load_index_dir, MemoryLedger};

use crate::config::LedgerConfig;
use crate::{Error, Executor, Invocation, Output, Result};

/// Status code of a successful response
pub const STATUS_OK: u16 = 200;

/// Status code of a failed response
pub const STATUS_ERROR: u16 = 500;

/// Response to one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// [`STATUS_OK`] or [`STATUS_ERROR`]
    pub status: u16,
    /// Stored bytes, query results, or `{"Error": ...}`
    pub payload: Vec<u8>,
    /// Error message; empty on success
    pub message: String,
}

impl Response {
    /// Successful response carrying `payload`
    pub fn ok(payload: Vec<u8>) -> Self {
        Self {
            status: STATUS_OK,
            payload,
            message: String::new(),
        }
    }

    /// Error response for `error`
    pub fn error(error: &Error) -> Self {
        Self {
            status: STATUS_ERROR,
            payload: error.to_payload(),
            message: error.to_string(),
        }
    }

    /// Whether the invocation succeeded
    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }
}

/// An executor bound to a ledger, committing once per invocation.
#[derive(Debug)]
pub struct Session {
    executor: Executor,
    ledger: MemoryLedger,
}

impl Session {
    /// Create a session with the default configuration.
    pub fn new(ledger: MemoryLedger) -> Self {
        Self::with_executor(ledger, Executor::default())
    }

    /// Create a session with the given configuration.
    pub fn with_config(ledger: MemoryLedger, config: LedgerConfig) -> Self {
        Self::with_executor(ledger, Executor::new(config))
    }

    /// Create a session around an existing executor.
    pub fn with_executor(ledger: MemoryLedger, executor: Executor) -> Self {
        Self { executor, ledger }
    }

    /// Get a reference to the underlying executor.
    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Get a reference to the underlying ledger.
    pub fn ledger(&self) -> &MemoryLedger {
        &self.ledger
    }

    /// Register shipped index definitions for both partitions.
    ///
    /// Looks for `<root>/<collection>/*.json` for each partition collection;
    /// a missing directory registers nothing. Returns the number of
    /// definitions registered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a definition file is unreadable or invalid.
    pub fn load_indexes(&self, root: &Path) -> Result<usize> {
        let partitions = &self.executor.config().partitions;
        let mut registered = 0;
        for collection in [&partitions.public, &partitions.private] {
            let dir = root.join(collection);
            if !dir.is_dir() {
                continue;
            }
            let definitions = load_index_dir(&dir).map_err(|e| Error::Config {
                reason: e.to_string(),
            })?;
            registered += definitions.len();
            self.ledger.register_indexes(collection, definitions);
        }
        Ok(registered)
    }

    /// Run one invocation in its own unit of work.
    pub fn invoke(&self, invocation: &Invocation) -> Response {
        match self.try_invoke(invocation) {
            Ok(output) => Response::ok(output.into_bytes()),
            Err(e) => Response::error(&e),
        }
    }

    /// Run invocations in order, each in its own unit of work.
    pub fn invoke_many(&self, invocations: &[Invocation]) -> Vec<Response> {
        invocations.iter().map(|inv| self.invoke(inv)).collect()
    }

    /// Run one invocation, returning the typed result.
    ///
    /// Staged writes are committed only if the handler succeeds. A commit
    /// rejected by the ledger surfaces as [`Error::Conflict`].
    pub fn try_invoke(&self, invocation: &Invocation) -> Result<Output> {
        let tx_id = Uuid::new_v4();
        let span = info_span!("invoke", operation = %invocation.operation, %tx_id);
        let _guard = span.enter();

        let mut txn = self.ledger.begin();
        match self.executor.execute(&mut txn, invocation) {
            Ok(output) => {
                let writes = txn.pending_writes();
                let version = txn.commit()?;
                debug!(target: "sealbook::executor", version, writes, "invocation committed");
                Ok(output)
            }
            Err(e) => {
                warn!(
                    target: "sealbook::executor",
                    error = %e,
                    discarded = txn.pending_writes(),
                    "invocation failed"
                );
                txn.rollback();
                Err(e)
            }
        }
    }
}
