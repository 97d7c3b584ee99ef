//! The Executor - single entry point to the record operations.
//!
//! The Executor is a dispatcher that routes invocations to the handler
//! registered under the operation name. It holds no ledger state: every call
//! runs against the unit of work passed in.

use std::collections::HashMap;

use tracing::{debug, warn};

use sealbook_core::StateStore;

use crate::config::LedgerConfig;
use crate::handlers::{self, Context, Handler};
use crate::store::RecordStore;
use crate::types::Invocation;
use crate::{Error, Output, Result};

/// The invocation executor - single entry point to record operations.
///
/// # Thread Safety
///
/// Executor is `Send + Sync` and can be shared across threads.
///
/// # Example
///
/// ```
/// use sealbook_executor::{Executor, Invocation, LedgerConfig};
/// use sealbook_storage::MemoryLedger;
///
/// let executor = Executor::new(LedgerConfig::default());
/// let ledger = MemoryLedger::new();
/// let mut txn = ledger.begin();
///
/// let result = executor.execute(&mut txn, &Invocation::new("read-record").arg("t1"));
/// assert!(result.is_err());
/// ```
pub struct Executor {
    handlers: HashMap<&'static str, Box<dyn Handler>>,
    config: LedgerConfig,
}

impl Executor {
    /// Create an executor with every built-in operation registered.
    pub fn new(config: LedgerConfig) -> Self {
        let mut executor = Self {
            handlers: HashMap::new(),
            config,
        };
        for handler in handlers::builtin() {
            executor.register(handler);
        }
        executor
    }

    /// Register a handler under its name, returning any handler it replaces.
    pub fn register(&mut self, handler: Box<dyn Handler>) -> Option<Box<dyn Handler>> {
        self.handlers.insert(handler.name(), handler)
    }

    /// Active configuration.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Registered operation names, sorted.
    pub fn operations(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Execute a single invocation against one unit of work.
    ///
    /// Writes are only staged in `state`; committing or discarding them is
    /// the caller's decision. If the handler fails, the writes it staged are
    /// rolled back to the savepoint taken before it ran, so `state` holds
    /// exactly what it held before the call.
    pub fn execute(&self, state: &mut dyn StateStore, invocation: &Invocation) -> Result<Output> {
        let Some(handler) = self.handlers.get(invocation.operation.as_str()) else {
            warn!(
                target: "sealbook::executor",
                operation = %invocation.operation,
                "unknown operation"
            );
            return Err(Error::UnknownOperation {
                operation: invocation.operation.clone(),
            });
        };

        if invocation.args.len() != handler.arity() {
            return Err(Error::InvalidArguments {
                operation: invocation.operation.clone(),
                expected: handler.arity(),
                actual: invocation.args.len(),
            });
        }

        debug!(
            target: "sealbook::executor",
            operation = handler.name(),
            args = invocation.args.len(),
            transient_keys = invocation.transient.len(),
            "dispatching"
        );
        let savepoint = state.savepoint();
        let result = {
            let mut ctx = Context::new(
                RecordStore::new(&mut *state, &self.config.partitions),
                &self.config,
            );
            handler.handle(&mut ctx, invocation)
        };
        if let Err(e) = &result {
            debug!(
                target: "sealbook::executor",
                operation = handler.name(),
                error = %e,
                "discarding writes of failed invocation"
            );
            state.rollback_to(savepoint);
        }
        result
    }

    /// Execute invocations in order against one unit of work.
    ///
    /// Every invocation runs regardless of earlier failures; results are
    /// returned in input order. A failed invocation leaves no staged writes
    /// behind, so later invocations see only the successful ones.
    pub fn execute_many(
        &self,
        state: &mut dyn StateStore,
        invocations: &[Invocation],
    ) -> Vec<Result<Output>> {
        invocations
            .iter()
            .map(|invocation| self.execute(state, invocation))
            .collect()
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("operations", &self.operations())
            .field("config", &self.config)
            .finish()
    }
}
