//! Operation handlers organized by category.
//!
//! Each operation is a [`Handler`] registered in the [`Executor`] table
//! under its name:
//!
//! | Module | Operations | Reads | Writes |
//! |--------|------------|-------|--------|
//! | `record` | create-record, read-record, read-record-detail, mark-accessed, delete-record | both partitions | both partitions |
//! | `query` | query-records-by-originator, query-records, records-by-authorization, records-by-range | public partition | none |
//!
//! [`Executor`]: crate::Executor

use crate::config::LedgerConfig;
use crate::store::RecordStore;
use crate::types::Invocation;
use crate::{Error, Output, Result};

pub(crate) mod query;
pub(crate) mod record;

/// Per-invocation state handed to a handler
pub struct Context<'a> {
    store: RecordStore<'a>,
    config: &'a LedgerConfig,
}

impl<'a> Context<'a> {
    pub(crate) fn new(store: RecordStore<'a>, config: &'a LedgerConfig) -> Self {
        Self { store, config }
    }

    /// Partitioned store of the current unit of work
    pub fn store(&self) -> &RecordStore<'a> {
        &self.store
    }

    /// Mutable partitioned store of the current unit of work
    pub fn store_mut(&mut self) -> &mut RecordStore<'a> {
        &mut self.store
    }

    /// Active configuration
    pub fn config(&self) -> &LedgerConfig {
        self.config
    }
}

/// One named operation
///
/// The executor checks the positional argument count against
/// [`Handler::arity`] before calling [`Handler::handle`].
pub trait Handler: Send + Sync {
    /// Operation name used for dispatch
    fn name(&self) -> &'static str;

    /// Exact number of positional arguments
    fn arity(&self) -> usize;

    /// Run the operation inside the current unit of work
    fn handle(&self, ctx: &mut Context<'_>, invocation: &Invocation) -> Result<Output>;
}

/// Every built-in handler
pub(crate) fn builtin() -> Vec<Box<dyn Handler>> {
    vec![
        Box::new(record::CreateRecord),
        Box::new(record::ReadRecord),
        Box::new(record::ReadRecordDetail),
        Box::new(record::MarkAccessed),
        Box::new(record::DeleteRecord),
        Box::new(query::QueryRecordsByOriginator),
        Box::new(query::QueryRecords),
        Box::new(query::RecordsByAuthorization),
        Box::new(query::RecordsByRange),
    ]
}

/// Tracks the steps of a multi-write sequence
///
/// A failure before any write is returned unchanged. A failure after at least
/// one write becomes [`Error::PartialWrite`] naming what completed.
pub(crate) struct WriteSequence<'n> {
    operation: &'static str,
    name: &'n str,
    completed: Vec<&'static str>,
}

impl<'n> WriteSequence<'n> {
    pub(crate) fn new(operation: &'static str, name: &'n str) -> Self {
        Self {
            operation,
            name,
            completed: Vec::new(),
        }
    }

    pub(crate) fn step(&mut self, label: &'static str, result: Result<()>) -> Result<()> {
        match result {
            Ok(()) => {
                self.completed.push(label);
                Ok(())
            }
            Err(e) if self.completed.is_empty() => Err(e),
            Err(e) => Err(Error::PartialWrite {
                operation: self.operation.to_string(),
                name: self.name.to_string(),
                completed: self.completed.iter().map(|s| s.to_string()).collect(),
                failed: label.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}
