//! Core trait for ledger state access
//!
//! This module defines the StateStore trait that lets the record layer run
//! against any ledger backend without knowing how state is persisted,
//! replicated or committed.

use crate::error::StoreResult;
use crate::iterator::ResultsIterator;

/// Marker for the staged writes of a unit of work at one point in time
///
/// Obtained from [`StateStore::savepoint`] and consumed by
/// [`StateStore::rollback_to`]. Only meaningful for the store that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Savepoint(pub usize);

/// Transaction-scoped access to collection-partitioned ledger state
///
/// One `StateStore` value corresponds to one unit of work. Writes issued
/// through it are staged by the host and become visible atomically when the
/// host commits, or not at all. Every read (point reads, scans and rich
/// queries) observes the writes already staged through the same value.
///
/// Keys are plain strings. Composite keys (see [`crate::key`]) share the same
/// key space as simple keys and are stored like any other entry.
pub trait StateStore {
    /// Read the value stored under `key`
    ///
    /// Returns `None` if the key does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    fn get(&self, collection: &str, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Stage a write of `value` under `key`
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    fn put(&mut self, collection: &str, key: &str, value: Vec<u8>) -> StoreResult<()>;

    /// Stage removal of `key`
    ///
    /// Deleting an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the delete.
    fn delete(&mut self, collection: &str, key: &str) -> StoreResult<()>;

    /// Scan simple keys in `[start, end)`
    ///
    /// An empty `start` begins at the first simple key (composite keys are
    /// never returned); an empty `end` means unbounded.
    ///
    /// # Errors
    ///
    /// Returns an error if the scan cannot be opened.
    fn range(&self, collection: &str, start: &str, end: &str) -> StoreResult<ResultsIterator>;

    /// Scan every key beginning with `prefix`, in key order
    ///
    /// # Errors
    ///
    /// Returns an error if the scan cannot be opened.
    fn range_by_prefix(&self, collection: &str, prefix: &str) -> StoreResult<ResultsIterator>;

    /// Run a backend-native rich query
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::QueryUnsupported`] on backends without
    /// rich query support, or [`crate::StoreError::MalformedQuery`] if the
    /// backend cannot parse `query`.
    fn query(&self, collection: &str, query: &str) -> StoreResult<ResultsIterator>;

    /// Mark the current position in the staged writes
    fn savepoint(&self) -> Savepoint;

    /// Discard every write staged after `savepoint` was taken
    ///
    /// Writes staged before it, and the unit of work itself, are kept.
    fn rollback_to(&mut self, savepoint: Savepoint);
}
