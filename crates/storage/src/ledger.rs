//! MemoryLedger: in-memory ledger state
//!
//! This module implements the committed side of the backend:
//! - `HashMap<collection, BTreeMap<key, StoredEntry>>` for ordered per-collection state
//! - `parking_lot::RwLock` for thread-safe access
//! - `AtomicU64` commit versions, stamped on every entry a commit writes
//! - Registered index definitions per collection
//!
//! # Design Notes
//!
//! - **Writes only through transactions**: state changes happen in
//!   [`MemoryLedger::commit`], which validates the read set and applies the
//!   whole write set under a single write lock.
//! - **Point-in-time cursors**: scans copy matching entries when the cursor is
//!   opened, so later commits are never observed mid-iteration.
//! - **Cursor accounting**: every open cursor is counted until released, which
//!   lets tests prove that no query path leaks a cursor.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use sealbook_core::{KeyValue, ResultsIterator, StoreError, StoreResult};

use crate::cursor::SnapshotCursor;
use crate::index_def::IndexDefinition;
use crate::testing::{Fault, FaultSet};
use crate::transaction::{LedgerTransaction, StateKey};

/// Rich query support offered by a ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryCapability {
    /// Selector-based rich queries are evaluated
    #[default]
    Rich,
    /// Only key and range lookups; rich queries fail with `QueryUnsupported`
    KeyRangeOnly,
}

/// Committed value plus the version of the commit that wrote it
#[derive(Debug, Clone)]
struct StoredEntry {
    value: Vec<u8>,
    version: u64,
}

type Collection = BTreeMap<String, StoredEntry>;

#[derive(Debug)]
struct LedgerInner {
    collections: RwLock<HashMap<String, Collection>>,
    indexes: RwLock<HashMap<String, Vec<IndexDefinition>>>,
    faults: Mutex<FaultSet>,
    capability: QueryCapability,
    version: AtomicU64,
    open_cursors: Arc<AtomicUsize>,
}

/// Shared handle to an in-memory ledger
///
/// Cloning the handle is cheap; all clones see the same state.
///
/// # Example
///
/// ```
/// use sealbook_core::StateStore;
/// use sealbook_storage::MemoryLedger;
///
/// let ledger = MemoryLedger::new();
/// let mut txn = ledger.begin();
/// txn.put("records", "t1", br#"{"name":"t1"}"#.to_vec()).unwrap();
/// txn.commit().unwrap();
///
/// assert!(ledger.get("records", "t1").is_some());
/// ```
#[derive(Debug, Clone)]
pub struct MemoryLedger {
    inner: Arc<LedgerInner>,
}

impl MemoryLedger {
    /// Create an empty ledger with rich query support
    pub fn new() -> Self {
        Self::with_capability(QueryCapability::Rich)
    }

    /// Create an empty ledger with the given query capability
    pub fn with_capability(capability: QueryCapability) -> Self {
        Self {
            inner: Arc::new(LedgerInner {
                collections: RwLock::new(HashMap::new()),
                indexes: RwLock::new(HashMap::new()),
                faults: Mutex::new(FaultSet::default()),
                capability,
                version: AtomicU64::new(0),
                open_cursors: Arc::new(AtomicUsize::new(0)),
            }),
        }
    }

    /// Query capability chosen at construction
    pub fn capability(&self) -> QueryCapability {
        self.inner.capability
    }

    /// Start a new unit of work
    pub fn begin(&self) -> LedgerTransaction {
        LedgerTransaction::new(self.clone())
    }

    /// Register index definitions for a collection
    ///
    /// Definitions are advisory: queries run the same with or without them.
    pub fn register_indexes(&self, collection: &str, definitions: Vec<IndexDefinition>) {
        debug!(
            target: "sealbook::storage",
            collection,
            count = definitions.len(),
            "registered index definitions"
        );
        self.inner
            .indexes
            .write()
            .entry(collection.to_string())
            .or_default()
            .extend(definitions);
    }

    /// Index definitions registered for a collection
    pub fn indexes(&self, collection: &str) -> Vec<IndexDefinition> {
        self.inner
            .indexes
            .read()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Whether a design document is registered for a collection
    pub fn has_design_doc(&self, collection: &str, ddoc: &str) -> bool {
        self.inner
            .indexes
            .read()
            .get(collection)
            .map_or(false, |defs| defs.iter().any(|d| d.design_doc() == Some(ddoc)))
    }

    /// Read committed state, bypassing any transaction
    pub fn get(&self, collection: &str, key: &str) -> Option<Vec<u8>> {
        self.read_versioned(collection, key).0
    }

    /// All committed keys of a collection, in key order
    pub fn keys(&self, collection: &str) -> Vec<String> {
        self.inner
            .collections
            .read()
            .get(collection)
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of committed keys in a collection
    pub fn len(&self, collection: &str) -> usize {
        self.inner
            .collections
            .read()
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    /// Whether every collection is empty
    pub fn is_empty(&self) -> bool {
        self.inner
            .collections
            .read()
            .values()
            .all(BTreeMap::is_empty)
    }

    /// Version of the most recent commit that wrote state
    pub fn current_version(&self) -> u64 {
        self.inner.version.load(Ordering::SeqCst)
    }

    /// Number of cursors opened and not yet released
    pub fn open_cursors(&self) -> usize {
        self.inner.open_cursors.load(Ordering::SeqCst)
    }

    /// Arm a one-shot fault
    pub fn inject_fault(&self, fault: Fault) {
        self.inner.faults.lock().push(fault);
    }

    /// Number of armed faults that have not fired yet
    pub fn pending_faults(&self) -> usize {
        self.inner.faults.lock().len()
    }

    pub(crate) fn faults(&self) -> parking_lot::MutexGuard<'_, FaultSet> {
        self.inner.faults.lock()
    }

    /// Committed value and its version (0 when absent)
    pub(crate) fn read_versioned(&self, collection: &str, key: &str) -> (Option<Vec<u8>>, u64) {
        let collections = self.inner.collections.read();
        match collections.get(collection).and_then(|c| c.get(key)) {
            Some(entry) => (Some(entry.value.clone()), entry.version),
            None => (None, 0),
        }
    }

    /// Committed entries in `[start, end)`; `None` means unbounded
    pub(crate) fn scan(&self, collection: &str, start: &str, end: Option<&str>) -> Vec<KeyValue> {
        let collections = self.inner.collections.read();
        let Some(entries) = collections.get(collection) else {
            return Vec::new();
        };
        entries
            .range(start.to_string()..)
            .take_while(|(k, _)| end.map_or(true, |end| k.as_str() < end))
            .map(|(k, e)| KeyValue::new(k.clone(), e.value.clone()))
            .collect()
    }

    /// Committed entries whose key begins with `prefix`
    pub(crate) fn scan_prefix(&self, collection: &str, prefix: &str) -> Vec<KeyValue> {
        let collections = self.inner.collections.read();
        let Some(entries) = collections.get(collection) else {
            return Vec::new();
        };
        entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, e)| KeyValue::new(k.clone(), e.value.clone()))
            .collect()
    }

    /// Open a counted cursor over a snapshot of entries
    pub(crate) fn open_cursor(&self, collection: &str, entries: Vec<KeyValue>) -> ResultsIterator {
        let fail_after = self.inner.faults.lock().take_cursor(collection);
        ResultsIterator::new(Box::new(SnapshotCursor::new(
            entries,
            fail_after,
            self.inner.open_cursors.clone(),
        )))
    }

    /// Validate the read set and apply the write set atomically
    ///
    /// Returns the commit version. A commit without writes validates the
    /// read set but does not allocate a version.
    pub(crate) fn commit(
        &self,
        read_set: &HashMap<StateKey, u64>,
        writes: BTreeMap<StateKey, Option<Vec<u8>>>,
    ) -> StoreResult<u64> {
        let mut collections = self.inner.collections.write();

        for ((collection, key), observed) in read_set {
            let current = collections
                .get(collection)
                .and_then(|c| c.get(key))
                .map_or(0, |e| e.version);
            if current != *observed {
                return Err(StoreError::Conflict {
                    collection: collection.clone(),
                    key: key.clone(),
                });
            }
        }

        if writes.is_empty() {
            return Ok(self.current_version());
        }

        let version = self.inner.version.fetch_add(1, Ordering::SeqCst) + 1;
        for ((collection, key), write) in writes {
            let entries = collections.entry(collection).or_default();
            match write {
                Some(value) => {
                    entries.insert(key, StoredEntry { value, version });
                }
                None => {
                    entries.remove(&key);
                }
            }
        }
        Ok(version)
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}
