//! Transaction context for optimistic concurrency control
//!
//! A `LedgerTransaction` is one unit of work against a [`MemoryLedger`]. It
//! tracks:
//! - **read set**: version of every key read through `get`, validated at commit
//! - **write set**: staged puts and deletes, applied atomically at commit
//! - **undo journal**: prior staged value of every write, for savepoints
//!
//! Every read observes the transaction's own staged writes: point reads look
//! them up directly, range scans and rich queries merge them over the
//! committed entries before the cursor is opened.
//!
//! Dropping a transaction without committing discards its writes.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use sealbook_core::{
    is_composite_key, validate_simple_key, KeyValue, ResultsIterator, Savepoint, StateStore,
    StoreError, StoreResult, MIN_SIMPLE_KEY,
};

use crate::ledger::{MemoryLedger, QueryCapability};
use crate::query::RichQuery;

/// (collection, key) pair addressing one entry
pub(crate) type StateKey = (String, String);

/// One unit of work against a [`MemoryLedger`]
#[derive(Debug)]
pub struct LedgerTransaction {
    ledger: MemoryLedger,
    read_set: RefCell<HashMap<StateKey, u64>>,
    writes: BTreeMap<StateKey, Option<Vec<u8>>>,
    undo: Vec<(StateKey, Option<Option<Vec<u8>>>)>,
}

impl LedgerTransaction {
    pub(crate) fn new(ledger: MemoryLedger) -> Self {
        Self {
            ledger,
            read_set: RefCell::new(HashMap::new()),
            writes: BTreeMap::new(),
            undo: Vec::new(),
        }
    }

    /// Number of staged puts and deletes
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    /// Number of keys whose committed version was observed
    pub fn read_count(&self) -> usize {
        self.read_set.borrow().len()
    }

    /// Whether no writes are staged
    pub fn is_read_only(&self) -> bool {
        self.writes.is_empty()
    }

    /// Validate the read set and apply staged writes atomically
    ///
    /// Returns the commit version.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if another transaction committed a
    /// change to a key this transaction read. Nothing is applied in that case.
    pub fn commit(self) -> StoreResult<u64> {
        let read_set = self.read_set.into_inner();
        let write_count = self.writes.len();
        match self.ledger.commit(&read_set, self.writes) {
            Ok(version) => {
                debug!(
                    target: "sealbook::storage",
                    version,
                    reads = read_set.len(),
                    writes = write_count,
                    "transaction committed"
                );
                Ok(version)
            }
            Err(e) => {
                warn!(target: "sealbook::storage", error = %e, "transaction aborted");
                Err(e)
            }
        }
    }

    /// Discard staged writes
    pub fn rollback(self) {
        debug!(
            target: "sealbook::storage",
            discarded = self.writes.len(),
            "transaction rolled back"
        );
    }

    fn state_key(collection: &str, key: &str) -> StateKey {
        (collection.to_string(), key.to_string())
    }

    fn stage(&mut self, state_key: StateKey, write: Option<Vec<u8>>) {
        let previous = self.writes.insert(state_key.clone(), write);
        self.undo.push((state_key, previous));
    }

    /// Apply staged writes in `collection` whose key passes `in_scope` over
    /// committed `entries`, keeping key order
    fn overlay(
        &self,
        collection: &str,
        entries: Vec<KeyValue>,
        in_scope: impl Fn(&str) -> bool,
    ) -> Vec<KeyValue> {
        let mut staged = self
            .writes
            .iter()
            .filter(|((c, key), _)| c.as_str() == collection && in_scope(key.as_str()))
            .peekable();
        if staged.peek().is_none() {
            return entries;
        }

        let mut merged: BTreeMap<String, Vec<u8>> =
            entries.into_iter().map(|kv| (kv.key, kv.value)).collect();
        for ((_, key), write) in staged {
            match write {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        merged
            .into_iter()
            .map(|(key, value)| KeyValue::new(key, value))
            .collect()
    }
}

/// Accept composite keys and valid simple keys
fn check_key(key: &str) -> StoreResult<()> {
    if is_composite_key(key) {
        return Ok(());
    }
    validate_simple_key(key)?;
    Ok(())
}

impl StateStore for LedgerTransaction {
    fn get(&self, collection: &str, key: &str) -> StoreResult<Option<Vec<u8>>> {
        check_key(key)?;
        let state_key = Self::state_key(collection, key);
        if let Some(staged) = self.writes.get(&state_key) {
            return Ok(staged.clone());
        }
        let (value, version) = self.ledger.read_versioned(collection, key);
        self.read_set.borrow_mut().entry(state_key).or_insert(version);
        Ok(value)
    }

    fn put(&mut self, collection: &str, key: &str, value: Vec<u8>) -> StoreResult<()> {
        check_key(key)?;
        if value.is_empty() {
            return Err(StoreError::backend(format!(
                "refusing to store empty value under {:?}",
                key
            )));
        }
        if self.ledger.faults().take_put(collection, key) {
            return Err(StoreError::backend(format!(
                "injected put failure on {:?} in '{}'",
                key, collection
            )));
        }
        self.stage(Self::state_key(collection, key), Some(value));
        Ok(())
    }

    fn delete(&mut self, collection: &str, key: &str) -> StoreResult<()> {
        check_key(key)?;
        if self.ledger.faults().take_delete(collection, key) {
            return Err(StoreError::backend(format!(
                "injected delete failure on {:?} in '{}'",
                key, collection
            )));
        }
        self.stage(Self::state_key(collection, key), None);
        Ok(())
    }

    fn range(&self, collection: &str, start: &str, end: &str) -> StoreResult<ResultsIterator> {
        let end = if end.is_empty() { None } else { Some(end) };
        if let Some(end) = end {
            if end < start {
                return Err(StoreError::backend(format!(
                    "range end {:?} sorts before start {:?}",
                    end, start
                )));
            }
        }
        // Composite keys sort below every simple key
        let start = start.max(MIN_SIMPLE_KEY);
        let entries = match end {
            Some(end) if end <= start => Vec::new(),
            _ => self.ledger.scan(collection, start, end),
        };
        let entries = self.overlay(collection, entries, |key| {
            key >= start && end.map_or(true, |end| key < end)
        });
        Ok(self.ledger.open_cursor(collection, entries))
    }

    fn range_by_prefix(&self, collection: &str, prefix: &str) -> StoreResult<ResultsIterator> {
        let entries = self.ledger.scan_prefix(collection, prefix);
        let entries = self.overlay(collection, entries, |key| key.starts_with(prefix));
        Ok(self.ledger.open_cursor(collection, entries))
    }

    fn query(&self, collection: &str, query: &str) -> StoreResult<ResultsIterator> {
        if self.ledger.capability() == QueryCapability::KeyRangeOnly {
            return Err(StoreError::QueryUnsupported {
                collection: collection.to_string(),
            });
        }
        let parsed = RichQuery::parse(query)?;
        if let Some(ddoc) = parsed.use_index_ddoc() {
            if !self.ledger.has_design_doc(collection, ddoc) {
                warn!(
                    target: "sealbook::storage",
                    collection,
                    ddoc,
                    "query names an index that is not registered; scanning"
                );
            }
        }
        let documents = self.overlay(
            collection,
            self.ledger.scan(collection, MIN_SIMPLE_KEY, None),
            |key| key >= MIN_SIMPLE_KEY,
        );
        let entries = parsed.execute(documents)?;
        Ok(self.ledger.open_cursor(collection, entries))
    }

    fn savepoint(&self) -> Savepoint {
        Savepoint(self.undo.len())
    }

    fn rollback_to(&mut self, savepoint: Savepoint) {
        let discarded = self.undo.len().saturating_sub(savepoint.0);
        while self.undo.len() > savepoint.0 {
            let Some((state_key, previous)) = self.undo.pop() else {
                break;
            };
            match previous {
                Some(write) => {
                    self.writes.insert(state_key, write);
                }
                None => {
                    self.writes.remove(&state_key);
                }
            }
        }
        if discarded > 0 {
            debug!(
                target: "sealbook::storage",
                discarded,
                "rolled back to savepoint"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fault;

    fn committed(ledger: &MemoryLedger, entries: &[(&str, &str)]) {
        let mut txn = ledger.begin();
        for (key, value) in entries {
            txn.put("c", key, value.as_bytes().to_vec()).unwrap();
        }
        txn.commit().unwrap();
    }

    #[test]
    fn test_read_your_writes() {
        let ledger = MemoryLedger::new();
        let mut txn = ledger.begin();
        txn.put("c", "k", b"v".to_vec()).unwrap();
        assert_eq!(txn.get("c", "k").unwrap(), Some(b"v".to_vec()));
        txn.delete("c", "k").unwrap();
        assert_eq!(txn.get("c", "k").unwrap(), None);
        assert!(ledger.get("c", "k").is_none());
    }

    #[test]
    fn test_rollback_discards_writes() {
        let ledger = MemoryLedger::new();
        let mut txn = ledger.begin();
        txn.put("c", "k", b"v".to_vec()).unwrap();
        assert_eq!(txn.pending_writes(), 1);
        txn.rollback();
        assert!(ledger.get("c", "k").is_none());
        assert_eq!(ledger.current_version(), 0);
    }

    #[test]
    fn test_drop_discards_writes() {
        let ledger = MemoryLedger::new();
        {
            let mut txn = ledger.begin();
            txn.put("c", "k", b"v".to_vec()).unwrap();
        }
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_conflict_on_concurrent_write() {
        let ledger = MemoryLedger::new();
        committed(&ledger, &[("k", "v0")]);

        let mut first = ledger.begin();
        let mut second = ledger.begin();
        first.get("c", "k").unwrap();
        second.get("c", "k").unwrap();
        first.put("c", "k", b"v1".to_vec()).unwrap();
        second.put("c", "k", b"v2".to_vec()).unwrap();

        first.commit().unwrap();
        let err = second.commit().unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert_eq!(ledger.get("c", "k"), Some(b"v1".to_vec()));
    }

    #[test]
    fn test_conflict_on_phantom_insert() {
        let ledger = MemoryLedger::new();
        let mut txn = ledger.begin();
        assert!(txn.get("c", "new").unwrap().is_none());
        committed(&ledger, &[("new", "other")]);
        txn.put("c", "new", b"mine".to_vec()).unwrap();
        assert!(matches!(txn.commit(), Err(StoreError::Conflict { .. })));
    }

    #[test]
    fn test_blind_writes_do_not_conflict() {
        let ledger = MemoryLedger::new();
        let mut first = ledger.begin();
        let mut second = ledger.begin();
        first.put("c", "a", b"1".to_vec()).unwrap();
        second.put("c", "b", b"2".to_vec()).unwrap();
        first.commit().unwrap();
        second.commit().unwrap();
        assert_eq!(ledger.len("c"), 2);
    }

    #[test]
    fn test_empty_value_rejected() {
        let ledger = MemoryLedger::new();
        let mut txn = ledger.begin();
        assert!(matches!(
            txn.put("c", "k", Vec::new()),
            Err(StoreError::Backend(_))
        ));
    }

    #[test]
    fn test_invalid_keys_rejected() {
        let ledger = MemoryLedger::new();
        let mut txn = ledger.begin();
        assert!(matches!(
            txn.put("c", "", b"v".to_vec()),
            Err(StoreError::InvalidKey(_))
        ));
        assert!(txn.get("c", "").is_err());
        assert!(txn.put("c", "\u{0}idx\u{0}a\u{0}", vec![0]).is_ok());
    }

    #[test]
    fn test_range_skips_composite_keys() {
        let ledger = MemoryLedger::new();
        let mut txn = ledger.begin();
        txn.put("c", "a", b"{}".to_vec()).unwrap();
        txn.put("c", "\u{0}idx\u{0}x\u{0}", vec![0]).unwrap();
        txn.commit().unwrap();

        let txn = ledger.begin();
        let keys: Vec<String> = txn
            .range("c", "", "")
            .unwrap()
            .map(|r| r.unwrap().key)
            .collect();
        assert_eq!(keys, vec!["a"]);
    }

    fn keys(results: ResultsIterator) -> Vec<String> {
        results.map(|r| r.unwrap().key).collect()
    }

    #[test]
    fn test_range_overlays_staged_writes() {
        let ledger = MemoryLedger::new();
        committed(&ledger, &[("a", "{}"), ("c", "{}")]);
        let mut txn = ledger.begin();
        txn.put("c", "b", b"{}".to_vec()).unwrap();
        txn.delete("c", "c").unwrap();
        txn.put("other", "a0", b"{}".to_vec()).unwrap();

        assert_eq!(keys(txn.range("c", "", "").unwrap()), vec!["a", "b"]);
        assert_eq!(keys(txn.range("c", "b", "").unwrap()), vec!["b"]);
        assert_eq!(keys(txn.range("c", "", "b").unwrap()), vec!["a"]);
        assert_eq!(ledger.open_cursors(), 0);
    }

    #[test]
    fn test_prefix_scan_overlays_staged_writes() {
        let ledger = MemoryLedger::new();
        let mut txn = ledger.begin();
        txn.put("c", "\u{0}idx\u{0}a1\u{0}t1\u{0}", vec![0]).unwrap();
        txn.put("c", "\u{0}idx\u{0}a1\u{0}t2\u{0}", vec![0]).unwrap();
        txn.commit().unwrap();

        let mut txn = ledger.begin();
        txn.delete("c", "\u{0}idx\u{0}a1\u{0}t1\u{0}").unwrap();
        txn.put("c", "\u{0}idx\u{0}a1\u{0}t3\u{0}", vec![0]).unwrap();
        txn.put("c", "\u{0}idx\u{0}a2\u{0}t4\u{0}", vec![0]).unwrap();

        let scanned = keys(txn.range_by_prefix("c", "\u{0}idx\u{0}a1\u{0}").unwrap());
        assert_eq!(
            scanned,
            vec!["\u{0}idx\u{0}a1\u{0}t2\u{0}", "\u{0}idx\u{0}a1\u{0}t3\u{0}"]
        );
    }

    #[test]
    fn test_query_overlays_staged_writes() {
        let ledger = MemoryLedger::new();
        committed(&ledger, &[("a", r#"{"n":1}"#), ("b", r#"{"n":1}"#)]);
        let mut txn = ledger.begin();
        txn.delete("c", "a").unwrap();
        txn.put("c", "b", br#"{"n":2}"#.to_vec()).unwrap();
        txn.put("c", "d", br#"{"n":1}"#.to_vec()).unwrap();
        txn.put("c", "\u{0}idx\u{0}x\u{0}", vec![0]).unwrap();

        let matched = keys(txn.query("c", r#"{"selector":{"n":1}}"#).unwrap());
        assert_eq!(matched, vec!["d"]);
    }

    #[test]
    fn test_range_start_below_simple_keys_is_clamped() {
        let ledger = MemoryLedger::new();
        let mut txn = ledger.begin();
        txn.put("c", "a", b"{}".to_vec()).unwrap();
        txn.put("c", "\u{0}idx\u{0}x\u{0}", vec![0]).unwrap();
        txn.commit().unwrap();

        let txn = ledger.begin();
        assert_eq!(keys(txn.range("c", "\u{0}", "").unwrap()), vec!["a"]);
        assert_eq!(keys(txn.range("c", "\u{0}idx", "b").unwrap()), vec!["a"]);
        assert!(keys(txn.range("c", "\u{0}", "\u{0}z").unwrap()).is_empty());
    }

    #[test]
    fn test_rollback_to_savepoint_restores_staged_state() {
        let ledger = MemoryLedger::new();
        committed(&ledger, &[("a", "v0")]);
        let mut txn = ledger.begin();
        txn.put("c", "a", b"v1".to_vec()).unwrap();
        let savepoint = txn.savepoint();

        txn.put("c", "a", b"v2".to_vec()).unwrap();
        txn.put("c", "b", b"v2".to_vec()).unwrap();
        txn.delete("c", "a").unwrap();
        txn.rollback_to(savepoint);

        assert_eq!(txn.get("c", "a").unwrap(), Some(b"v1".to_vec()));
        assert_eq!(txn.get("c", "b").unwrap(), None);
        assert_eq!(txn.pending_writes(), 1);

        txn.commit().unwrap();
        assert_eq!(ledger.get("c", "a"), Some(b"v1".to_vec()));
        assert!(ledger.get("c", "b").is_none());
    }

    #[test]
    fn test_rollback_to_initial_savepoint_leaves_read_only() {
        let ledger = MemoryLedger::new();
        let mut txn = ledger.begin();
        let savepoint = txn.savepoint();
        txn.put("c", "a", b"v".to_vec()).unwrap();
        txn.rollback_to(savepoint);
        assert!(txn.is_read_only());
        txn.commit().unwrap();
        assert_eq!(ledger.current_version(), 0);
    }

    #[test]
    fn test_inverted_range_is_error() {
        let ledger = MemoryLedger::new();
        let txn = ledger.begin();
        assert!(txn.range("c", "z", "a").is_err());
        assert_eq!(ledger.open_cursors(), 0);
    }

    #[test]
    fn test_query_unsupported_on_key_range_ledger() {
        let ledger = MemoryLedger::with_capability(QueryCapability::KeyRangeOnly);
        let txn = ledger.begin();
        let err = txn.query("c", r#"{"selector":{}}"#).unwrap_err();
        assert!(matches!(err, StoreError::QueryUnsupported { .. }));
        assert_eq!(ledger.open_cursors(), 0);
    }

    #[test]
    fn test_query_filters_documents() {
        let ledger = MemoryLedger::new();
        committed(
            &ledger,
            &[("a", r#"{"kind":"record","n":1}"#), ("b", r#"{"kind":"other"}"#)],
        );
        let txn = ledger.begin();
        let keys: Vec<String> = txn
            .query("c", r#"{"selector":{"kind":"record"}}"#)
            .unwrap()
            .map(|r| r.unwrap().key)
            .collect();
        assert_eq!(keys, vec!["a"]);
        assert_eq!(ledger.open_cursors(), 0);
    }

    #[test]
    fn test_injected_faults_are_one_shot() {
        let ledger = MemoryLedger::new();
        ledger.inject_fault(Fault::delete("c", "k"));
        let mut txn = ledger.begin();
        assert!(txn.delete("c", "k").is_err());
        assert!(txn.delete("c", "k").is_ok());
        assert_eq!(ledger.pending_faults(), 0);
    }
}
