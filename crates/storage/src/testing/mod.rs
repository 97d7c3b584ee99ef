//! Fault injection for exercising partial-failure paths
//!
//! Faults are one-shot: each armed fault fires on the first matching
//! operation and is then discarded.
//!
//! # Example
//!
//! ```
//! use sealbook_core::StateStore;
//! use sealbook_storage::{Fault, MemoryLedger};
//!
//! let ledger = MemoryLedger::new();
//! ledger.inject_fault(Fault::put("records", "t1"));
//!
//! let mut txn = ledger.begin();
//! assert!(txn.put("records", "t1", b"{}".to_vec()).is_err());
//! assert!(txn.put("records", "t1", b"{}".to_vec()).is_ok());
//! ```

/// A one-shot backend failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Fail the next put of `key` in `collection`
    Put {
        /// Target collection
        collection: String,
        /// Target key
        key: String,
    },
    /// Fail the next delete of `key` in `collection`
    Delete {
        /// Target collection
        collection: String,
        /// Target key
        key: String,
    },
    /// Fail the next cursor opened on `collection` after `after` results
    Cursor {
        /// Target collection
        collection: String,
        /// Results yielded before the failure
        after: usize,
    },
}

impl Fault {
    /// Fail the next put of `key`
    pub fn put(collection: impl Into<String>, key: impl Into<String>) -> Self {
        Fault::Put {
            collection: collection.into(),
            key: key.into(),
        }
    }

    /// Fail the next delete of `key`
    pub fn delete(collection: impl Into<String>, key: impl Into<String>) -> Self {
        Fault::Delete {
            collection: collection.into(),
            key: key.into(),
        }
    }

    /// Fail the next cursor on `collection` after `after` results
    pub fn cursor(collection: impl Into<String>, after: usize) -> Self {
        Fault::Cursor {
            collection: collection.into(),
            after,
        }
    }
}

/// Armed faults, consumed in arming order
#[derive(Debug, Default)]
pub(crate) struct FaultSet {
    armed: Vec<Fault>,
}

impl FaultSet {
    pub(crate) fn push(&mut self, fault: Fault) {
        self.armed.push(fault);
    }

    pub(crate) fn len(&self) -> usize {
        self.armed.len()
    }

    fn take_first(&mut self, matches: impl Fn(&Fault) -> bool) -> Option<Fault> {
        let pos = self.armed.iter().position(matches)?;
        Some(self.armed.remove(pos))
    }

    pub(crate) fn take_put(&mut self, collection: &str, key: &str) -> bool {
        self.take_first(|f| {
            matches!(f, Fault::Put { collection: c, key: k } if c == collection && k == key)
        })
        .is_some()
    }

    pub(crate) fn take_delete(&mut self, collection: &str, key: &str) -> bool {
        self.take_first(|f| {
            matches!(f, Fault::Delete { collection: c, key: k } if c == collection && k == key)
        })
        .is_some()
    }

    pub(crate) fn take_cursor(&mut self, collection: &str) -> Option<usize> {
        match self.take_first(|f| matches!(f, Fault::Cursor { collection: c, .. } if c == collection))
        {
            Some(Fault::Cursor { after, .. }) => Some(after),
            _ => None,
        }
    }
}
