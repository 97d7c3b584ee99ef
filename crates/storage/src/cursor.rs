//! Snapshot cursor handed out for range scans and rich queries

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use sealbook_core::{Cursor, KeyValue, StoreError, StoreResult};

/// Cursor over entries copied when the scan was opened
///
/// Increments the ledger's open-cursor count on creation and decrements it on
/// the first `close`.
pub(crate) struct SnapshotCursor {
    entries: std::vec::IntoIter<KeyValue>,
    yielded: usize,
    fail_after: Option<usize>,
    open_cursors: Arc<AtomicUsize>,
    closed: bool,
}

impl SnapshotCursor {
    pub(crate) fn new(
        entries: Vec<KeyValue>,
        fail_after: Option<usize>,
        open_cursors: Arc<AtomicUsize>,
    ) -> Self {
        open_cursors.fetch_add(1, Ordering::SeqCst);
        Self {
            entries: entries.into_iter(),
            yielded: 0,
            fail_after,
            open_cursors,
            closed: false,
        }
    }
}

impl Cursor for SnapshotCursor {
    fn advance(&mut self) -> Option<StoreResult<KeyValue>> {
        if self.fail_after == Some(self.yielded) {
            self.fail_after = None;
            return Some(Err(StoreError::Cursor(format!(
                "cursor failed after {} results",
                self.yielded
            ))));
        }
        let next = self.entries.next()?;
        self.yielded += 1;
        Some(Ok(next))
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.open_cursors.fetch_sub(1, Ordering::SeqCst);
        }
    }
}
