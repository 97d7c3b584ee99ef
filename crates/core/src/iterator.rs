//! Result cursors for range scans and rich queries
//!
//! Backends hand out query results as a [`ResultsIterator`]: a finite,
//! non-restartable lazy sequence of [`KeyValue`] pairs. The iterator owns a
//! backend [`Cursor`] and releases it exactly once, whichever way iteration
//! ends:
//!
//! - exhaustion (`next()` returns `None`)
//! - a cursor error (the error is yielded, then the iterator is fused)
//! - an explicit [`ResultsIterator::close`]
//! - drop before exhaustion (early return, `?` propagation)

use std::fmt;

use crate::error::StoreResult;

/// A single key/value pair produced by a backend scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    /// Key as stored in the collection
    pub key: String,
    /// Raw stored bytes
    pub value: Vec<u8>,
}

impl KeyValue {
    /// Create a new pair
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Backend-side cursor driven by a [`ResultsIterator`]
pub trait Cursor: Send {
    /// Advance to the next result
    ///
    /// Returns `None` once the cursor is exhausted.
    fn advance(&mut self) -> Option<StoreResult<KeyValue>>;

    /// Release backend resources held by the cursor
    ///
    /// Called exactly once by the owning [`ResultsIterator`].
    fn close(&mut self);
}

/// Lazy sequence of query results with guaranteed cursor release
pub struct ResultsIterator {
    cursor: Option<Box<dyn Cursor>>,
}

impl ResultsIterator {
    /// Wrap a backend cursor
    pub fn new(cursor: Box<dyn Cursor>) -> Self {
        Self {
            cursor: Some(cursor),
        }
    }

    /// Iterator over a fixed list of results, with no backend resources
    pub fn from_entries(entries: Vec<KeyValue>) -> Self {
        Self::new(Box::new(VecCursor {
            entries: entries.into_iter(),
        }))
    }

    /// Release the underlying cursor without draining it
    pub fn close(mut self) {
        self.release();
    }

    /// Whether the underlying cursor has been released
    pub fn is_closed(&self) -> bool {
        self.cursor.is_none()
    }

    fn release(&mut self) {
        if let Some(mut cursor) = self.cursor.take() {
            cursor.close();
        }
    }
}

impl Iterator for ResultsIterator {
    type Item = StoreResult<KeyValue>;

    fn next(&mut self) -> Option<Self::Item> {
        let cursor = self.cursor.as_mut()?;
        match cursor.advance() {
            Some(Ok(kv)) => Some(Ok(kv)),
            Some(Err(e)) => {
                self.release();
                Some(Err(e))
            }
            None => {
                self.release();
                None
            }
        }
    }
}

impl Drop for ResultsIterator {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for ResultsIterator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultsIterator")
            .field("closed", &self.is_closed())
            .finish()
    }
}

struct VecCursor {
    entries: std::vec::IntoIter<KeyValue>,
}

impl Cursor for VecCursor {
    fn advance(&mut self) -> Option<StoreResult<KeyValue>> {
        self.entries.next().map(Ok)
    }

    fn close(&mut self) {}
}
