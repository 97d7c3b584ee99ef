//! Partitioned record store.
//!
//! The only place that maps a [`Partition`] to a backend collection name.
//! Every call is a pass-through to the [`StateStore`] of the current unit of
//! work; atomicity across calls comes from the host commit.

use sealbook_core::{ResultsIterator, StateStore};

use crate::config::PartitionConfig;
use crate::types::Partition;
use crate::Result;

/// Partition-aware view over one unit of work
pub struct RecordStore<'a> {
    state: &'a mut dyn StateStore,
    partitions: &'a PartitionConfig,
}

impl<'a> RecordStore<'a> {
    /// Wrap a backend unit of work
    pub fn new(state: &'a mut dyn StateStore, partitions: &'a PartitionConfig) -> Self {
        Self { state, partitions }
    }

    /// Backend collection backing `partition`
    pub fn collection(&self, partition: Partition) -> &'a str {
        collection_for(self.partitions, partition)
    }

    /// Stored bytes under `key`, if any
    pub fn get(&self, partition: Partition, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.state.get(self.collection(partition), key)?)
    }

    /// Stage a write
    pub fn put(&mut self, partition: Partition, key: &str, value: Vec<u8>) -> Result<()> {
        let collection = self.collection(partition);
        Ok(self.state.put(collection, key, value)?)
    }

    /// Stage a delete
    pub fn delete(&mut self, partition: Partition, key: &str) -> Result<()> {
        let collection = self.collection(partition);
        Ok(self.state.delete(collection, key)?)
    }

    /// Simple keys in `[start, end)`
    pub fn range(&self, partition: Partition, start: &str, end: &str) -> Result<ResultsIterator> {
        Ok(self.state.range(self.collection(partition), start, end)?)
    }

    /// Every key beginning with `prefix`
    pub fn scan_prefix(&self, partition: Partition, prefix: &str) -> Result<ResultsIterator> {
        Ok(self.state.range_by_prefix(self.collection(partition), prefix)?)
    }

    /// Backend-native rich query
    pub fn query(&self, partition: Partition, query: &str) -> Result<ResultsIterator> {
        Ok(self.state.query(self.collection(partition), query)?)
    }
}

fn collection_for(partitions: &PartitionConfig, partition: Partition) -> &str {
    match partition {
        Partition::Public => &partitions.public,
        Partition::Private => &partitions.private,
    }
}
