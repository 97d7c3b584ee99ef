//! Composite index over `authorization~name`.
//!
//! Each live record has one index entry in the public partition whose key is
//! the composite of its authorization and name, and whose value is a single
//! sentinel byte. Only key existence matters; the value is never read.

use sealbook_core::{create_composite_key, partial_composite_key, split_composite_key, StoreError};

use crate::store::RecordStore;
use crate::types::Partition;
use crate::{Error, Result};

/// Index name used for the authorization index
pub const INDEX_NAME: &str = "authorization~name";

/// Value stored under every index entry
pub const SENTINEL: [u8; 1] = [0x00];

/// Composite key of the entry for (`authorization`, `name`)
pub fn entry_key(authorization: &str, name: &str) -> Result<String> {
    Ok(create_composite_key(INDEX_NAME, &[authorization, name]).map_err(StoreError::from)?)
}

/// Scan prefix matching every entry under `authorization`
pub fn authorization_prefix(authorization: &str) -> Result<String> {
    Ok(partial_composite_key(INDEX_NAME, &[authorization]).map_err(StoreError::from)?)
}

/// Stage the entry for (`authorization`, `name`)
pub fn create_entry(store: &mut RecordStore<'_>, authorization: &str, name: &str) -> Result<()> {
    let key = entry_key(authorization, name)?;
    store.put(Partition::Public, &key, SENTINEL.to_vec())
}

/// Stage removal of the entry for (`authorization`, `name`)
pub fn delete_entry(store: &mut RecordStore<'_>, authorization: &str, name: &str) -> Result<()> {
    let key = entry_key(authorization, name)?;
    store.delete(Partition::Public, &key)
}

/// Names indexed under `authorization`, in key order
///
/// Fails fast on the first cursor error.
pub fn names_for(store: &RecordStore<'_>, authorization: &str) -> Result<Vec<String>> {
    let prefix = authorization_prefix(authorization)?;
    let mut names = Vec::new();
    for entry in store.scan_prefix(Partition::Public, &prefix)? {
        let entry = entry?;
        let (index, mut components) = split_composite_key(&entry.key).map_err(StoreError::from)?;
        match (index.as_str(), components.len()) {
            (INDEX_NAME, 2) => names.extend(components.pop()),
            _ => {
                return Err(Error::Inconsistent {
                    reason: format!("unexpected key {:?} under authorization index", entry.key),
                })
            }
        }
    }
    Ok(names)
}
