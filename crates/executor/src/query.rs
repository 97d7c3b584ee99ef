//! Query executor.
//!
//! Drives a backend result iterator to exhaustion and serializes the results
//! as `[{"Key": <key>, "Record": <stored JSON>}, ...]`. Stored bytes are
//! embedded verbatim, not re-encoded as strings. An empty result set
//! serializes as `[]`.

use serde::Serialize;
use serde_json::value::RawValue;
use tracing::{debug, trace};

use sealbook_core::{KeyValue, ResultsIterator};

use crate::store::RecordStore;
use crate::types::{Partition, RECORD_KIND};
use crate::{Error, Result};

#[derive(Serialize)]
struct QueryRecord<'a> {
    #[serde(rename = "Key")]
    key: &'a str,
    #[serde(rename = "Record")]
    record: &'a RawValue,
}

/// Drain `results`, discarding everything on the first error
///
/// The cursor is released on every path.
pub fn collect_results(results: ResultsIterator) -> Result<Vec<KeyValue>> {
    results.map(|r| r.map_err(Error::from)).collect()
}

/// Serialize results in iteration order
///
/// # Errors
///
/// Returns [`Error::Serialization`] if a stored value is not valid JSON.
pub fn serialize_results(results: &[KeyValue]) -> Result<Vec<u8>> {
    let records = results
        .iter()
        .map(|kv| {
            let record: &RawValue = serde_json::from_slice(&kv.value).map_err(|e| {
                Error::serialization(format!(
                    "stored value under {:?} is not JSON: {}",
                    kv.key, e
                ))
            })?;
            Ok(QueryRecord {
                key: &kv.key,
                record,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    serde_json::to_vec(&records).map_err(|e| Error::serialization(e.to_string()))
}

/// Run a backend-native query and serialize its results
pub fn run(
    store: &RecordStore<'_>,
    partition: Partition,
    query: &str,
    log_results: bool,
) -> Result<Vec<u8>> {
    debug!(target: "sealbook::query", collection = store.collection(partition), query, "running query");
    let results = collect_results(store.query(partition, query)?)?;
    let payload = serialize_results(&results)?;
    debug!(target: "sealbook::query", count = results.len(), "query complete");
    if log_results {
        trace!(
            target: "sealbook::query",
            results = %String::from_utf8_lossy(&payload),
            "query results"
        );
    }
    Ok(payload)
}

/// Canned selector matching records by originator
///
/// The value is JSON-encoded, so quotes and braces in it cannot alter the
/// query structure.
pub fn originator_query(originator: &str) -> Result<String> {
    let query = serde_json::json!({
        "selector": {
            "kind": RECORD_KIND,
            "originator": originator,
        }
    });
    serde_json::to_string(&query).map_err(|e| Error::serialization(e.to_string()))
}
