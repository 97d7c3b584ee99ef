//! Common test utilities for record lifecycle tests

use serde::Deserialize;
use sealbook::{Invocation, MemoryLedger, Record, Session};

/// Install a test-writer subscriber honoring `RUST_LOG`; repeat calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Create a Session over a fresh in-memory ledger
pub fn create_session() -> Session {
    init_tracing();
    Session::new(MemoryLedger::new())
}

/// One element of a query response
#[derive(Debug, Deserialize)]
pub struct QueryRow {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Record")]
    pub record: Record,
}

/// Decode a query response payload
pub fn rows(payload: &[u8]) -> Vec<QueryRow> {
    serde_json::from_slice(payload).unwrap()
}

/// Field values for one record
#[derive(Debug, Clone)]
pub struct Fields {
    pub name: String,
    pub description: String,
    pub originator: String,
    pub recipient: String,
    pub authorization: String,
    pub location: String,
    pub key_material: String,
}

impl Fields {
    pub fn new(name: &str, originator: &str, authorization: &str) -> Self {
        Self {
            name: name.to_string(),
            description: "d".to_string(),
            originator: originator.to_string(),
            recipient: "bob".to_string(),
            authorization: authorization.to_string(),
            location: "loc".to_string(),
            key_material: "k".to_string(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "originator": self.originator,
            "recipient": self.recipient,
            "authorization": self.authorization,
            "location": self.location,
            "key-material": self.key_material,
        })
    }

    pub fn create(&self) -> Invocation {
        Invocation::new("create-record")
            .transient("record-create", self.to_json().to_string().into_bytes())
    }
}

pub fn read(name: &str) -> Invocation {
    Invocation::new("read-record").arg(name)
}

pub fn read_detail(name: &str) -> Invocation {
    Invocation::new("read-record-detail").arg(name)
}

pub fn mark_accessed(name: &str) -> Invocation {
    Invocation::new("mark-accessed").transient(
        "record-access",
        serde_json::json!({ "name": name }).to_string().into_bytes(),
    )
}

pub fn delete(name: &str) -> Invocation {
    Invocation::new("delete-record").transient(
        "record-delete",
        serde_json::json!({ "name": name }).to_string().into_bytes(),
    )
}

pub fn by_authorization(authorization: &str) -> Invocation {
    Invocation::new("records-by-authorization").arg(authorization)
}

pub fn by_originator(originator: &str) -> Invocation {
    Invocation::new("query-records-by-originator").arg(originator)
}
