//! Test modules for the executor crate.


use sealbook_storage::MemoryLedger;

use crate::{Invocation, Session};

/// Create a test session over a fresh ledger with rich query support.
pub(crate) fn create_test_session() -> Session {
    Session::new(MemoryLedger::new())
}

/// JSON payload for `create-record` with every field set.
pub(crate) fn create_payload(name: &str, originator: &str, authorization: &str) -> Vec<u8> {
    serde_json::json!({
        "name": name,
        "description": format!("description of {}", name),
        "originator": originator,
        "recipient": "bob",
        "authorization": authorization,
        "location": format!("vault://{}", name),
        "key-material": format!("key-{}", name),
    })
    .to_string()
    .into_bytes()
}

pub(crate) fn create(name: &str, originator: &str, authorization: &str) -> Invocation {
    Invocation::new("create-record").transient(
        "record-create",
        create_payload(name, originator, authorization),
    )
}

pub(crate) fn read(name: &str) -> Invocation {
    Invocation::new("read-record").arg(name)
}

pub(crate) fn read_detail(name: &str) -> Invocation {
    Invocation::new("read-record-detail").arg(name)
}

pub(crate) fn mark_accessed(name: &str) -> Invocation {
    Invocation::new("mark-accessed").transient(
        "record-access",
        serde_json::json!({ "name": name }).to_string().into_bytes(),
    )
}

pub(crate) fn delete(name: &str) -> Invocation {
    Invocation::new("delete-record").transient(
        "record-delete",
        serde_json::json!({ "name": name }).to_string().into_bytes(),
    )
}
