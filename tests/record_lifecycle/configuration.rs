//! Configuration files and shipped index definitions.

use std::fs;
use std::path::PathBuf;

use sealbook::{Error, LedgerConfig, MemoryLedger, Session, CONFIG_FILE_NAME};

use crate::common::*;

fn shipped_indexes() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("indexes")
}

#[test]
fn default_config_file_round_trips_into_a_session() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);

    LedgerConfig::write_default_if_missing(&path).unwrap();
    let config = LedgerConfig::from_file(&path).unwrap();
    assert_eq!(config, LedgerConfig::default());

    let session = Session::with_config(MemoryLedger::new(), config);
    assert_eq!(session.load_indexes(&shipped_indexes()).unwrap(), 1);
    assert!(session.invoke(&Fields::new("t1", "alice", "a1").create()).is_ok());
    assert_eq!(rows(&session.invoke(&by_originator("alice")).payload).len(), 1);
}

#[test]
fn custom_partitions_route_records_and_details() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    fs::write(
        &path,
        "log_query_results = true\n\n[partitions]\npublic = \"summaries\"\nprivate = \"secrets\"\n",
    )
    .unwrap();

    let config = LedgerConfig::from_file(&path).unwrap();
    assert!(config.log_query_results);
    let session = Session::with_config(MemoryLedger::new(), config);
    session.invoke(&Fields::new("t1", "alice", "a1").create());

    let ledger = session.ledger();
    assert!(ledger.get("summaries", "t1").is_some());
    assert!(ledger.get("secrets", "t1").is_some());
    assert_eq!(ledger.len("summaries"), 2);
    assert_eq!(rows(&session.invoke(&by_originator("alice")).payload).len(), 1);

    // Shipped definitions are laid out for the default collection names
    assert_eq!(session.load_indexes(&shipped_indexes()).unwrap(), 0);
}

#[test]
fn shared_collection_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    fs::write(&path, "[partitions]\npublic = \"one\"\nprivate = \"one\"\n").unwrap();

    match LedgerConfig::from_file(&path) {
        Err(Error::Config { reason }) => assert!(reason.contains(CONFIG_FILE_NAME)),
        other => panic!("expected Config error, got {:?}", other),
    }
}

#[test]
fn written_config_reloads_identically() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    let mut config = LedgerConfig::default();
    config.partitions.public = "records-v2".to_string();

    config.write_to_file(&path).unwrap();
    assert_eq!(LedgerConfig::from_file(&path).unwrap(), config);
}
