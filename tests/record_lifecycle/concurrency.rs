//! Concurrent sessions sharing one ledger.
//!
//! Each invocation is its own unit of work, so racing invocations either
//! commit whole or fail with a conflict and leave no trace.

use std::sync::{Arc, Barrier};
use std::thread;

use sealbook::{Error, Record};

use crate::common::*;

const THREADS: usize = 8;

#[test]
fn concurrent_creates_of_distinct_names_all_commit() {
    let session = Arc::new(create_session());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let session = Arc::clone(&session);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                session.try_invoke(&Fields::new(&format!("t{}", i), "alice", "a1").create())
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap().is_ok());
    }
    assert_eq!(rows(&session.invoke(&by_authorization("a1")).payload).len(), THREADS);
    assert_eq!(session.ledger().len("collectionRecordDetails"), THREADS);
}

#[test]
fn concurrent_creates_of_one_name_admit_exactly_one() {
    let session = Arc::new(create_session());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let session = Arc::clone(&session);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                session.try_invoke(&Fields::new("t1", &format!("o{}", i), &format!("a{}", i)).create())
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(
            matches!(err, Error::AlreadyExists { .. } | Error::Conflict { .. }),
            "unexpected error: {:?}",
            err
        );
    }

    // Exactly one record, one detail, one index entry
    let record: Record = serde_json::from_slice(&session.invoke(&read("t1")).payload).unwrap();
    let indexed = rows(&session.invoke(&by_authorization(&record.authorization)).payload);
    assert_eq!(indexed.len(), 1);
    assert_eq!(session.ledger().len("collectionRecords"), 2);
    assert_eq!(session.ledger().len("collectionRecordDetails"), 1);
}

#[test]
fn concurrent_mark_accessed_converges() {
    let session = Arc::new(create_session());
    session.invoke(&Fields::new("t1", "alice", "a1").create());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let session = Arc::clone(&session);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                session.try_invoke(&mark_accessed("t1"))
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(results.iter().any(|r| r.is_ok()));
    assert!(results
        .iter()
        .all(|r| matches!(r, Ok(_) | Err(Error::Conflict { .. }))));

    let record: Record = serde_json::from_slice(&session.invoke(&read("t1")).payload).unwrap();
    assert!(record.accessed);
}

#[test]
fn queries_run_alongside_writers_without_leaking_cursors() {
    let session = Arc::new(create_session());
    let barrier = Arc::new(Barrier::new(2));

    let writer = {
        let session = Arc::clone(&session);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            for i in 0..50 {
                session.invoke(&Fields::new(&format!("t{:02}", i), "alice", "a1").create());
            }
        })
    };
    let reader = {
        let session = Arc::clone(&session);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            for _ in 0..50 {
                let response = session.invoke(&by_originator("alice"));
                assert!(response.is_ok(), "{}", response.message);
                let _ = rows(&response.payload);
            }
        })
    };

    writer.join().unwrap();
    reader.join().unwrap();
    assert_eq!(session.ledger().open_cursors(), 0);
    assert_eq!(rows(&session.invoke(&by_originator("alice")).payload).len(), 50);
}
