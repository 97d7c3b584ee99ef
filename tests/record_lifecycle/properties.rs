//! Lifecycle properties over generated records.

use proptest::prelude::*;
use sealbook::{Error, Invocation, Record};

use crate::common::*;

const FIELD_KEYS: [&str; 7] = [
    "name",
    "description",
    "originator",
    "recipient",
    "authorization",
    "location",
    "key-material",
];

fn fields_strategy() -> impl Strategy<Value = Fields> {
    (
        "[a-z][a-z0-9_-]{0,11}",
        "[ -~]{1,24}",
        "[A-Za-z]{1,8}",
        "[A-Za-z]{1,8}",
        "[a-z0-9~ ]{1,8}",
        "[ -~]{1,16}",
        "[A-Za-z0-9+/=]{1,16}",
    )
        .prop_map(
            |(name, description, originator, recipient, authorization, location, key_material)| {
                Fields {
                    name,
                    description,
                    originator,
                    recipient,
                    authorization,
                    location,
                    key_material,
                }
            },
        )
}

fn read_record(session: &sealbook::Session, name: &str) -> Record {
    let response = session.invoke(&read(name));
    assert!(response.is_ok(), "{}", response.message);
    serde_json::from_slice(&response.payload).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn create_then_read_returns_supplied_fields(fields in fields_strategy()) {
        let session = create_session();
        prop_assert!(session.invoke(&fields.create()).is_ok());

        let record = read_record(&session, &fields.name);
        prop_assert_eq!(&record.kind, "record");
        prop_assert_eq!(&record.name, &fields.name);
        prop_assert_eq!(&record.description, &fields.description);
        prop_assert_eq!(&record.originator, &fields.originator);
        prop_assert_eq!(&record.recipient, &fields.recipient);
        prop_assert_eq!(&record.authorization, &fields.authorization);
        prop_assert!(!record.accessed);
    }

    #[test]
    fn second_create_is_rejected_and_first_kept(
        first in fields_strategy(),
        second in fields_strategy(),
    ) {
        let session = create_session();
        let second = Fields { name: first.name.clone(), ..second };
        session.invoke(&first.create());
        let before = session.invoke(&read(&first.name)).payload;

        let err = session.try_invoke(&second.create()).unwrap_err();
        prop_assert_eq!(err, Error::AlreadyExists { name: first.name.clone() });
        prop_assert_eq!(session.invoke(&read(&first.name)).payload, before);
    }

    #[test]
    fn missing_or_empty_field_writes_nothing(
        fields in fields_strategy(),
        field in 0..FIELD_KEYS.len(),
        remove in any::<bool>(),
    ) {
        let session = create_session();
        let mut payload = fields.to_json();
        let object = payload.as_object_mut().unwrap();
        if remove {
            object.remove(FIELD_KEYS[field]);
        } else {
            object.insert(FIELD_KEYS[field].to_string(), serde_json::json!(""));
        }
        let inv = Invocation::new("create-record")
            .transient("record-create", payload.to_string().into_bytes());

        let is_validation = matches!(session.try_invoke(&inv), Err(Error::Validation { .. }));
        prop_assert!(is_validation);
        prop_assert!(session.ledger().is_empty());
        let is_not_found = matches!(
            session.try_invoke(&read(&fields.name)),
            Err(Error::NotFound { .. }) | Err(Error::Validation { .. })
        );
        prop_assert!(is_not_found);
    }

    #[test]
    fn mark_accessed_twice_is_harmless(fields in fields_strategy()) {
        let session = create_session();
        session.invoke(&fields.create());

        prop_assert!(session.invoke(&mark_accessed(&fields.name)).is_ok());
        prop_assert!(read_record(&session, &fields.name).accessed);
        prop_assert!(session.invoke(&mark_accessed(&fields.name)).is_ok());
        prop_assert!(read_record(&session, &fields.name).accessed);
    }

    #[test]
    fn delete_removes_every_trace(fields in fields_strategy()) {
        let session = create_session();
        session.invoke(&fields.create());
        prop_assert!(session.invoke(&delete(&fields.name)).is_ok());

        let read_gone = matches!(session.try_invoke(&read(&fields.name)), Err(Error::NotFound { .. }));
        let detail_gone = matches!(
            session.try_invoke(&read_detail(&fields.name)),
            Err(Error::NotFound { .. })
        );
        prop_assert!(read_gone);
        prop_assert!(detail_gone);
        let indexed = rows(&session.invoke(&by_authorization(&fields.authorization)).payload);
        prop_assert!(indexed.is_empty());
        prop_assert!(session.ledger().is_empty());

        let again = matches!(session.try_invoke(&delete(&fields.name)), Err(Error::NotFound { .. }));
        prop_assert!(again);
    }

    #[test]
    fn query_preserves_order_and_stored_bytes(
        names in proptest::collection::btree_set("[a-z]{1,6}", 0..8),
    ) {
        let session = create_session();
        for name in &names {
            session.invoke(&Fields::new(name, "alice", "a1").create());
        }
        session.invoke(&Fields::new("zz-other", "carol", "a1").create());

        let response = session.invoke(&by_originator("alice"));
        prop_assert!(response.is_ok());
        if names.is_empty() {
            prop_assert_eq!(response.payload, b"[]".to_vec());
        } else {
            let mut expected = b"[".to_vec();
            for (i, name) in names.iter().enumerate() {
                if i > 0 {
                    expected.push(b',');
                }
                expected.extend_from_slice(format!(r#"{{"Key":"{}","Record":"#, name).as_bytes());
                expected.extend_from_slice(&session.ledger().get("collectionRecords", name).unwrap());
                expected.push(b'}');
            }
            expected.push(b']');
            prop_assert_eq!(response.payload, expected);
        }
    }
}

#[test]
fn delete_removes_entry_created_under_original_authorization() {
    let session = create_session();
    session.invoke(&Fields::new("t1", "alice", "a1").create());
    session.invoke(&Fields::new("t2", "alice", "a1").create());
    assert_eq!(rows(&session.invoke(&by_authorization("a1")).payload).len(), 2);

    session.invoke(&delete("t1"));

    let remaining = rows(&session.invoke(&by_authorization("a1")).payload);
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].key, "t2");
    assert_eq!(remaining[0].record.authorization, "a1");
}

#[test]
fn walkthrough_create_access_delete() {
    let session = create_session();
    let fields = Fields::new("t1", "alice", "a1");

    assert!(session.invoke(&fields.create()).is_ok());
    let found = rows(&session.invoke(&by_originator("alice")).payload);
    assert_eq!(found.len(), 1);
    assert!(!found[0].record.accessed);

    assert!(session.invoke(&mark_accessed("t1")).is_ok());
    let found = rows(&session.invoke(&by_originator("alice")).payload);
    assert!(found[0].record.accessed);

    let detail: serde_json::Value =
        serde_json::from_slice(&session.invoke(&read_detail("t1")).payload).unwrap();
    assert_eq!(detail["key-material"], "k");

    assert!(session.invoke(&delete("t1")).is_ok());
    assert_eq!(session.invoke(&by_originator("alice")).payload, b"[]".to_vec());
}
