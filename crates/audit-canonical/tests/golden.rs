use audit_canonical::{canonicalize, canonicalize_value, hash_canonical, Hash, Timestamp};
use serde::Serialize;
use serde_json::json;

#[derive(Serialize, Clone)]
struct Event {
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    actor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<Timestamp>,
    #[serde(skip)]
    #[allow(dead_code)]
    local_only: u32,
}

#[derive(Serialize)]
struct ReorderedEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    actor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

#[test]
fn canonical_keys_are_sorted_without_whitespace() {
    let event = Event {
        message: Some("m".into()),
        actor: Some("a".into()),
        timestamp: None,
        local_only: 7,
    };

    assert_eq!(
        canonicalize(&event).unwrap(),
        br#"{"actor":"a","message":"m"}"#.to_vec()
    );
}

#[test]
fn canonical_output_ignores_declaration_order() {
    let event = Event {
        message: Some("m".into()),
        actor: Some("a".into()),
        timestamp: None,
        local_only: 0,
    };
    let reordered = ReorderedEvent {
        actor: Some("a".into()),
        message: Some("m".into()),
    };

    assert_eq!(
        canonicalize(&event).unwrap(),
        canonicalize(&reordered).unwrap()
    );
    assert_eq!(
        canonicalize(&event).unwrap(),
        canonicalize(&event.clone()).unwrap()
    );
}

#[test]
fn envelope_hash_matches_service_digest() {
    let envelope = json!({"event": {"message": "test"}});
    let hash = hash_canonical(&envelope).unwrap();

    assert_eq!(
        hash,
        Hash::from_hex("9c9c3b5a627cce035d517c14c10779656e900532bf6e76a5d2c69148e45fdb8d").unwrap()
    );
}

#[test]
fn timestamps_use_microsecond_utc_form() {
    let event = Event {
        message: Some("m".into()),
        actor: None,
        timestamp: Some(Timestamp::parse("2022-10-11T12:13:14.5").unwrap()),
        local_only: 0,
    };

    assert_eq!(
        canonicalize(&event).unwrap(),
        br#"{"message":"m","timestamp":"2022-10-11T12:13:14.500000Z"}"#.to_vec()
    );
}

#[test]
fn null_members_are_treated_as_absent() {
    let with_null = json!({"event": {"message": "test", "actor": null}, "signature": null});
    let without = json!({"event": {"message": "test"}});

    assert_eq!(
        canonicalize_value(&with_null).unwrap(),
        canonicalize_value(&without).unwrap()
    );
}
