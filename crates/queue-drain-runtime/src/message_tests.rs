//! Tests for message types and addressing.

use super::*;
use chrono::Utc;

#[test]
fn queue_name_accepts_valid_names() {
    for name in ["orders", "dead_letter", "audit-2024", "billing.v2"] {
        assert!(QueueName::new(name.to_string()).is_ok(), "{name}");
    }
}

#[test]
fn queue_name_rejects_invalid_names() {
    for name in ["", "-orders", "orders-", "or--ders", "or ders", "ord@rs"] {
        assert!(QueueName::new(name.to_string()).is_err(), "{name}");
    }
}

#[test]
fn queue_address_parses_local_and_remote() {
    let local: QueueAddress = "orders".parse().unwrap();
    assert_eq!(local.queue().as_str(), "orders");
    assert_eq!(local.server(), None);

    let remote: QueueAddress = "orders@mq01".parse().unwrap();
    assert_eq!(remote.queue().as_str(), "orders");
    assert_eq!(remote.server(), Some("mq01"));
}

#[test]
fn queue_address_display_round_trips() {
    for raw in ["orders", "orders@mq01"] {
        let address: QueueAddress = raw.parse().unwrap();
        assert_eq!(address.to_string(), raw);
    }
}

#[test]
fn queue_address_rejects_empty_server() {
    assert!("orders@".parse::<QueueAddress>().is_err());
}

#[test]
fn raw_message_builder() {
    let message = RawMessage::new("hello".as_bytes().to_vec())
        .with_label("greeting")
        .with_correlation_id("corr-1")
        .with_extension(vec![1, 2, 3]);

    assert_eq!(&message.body[..], b"hello");
    assert_eq!(message.label, "greeting");
    assert_eq!(message.correlation_id.as_deref(), Some("corr-1"));
    assert_eq!(&message.extension[..], &[1, 2, 3]);
}

#[test]
fn clone_for_copy_gets_fresh_identifier() {
    let original = RawMessage::new("body".as_bytes().to_vec()).with_label("l");
    let copy = original.clone_for_copy();

    assert_ne!(copy.id, original.id);
    assert_eq!(copy.body, original.body);
    assert_eq!(copy.label, original.label);
    assert_eq!(copy.extension, original.extension);
    assert_eq!(copy.enqueued_at, original.enqueued_at);
}

#[test]
fn timestamp_ordering() {
    let earlier = Timestamp::from_datetime(Utc::now() - chrono::Duration::seconds(10));
    let later = Timestamp::now();
    assert!(earlier < later);
}
