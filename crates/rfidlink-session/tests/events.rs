mod common;

use common::{Rig, next_status, next_tags, tag, tags};
use rfidlink_core::{StatusKind, TagEventKind};
use rfidlink_hardware::{HandheldTriggerEvent, StatusNotification};
use serde_json::Value;

#[tokio::test]
async fn test_initialize_emits_progress_events() {
    let rig = Rig::new();
    let mut status = rig.session.subscribe_status();

    rig.session.initialize().await.unwrap();

    let first = status.recv().await.unwrap();
    assert_eq!(first.kind, StatusKind::Initializing);
    assert_eq!(first.message, "Starting SDK initialization...");

    let ready = status.recv().await.unwrap();
    assert_eq!(ready.kind, StatusKind::Initialized);
    assert_eq!(ready.message, "SDK ready - 2 reader(s)");
}

#[tokio::test]
async fn test_tag_batch_in_capability_order() {
    let rig = Rig::connected().await;
    let mut stream = rig.session.subscribe_tags();
    rig.session.start_inventory().await.unwrap();

    rig.reader_a
        .notify_tags(vec![tag("E2001"), tag("E2002"), tag("E2003")]);

    let event = next_tags(&mut stream).await;
    assert_eq!(event.kind, TagEventKind::TagRead);
    let ids: Vec<_> = event.tags.iter().map(|t| t.tag_id.as_str()).collect();
    assert_eq!(ids, ["E2001", "E2002", "E2003"]);
    assert!(event.status.contains("[TAG_READ] Read 3 tags"));
    assert!(event.status.contains("[START_INV] Inventory started"));
}

#[tokio::test]
async fn test_large_buffer_is_polled_in_bounded_batches() {
    let rig = Rig::connected().await;
    let mut stream = rig.session.subscribe_tags();

    rig.reader_a.notify_tags(tags(150));
    let first = next_tags(&mut stream).await;
    assert_eq!(first.tags.len(), 100);
    assert_eq!(rig.reader_a.buffered_tags(), 50);

    rig.reader_a.fire_read_notify();
    let second = next_tags(&mut stream).await;
    assert_eq!(second.tags.len(), 50);
    assert_eq!(second.tags[0].tag_id, "E28000000100");
}

#[tokio::test]
async fn test_empty_poll_emits_nothing() {
    let rig = Rig::connected().await;
    let mut stream = rig.session.subscribe_tags();

    rig.reader_a.fire_read_notify();
    rig.reader_a.fire_read_notify();
    rig.reader_a.notify_tags(vec![tag("E2009")]);

    let event = next_tags(&mut stream).await;
    assert_eq!(event.tags.len(), 1);
    assert_eq!(event.tags[0].tag_id, "E2009");
    assert!(stream.try_recv().is_none());
}

#[tokio::test]
async fn test_no_tag_events_after_disconnect() {
    let rig = Rig::connected().await;
    let mut stream = rig.session.subscribe_tags();
    rig.session.disconnect().await.unwrap();

    rig.reader_a.notify_tags(vec![tag("E2001")]);
    assert_eq!(rig.reader_a.buffered_tags(), 1);

    // A status round-trip flushes the delivery queue.
    let mut status = rig.session.subscribe_status();
    rig.session.initialize().await.unwrap();
    next_status(&mut status, StatusKind::Initialized).await;
    assert!(stream.try_recv().is_none());
}

#[tokio::test]
async fn test_trigger_events() {
    let rig = Rig::connected().await;
    let mut status = rig.session.subscribe_status();

    rig.reader_a
        .fire_status(StatusNotification::HandheldTrigger(HandheldTriggerEvent::Pressed));
    rig.reader_a
        .fire_status(StatusNotification::HandheldTrigger(HandheldTriggerEvent::Released));

    let pressed = next_status(&mut status, StatusKind::TriggerPressed).await;
    assert_eq!(pressed.extra("pressed"), Some(&Value::Bool(true)));

    let released = next_status(&mut status, StatusKind::TriggerReleased).await;
    assert_eq!(released.extra("pressed"), Some(&Value::Bool(false)));
}

#[tokio::test]
async fn test_unsolicited_disconnect_event() {
    let rig = Rig::connected().await;
    let mut status = rig.session.subscribe_status();

    rig.reader_a.drop_connection();

    let event = next_status(&mut status, StatusKind::Disconnected).await;
    assert_eq!(event.message, "Reader disconnected unexpectedly");
    assert!(!rig.session.is_connected().await.unwrap().payload);
}

#[tokio::test]
async fn test_discovery_events_after_initialize() {
    let rig = Rig::new();
    let mut status = rig.session.subscribe_status();
    rig.session.initialize().await.unwrap();
    assert_eq!(rig.capability.discovery_listener_count(), 1);

    rig.capability.reader_appeared(Some("RFD40+_2140"));
    rig.capability.reader_disappeared(None);

    let appeared = next_status(&mut status, StatusKind::ReaderAppeared).await;
    assert_eq!(appeared.extra("readerName"), Some(&Value::from("RFD40+_2140")));
    assert_eq!(appeared.message, "Reader appeared: RFD40+_2140");

    let gone = next_status(&mut status, StatusKind::ReaderDisappeared).await;
    assert_eq!(gone.extra("readerName"), Some(&Value::from("Unknown")));
}

#[tokio::test]
async fn test_new_subscriber_replaces_old() {
    let rig = Rig::connected().await;
    let mut old = rig.session.subscribe_tags();
    let mut current = rig.session.subscribe_tags();

    rig.reader_a.notify_tags(vec![tag("E2001")]);

    assert!(old.recv().await.is_none());
    assert_eq!(next_tags(&mut current).await.tags[0].tag_id, "E2001");
}

#[tokio::test]
async fn test_events_while_unsubscribed_are_dropped() {
    let rig = Rig::connected().await;
    let mut stream = rig.session.subscribe_tags();
    rig.session.unsubscribe_tags();

    rig.reader_a.notify_tags(vec![tag("E2001")]);
    assert!(stream.recv().await.is_none());

    let mut stream = rig.session.subscribe_tags();
    rig.reader_a.notify_tags(vec![tag("E2002")]);
    assert_eq!(next_tags(&mut stream).await.tags[0].tag_id, "E2002");
}

#[tokio::test]
async fn test_status_event_wire_shape() {
    let rig = Rig::new();
    let mut status = rig.session.subscribe_status();
    rig.session.initialize().await.unwrap();
    rig.session.connect(Some("ReaderB")).await.unwrap();

    let event = next_status(&mut status, StatusKind::Connected).await;
    let wire = serde_json::to_value(&event).unwrap();

    assert_eq!(wire["type"], "connected");
    assert_eq!(wire["message"], "Connected to ReaderB");
    assert_eq!(wire["readerName"], "ReaderB");
    assert!(
        wire["status"]
            .as_str()
            .unwrap()
            .contains("[CONNECT] Connected to ReaderB")
    );
}
