//! Driver-callback bridge.
//!
//! The vendor SDK pushes notifications on its own threads. [`EventBridge`]
//! receives them, does the minimum synchronous work (polling the tag buffer,
//! classifying status notifications), traces it, and hands outward events to
//! the delivery queue. Nothing raised inside a callback propagates back into
//! the driver.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};

use rfidlink_core::constants::UNKNOWN_READER_NAME;
use rfidlink_core::{StatusKind, TagReading};
use rfidlink_hardware::{
    DiscoveryListener, HandheldTriggerEvent, ReaderDevice, RfidEventsListener, StatusNotification,
    TagData,
};
use serde_json::Value;
use tracing::warn;

use crate::events::EventPublisher;
use crate::trace::Trace;

/// Listener registered with the capability and with the connected reader.
pub struct EventBridge<R> {
    trace: Arc<Trace>,
    publisher: EventPublisher,
    active: RwLock<Option<R>>,
    batch_limit: usize,
}

impl<R: ReaderDevice> EventBridge<R> {
    pub(crate) fn new(trace: Arc<Trace>, publisher: EventPublisher, batch_limit: usize) -> Self {
        Self {
            trace,
            publisher,
            active: RwLock::new(None),
            batch_limit,
        }
    }

    /// Point read notifications at the connected reader, or at nothing.
    pub(crate) fn set_active(&self, reader: Option<R>) {
        *self.active.write().unwrap_or_else(PoisonError::into_inner) = reader;
    }

    fn active(&self) -> Option<R> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn poll_tags(&self) {
        let Some(reader) = self.active() else {
            return;
        };

        match reader.read_tags(self.batch_limit) {
            Ok(batch) if batch.is_empty() => {}
            Ok(batch) => {
                self.trace
                    .record(format!("[TAG_READ] Read {} tags", batch.len()));
                self.publisher
                    .tags(batch.into_iter().map(to_reading).collect());
            }
            Err(e) => {
                warn!(error = %e, "tag poll failed");
                self.trace.record(format!("[TAG_READ ERROR] {e}"));
            }
        }
    }

    fn classify_status(&self, event: StatusNotification) {
        match event {
            StatusNotification::HandheldTrigger(trigger) => {
                let (kind, pressed, message) = match trigger {
                    HandheldTriggerEvent::Pressed => {
                        (StatusKind::TriggerPressed, true, "Trigger pressed")
                    }
                    HandheldTriggerEvent::Released => {
                        (StatusKind::TriggerReleased, false, "Trigger released")
                    }
                };
                self.trace.record(format!("[STATUS] {message}"));
                self.publisher
                    .status_with(kind, message, [("pressed", Value::Bool(pressed))]);
            }
            StatusNotification::Disconnection => {
                self.trace.record("[STATUS] Reader disconnected unexpectedly");
                self.publisher.status(
                    StatusKind::Disconnected,
                    "Reader disconnected unexpectedly",
                );
            }
            StatusNotification::Other(kind) => {
                self.trace.record(format!("[STATUS] Event: {kind}"));
            }
        }
    }

    fn announce(&self, kind: StatusKind, verb: &str, name: Option<&str>) {
        let name = name.unwrap_or(UNKNOWN_READER_NAME);
        self.trace.record(format!("[DISCOVERY] Reader {verb}: {name}"));
        self.publisher.status_with(
            kind,
            format!("Reader {verb}: {name}"),
            [("readerName", Value::from(name))],
        );
    }

    /// Run a callback body, tracing any panic instead of unwinding into the
    /// driver thread.
    fn shielded(&self, label: &str, body: impl FnOnce()) {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(body)) {
            let detail = panic_message(payload.as_ref());
            warn!(callback = label, %detail, "callback panicked");
            self.trace.record(format!("[{label} ERROR] {detail}"));
        }
    }
}

impl<R: ReaderDevice> RfidEventsListener for EventBridge<R> {
    fn read_notify(&self) {
        self.shielded("TAG_READ", || self.poll_tags());
    }

    fn status_notify(&self, event: StatusNotification) {
        self.shielded("STATUS", || self.classify_status(event));
    }
}

impl<R: ReaderDevice> DiscoveryListener for EventBridge<R> {
    fn reader_appeared(&self, name: Option<&str>) {
        self.shielded("DISCOVERY", || {
            self.announce(StatusKind::ReaderAppeared, "appeared", name)
        });
    }

    fn reader_disappeared(&self, name: Option<&str>) {
        self.shielded("DISCOVERY", || {
            self.announce(StatusKind::ReaderDisappeared, "disappeared", name)
        });
    }
}

fn to_reading(tag: TagData) -> TagReading {
    TagReading {
        tag_id: tag.tag_id,
        rssi: i32::from(tag.peak_rssi),
        antenna_id: i32::from(tag.antenna_id),
        seen_count: i32::try_from(tag.seen_count).unwrap_or(i32::MAX),
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}
