//! Outward event delivery.
//!
//! Producers (the command executor and driver callback threads) push onto a
//! single unbounded queue. One delivery task drains it in order, stamps each
//! event with the trace snapshot taken at delivery time, and forwards it to
//! whichever subscriber is registered for that stream. Events published
//! while no subscriber is registered are dropped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rfidlink_core::{StatusEvent, StatusKind, TagEvent, TagReading};
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::trace::Trace;

/// Item queued for delivery, before the trace snapshot is attached.
#[derive(Debug)]
enum Outbound {
    Tags(Vec<TagReading>),
    Status {
        kind: StatusKind,
        message: String,
        extra: Map<String, Value>,
    },
}

/// Cheap, cloneable producer side of the delivery queue.
///
/// Publishing never blocks and is safe from any thread.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl EventPublisher {
    pub fn tags(&self, tags: Vec<TagReading>) {
        self.push(Outbound::Tags(tags));
    }

    pub fn status(&self, kind: StatusKind, message: impl Into<String>) {
        self.status_with(kind, message, []);
    }

    /// Publish a status event with extra top-level fields.
    pub fn status_with<'a>(
        &self,
        kind: StatusKind,
        message: impl Into<String>,
        extra: impl IntoIterator<Item = (&'a str, Value)>,
    ) {
        self.push(Outbound::Status {
            kind,
            message: message.into(),
            extra: extra
                .into_iter()
                .map(|(k, v)| (k.to_owned(), v))
                .collect(),
        });
    }

    fn push(&self, item: Outbound) {
        if self.tx.send(item).is_err() {
            trace!("delivery task gone, event discarded");
        }
    }
}

type Sink<T> = Mutex<Option<mpsc::UnboundedSender<T>>>;

#[derive(Default)]
struct Sinks {
    tags: Sink<TagEvent>,
    status: Sink<StatusEvent>,
}

impl Sinks {
    fn forward<T>(sink: &Sink<T>, event: T) {
        let mut slot = lock(sink);
        if let Some(tx) = slot.as_ref()
            && tx.send(event).is_err()
        {
            // Subscriber dropped its stream.
            *slot = None;
        }
    }
}

fn lock<T>(sink: &Sink<T>) -> MutexGuard<'_, Option<mpsc::UnboundedSender<T>>> {
    sink.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Subscription side: at most one subscriber per stream.
#[derive(Clone)]
pub struct EventStreams {
    sinks: Arc<Sinks>,
}

impl EventStreams {
    /// Subscribe to tag events, replacing any previous subscriber.
    pub fn subscribe_tags(&self) -> EventStream<TagEvent> {
        Self::subscribe(&self.sinks.tags)
    }

    /// Subscribe to status events, replacing any previous subscriber.
    pub fn subscribe_status(&self) -> EventStream<StatusEvent> {
        Self::subscribe(&self.sinks.status)
    }

    pub fn unsubscribe_tags(&self) {
        *lock(&self.sinks.tags) = None;
    }

    pub fn unsubscribe_status(&self) {
        *lock(&self.sinks.status) = None;
    }

    fn subscribe<T>(sink: &Sink<T>) -> EventStream<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        *lock(sink) = Some(tx);
        EventStream { rx }
    }
}

/// Receiving end of one event stream.
///
/// Ends (yields `None`) when a newer subscriber replaces it or the session
/// shuts down.
#[derive(Debug)]
pub struct EventStream<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> EventStream<T> {
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Take an already delivered event without waiting.
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }
}

/// Start the delivery task.
pub(crate) fn spawn_delivery(trace: Arc<Trace>) -> (EventPublisher, EventStreams, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sinks = Arc::new(Sinks::default());

    let task = tokio::spawn(deliver(rx, sinks.clone(), trace));

    (EventPublisher { tx }, EventStreams { sinks }, task)
}

async fn deliver(
    mut rx: mpsc::UnboundedReceiver<Outbound>,
    sinks: Arc<Sinks>,
    trace: Arc<Trace>,
) {
    while let Some(item) = rx.recv().await {
        let status = trace.snapshot();
        match item {
            Outbound::Tags(tags) => Sinks::forward(&sinks.tags, TagEvent::new(tags, status)),
            Outbound::Status {
                kind,
                message,
                extra,
            } => Sinks::forward(
                &sinks.status,
                StatusEvent {
                    kind,
                    message,
                    status,
                    extra,
                },
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(id: &str) -> TagReading {
        TagReading {
            tag_id: id.into(),
            rssi: -50,
            antenna_id: 1,
            seen_count: 1,
        }
    }

    #[tokio::test]
    async fn test_events_without_subscriber_are_dropped() {
        let trace = Arc::new(Trace::new("origin"));
        let (publisher, streams, _task) = spawn_delivery(trace);

        publisher.tags(vec![reading("dropped")]);
        tokio::task::yield_now().await;

        let mut tags = streams.subscribe_tags();
        publisher.tags(vec![reading("kept")]);

        let event = tags.recv().await.unwrap();
        assert_eq!(event.tags[0].tag_id, "kept");
        assert!(tags.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_status_carries_trace_at_delivery() {
        let trace = Arc::new(Trace::new("origin"));
        let (publisher, streams, _task) = spawn_delivery(trace.clone());
        let mut status = streams.subscribe_status();

        trace.record("[CONNECT] Connected");
        publisher.status_with(
            StatusKind::Connected,
            "Connected to ReaderB",
            [("readerName", Value::from("ReaderB"))],
        );

        let event = status.recv().await.unwrap();
        assert_eq!(event.kind, StatusKind::Connected);
        assert_eq!(event.extra("readerName"), Some(&Value::from("ReaderB")));
        assert!(event.status.contains("[CONNECT] Connected"));
    }

    #[tokio::test]
    async fn test_resubscribe_closes_previous_stream() {
        let trace = Arc::new(Trace::new("origin"));
        let (publisher, streams, _task) = spawn_delivery(trace);

        let mut first = streams.subscribe_status();
        let mut second = streams.subscribe_status();

        publisher.status(StatusKind::Initializing, "Starting SDK initialization...");

        assert!(first.recv().await.is_none());
        assert_eq!(
            second.recv().await.unwrap().kind,
            StatusKind::Initializing
        );
    }

    #[tokio::test]
    async fn test_delivery_preserves_publish_order() {
        let trace = Arc::new(Trace::new("origin"));
        let (publisher, streams, _task) = spawn_delivery(trace);
        let mut tags = streams.subscribe_tags();

        for i in 0..20 {
            publisher.tags(vec![reading(&format!("tag-{i}"))]);
        }

        for i in 0..20 {
            let event = tags.recv().await.unwrap();
            assert_eq!(event.tags[0].tag_id, format!("tag-{i}"));
        }
    }
}
