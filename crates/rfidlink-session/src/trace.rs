//! Append-only activity trace.
//!
//! Every operation the session attempts is written here, from the command
//! executor and from driver callback threads alike. The full rendered trace
//! travels with every command result and every outward event.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tracing::debug;

/// One timestamped trace line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    pub at: DateTime<Utc>,
    pub message: String,
}

impl TraceEntry {
    fn render(&self) -> String {
        format!("{} {}", self.at.format("%H:%M:%S%.3f"), self.message)
    }
}

/// Thread-safe append-only log.
///
/// Entries are never removed or reordered. Appends from different threads
/// are atomic with respect to each other; no ordering across threads is
/// implied beyond that.
///
/// # Examples
///
/// ```
/// use rfidlink_session::Trace;
///
/// let trace = Trace::new("session created");
/// trace.record("[INIT] Initialize called");
///
/// assert_eq!(trace.len(), 2);
/// assert!(trace.snapshot().ends_with("[INIT] Initialize called"));
/// ```
#[derive(Debug)]
pub struct Trace {
    entries: Mutex<Vec<TraceEntry>>,
}

impl Trace {
    /// Create a trace whose first entry is `origin`.
    pub fn new(origin: impl Into<String>) -> Self {
        let trace = Self {
            entries: Mutex::new(Vec::new()),
        };
        trace.record(origin);
        trace
    }

    /// Append an entry stamped with the current time.
    pub fn record(&self, message: impl Into<String>) {
        let message = message.into();
        debug!(target: "rfidlink::trace", "{message}");

        self.lock().push(TraceEntry {
            at: Utc::now(),
            message,
        });
    }

    /// Render the whole trace, one entry per line.
    pub fn snapshot(&self) -> String {
        self.lock()
            .iter()
            .map(TraceEntry::render)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Copy of the raw entries.
    pub fn entries(&self) -> Vec<TraceEntry> {
        self.lock().clone()
    }

    /// Whether any entry contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lock().iter().any(|e| e.message.contains(needle))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<TraceEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
