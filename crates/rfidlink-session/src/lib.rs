//! Reader session for rfidlink.
//!
//! [`ReaderSession`] owns the lifecycle of one RFID reader: discovery across
//! transports, connect and configure, inventory, antenna power and teardown.
//! Commands are serialized through a single executor task. Driver callbacks
//! are bridged into two ordered outward streams (tag reads and status), and
//! every command result and event carries the session's activity [`Trace`].
//!
//! # Example
//!
//! ```
//! use rfidlink_hardware::mock::{MockCapability, MockReader};
//! use rfidlink_hardware::TransportKind;
//! use rfidlink_session::{ReaderSession, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let (capability, handle) = MockCapability::new();
//!     handle.add_reader(TransportKind::Serial, MockReader::new("ReaderA"), None);
//!
//!     let session = ReaderSession::spawn(capability, SessionConfig::default());
//!     let mut status = session.subscribe_status();
//!
//!     session.initialize().await.unwrap();
//!     session.connect(Some("readera")).await.unwrap();
//!     session.start_inventory().await.unwrap();
//!
//!     while let Some(event) = status.recv().await {
//!         if event.kind == rfidlink_core::StatusKind::InventoryStarted {
//!             break;
//!         }
//!     }
//!
//!     session.shutdown().await;
//! }
//! ```

pub mod bridge;
pub mod config;
pub mod events;
mod executor;
pub mod method;
pub mod session;
pub mod state;
pub mod trace;

pub use bridge::EventBridge;
pub use config::{SessionConfig, TransientFaultPredicate};
pub use events::{EventPublisher, EventStream, EventStreams};
pub use method::{MethodCall, MethodError, MethodResult, dispatch};
pub use session::ReaderSession;
pub use state::SessionPhase;
pub use trace::{Trace, TraceEntry};
