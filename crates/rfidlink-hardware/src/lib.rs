//! Reader capability abstraction layer for rfidlink.
//!
//! This crate defines the boundary between the reader session and the vendor
//! RFID SDK. The SDK is treated as an opaque capability: it enumerates readers
//! per transport, connects and configures a reader, runs inventory, and pushes
//! tag and status notifications back through listener callbacks.
//!
//! # Design Philosophy
//!
//! - **Async-first**: device operations return `Send` futures so a generic
//!   capability can be driven from a spawned Tokio task.
//! - **Push callbacks stay synchronous**: listeners are invoked from the
//!   vendor's driver threads and poll buffered tags synchronously.
//! - **Categorized faults**: [`CapabilityError`] distinguishes usage faults,
//!   operation failures and everything else; the session's retry and skip
//!   rules key off that distinction.
//!
//! # Reader Lifecycle
//!
//! ```no_run
//! use rfidlink_hardware::traits::{ReaderCapability, ReaderDevice};
//! use rfidlink_hardware::types::TransportKind;
//! use rfidlink_hardware::Result;
//!
//! async fn run_once<C: ReaderCapability>(cap: &mut C) -> Result<()> {
//!     cap.open(TransportKind::Bluetooth).await?;
//!     let readers = cap.available_readers().await?;
//!
//!     if let Some(reader) = readers.first() {
//!         reader.handle.connect().await?;
//!         reader.handle.perform_inventory().await?;
//!         let tags = reader.handle.read_tags(100)?;
//!         println!("{} tags", tags.len());
//!         reader.handle.stop_inventory().await?;
//!         reader.handle.disconnect().await?;
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Mock Implementations
//!
//! [`mock::MockCapability`] and [`mock::MockReader`] simulate the SDK for
//! development and testing, including fault injection and driver-thread
//! callbacks.

pub mod error;
pub mod mock;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{CapabilityError, FaultCategory, Result};
pub use traits::{DiscoveryListener, ReaderCapability, ReaderDevice, RfidEventsListener};
pub use types::{
    AntennaRfConfig, DiscoveredReader, EventSubscriptions, HandheldTriggerEvent, InventoryState,
    SingulationControl, SingulationSession, SlFlag, StartTrigger, StatusNotification, StopTrigger,
    TagData, TransportKind, TriggerMode,
};
