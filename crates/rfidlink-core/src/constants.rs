//! Core constants for reader session behavior.
//!
//! This module centralizes the fixed values that drive the reader lifecycle:
//! the power placeholder used before a device reports its capabilities, the
//! tag poll batch size, the inventory retry delay, and the antenna settings
//! applied during configuration.
//!
//! # Usage
//!
//! ```
//! use rfidlink_core::constants::*;
//! use std::time::Duration;
//!
//! let delay = Duration::from_millis(INVENTORY_RETRY_DELAY_MS);
//! assert_eq!(delay.as_millis(), 500);
//!
//! fn power_in_range(level: i32) -> bool {
//!     (0..=DEFAULT_POWER_MAX as i32).contains(&level)
//! }
//! assert!(power_in_range(270));
//! ```

// ============================================================================
// Power
// ============================================================================

/// Placeholder maximum transmit power index.
///
/// Used until the connected device reports its supported power level table
/// during configuration. Replaced by `levels.len() - 1` afterwards.
pub const DEFAULT_POWER_MAX: u16 = 270;

// ============================================================================
// Inventory
// ============================================================================

/// Maximum number of buffered tag reads polled per read notification.
pub const TAG_BATCH_LIMIT: usize = 100;

/// Delay between the forced inventory stop and the single start retry.
///
/// The delay blocks the command executor; no other command runs while it
/// elapses.
pub const INVENTORY_RETRY_DELAY_MS: u64 = 500;

/// Stop trigger duration meaning "run until explicitly stopped".
pub const CONTINUOUS_STOP_DURATION_MS: u32 = 0;

// ============================================================================
// Antenna
// ============================================================================

/// Antenna that configuration and power commands target.
///
/// Only a single antenna is managed; multi-antenna arrays are not handled.
pub const PRIMARY_ANTENNA_ID: u16 = 1;

/// RF mode table index applied to the primary antenna on connect.
pub const DEFAULT_RF_MODE_TABLE_INDEX: u32 = 0;

/// Tari value applied to the primary antenna on connect.
pub const DEFAULT_TARI: u32 = 0;

// ============================================================================
// Command boundary
// ============================================================================

/// Capacity of the session command queue.
///
/// Callers await a free slot when the queue is full; commands are never
/// dropped.
pub const DEFAULT_COMMAND_QUEUE_CAPACITY: usize = 32;

/// Placeholder reported for readers without an address.
pub const ADDRESS_UNAVAILABLE: &str = "N/A";

/// Placeholder reported for readers whose model cannot be determined.
pub const UNKNOWN_MODEL: &str = "Unknown";

/// Placeholder name for discovery callbacks carrying no device name.
pub const UNKNOWN_READER_NAME: &str = "Unknown";

// A zero-capacity queue cannot be created and a zero batch never drains.
const _: () = assert!(DEFAULT_COMMAND_QUEUE_CAPACITY > 0);
const _: () = assert!(TAG_BATCH_LIMIT > 0);
