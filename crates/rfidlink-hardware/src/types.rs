//! Types exchanged with the reader capability.
//!
//! These mirror the vendor SDK's configuration surface closely enough for the
//! session to drive it: event subscription flags, trigger configuration,
//! antenna RF settings, singulation control, and raw tag data.

use serde::{Deserialize, Serialize};

pub use rfidlink_core::TransportKind;

/// A reader found by discovery.
///
/// The handle is the vendor's device object; the session treats it as
/// opaque and only calls [`ReaderDevice`](crate::traits::ReaderDevice)
/// methods on it.
#[derive(Debug, Clone)]
pub struct DiscoveredReader<R> {
    /// Device name as advertised during discovery.
    pub name: String,

    /// Link address (MAC, port path), if the transport has one.
    pub address: Option<String>,

    /// Transport the reader was discovered on.
    pub transport: TransportKind,

    /// Vendor device handle.
    pub handle: R,
}

impl<R> DiscoveredReader<R> {
    /// Create a new discovered reader without an address.
    pub fn new(name: impl Into<String>, transport: TransportKind, handle: R) -> Self {
        Self {
            name: name.into(),
            address: None,
            transport,
            handle,
        }
    }

    /// Set the address.
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Case-insensitive substring match against the reader name.
    pub fn name_matches(&self, query: &str) -> bool {
        self.name.to_lowercase().contains(&query.to_lowercase())
    }
}

/// A buffered tag read as reported by the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagData {
    /// EPC / tag identifier as hex.
    pub tag_id: String,

    /// Peak RSSI in dBm.
    pub peak_rssi: i16,

    /// Antenna that observed the tag.
    pub antenna_id: u16,

    /// Number of times the tag was seen since the last poll.
    pub seen_count: u32,
}

impl TagData {
    pub fn new(tag_id: impl Into<String>, peak_rssi: i16, antenna_id: u16, seen_count: u32) -> Self {
        Self {
            tag_id: tag_id.into(),
            peak_rssi,
            antenna_id,
            seen_count,
        }
    }
}

/// Device event categories delivered through the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventSubscriptions {
    pub handheld_trigger: bool,
    pub tag_read: bool,

    /// Embed tag payloads in read notifications instead of polling.
    pub attach_tag_data_with_read_event: bool,

    pub reader_disconnect: bool,
}

impl EventSubscriptions {
    /// Trigger, tag-read and disconnect events; tag data is polled.
    pub fn session_default() -> Self {
        Self {
            handheld_trigger: true,
            tag_read: true,
            attach_tag_data_with_read_event: false,
            reader_disconnect: true,
        }
    }
}

/// Whether the handheld trigger drives RFID or barcode scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerMode {
    Rfid,
    Barcode,
}

/// When an inventory round starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartTrigger {
    /// As soon as inventory is requested.
    Immediate,

    /// On handheld trigger press.
    Handheld,
}

/// When an inventory round stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopTrigger {
    /// After the given duration; zero means run until explicitly stopped.
    Duration { milliseconds: u32 },

    /// On handheld trigger release.
    Handheld,
}

impl StopTrigger {
    /// Whether the inventory runs until an explicit stop.
    pub fn is_continuous(&self) -> bool {
        matches!(self, Self::Duration { milliseconds: 0 })
    }
}

/// Per-antenna RF settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AntennaRfConfig {
    /// Index into the device's transmit power table.
    pub transmit_power_index: u16,

    pub rf_mode_table_index: u32,

    pub tari: u32,
}

/// Air-interface session used for singulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SingulationSession {
    #[default]
    S0,
    S1,
    S2,
    S3,
}

/// Inventoried flag targeted by an inventory round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InventoryState {
    #[default]
    A,
    B,
    AbFlip,
}

/// Select flag filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SlFlag {
    #[default]
    All,
    Asserted,
    Deasserted,
}

/// Singulation control for one antenna.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SingulationControl {
    pub session: SingulationSession,
    pub inventory_state: InventoryState,
    pub sl_flag: SlFlag,
}

/// Handheld trigger state reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandheldTriggerEvent {
    Pressed,
    Released,
}

/// Status notification pushed by the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusNotification {
    /// Handheld trigger pressed or released.
    HandheldTrigger(HandheldTriggerEvent),

    /// The link to the reader dropped without a disconnect request.
    Disconnection,

    /// Any other vendor status category (battery, temperature, ...).
    Other(String),
}
