//! Reader capability trait definitions.
//!
//! These traits are the contract between the reader session and the vendor
//! SDK. [`ReaderCapability`] is the enumeration side (open a transport, list
//! readers, watch for readers appearing); [`ReaderDevice`] is a handle to one
//! physical reader. The two listener traits are the push side: the device
//! calls them from its own threads.
//!
//! Async methods are declared as `fn ... -> impl Future + Send` so the session
//! can drive a generic capability from a spawned Tokio task. Implementations
//! may still write them as plain `async fn`.

use std::future::Future;
use std::sync::Arc;

use crate::error::Result;
use crate::types::{
    AntennaRfConfig, DiscoveredReader, EventSubscriptions, SingulationControl, StartTrigger,
    StatusNotification, StopTrigger, TagData, TransportKind, TriggerMode,
};

/// Receiver for device-pushed events.
///
/// Called from arbitrary driver threads, concurrently with any command the
/// session is running. Implementations must not block and must not panic
/// back into the caller.
pub trait RfidEventsListener: Send + Sync {
    /// Buffered tag reads are available; poll them with
    /// [`ReaderDevice::read_tags`].
    fn read_notify(&self);

    /// The device status changed.
    fn status_notify(&self, event: StatusNotification);
}

/// Receiver for readers appearing and disappearing on the transport.
pub trait DiscoveryListener: Send + Sync {
    fn reader_appeared(&self, name: Option<&str>);

    fn reader_disappeared(&self, name: Option<&str>);
}

/// Enumeration side of the vendor SDK.
///
/// # Examples
///
/// ```no_run
/// use rfidlink_hardware::traits::ReaderCapability;
/// use rfidlink_hardware::types::TransportKind;
/// use rfidlink_hardware::Result;
///
/// async fn first_bluetooth_reader<C: ReaderCapability>(cap: &mut C) -> Result<Option<String>> {
///     cap.open(TransportKind::Bluetooth).await?;
///     let readers = cap.available_readers().await?;
///     Ok(readers.first().map(|r| r.name.clone()))
/// }
/// ```
pub trait ReaderCapability: Send + 'static {
    /// Handle type for a discovered reader.
    type Device: ReaderDevice;

    /// Acquire the enumeration interface for a transport, replacing any
    /// previously opened one.
    fn open(&mut self, transport: TransportKind) -> impl Future<Output = Result<()>> + Send;

    /// List readers reachable over the opened transport.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::InvalidUsage`](crate::CapabilityError::InvalidUsage)
    /// if no transport has been opened.
    fn available_readers(
        &mut self,
    ) -> impl Future<Output = Result<Vec<DiscoveredReader<Self::Device>>>> + Send;

    /// Register for reader appeared/disappeared callbacks. Registering the
    /// same listener twice has no additional effect.
    fn attach_discovery_listener(&mut self, listener: Arc<dyn DiscoveryListener>);

    /// Release the enumeration interface. Safe to call repeatedly.
    fn dispose(&mut self);
}

/// Handle to one physical reader.
///
/// Handles are cheap to clone and share the same underlying device; the
/// session keeps one in its state and one in the event bridge.
pub trait ReaderDevice: Clone + Send + Sync + 'static {
    /// Host name reported by the device.
    fn host_name(&self) -> String;

    /// Model string, if the device reports one.
    fn model(&self) -> Result<Option<String>>;

    fn is_connected(&self) -> bool;

    fn connect(&self) -> impl Future<Output = Result<()>> + Send;

    fn disconnect(&self) -> impl Future<Output = Result<()>> + Send;

    fn add_events_listener(&self, listener: Arc<dyn RfidEventsListener>) -> Result<()>;

    /// Remove a listener previously added, matched by identity.
    fn remove_events_listener(&self, listener: &Arc<dyn RfidEventsListener>) -> Result<()>;

    fn set_event_subscriptions(
        &self,
        subscriptions: EventSubscriptions,
    ) -> impl Future<Output = Result<()>> + Send;

    fn set_trigger_mode(&self, mode: TriggerMode) -> impl Future<Output = Result<()>> + Send;

    fn set_start_trigger(&self, trigger: StartTrigger)
    -> impl Future<Output = Result<()>> + Send;

    fn set_stop_trigger(&self, trigger: StopTrigger) -> impl Future<Output = Result<()>> + Send;

    /// Supported transmit power table, one entry per power step.
    fn transmit_power_levels(&self) -> Result<Vec<u16>>;

    fn antenna_rf_config(
        &self,
        antenna: u16,
    ) -> impl Future<Output = Result<AntennaRfConfig>> + Send;

    fn set_antenna_rf_config(
        &self,
        antenna: u16,
        config: AntennaRfConfig,
    ) -> impl Future<Output = Result<()>> + Send;

    fn singulation_control(
        &self,
        antenna: u16,
    ) -> impl Future<Output = Result<SingulationControl>> + Send;

    fn set_singulation_control(
        &self,
        antenna: u16,
        control: SingulationControl,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Remove every device-side pre-filter.
    fn delete_all_prefilters(&self) -> impl Future<Output = Result<()>> + Send;

    /// Start inventory using the configured triggers.
    fn perform_inventory(&self) -> impl Future<Output = Result<()>> + Send;

    fn stop_inventory(&self) -> impl Future<Output = Result<()>> + Send;

    /// Drain up to `max` buffered tag reads.
    ///
    /// Synchronous: it is called from the listener's notification thread.
    fn read_tags(&self, max: usize) -> Result<Vec<TagData>>;
}
