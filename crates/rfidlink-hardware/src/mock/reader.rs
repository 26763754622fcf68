//! Mock reader device for testing and development.
//!
//! [`MockReader`] keeps all device state behind a shared lock so clones
//! observe the same device: the session holds one clone, the test holds
//! another to inject tags, status notifications and faults.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::{CapabilityError, Result};
use crate::traits::{ReaderDevice, RfidEventsListener};
use crate::types::{
    AntennaRfConfig, EventSubscriptions, InventoryState, SingulationControl, SingulationSession,
    SlFlag, StartTrigger, StatusNotification, StopTrigger, TagData, TriggerMode,
};

/// Number of transmit power steps reported by default (0..=299).
const DEFAULT_POWER_STEPS: u16 = 300;

/// Operations recorded by the mock, in call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    Model,
    /// Only honored by [`MockReader::panic_next`]; status checks are not logged.
    IsConnected,
    Connect,
    Disconnect,
    AddEventsListener,
    RemoveEventsListener,
    SetEventSubscriptions,
    SetTriggerMode,
    SetStartTrigger,
    SetStopTrigger,
    TransmitPowerLevels,
    GetAntennaRfConfig,
    SetAntennaRfConfig,
    GetSingulationControl,
    SetSingulationControl,
    DeleteAllPrefilters,
    PerformInventory,
    StopInventory,
    ReadTags,
}

impl MockOperation {
    fn requires_connection(&self) -> bool {
        !matches!(
            self,
            Self::Model
                | Self::IsConnected
                | Self::Connect
                | Self::Disconnect
                | Self::AddEventsListener
                | Self::RemoveEventsListener
                | Self::TransmitPowerLevels
        )
    }
}

struct ReaderState {
    host_name: String,
    model: Option<String>,
    connected: bool,
    connect_leaves_disconnected: bool,
    inventory_running: bool,
    power_levels: Vec<u16>,
    antenna: AntennaRfConfig,
    singulation: SingulationControl,
    subscriptions: Option<EventSubscriptions>,
    trigger_mode: Option<TriggerMode>,
    start_trigger: Option<StartTrigger>,
    stop_trigger: Option<StopTrigger>,
    prefilters: usize,
    listeners: Vec<Arc<dyn RfidEventsListener>>,
    tag_buffer: VecDeque<TagData>,
    faults: HashMap<MockOperation, VecDeque<CapabilityError>>,
    panics: HashMap<MockOperation, usize>,
    calls: Vec<MockOperation>,
    op_delay: Duration,
    in_flight: usize,
    max_in_flight: usize,
}

/// Mock reader device.
///
/// # Examples
///
/// ```
/// use rfidlink_hardware::mock::MockReader;
/// use rfidlink_hardware::traits::ReaderDevice;
/// use rfidlink_hardware::types::TagData;
///
/// #[tokio::main]
/// async fn main() -> rfidlink_hardware::Result<()> {
///     let reader = MockReader::new("RFD4031");
///     reader.connect().await?;
///
///     reader.push_tags(vec![TagData::new("E2801160", -48, 1, 2)]);
///     let tags = reader.read_tags(100)?;
///     assert_eq!(tags.len(), 1);
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct MockReader {
    state: Arc<Mutex<ReaderState>>,
}

impl MockReader {
    /// Create a disconnected mock reader with a 300-step power table.
    pub fn new(host_name: impl Into<String>) -> Self {
        let state = ReaderState {
            host_name: host_name.into(),
            model: None,
            connected: false,
            connect_leaves_disconnected: false,
            inventory_running: false,
            power_levels: (0..DEFAULT_POWER_STEPS).collect(),
            antenna: AntennaRfConfig {
                transmit_power_index: 100,
                rf_mode_table_index: 4,
                tari: 25,
            },
            singulation: SingulationControl {
                session: SingulationSession::S2,
                inventory_state: InventoryState::B,
                sl_flag: SlFlag::Asserted,
            },
            subscriptions: None,
            trigger_mode: None,
            start_trigger: None,
            stop_trigger: None,
            prefilters: 0,
            listeners: Vec::new(),
            tag_buffer: VecDeque::new(),
            faults: HashMap::new(),
            panics: HashMap::new(),
            calls: Vec::new(),
            op_delay: Duration::ZERO,
            in_flight: 0,
            max_in_flight: 0,
        };

        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Set the model string reported by [`ReaderDevice::model`].
    pub fn with_model(self, model: impl Into<String>) -> Self {
        self.lock().model = Some(model.into());
        self
    }

    /// Replace the transmit power table with `steps` entries.
    pub fn with_power_steps(self, steps: u16) -> Self {
        self.lock().power_levels = (0..steps).collect();
        self
    }

    /// Make every async operation take `delay` to complete.
    pub fn with_operation_delay(self, delay: Duration) -> Self {
        self.lock().op_delay = delay;
        self
    }

    /// Make `connect()` succeed without the link coming up.
    pub fn with_connect_leaving_disconnected(self) -> Self {
        self.lock().connect_leaves_disconnected = true;
        self
    }

    /// Queue a fault returned by the next call of `operation`.
    ///
    /// Faults queue up: two calls queue two consecutive failures.
    pub fn fail_next(&self, operation: MockOperation, error: CapabilityError) {
        self.lock()
            .faults
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    /// Make the next call of `operation` panic, simulating a driver crash.
    pub fn panic_next(&self, operation: MockOperation) {
        *self.lock().panics.entry(operation).or_default() += 1;
    }

    /// Install pre-filters, to observe that configuration clears them.
    pub fn add_prefilters(&self, count: usize) {
        self.lock().prefilters += count;
    }

    /// Append tags to the device buffer without notifying listeners.
    pub fn push_tags(&self, tags: Vec<TagData>) {
        self.lock().tag_buffer.extend(tags);
    }

    /// Append tags and fire a read notification from a driver thread.
    pub fn notify_tags(&self, tags: Vec<TagData>) {
        self.push_tags(tags);
        self.fire_read_notify();
    }

    /// Fire a read notification from a driver thread and wait for the
    /// listeners to return.
    pub fn fire_read_notify(&self) {
        let listeners = self.lock().listeners.clone();
        Self::on_driver_thread(move || {
            for listener in &listeners {
                listener.read_notify();
            }
        });
    }

    /// Fire a status notification from a driver thread and wait for the
    /// listeners to return.
    pub fn fire_status(&self, event: StatusNotification) {
        let listeners = self.lock().listeners.clone();
        Self::on_driver_thread(move || {
            for listener in &listeners {
                listener.status_notify(event.clone());
            }
        });
    }

    /// Drop the link as if the reader went out of range, then notify.
    pub fn drop_connection(&self) {
        {
            let mut state = self.lock();
            state.connected = false;
            state.inventory_running = false;
        }
        self.fire_status(StatusNotification::Disconnection);
    }

    pub fn is_inventory_running(&self) -> bool {
        self.lock().inventory_running
    }

    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    pub fn subscriptions(&self) -> Option<EventSubscriptions> {
        self.lock().subscriptions
    }

    pub fn trigger_mode(&self) -> Option<TriggerMode> {
        self.lock().trigger_mode
    }

    pub fn start_trigger(&self) -> Option<StartTrigger> {
        self.lock().start_trigger
    }

    pub fn stop_trigger(&self) -> Option<StopTrigger> {
        self.lock().stop_trigger
    }

    pub fn antenna(&self) -> AntennaRfConfig {
        self.lock().antenna
    }

    pub fn singulation(&self) -> SingulationControl {
        self.lock().singulation
    }

    pub fn prefilter_count(&self) -> usize {
        self.lock().prefilters
    }

    pub fn buffered_tags(&self) -> usize {
        self.lock().tag_buffer.len()
    }

    /// Every operation invoked so far, in order.
    pub fn calls(&self) -> Vec<MockOperation> {
        self.lock().calls.clone()
    }

    /// How many times `operation` was invoked.
    pub fn call_count(&self, operation: MockOperation) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|op| **op == operation)
            .count()
    }

    /// Highest number of async operations observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.lock().max_in_flight
    }

    fn lock(&self) -> MutexGuard<'_, ReaderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn on_driver_thread(f: impl FnOnce() + Send + 'static) {
        // Listener panics stay on the driver thread.
        let _ = std::thread::spawn(f).join();
    }

    /// Record a synchronous call and resolve any injected fault.
    fn enter(&self, operation: MockOperation) -> Result<()> {
        let (fault, panic) = {
            let mut state = self.lock();
            state.calls.push(operation);
            Self::take_injected(&mut state, operation)
        };

        if panic {
            panic!("mock reader driver crashed during {operation:?}");
        }
        fault.map_or(Ok(()), Err)
    }

    /// Record an async call, honoring the configured operation delay.
    async fn enter_async(&self, operation: MockOperation) -> Result<()> {
        let (delay, fault, panic) = {
            let mut state = self.lock();
            state.calls.push(operation);
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
            let (fault, panic) = Self::take_injected(&mut state, operation);
            (state.op_delay, fault, panic)
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.lock().in_flight -= 1;

        if panic {
            panic!("mock reader driver crashed during {operation:?}");
        }
        fault.map_or(Ok(()), Err)
    }

    fn take_injected(
        state: &mut ReaderState,
        operation: MockOperation,
    ) -> (Option<CapabilityError>, bool) {
        let panic = Self::take_panic(state, operation);

        let fault = state
            .faults
            .get_mut(&operation)
            .and_then(VecDeque::pop_front)
            .or_else(|| {
                (operation.requires_connection() && !state.connected)
                    .then(|| CapabilityError::disconnected(state.host_name.clone()))
            });

        (fault, panic)
    }

    fn take_panic(state: &mut ReaderState, operation: MockOperation) -> bool {
        match state.panics.get_mut(&operation) {
            Some(count) if *count > 0 => {
                *count -= 1;
                true
            }
            _ => false,
        }
    }
}

impl fmt::Debug for MockReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("MockReader")
            .field("host_name", &state.host_name)
            .field("connected", &state.connected)
            .field("inventory_running", &state.inventory_running)
            .finish_non_exhaustive()
    }
}

impl ReaderDevice for MockReader {
    fn host_name(&self) -> String {
        self.lock().host_name.clone()
    }

    fn model(&self) -> Result<Option<String>> {
        self.enter(MockOperation::Model)?;
        Ok(self.lock().model.clone())
    }

    fn is_connected(&self) -> bool {
        let (connected, panic) = {
            let mut state = self.lock();
            (state.connected, Self::take_panic(&mut state, MockOperation::IsConnected))
        };

        if panic {
            panic!("mock reader driver crashed during status check");
        }
        connected
    }

    async fn connect(&self) -> Result<()> {
        self.enter_async(MockOperation::Connect).await?;
        let mut state = self.lock();
        state.connected = !state.connect_leaves_disconnected;
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.enter_async(MockOperation::Disconnect).await?;
        let mut state = self.lock();
        state.connected = false;
        state.inventory_running = false;
        Ok(())
    }

    fn add_events_listener(&self, listener: Arc<dyn RfidEventsListener>) -> Result<()> {
        self.enter(MockOperation::AddEventsListener)?;
        let mut state = self.lock();
        if !state.listeners.iter().any(|l| Arc::ptr_eq(l, &listener)) {
            state.listeners.push(listener);
        }
        Ok(())
    }

    fn remove_events_listener(&self, listener: &Arc<dyn RfidEventsListener>) -> Result<()> {
        self.enter(MockOperation::RemoveEventsListener)?;
        self.lock().listeners.retain(|l| !Arc::ptr_eq(l, listener));
        Ok(())
    }

    async fn set_event_subscriptions(&self, subscriptions: EventSubscriptions) -> Result<()> {
        self.enter_async(MockOperation::SetEventSubscriptions).await?;
        self.lock().subscriptions = Some(subscriptions);
        Ok(())
    }

    async fn set_trigger_mode(&self, mode: TriggerMode) -> Result<()> {
        self.enter_async(MockOperation::SetTriggerMode).await?;
        self.lock().trigger_mode = Some(mode);
        Ok(())
    }

    async fn set_start_trigger(&self, trigger: StartTrigger) -> Result<()> {
        self.enter_async(MockOperation::SetStartTrigger).await?;
        self.lock().start_trigger = Some(trigger);
        Ok(())
    }

    async fn set_stop_trigger(&self, trigger: StopTrigger) -> Result<()> {
        self.enter_async(MockOperation::SetStopTrigger).await?;
        self.lock().stop_trigger = Some(trigger);
        Ok(())
    }

    fn transmit_power_levels(&self) -> Result<Vec<u16>> {
        self.enter(MockOperation::TransmitPowerLevels)?;
        Ok(self.lock().power_levels.clone())
    }

    async fn antenna_rf_config(&self, _antenna: u16) -> Result<AntennaRfConfig> {
        self.enter_async(MockOperation::GetAntennaRfConfig).await?;
        Ok(self.lock().antenna)
    }

    async fn set_antenna_rf_config(&self, _antenna: u16, config: AntennaRfConfig) -> Result<()> {
        self.enter_async(MockOperation::SetAntennaRfConfig).await?;
        self.lock().antenna = config;
        Ok(())
    }

    async fn singulation_control(&self, _antenna: u16) -> Result<SingulationControl> {
        self.enter_async(MockOperation::GetSingulationControl)
            .await?;
        Ok(self.lock().singulation)
    }

    async fn set_singulation_control(&self, _antenna: u16, control: SingulationControl) -> Result<()> {
        self.enter_async(MockOperation::SetSingulationControl)
            .await?;
        self.lock().singulation = control;
        Ok(())
    }

    async fn delete_all_prefilters(&self) -> Result<()> {
        self.enter_async(MockOperation::DeleteAllPrefilters).await?;
        self.lock().prefilters = 0;
        Ok(())
    }

    async fn perform_inventory(&self) -> Result<()> {
        self.enter_async(MockOperation::PerformInventory).await?;
        let mut state = self.lock();
        if state.inventory_running {
            return Err(CapabilityError::operation_failure(
                "Inventory operation already in progress",
            ));
        }
        state.inventory_running = true;
        Ok(())
    }

    async fn stop_inventory(&self) -> Result<()> {
        self.enter_async(MockOperation::StopInventory).await?;
        self.lock().inventory_running = false;
        Ok(())
    }

    fn read_tags(&self, max: usize) -> Result<Vec<TagData>> {
        self.enter(MockOperation::ReadTags)?;
        let mut state = self.lock();
        let count = max.min(state.tag_buffer.len());
        Ok(state.tag_buffer.drain(..count).collect())
    }
}
