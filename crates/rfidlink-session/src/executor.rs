//! Single-slot command executor.
//!
//! The executor task is the only owner of the capability, the reader list
//! and the active handle. It takes commands off the queue one at a time,
//! runs each to completion (including any hardware waits and the inventory
//! retry delay), then answers the caller through a oneshot channel.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use rfidlink_core::constants::{ADDRESS_UNAVAILABLE, CONTINUOUS_STOP_DURATION_MS, UNKNOWN_MODEL};
use rfidlink_core::{
    CommandFailure, CommandReply, CommandResult, ConnectSummary, ErrorCode, InitSummary,
    PowerReading, ReaderSummary, StatusKind,
};
use rfidlink_hardware::{
    DiscoveredReader, DiscoveryListener, EventSubscriptions, FaultCategory, InventoryState,
    ReaderCapability, ReaderDevice, RfidEventsListener, SingulationSession, SlFlag, StartTrigger,
    StopTrigger, TransportKind, TriggerMode,
};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

use crate::bridge::{EventBridge, panic_message};
use crate::config::SessionConfig;
use crate::events::EventPublisher;
use crate::state::{Discovery, Link, SessionPhase, SessionState};
use crate::trace::Trace;

/// Where a command's outcome is sent.
pub(crate) type Reply<T> = oneshot::Sender<CommandResult<CommandReply<T>>>;

/// Commands accepted by the executor.
pub(crate) enum Command {
    Initialize(Reply<InitSummary>),
    ListReaders(Reply<Vec<ReaderSummary>>),
    IsConnected(Reply<bool>),
    Connect {
        name: Option<String>,
        reply: Reply<ConnectSummary>,
    },
    Disconnect(Reply<String>),
    StartInventory(Reply<String>),
    StopInventory(Reply<String>),
    SetAntennaPower {
        level: i32,
        reply: Reply<u16>,
    },
    GetAntennaPower(Reply<PowerReading>),
    Dispose(Reply<String>),
}

pub(crate) struct Executor<C: ReaderCapability> {
    capability: C,
    config: SessionConfig,
    state: SessionState<C::Device>,
    trace: Arc<Trace>,
    events: EventPublisher,
    bridge: Arc<EventBridge<C::Device>>,
    phase: watch::Sender<SessionPhase>,
    /// Last power bound a reader reported; survives reconnects.
    power_max: u16,
}

impl<C: ReaderCapability> Executor<C> {
    pub(crate) fn new(
        capability: C,
        config: SessionConfig,
        trace: Arc<Trace>,
        events: EventPublisher,
        phase: watch::Sender<SessionPhase>,
    ) -> Self {
        let bridge = Arc::new(EventBridge::new(
            trace.clone(),
            events.clone(),
            config.tag_batch_limit,
        ));

        Self {
            capability,
            power_max: config.default_power_max,
            config,
            state: SessionState::Uninitialized,
            trace,
            events,
            bridge,
            phase,
        }
    }

    /// Drain the command queue until every sender is gone.
    pub(crate) async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        debug!("command executor started");

        while let Some(command) = commands.recv().await {
            self.execute(command).await;
        }

        debug!("command queue closed, executor stopping");
    }

    async fn execute(&mut self, command: Command) {
        match command {
            Command::Initialize(reply) => {
                let outcome = shielded(self.initialize()).await;
                let outcome = self.settle(outcome, ErrorCode::InitError, "Initialization error");
                self.complete(reply, outcome);
            }
            Command::ListReaders(reply) => {
                let outcome = shielded(self.list_readers()).await;
                let outcome = self.settle(outcome, ErrorCode::GetReadersError, "Listing error");
                self.complete(reply, outcome);
            }
            Command::IsConnected(reply) => {
                // A status check never fails; a crashed driver reads as disconnected.
                let outcome = shielded(self.is_connected()).await.unwrap_or_else(|panic| {
                    warn!("status check panicked: {panic}");
                    self.record(format!("[IS_CONNECTED] Status check failed: {panic}"));
                    Ok(false)
                });
                self.complete(reply, outcome);
            }
            Command::Connect { name, reply } => {
                let outcome = shielded(self.connect(name)).await;
                let outcome = self.settle(outcome, ErrorCode::ConnectError, "Connection error");
                self.complete(reply, outcome);
            }
            Command::Disconnect(reply) => {
                let outcome = shielded(self.disconnect()).await;
                let outcome = self.settle(outcome, ErrorCode::DisconnectError, "Disconnect error");
                self.complete(reply, outcome);
            }
            Command::StartInventory(reply) => {
                let outcome = shielded(self.start_inventory()).await;
                let outcome =
                    self.settle(outcome, ErrorCode::StartInventoryError, "Inventory start error");
                self.complete(reply, outcome);
            }
            Command::StopInventory(reply) => {
                let outcome = shielded(self.stop_inventory()).await;
                let outcome =
                    self.settle(outcome, ErrorCode::StopInventoryError, "Inventory stop error");
                self.complete(reply, outcome);
            }
            Command::SetAntennaPower { level, reply } => {
                let outcome = shielded(self.set_antenna_power(level)).await;
                let outcome = self.settle(outcome, ErrorCode::SetPowerError, "Power error");
                self.complete(reply, outcome);
            }
            Command::GetAntennaPower(reply) => {
                let outcome = shielded(self.get_antenna_power()).await;
                let outcome = self.settle(outcome, ErrorCode::GetPowerError, "Power error");
                self.complete(reply, outcome);
            }
            Command::Dispose(reply) => {
                let outcome = shielded(self.dispose()).await;
                let outcome = self.settle(outcome, ErrorCode::DisconnectError, "Dispose error");
                self.complete(reply, outcome);
            }
        }
    }

    // ========================================================================
    // Discovery
    // ========================================================================

    async fn initialize(&mut self) -> CommandResult<InitSummary> {
        self.record("[INIT] Initialize called");
        self.events
            .status(StatusKind::Initializing, "Starting SDK initialization...");

        if let Some(discovery) = self.state.discovery() {
            let summary = InitSummary {
                message: "Already initialized".into(),
                transport: discovery.transport,
                reader_count: discovery.readers.len(),
            };
            self.record("[INIT] Already initialized");
            self.events
                .status(StatusKind::Initialized, "SDK already initialized");
            return Ok(summary);
        }

        self.set_state(SessionState::Initializing);

        let Some(discovery) = self.discover().await else {
            let message = "No readers found on any transport";
            self.record(format!("[INIT] FAILED: {message}"));
            self.set_state(SessionState::Error(message.into()));
            self.events.status(StatusKind::Error, "No readers found");
            return Err(CommandFailure::new(ErrorCode::InitFailed, message));
        };

        let listener = self.discovery_listener();
        self.capability.attach_discovery_listener(listener);

        for reader in &discovery.readers {
            self.record(format!(
                "[INIT]   - {} ({})",
                reader.name,
                reader.address.as_deref().unwrap_or(ADDRESS_UNAVAILABLE)
            ));
        }

        let transport = discovery.transport;
        let reader_count = discovery.readers.len();
        let message = format!("SDK ready - {reader_count} reader(s)");

        info!(%transport, readers = reader_count, "reader session initialized");
        self.record(format!("[INIT] {message} on {transport}"));
        self.events.status_with(
            StatusKind::Initialized,
            message.clone(),
            [
                ("transport", Value::from(transport.to_string())),
                ("readerCount", Value::from(reader_count)),
            ],
        );
        self.set_state(SessionState::Ready(discovery));

        Ok(InitSummary {
            message,
            transport,
            reader_count,
        })
    }

    /// Walk the configured transports and keep the first non-empty roster.
    async fn discover(&mut self) -> Option<Discovery<C::Device>> {
        let transports = self.config.transports.clone();

        for transport in transports {
            self.record(format!("[INIT] Trying transport: {transport}"));

            match self.enumerate(transport).await {
                Ok(readers) if readers.is_empty() => {
                    self.record(format!("[INIT] No readers on {transport}"));
                }
                Ok(readers) => {
                    self.record(format!(
                        "[INIT] Found {} reader(s) on {transport}",
                        readers.len()
                    ));
                    return Some(Discovery { transport, readers });
                }
                Err(e) => {
                    debug!(%transport, error = %e, "transport skipped");
                    match e.category() {
                        FaultCategory::Usage => self.record(format!(
                            "[INIT] Invalid usage on {transport}: {}",
                            e.detail()
                        )),
                        _ => self.record(format!("[INIT] Error on {transport}: {e}")),
                    }
                }
            }
        }

        None
    }

    async fn enumerate(
        &mut self,
        transport: TransportKind,
    ) -> rfidlink_hardware::Result<Vec<DiscoveredReader<C::Device>>> {
        self.capability.open(transport).await?;
        self.capability.available_readers().await
    }

    /// Re-query the open transport; a failed refresh keeps the old list.
    async fn refresh(&mut self, discovery: &mut Discovery<C::Device>) {
        match self.capability.available_readers().await {
            Ok(readers) => {
                let listener = self.discovery_listener();
                self.capability.attach_discovery_listener(listener);
                self.record(format!("[CONNECT] Found {} reader(s)", readers.len()));
                discovery.readers = readers;
            }
            Err(e) => {
                warn!(error = %e, "reader refresh failed");
                self.record(format!(
                    "[CONNECT] Refresh failed, keeping previous list: {e}"
                ));
            }
        }
    }

    async fn list_readers(&mut self) -> CommandResult<Vec<ReaderSummary>> {
        self.record("[GET_READERS] Called");

        let Some(discovery) = self.state.discovery() else {
            return Err(self.not_initialized("GET_READERS"));
        };

        let mut summaries = Vec::with_capacity(discovery.readers.len());
        for reader in &discovery.readers {
            match reader.handle.model() {
                Ok(model) => summaries.push(ReaderSummary {
                    name: reader.name.clone(),
                    address: reader
                        .address
                        .clone()
                        .unwrap_or_else(|| ADDRESS_UNAVAILABLE.into()),
                    model: model.unwrap_or_else(|| UNKNOWN_MODEL.into()),
                }),
                Err(e) => self.record(format!(
                    "[GET_READERS] Error reading device {}: {e}",
                    reader.name
                )),
            }
        }

        self.record(format!(
            "[GET_READERS] Returning {} reader(s)",
            summaries.len()
        ));
        Ok(summaries)
    }

    async fn is_connected(&mut self) -> CommandResult<bool> {
        Ok(self
            .state
            .link()
            .is_some_and(|link| link.reader.handle.is_connected()))
    }

    // ========================================================================
    // Connection
    // ========================================================================

    async fn connect(&mut self, name: Option<String>) -> CommandResult<ConnectSummary> {
        self.record(format!(
            "[CONNECT] Called with reader: {}",
            name.as_deref().unwrap_or("auto-select")
        ));

        let Some(mut discovery) = self.state.discovery().cloned() else {
            return Err(self.not_initialized("CONNECT"));
        };

        if let Some(link) = self.state.link() {
            let host = link.reader.handle.host_name();
            if link.reader.handle.is_connected() {
                self.record(format!("[CONNECT] Already connected to {host}"));
                return Ok(ConnectSummary {
                    message: format!("Already connected to {host}"),
                    reader_name: host,
                });
            }

            let stale = link.reader.handle.clone();
            self.record(format!("[CONNECT] Link to {host} is down, reconnecting"));
            self.detach(&stale, "CONNECT");
            self.bridge.set_active(None);
        }

        self.refresh(&mut discovery).await;

        if discovery.readers.is_empty() {
            self.record("[CONNECT] No readers available");
            self.set_state(SessionState::Ready(discovery));
            return Err(CommandFailure::new(
                ErrorCode::NoReaders,
                "No readers available",
            ));
        }

        let candidate = match name.as_deref() {
            Some(query) => discovery.readers.iter().find(|r| r.name_matches(query)),
            None => discovery.readers.first(),
        }
        .cloned();

        let Some(selected) = candidate else {
            let query = name.unwrap_or_default();
            let message = format!("Reader '{query}' not found");
            self.record(format!("[CONNECT] {message}"));
            self.set_state(SessionState::Ready(discovery));
            return Err(CommandFailure::new(ErrorCode::ReaderNotFound, message));
        };

        self.record(format!("[CONNECT] Selected: {}", selected.name));
        self.set_state(SessionState::Connecting(discovery.clone()));
        self.bridge.set_active(Some(selected.handle.clone()));

        match self.establish(&selected.handle).await {
            Ok(power_max) => {
                let host = selected.handle.host_name();
                let message = format!("Connected to {host}");

                info!(reader = %host, power_max, "reader connected");
                self.record(format!("[CONNECT] {message}"));
                self.events.status_with(
                    StatusKind::Connected,
                    message.clone(),
                    [("readerName", Value::from(host.clone()))],
                );
                self.set_state(SessionState::Connected(Link {
                    discovery,
                    reader: selected,
                    power_max,
                }));

                Ok(ConnectSummary {
                    message,
                    reader_name: host,
                })
            }
            Err(message) => {
                self.bridge.set_active(None);
                self.set_state(SessionState::Ready(discovery));
                Err(CommandFailure::new(ErrorCode::ConnectionFailed, message))
            }
        }
    }

    /// Physically connect and configure. Returns the discovered power bound.
    async fn establish(&mut self, handle: &C::Device) -> Result<u16, String> {
        let host = handle.host_name();
        self.record(format!("[CONNECT] Connecting to {host}..."));

        if let Err(e) = handle.connect().await {
            let message = format!("Connection failed: {e}");
            warn!(reader = %host, error = %e, "connect failed");
            self.record(format!("[CONNECT] {message}"));
            return Err(message);
        }

        let power_max = self.configure(handle).await;

        if !handle.is_connected() {
            let message = "Connection failed: reader reports disconnected after connect".to_owned();
            self.record(format!("[CONNECT] {message}"));
            self.detach(handle, "CONNECT");
            return Err(message);
        }

        Ok(power_max)
    }

    /// Run the configuration sequence; faults are reported, not propagated.
    async fn configure(&mut self, handle: &C::Device) -> u16 {
        let mut power_max = self.power_max;

        let configured = self.apply_configuration(handle, &mut power_max).await;
        self.power_max = power_max;

        match configured {
            Ok(()) => self.record("[CONFIG] Reader configured"),
            Err(e) => {
                warn!(error = %e, "reader configuration incomplete");
                self.record(format!("[CONFIG ERROR] {e}"));
                self.events
                    .status(StatusKind::Error, format!("Configuration error: {e}"));
            }
        }

        power_max
    }

    async fn apply_configuration(
        &mut self,
        handle: &C::Device,
        power_max: &mut u16,
    ) -> rfidlink_hardware::Result<()> {
        let antenna = self.config.antenna_id;
        let rf_mode_table_index = self.config.rf_mode_table_index;
        let tari = self.config.tari;

        self.record(format!("[CONFIG] Configuring {}", handle.host_name()));

        handle.add_events_listener(self.events_listener())?;
        self.record("[CONFIG] Event listener registered");

        handle
            .set_event_subscriptions(EventSubscriptions::session_default())
            .await?;
        self.record("[CONFIG] Trigger, tag-read and disconnect events enabled");

        handle.set_trigger_mode(TriggerMode::Rfid).await?;
        handle.set_start_trigger(StartTrigger::Immediate).await?;
        handle
            .set_stop_trigger(StopTrigger::Duration {
                milliseconds: CONTINUOUS_STOP_DURATION_MS,
            })
            .await?;
        self.record("[CONFIG] Triggers set: RFID mode, immediate start, continuous");

        let levels = handle.transmit_power_levels()?;
        match levels.len().checked_sub(1) {
            Some(max) => {
                *power_max = u16::try_from(max).unwrap_or(u16::MAX);
                self.record(format!(
                    "[CONFIG] {} power levels, max index {power_max}",
                    levels.len()
                ));
            }
            None => self.record(format!(
                "[CONFIG] No power levels reported, keeping max {power_max}"
            )),
        }

        let mut rf = handle.antenna_rf_config(antenna).await?;
        rf.transmit_power_index = *power_max;
        rf.rf_mode_table_index = rf_mode_table_index;
        rf.tari = tari;
        handle.set_antenna_rf_config(antenna, rf).await?;
        self.record(format!("[CONFIG] Antenna {antenna} at power {power_max}"));

        let mut singulation = handle.singulation_control(antenna).await?;
        singulation.session = SingulationSession::S0;
        singulation.inventory_state = InventoryState::A;
        singulation.sl_flag = SlFlag::All;
        handle.set_singulation_control(antenna, singulation).await?;
        self.record("[CONFIG] Singulation: session S0, state A, flag All");

        handle.delete_all_prefilters().await?;
        self.record("[CONFIG] Pre-filters cleared");

        Ok(())
    }

    async fn disconnect(&mut self) -> CommandResult<String> {
        self.record("[DISCONNECT] Called");

        let Some(link) = self.state.link().cloned() else {
            self.record("[DISCONNECT] No reader to disconnect");
            return Ok("No reader to disconnect".into());
        };

        let host = link.reader.handle.host_name();

        if !link.reader.handle.is_connected() {
            self.record(format!("[DISCONNECT] {host} already disconnected"));
            self.detach(&link.reader.handle, "DISCONNECT");
            self.bridge.set_active(None);
            self.set_state(SessionState::Ready(link.discovery));
            return Ok("Already disconnected".into());
        }

        self.set_state(SessionState::Disconnecting(link.clone()));

        match self.release(&link.reader.handle).await {
            Ok(()) => {
                self.bridge.set_active(None);
                info!(reader = %host, "reader disconnected");
                self.record(format!("[DISCONNECT] Disconnected from {host}"));
                self.events.status_with(
                    StatusKind::Disconnected,
                    format!("Disconnected from {host}"),
                    [("readerName", Value::from(host))],
                );
                self.set_state(SessionState::Ready(link.discovery));
                Ok("Disconnected successfully".into())
            }
            Err(e) => {
                self.record(format!("[DISCONNECT ERROR] {e}"));
                if let Err(restore) = link.reader.handle.add_events_listener(self.events_listener()) {
                    self.record(format!("[DISCONNECT] Listener not restored: {restore}"));
                }
                self.set_state(SessionState::Connected(link));
                Err(CommandFailure::new(
                    ErrorCode::DisconnectError,
                    format!("Disconnect failed: {e}"),
                ))
            }
        }
    }

    async fn release(&mut self, handle: &C::Device) -> rfidlink_hardware::Result<()> {
        handle.remove_events_listener(&self.events_listener())?;
        handle.disconnect().await
    }

    // ========================================================================
    // Inventory and power
    // ========================================================================

    async fn start_inventory(&mut self) -> CommandResult<String> {
        self.record("[START_INV] Called");
        let (handle, _) = self.connected("START_INV")?;

        match handle.perform_inventory().await {
            Ok(()) => {}
            Err(first) if self.config.is_transient(&first) => {
                warn!(error = %first, "inventory start failed, retrying once");
                self.record(format!(
                    "[START_INV] First attempt failed ({first}), retrying..."
                ));

                if let Err(retry) = Self::retry_inventory(&handle, self.config.retry_delay).await
                {
                    self.record(format!("[START_INV ERROR] Retry failed: {retry}"));
                    return Err(CommandFailure::new(
                        ErrorCode::StartInventoryFailed,
                        format!("Failed to start: {}", first.detail()),
                    ));
                }

                self.record("[START_INV] Retry succeeded");
            }
            Err(e) => {
                self.record(format!("[START_INV ERROR] {e}"));
                return Err(CommandFailure::new(
                    ErrorCode::StartInventoryError,
                    format!("Failed to start: {e}"),
                ));
            }
        }

        self.record("[START_INV] Inventory started");
        self.events
            .status(StatusKind::InventoryStarted, "Inventory started");
        Ok("Inventory started".into())
    }

    async fn retry_inventory(handle: &C::Device, delay: Duration) -> rfidlink_hardware::Result<()> {
        handle.stop_inventory().await?;
        tokio::time::sleep(delay).await;
        handle.perform_inventory().await
    }

    async fn stop_inventory(&mut self) -> CommandResult<String> {
        self.record("[STOP_INV] Called");
        let (handle, _) = self.connected("STOP_INV")?;

        if let Err(e) = handle.stop_inventory().await {
            self.record(format!("[STOP_INV ERROR] {e}"));
            return Err(CommandFailure::new(
                ErrorCode::StopInventoryError,
                format!("Failed to stop: {e}"),
            ));
        }

        self.record("[STOP_INV] Inventory stopped");
        self.events
            .status(StatusKind::InventoryStopped, "Inventory stopped");
        Ok("Inventory stopped".into())
    }

    async fn set_antenna_power(&mut self, level: i32) -> CommandResult<u16> {
        self.record(format!("[SET_POWER] Called with level {level}"));
        let (handle, power_max) = self.connected("SET_POWER")?;

        let Some(power) = u16::try_from(level).ok().filter(|p| *p <= power_max) else {
            let message = format!("Invalid power level. Must be 0-{power_max}");
            self.record(format!("[SET_POWER] {message}"));
            return Err(CommandFailure::new(ErrorCode::InvalidPowerLevel, message));
        };

        let antenna = self.config.antenna_id;
        let written = async {
            let mut rf = handle.antenna_rf_config(antenna).await?;
            rf.transmit_power_index = power;
            handle.set_antenna_rf_config(antenna, rf).await
        };

        if let Err(e) = written.await {
            self.record(format!("[SET_POWER ERROR] {e}"));
            return Err(CommandFailure::new(
                ErrorCode::SetPowerError,
                format!("Failed to set power: {e}"),
            ));
        }

        self.record(format!("[SET_POWER] Power set to {power}"));
        Ok(power)
    }

    async fn get_antenna_power(&mut self) -> CommandResult<PowerReading> {
        self.record("[GET_POWER] Called");
        let (handle, power_max) = self.connected("GET_POWER")?;

        match handle.antenna_rf_config(self.config.antenna_id).await {
            Ok(rf) => {
                self.record(format!(
                    "[GET_POWER] Power {} of {power_max}",
                    rf.transmit_power_index
                ));
                Ok(PowerReading {
                    current_power: rf.transmit_power_index,
                    max_power: power_max,
                })
            }
            Err(e) => {
                self.record(format!("[GET_POWER ERROR] {e}"));
                Err(CommandFailure::new(
                    ErrorCode::GetPowerError,
                    format!("Failed to get power: {e}"),
                ))
            }
        }
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    async fn dispose(&mut self) -> CommandResult<String> {
        self.record("[DISPOSE] Called");

        if matches!(self.state, SessionState::Uninitialized) {
            self.record("[DISPOSE] Nothing to dispose");
            return Ok("Already disposed".into());
        }

        match shielded(self.disconnect()).await {
            Ok(Ok(message)) => self.record(format!("[DISPOSE] Disconnect: {message}")),
            Ok(Err(failure)) => {
                self.record(format!("[DISPOSE] Disconnect failed: {}", failure.message));
            }
            Err(panic) => self.record(format!("[DISPOSE] Disconnect panicked: {panic}")),
        }

        self.capability.dispose();
        self.bridge.set_active(None);
        self.set_state(SessionState::Uninitialized);

        info!("reader session disposed");
        self.record("[DISPOSE] Disposed");
        Ok("Disposed".into())
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn record(&self, message: impl Into<String>) {
        self.trace.record(message);
    }

    fn set_state(&mut self, state: SessionState<C::Device>) {
        let phase = state.phase();
        self.state = state;
        self.phase.send_replace(phase);
    }

    fn events_listener(&self) -> Arc<dyn RfidEventsListener> {
        self.bridge.clone()
    }

    fn discovery_listener(&self) -> Arc<dyn DiscoveryListener> {
        self.bridge.clone()
    }

    /// Best-effort removal of the bridge from a reader.
    fn detach(&self, handle: &C::Device, label: &str) {
        if let Err(e) = handle.remove_events_listener(&self.events_listener()) {
            self.record(format!("[{label}] Listener removal failed: {e}"));
        }
    }

    fn not_initialized(&self, label: &str) -> CommandFailure {
        self.record(format!("[{label}] SDK not initialized"));
        CommandFailure::new(
            ErrorCode::NotInitialized,
            "SDK not initialized. Call initialize() first.",
        )
    }

    /// Active handle and power bound, if the reader is connected.
    fn connected(&self, label: &str) -> CommandResult<(C::Device, u16)> {
        match self.state.link() {
            Some(link) if link.reader.handle.is_connected() => {
                Ok((link.reader.handle.clone(), link.power_max))
            }
            _ => {
                self.record(format!("[{label}] Reader not connected"));
                Err(CommandFailure::new(
                    ErrorCode::ReaderNotConnected,
                    "Reader not connected",
                ))
            }
        }
    }

    /// Turn a panicked command into a failure and settle the state it left.
    fn settle<T>(
        &mut self,
        outcome: Result<CommandResult<T>, String>,
        code: ErrorCode,
        context: &str,
    ) -> CommandResult<T> {
        outcome.unwrap_or_else(|panic| {
            let message = format!("{context}: {panic}");
            error!(%code, "{message}");
            self.record(format!("[EXECUTOR] {message}"));

            let state = std::mem::replace(&mut self.state, SessionState::Uninitialized).settle();
            if state.link().is_none() {
                self.bridge.set_active(None);
            }
            self.set_state(state);

            if code == ErrorCode::InitError {
                self.events.status(StatusKind::Error, message.clone());
            }

            Err(CommandFailure::new(code, message))
        })
    }

    fn complete<T>(&self, reply: Reply<T>, outcome: CommandResult<T>) {
        let status = self.trace.snapshot();

        let response = match outcome {
            Ok(payload) => Ok(CommandReply::new(payload, status)),
            Err(failure) => {
                if failure.code.is_precondition() {
                    debug!(code = %failure.code, "{}", failure.message);
                } else {
                    warn!(code = %failure.code, "{}", failure.message);
                }
                Err(failure.with_status(status))
            }
        };

        if reply.send(response).is_err() {
            debug!("caller dropped before the reply was sent");
        }
    }
}

/// Run a command body, capturing a panic as its message.
async fn shielded<T>(body: impl Future<Output = CommandResult<T>>) -> Result<CommandResult<T>, String> {
    AssertUnwindSafe(body)
        .catch_unwind()
        .await
        .map_err(|payload| panic_message(payload.as_ref()))
}
