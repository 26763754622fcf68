//! Reader session handle.

use std::sync::Arc;

use rfidlink_core::{
    CommandFailure, CommandReply, CommandResult, ConnectSummary, ErrorCode, InitSummary,
    PowerReading, ReaderSummary, StatusEvent, TagEvent,
};
use rfidlink_hardware::ReaderCapability;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::events::{EventStream, EventStreams, spawn_delivery};
use crate::executor::{Command, Executor, Reply};
use crate::state::SessionPhase;
use crate::trace::Trace;

/// Owner of one physical reader's lifecycle.
///
/// Every command is queued to a private executor task and runs strictly
/// one at a time, in the order issued. Share the session behind an `Arc`
/// to issue commands from several tasks.
///
/// # Example
///
/// ```
/// use rfidlink_hardware::mock::{MockCapability, MockReader};
/// use rfidlink_hardware::TransportKind;
/// use rfidlink_session::{ReaderSession, SessionConfig};
///
/// #[tokio::main]
/// async fn main() {
///     let (capability, handle) = MockCapability::new();
///     handle.add_reader(TransportKind::Usb, MockReader::new("RFD40"), None);
///
///     let session = ReaderSession::spawn(capability, SessionConfig::default());
///     let init = session.initialize().await.unwrap();
///     assert_eq!(init.payload.transport, TransportKind::Usb);
///
///     let connected = session.connect(None).await.unwrap();
///     assert_eq!(connected.payload.reader_name, "RFD40");
///
///     session.shutdown().await;
/// }
/// ```
pub struct ReaderSession {
    commands: mpsc::Sender<Command>,
    trace: Arc<Trace>,
    streams: EventStreams,
    phase: watch::Receiver<SessionPhase>,
    executor: JoinHandle<()>,
    delivery: JoinHandle<()>,
}

impl ReaderSession {
    /// Start the executor and delivery tasks for `capability`.
    ///
    /// Must be called within a Tokio runtime.
    pub fn spawn<C: ReaderCapability>(capability: C, config: SessionConfig) -> Self {
        let trace = Arc::new(Trace::new("session created"));
        let (publisher, streams, delivery) = spawn_delivery(trace.clone());
        let (phase_tx, phase) = watch::channel(SessionPhase::Uninitialized);
        let (commands, queue) = mpsc::channel(config.command_queue_capacity.max(1));

        debug!(?config, "starting reader session");
        let executor = Executor::new(capability, config, trace.clone(), publisher, phase_tx);
        let executor = tokio::spawn(executor.run(queue));

        Self {
            commands,
            trace,
            streams,
            phase,
            executor,
            delivery,
        }
    }

    /// Discover readers, trying each configured transport in turn.
    pub async fn initialize(&self) -> CommandResult<CommandReply<InitSummary>> {
        self.request(Command::Initialize).await
    }

    pub async fn list_readers(&self) -> CommandResult<CommandReply<Vec<ReaderSummary>>> {
        self.request(Command::ListReaders).await
    }

    pub async fn is_connected(&self) -> CommandResult<CommandReply<bool>> {
        self.request(Command::IsConnected).await
    }

    /// Connect to the first reader whose name contains `reader_name`
    /// (case-insensitive), or to the first discovered reader.
    pub async fn connect(
        &self,
        reader_name: Option<&str>,
    ) -> CommandResult<CommandReply<ConnectSummary>> {
        let name = reader_name.map(str::to_owned);
        self.request(|reply| Command::Connect { name, reply }).await
    }

    pub async fn disconnect(&self) -> CommandResult<CommandReply<String>> {
        self.request(Command::Disconnect).await
    }

    /// Start continuous inventory, retrying once on a transient fault.
    pub async fn start_inventory(&self) -> CommandResult<CommandReply<String>> {
        self.request(Command::StartInventory).await
    }

    pub async fn stop_inventory(&self) -> CommandResult<CommandReply<String>> {
        self.request(Command::StopInventory).await
    }

    /// Set the transmit power index of the configured antenna.
    pub async fn set_antenna_power(&self, level: i32) -> CommandResult<CommandReply<u16>> {
        self.request(|reply| Command::SetAntennaPower { level, reply })
            .await
    }

    pub async fn get_antenna_power(&self) -> CommandResult<CommandReply<PowerReading>> {
        self.request(Command::GetAntennaPower).await
    }

    /// Disconnect, release the capability and return to uninitialized.
    ///
    /// Safe to call repeatedly.
    pub async fn dispose(&self) -> CommandResult<CommandReply<String>> {
        self.request(Command::Dispose).await
    }

    /// Dispose, then stop the executor and delivery tasks.
    pub async fn shutdown(self) {
        if let Err(failure) = self.dispose().await {
            warn!(code = %failure.code, "dispose during shutdown failed: {}", failure.message);
        }

        let Self {
            commands,
            executor,
            delivery,
            ..
        } = self;

        drop(commands);
        if let Err(e) = executor.await {
            warn!(error = %e, "command executor ended abnormally");
        }

        delivery.abort();
        let _ = delivery.await;
        info!("reader session shut down");
    }

    /// Subscribe to tag events, replacing any previous subscriber.
    pub fn subscribe_tags(&self) -> EventStream<TagEvent> {
        self.streams.subscribe_tags()
    }

    /// Subscribe to status events, replacing any previous subscriber.
    pub fn subscribe_status(&self) -> EventStream<StatusEvent> {
        self.streams.subscribe_status()
    }

    pub fn unsubscribe_tags(&self) {
        self.streams.unsubscribe_tags();
    }

    pub fn unsubscribe_status(&self) {
        self.streams.unsubscribe_status();
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        *self.phase.borrow()
    }

    /// Receiver that observes every phase change.
    pub fn watch_phase(&self) -> watch::Receiver<SessionPhase> {
        self.phase.clone()
    }

    pub fn trace(&self) -> &Arc<Trace> {
        &self.trace
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> Command,
    ) -> CommandResult<CommandReply<T>> {
        let (reply, outcome) = oneshot::channel();

        if self.commands.send(command(reply)).await.is_err() {
            return Err(self.closed());
        }

        outcome.await.unwrap_or_else(|_| Err(self.closed()))
    }

    fn closed(&self) -> CommandFailure {
        CommandFailure::new(ErrorCode::SessionClosed, "Session executor is not running")
            .with_status(self.trace.snapshot())
    }
}

impl std::fmt::Debug for ReaderSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderSession")
            .field("phase", &self.phase())
            .field("trace_entries", &self.trace.len())
            .finish_non_exhaustive()
    }
}
