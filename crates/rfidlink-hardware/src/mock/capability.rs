//! Mock reader capability for testing and development.
//!
//! Simulates the vendor SDK's enumeration side: per-transport reader rosters,
//! injectable discovery faults, and appear/disappear callbacks.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{CapabilityError, Result};
use crate::mock::MockReader;
use crate::traits::{DiscoveryListener, ReaderCapability, ReaderDevice};
use crate::types::{DiscoveredReader, TransportKind};

#[derive(Default)]
struct CapabilityState {
    rosters: HashMap<TransportKind, Vec<DiscoveredReader<MockReader>>>,
    open_faults: HashMap<TransportKind, VecDeque<CapabilityError>>,
    discovery_faults: VecDeque<CapabilityError>,
    listeners: Vec<Arc<dyn DiscoveryListener>>,
    open_calls: Vec<TransportKind>,
    discovery_calls: usize,
    dispose_calls: usize,
}

/// Mock reader capability.
///
/// Created together with a [`MockCapabilityHandle`] that stays with the test
/// after the capability itself has been moved into a session.
///
/// # Examples
///
/// ```
/// use rfidlink_hardware::mock::{MockCapability, MockReader};
/// use rfidlink_hardware::traits::ReaderCapability;
/// use rfidlink_hardware::types::TransportKind;
///
/// #[tokio::main]
/// async fn main() -> rfidlink_hardware::Result<()> {
///     let (mut capability, handle) = MockCapability::new();
///     handle.add_reader(TransportKind::Serial, MockReader::new("ReaderA"), None);
///
///     capability.open(TransportKind::Serial).await?;
///     let readers = capability.available_readers().await?;
///     assert_eq!(readers[0].name, "ReaderA");
///
///     Ok(())
/// }
/// ```
pub struct MockCapability {
    shared: Arc<Mutex<CapabilityState>>,
    opened: Option<TransportKind>,
}

impl MockCapability {
    /// Create a mock capability with empty rosters on every transport.
    pub fn new() -> (Self, MockCapabilityHandle) {
        let shared = Arc::new(Mutex::new(CapabilityState::default()));

        let capability = Self {
            shared: shared.clone(),
            opened: None,
        };

        (capability, MockCapabilityHandle { shared })
    }

    /// Transport currently opened, if any.
    pub fn opened(&self) -> Option<TransportKind> {
        self.opened
    }

    fn lock(&self) -> MutexGuard<'_, CapabilityState> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockCapability {
    fn default() -> Self {
        Self::new().0
    }
}

impl ReaderCapability for MockCapability {
    type Device = MockReader;

    async fn open(&mut self, transport: TransportKind) -> Result<()> {
        let fault = {
            let mut state = self.lock();
            state.open_calls.push(transport);
            state
                .open_faults
                .get_mut(&transport)
                .and_then(VecDeque::pop_front)
        };

        if let Some(error) = fault {
            return Err(error);
        }

        self.opened = Some(transport);
        Ok(())
    }

    async fn available_readers(&mut self) -> Result<Vec<DiscoveredReader<MockReader>>> {
        let transport = self
            .opened
            .ok_or_else(|| CapabilityError::invalid_usage("No transport opened"))?;

        let mut state = self.lock();
        state.discovery_calls += 1;

        if let Some(error) = state.discovery_faults.pop_front() {
            return Err(error);
        }

        Ok(state.rosters.get(&transport).cloned().unwrap_or_default())
    }

    fn attach_discovery_listener(&mut self, listener: Arc<dyn DiscoveryListener>) {
        let mut state = self.lock();
        if !state.listeners.iter().any(|l| Arc::ptr_eq(l, &listener)) {
            state.listeners.push(listener);
        }
    }

    fn dispose(&mut self) {
        self.lock().dispose_calls += 1;
        self.opened = None;
    }
}

/// Handle for controlling a mock capability.
///
/// Cloning the handle shares the same capability state.
#[derive(Clone)]
pub struct MockCapabilityHandle {
    shared: Arc<Mutex<CapabilityState>>,
}

impl MockCapabilityHandle {
    /// Add a reader to a transport's roster.
    pub fn add_reader(&self, transport: TransportKind, reader: MockReader, address: Option<&str>) {
        let name = reader.host_name();
        let mut discovered = DiscoveredReader::new(name, transport, reader);
        discovered.address = address.map(str::to_owned);

        self.lock()
            .rosters
            .entry(transport)
            .or_default()
            .push(discovered);
    }

    /// Remove every reader from a transport's roster.
    pub fn clear_readers(&self, transport: TransportKind) {
        self.lock().rosters.remove(&transport);
    }

    /// Queue a fault for the next `open` of a transport.
    pub fn fail_open(&self, transport: TransportKind, error: CapabilityError) {
        self.lock()
            .open_faults
            .entry(transport)
            .or_default()
            .push_back(error);
    }

    /// Queue a fault for the next reader listing.
    pub fn fail_next_discovery(&self, error: CapabilityError) {
        self.lock().discovery_faults.push_back(error);
    }

    /// Fire a reader-appeared callback from a driver thread.
    pub fn reader_appeared(&self, name: Option<&str>) {
        let name = name.map(str::to_owned);
        self.on_driver_thread(move |listener| listener.reader_appeared(name.as_deref()));
    }

    /// Fire a reader-disappeared callback from a driver thread.
    pub fn reader_disappeared(&self, name: Option<&str>) {
        let name = name.map(str::to_owned);
        self.on_driver_thread(move |listener| listener.reader_disappeared(name.as_deref()));
    }

    /// Transports opened so far, in order.
    pub fn open_calls(&self) -> Vec<TransportKind> {
        self.lock().open_calls.clone()
    }

    pub fn discovery_calls(&self) -> usize {
        self.lock().discovery_calls
    }

    pub fn dispose_calls(&self) -> usize {
        self.lock().dispose_calls
    }

    pub fn discovery_listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    fn on_driver_thread(&self, f: impl Fn(&dyn DiscoveryListener) + Send + 'static) {
        let listeners = self.lock().listeners.clone();
        let _ = std::thread::spawn(move || {
            for listener in &listeners {
                f(listener.as_ref());
            }
        })
        .join();
    }

    fn lock(&self) -> MutexGuard<'_, CapabilityState> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
