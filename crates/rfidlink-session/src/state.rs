//! Session lifecycle state.

use std::fmt;

use rfidlink_hardware::{DiscoveredReader, TransportKind};
use serde::Serialize;

/// Observable lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    Uninitialized,
    Initializing,
    Ready,
    Connecting,
    Connected,
    Disconnecting,
    Error,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnecting => "disconnecting",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Result of the last successful discovery.
#[derive(Debug, Clone)]
pub(crate) struct Discovery<R> {
    pub transport: TransportKind,
    pub readers: Vec<DiscoveredReader<R>>,
}

/// Session state owned by the command executor.
///
/// Transitional variants keep the data of the state they came from so an
/// interrupted command can fall back to it.
#[derive(Debug)]
pub(crate) enum SessionState<R> {
    Uninitialized,
    Initializing,
    Ready(Discovery<R>),
    Connecting(Discovery<R>),
    Connected(Link<R>),
    Disconnecting(Link<R>),
    Error(String),
}

/// A connected reader together with the discovery it was picked from.
#[derive(Debug, Clone)]
pub(crate) struct Link<R> {
    pub discovery: Discovery<R>,
    pub reader: DiscoveredReader<R>,
    pub power_max: u16,
}

impl<R> SessionState<R> {
    pub fn phase(&self) -> SessionPhase {
        match self {
            Self::Uninitialized => SessionPhase::Uninitialized,
            Self::Initializing => SessionPhase::Initializing,
            Self::Ready(_) => SessionPhase::Ready,
            Self::Connecting(_) => SessionPhase::Connecting,
            Self::Connected(_) => SessionPhase::Connected,
            Self::Disconnecting(_) => SessionPhase::Disconnecting,
            Self::Error(_) => SessionPhase::Error,
        }
    }

    /// Discovery of a settled state (ready or connected).
    pub fn discovery(&self) -> Option<&Discovery<R>> {
        match self {
            Self::Ready(discovery) => Some(discovery),
            Self::Connected(link) => Some(&link.discovery),
            _ => None,
        }
    }

    pub fn link(&self) -> Option<&Link<R>> {
        match self {
            Self::Connected(link) => Some(link),
            _ => None,
        }
    }

    /// Settle a state left behind by an interrupted command.
    pub fn settle(self) -> Self {
        match self {
            Self::Initializing => Self::Error("Initialization interrupted".into()),
            Self::Connecting(discovery) => Self::Ready(discovery),
            Self::Disconnecting(link) => Self::Connected(link),
            settled => settled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn discovery() -> Discovery<()> {
        Discovery {
            transport: TransportKind::Serial,
            readers: vec![DiscoveredReader::new("ReaderA", TransportKind::Serial, ())],
        }
    }

    #[test]
    fn test_discovery_only_for_settled_states() {
        assert!(SessionState::Ready(discovery()).discovery().is_some());
        assert!(SessionState::Connecting(discovery()).discovery().is_none());
        assert!(SessionState::<()>::Error("x".into()).discovery().is_none());
    }

    #[test]
    fn test_settle() {
        assert_eq!(
            SessionState::Connecting(discovery()).settle().phase(),
            SessionPhase::Ready
        );

        let link = Link {
            discovery: discovery(),
            reader: DiscoveredReader::new("ReaderA", TransportKind::Serial, ()),
            power_max: 299,
        };
        assert_eq!(
            SessionState::Disconnecting(link).settle().phase(),
            SessionPhase::Connected
        );
        assert_eq!(
            SessionState::<()>::Initializing.settle().phase(),
            SessionPhase::Error
        );
        assert_eq!(
            SessionState::<()>::Uninitialized.settle().phase(),
            SessionPhase::Uninitialized
        );
    }

    #[test]
    fn test_phase_display_matches_wire() {
        for phase in [SessionPhase::Ready, SessionPhase::Disconnecting] {
            let wire = serde_json::to_value(phase).unwrap();
            assert_eq!(wire, serde_json::Value::from(phase.to_string()));
        }
    }
}
