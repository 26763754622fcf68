//! Command failure taxonomy.
//!
//! Every session command either succeeds or fails with a [`CommandFailure`]
//! carrying an [`ErrorCode`], a human-readable message, and the session trace
//! at the moment of failure.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Failure codes reported by session commands.
///
/// Precondition codes (`NotInitialized`, `ReaderNotConnected`,
/// `InvalidPowerLevel`, ...) are raised before the device is touched. The
/// `...Error` variants are the catch-all for unrecognized faults of a given
/// command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotInitialized,
    InitFailed,
    InitError,
    GetReadersError,
    NoReaders,
    ReaderNotFound,
    ConnectionFailed,
    ConnectError,
    DisconnectError,
    ReaderNotConnected,
    StartInventoryFailed,
    StartInventoryError,
    StopInventoryError,
    InvalidPowerLevel,
    SetPowerError,
    GetPowerError,
    InvalidArgument,
    NotImplemented,
    /// The session executor is no longer running.
    SessionClosed,
}

impl ErrorCode {
    /// Wire representation of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::InitFailed => "INIT_FAILED",
            Self::InitError => "INIT_ERROR",
            Self::GetReadersError => "GET_READERS_ERROR",
            Self::NoReaders => "NO_READERS",
            Self::ReaderNotFound => "READER_NOT_FOUND",
            Self::ConnectionFailed => "CONNECTION_FAILED",
            Self::ConnectError => "CONNECT_ERROR",
            Self::DisconnectError => "DISCONNECT_ERROR",
            Self::ReaderNotConnected => "READER_NOT_CONNECTED",
            Self::StartInventoryFailed => "START_INVENTORY_FAILED",
            Self::StartInventoryError => "START_INVENTORY_ERROR",
            Self::StopInventoryError => "STOP_INVENTORY_ERROR",
            Self::InvalidPowerLevel => "INVALID_POWER_LEVEL",
            Self::SetPowerError => "SET_POWER_ERROR",
            Self::GetPowerError => "GET_POWER_ERROR",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::NotImplemented => "NOT_IMPLEMENTED",
            Self::SessionClosed => "SESSION_CLOSED",
        }
    }

    /// Whether the code reports a precondition violation rather than a
    /// device fault.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::NotInitialized
                | Self::NoReaders
                | Self::ReaderNotFound
                | Self::ReaderNotConnected
                | Self::InvalidPowerLevel
                | Self::InvalidArgument
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed session command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct CommandFailure {
    /// Failure classification.
    pub code: ErrorCode,

    /// Human-readable description.
    pub message: String,

    /// Session trace captured when the command completed.
    pub status: String,
}

impl CommandFailure {
    /// Create a failure without a trace snapshot attached yet.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            status: String::new(),
        }
    }

    /// Attach the trace snapshot.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }
}

/// Result type for session commands.
pub type CommandResult<T> = std::result::Result<T, CommandFailure>;
