//! Error types for reader capability operations.
//!
//! The vendor layer reports faults in a few distinguishable categories. The
//! session relies on that distinction: usage faults during discovery are
//! skipped, and operation faults during inventory start trigger the single
//! retry.

/// Result type alias for capability operations.
pub type Result<T> = std::result::Result<T, CapabilityError>;

/// Coarse fault classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultCategory {
    /// The call was made in the wrong state or with bad arguments.
    Usage,

    /// The device rejected the operation (busy, conflicting operation).
    Operation,

    /// Anything else.
    General,
}

/// Errors that can occur during reader capability operations.
#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    /// Caller-usage or precondition fault.
    #[error("Invalid usage: {info}")]
    InvalidUsage { info: String },

    /// Device-side operation failure carrying the vendor's detail message.
    #[error("Operation failure: {vendor_message}")]
    OperationFailure { vendor_message: String },

    /// The handle is not connected.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// The device did not answer in time.
    #[error("Operation timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Link-level communication fault (noise, dropped frames).
    #[error("Communication error: {message}")]
    CommunicationError { message: String },
}

impl CapabilityError {
    /// Create a new invalid usage error.
    pub fn invalid_usage(info: impl Into<String>) -> Self {
        Self::InvalidUsage { info: info.into() }
    }

    /// Create a new operation failure.
    pub fn operation_failure(vendor_message: impl Into<String>) -> Self {
        Self::OperationFailure {
            vendor_message: vendor_message.into(),
        }
    }

    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Create a new communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }

    /// Classify the fault.
    pub fn category(&self) -> FaultCategory {
        match self {
            Self::InvalidUsage { .. } => FaultCategory::Usage,
            Self::OperationFailure { .. } => FaultCategory::Operation,
            _ => FaultCategory::General,
        }
    }

    /// The most specific detail available: the vendor message for operation
    /// failures, the usage info for usage faults, the display form otherwise.
    pub fn detail(&self) -> String {
        match self {
            Self::OperationFailure { vendor_message } => vendor_message.clone(),
            Self::InvalidUsage { info } => info.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_usage_error() {
        let error = CapabilityError::invalid_usage("Reader not attached");
        assert_eq!(error.category(), FaultCategory::Usage);
        assert_eq!(error.to_string(), "Invalid usage: Reader not attached");
        assert_eq!(error.detail(), "Reader not attached");
    }

    #[test]
    fn test_operation_failure_error() {
        let error = CapabilityError::operation_failure("Radio busy");
        assert_eq!(error.category(), FaultCategory::Operation);
        assert_eq!(error.to_string(), "Operation failure: Radio busy");
        assert_eq!(error.detail(), "Radio busy");
    }

    #[test]
    fn test_general_category() {
        let errors = vec![
            CapabilityError::disconnected("RFD40"),
            CapabilityError::timeout(1000),
            CapabilityError::communication("link reset"),
        ];

        for error in errors {
            assert_eq!(error.category(), FaultCategory::General);
            assert_eq!(error.detail(), error.to_string());
        }
    }
}
