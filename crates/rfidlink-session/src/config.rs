//! Session configuration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rfidlink_core::constants::{
    DEFAULT_COMMAND_QUEUE_CAPACITY, DEFAULT_POWER_MAX, DEFAULT_RF_MODE_TABLE_INDEX, DEFAULT_TARI,
    INVENTORY_RETRY_DELAY_MS, PRIMARY_ANTENNA_ID, TAG_BATCH_LIMIT,
};
use rfidlink_hardware::{CapabilityError, FaultCategory, TransportKind};

/// Decides whether an inventory-start fault is worth the single retry.
pub type TransientFaultPredicate = Arc<dyn Fn(&CapabilityError) -> bool + Send + Sync>;

/// Configuration for a [`ReaderSession`](crate::ReaderSession).
///
/// # Example
///
/// ```
/// use rfidlink_session::SessionConfig;
/// use rfidlink_hardware::{CapabilityError, TransportKind};
/// use std::time::Duration;
///
/// let config = SessionConfig::default()
///     .with_transports(vec![TransportKind::Usb])
///     .with_retry_delay(Duration::from_millis(250))
///     .with_transient_fault(|e| matches!(e, CapabilityError::Timeout { .. }));
///
/// assert!(config.is_transient(&CapabilityError::timeout(100)));
/// assert!(!config.is_transient(&CapabilityError::operation_failure("busy")));
/// ```
#[derive(Clone)]
pub struct SessionConfig {
    /// Transports tried by discovery, in order.
    pub transports: Vec<TransportKind>,

    /// Pause between the forced stop and the inventory-start retry.
    pub retry_delay: Duration,

    /// Maximum tag reads polled per read notification.
    pub tag_batch_limit: usize,

    /// Antenna targeted by configuration and power commands.
    pub antenna_id: u16,

    /// Power bound assumed until the device reports its power table.
    pub default_power_max: u16,

    pub rf_mode_table_index: u32,

    pub tari: u32,

    /// Pending commands buffered before callers wait for a slot.
    pub command_queue_capacity: usize,

    /// Faults that trigger the inventory-start retry.
    pub transient_fault: TransientFaultPredicate,
}

impl SessionConfig {
    pub fn with_transports(mut self, transports: Vec<TransportKind>) -> Self {
        self.transports = transports;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_tag_batch_limit(mut self, limit: usize) -> Self {
        self.tag_batch_limit = limit;
        self
    }

    pub fn with_default_power_max(mut self, power_max: u16) -> Self {
        self.default_power_max = power_max;
        self
    }

    pub fn with_command_queue_capacity(mut self, capacity: usize) -> Self {
        self.command_queue_capacity = capacity;
        self
    }

    /// Replace the transient-fault predicate.
    pub fn with_transient_fault(
        mut self,
        predicate: impl Fn(&CapabilityError) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.transient_fault = Arc::new(predicate);
        self
    }

    pub fn is_transient(&self, error: &CapabilityError) -> bool {
        (self.transient_fault)(error)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            transports: TransportKind::PRIORITY.to_vec(),
            retry_delay: Duration::from_millis(INVENTORY_RETRY_DELAY_MS),
            tag_batch_limit: TAG_BATCH_LIMIT,
            antenna_id: PRIMARY_ANTENNA_ID,
            default_power_max: DEFAULT_POWER_MAX,
            rf_mode_table_index: DEFAULT_RF_MODE_TABLE_INDEX,
            tari: DEFAULT_TARI,
            command_queue_capacity: DEFAULT_COMMAND_QUEUE_CAPACITY,
            transient_fault: Arc::new(|e| e.category() == FaultCategory::Operation),
        }
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("transports", &self.transports)
            .field("retry_delay", &self.retry_delay)
            .field("tag_batch_limit", &self.tag_batch_limit)
            .field("antenna_id", &self.antenna_id)
            .field("default_power_max", &self.default_power_max)
            .field("rf_mode_table_index", &self.rf_mode_table_index)
            .field("tari", &self.tari)
            .field("command_queue_capacity", &self.command_queue_capacity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(
            config.transports,
            vec![
                TransportKind::Bluetooth,
                TransportKind::Usb,
                TransportKind::Serial
            ]
        );
        assert_eq!(config.retry_delay, Duration::from_millis(500));
        assert_eq!(config.tag_batch_limit, 100);
        assert_eq!(config.antenna_id, 1);
        assert_eq!(config.default_power_max, 270);
    }

    #[test]
    fn test_default_predicate_accepts_operation_failures_only() {
        let config = SessionConfig::default();
        assert!(config.is_transient(&CapabilityError::operation_failure("busy")));
        assert!(!config.is_transient(&CapabilityError::invalid_usage("bad state")));
        assert!(!config.is_transient(&CapabilityError::communication("link lost")));
    }

    #[test]
    fn test_debug_omits_predicate() {
        let rendered = format!("{:?}", SessionConfig::default());
        assert!(rendered.contains("retry_delay"));
        assert!(!rendered.contains("transient_fault"));
    }
}
