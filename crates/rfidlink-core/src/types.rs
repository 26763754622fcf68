use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Link-layer channel used to reach a reader.
///
/// Discovery walks transports in [`TransportKind::PRIORITY`] order and stops
/// at the first one reporting readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransportKind {
    Bluetooth,
    Usb,
    Serial,
}

impl TransportKind {
    /// Fixed discovery priority.
    pub const PRIORITY: [TransportKind; 3] = [Self::Bluetooth, Self::Usb, Self::Serial];
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bluetooth => write!(f, "BLUETOOTH"),
            Self::Usb => write!(f, "USB"),
            Self::Serial => write!(f, "SERIAL"),
        }
    }
}

impl std::str::FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bluetooth" | "bt" => Ok(Self::Bluetooth),
            "usb" => Ok(Self::Usb),
            "serial" => Ok(Self::Serial),
            other => Err(format!("Unknown transport: {other}")),
        }
    }
}

/// A single tag observation forwarded to the consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagReading {
    pub tag_id: String,
    pub rssi: i32,
    pub antenna_id: i32,
    pub seen_count: i32,
}

/// Kind of a status event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatusKind {
    Initializing,
    Initialized,
    Connected,
    Disconnected,
    InventoryStarted,
    InventoryStopped,
    ReaderAppeared,
    ReaderDisappeared,
    TriggerPressed,
    TriggerReleased,
    Error,
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initializing => "initializing",
            Self::Initialized => "initialized",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::InventoryStarted => "inventoryStarted",
            Self::InventoryStopped => "inventoryStopped",
            Self::ReaderAppeared => "readerAppeared",
            Self::ReaderDisappeared => "readerDisappeared",
            Self::TriggerPressed => "triggerPressed",
            Self::TriggerReleased => "triggerReleased",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Event published on the status stream.
///
/// Serializes flat: `{"type": ..., "message": ..., "status": ..., ...extra}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEvent {
    #[serde(rename = "type")]
    pub kind: StatusKind,

    pub message: String,

    /// Session trace at delivery time.
    pub status: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StatusEvent {
    /// Look up an extra field.
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TagEventKind {
    TagRead,
}

/// Event published on the tag stream: one per non-empty poll batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagEvent {
    #[serde(rename = "type")]
    pub kind: TagEventKind,

    pub tags: Vec<TagReading>,

    pub status: String,
}

impl TagEvent {
    pub fn new(tags: Vec<TagReading>, status: String) -> Self {
        Self {
            kind: TagEventKind::TagRead,
            tags,
            status,
        }
    }
}

/// Reader entry returned by the list command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderSummary {
    pub name: String,
    pub address: String,
    pub model: String,
}

/// Outcome of a successful initialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitSummary {
    pub message: String,

    /// Transport the active discovery came from.
    pub transport: TransportKind,

    pub reader_count: usize,
}

/// Outcome of a successful connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectSummary {
    pub message: String,
    pub reader_name: String,
}

/// Current antenna power and its upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerReading {
    pub current_power: u16,
    pub max_power: u16,
}

/// Successful command completion: the payload plus the session trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply<T> {
    pub payload: T,
    pub status: String,
}

impl<T> CommandReply<T> {
    pub fn new(payload: T, status: impl Into<String>) -> Self {
        Self {
            payload,
            status: status.into(),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CommandReply<U> {
        CommandReply {
            payload: f(self.payload),
            status: self.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("bluetooth", TransportKind::Bluetooth)]
    #[case("BT", TransportKind::Bluetooth)]
    #[case(" usb ", TransportKind::Usb)]
    #[case("Serial", TransportKind::Serial)]
    fn test_transport_from_str(#[case] input: &str, #[case] expected: TransportKind) {
        assert_eq!(input.parse::<TransportKind>().unwrap(), expected);
    }

    #[test]
    fn test_transport_from_str_rejects_unknown() {
        assert!("nfc".parse::<TransportKind>().is_err());
    }

    #[test]
    fn test_transport_priority() {
        assert_eq!(
            TransportKind::PRIORITY,
            [
                TransportKind::Bluetooth,
                TransportKind::Usb,
                TransportKind::Serial
            ]
        );
    }

    #[test]
    fn test_status_event_serializes_flat() {
        let mut extra = Map::new();
        extra.insert("readerName".into(), Value::from("ReaderB"));

        let event = StatusEvent {
            kind: StatusKind::Connected,
            message: "Connected to ReaderB".into(),
            status: "trace".into(),
            extra,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "connected");
        assert_eq!(json["message"], "Connected to ReaderB");
        assert_eq!(json["status"], "trace");
        assert_eq!(json["readerName"], "ReaderB");
    }

    #[test]
    fn test_status_kind_display_matches_wire() {
        let kinds = [
            StatusKind::InventoryStarted,
            StatusKind::TriggerReleased,
            StatusKind::ReaderDisappeared,
        ];
        for kind in kinds {
            let wire = serde_json::to_value(kind).unwrap();
            assert_eq!(wire, Value::from(kind.to_string()));
        }
    }

    #[test]
    fn test_tag_event_shape() {
        let event = TagEvent::new(
            vec![TagReading {
                tag_id: "E200".into(),
                rssi: -52,
                antenna_id: 1,
                seen_count: 3,
            }],
            "trace".into(),
        );

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "tagRead");
        assert_eq!(json["tags"][0]["tagId"], "E200");
        assert_eq!(json["tags"][0]["seenCount"], 3);
    }

    #[test]
    fn test_reply_map_keeps_status() {
        let reply = CommandReply::new(3usize, "trace").map(|n| n * 2);
        assert_eq!(reply.payload, 6);
        assert_eq!(reply.status, "trace");
    }
}
