//! Shared fixtures for session integration tests.

#![allow(dead_code)]

use std::time::Duration;

use rfidlink_core::{StatusEvent, StatusKind, TagEvent};
use rfidlink_hardware::mock::{MockCapability, MockCapabilityHandle, MockReader};
use rfidlink_hardware::{TagData, TransportKind};
use rfidlink_session::{EventStream, ReaderSession, SessionConfig};

/// Session over two serial readers, nothing on Bluetooth or USB.
pub struct Rig {
    pub session: ReaderSession,
    pub capability: MockCapabilityHandle,
    pub reader_a: MockReader,
    pub reader_b: MockReader,
}

impl Rig {
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    pub fn with_config(config: SessionConfig) -> Self {
        Self::with_readers(
            MockReader::new("ReaderA").with_power_steps(271),
            MockReader::new("ReaderB")
                .with_model("RFD4031")
                .with_power_steps(271),
            config,
        )
    }

    pub fn with_readers(reader_a: MockReader, reader_b: MockReader, config: SessionConfig) -> Self {
        let (capability, handle) = MockCapability::new();
        handle.add_reader(TransportKind::Serial, reader_a.clone(), None);
        handle.add_reader(
            TransportKind::Serial,
            reader_b.clone(),
            Some("/dev/ttyUSB1"),
        );

        Self {
            session: ReaderSession::spawn(capability, config),
            capability: handle,
            reader_a,
            reader_b,
        }
    }

    /// Initialize and connect to ReaderA.
    pub async fn connected() -> Self {
        let rig = Self::new();
        rig.session.initialize().await.unwrap();
        rig.session.connect(Some("ReaderA")).await.unwrap();
        rig
    }
}

pub fn tag(id: &str) -> TagData {
    TagData::new(id, -52, 1, 1)
}

pub fn tags(count: usize) -> Vec<TagData> {
    (0..count).map(|i| tag(&format!("E280{i:08}"))).collect()
}

/// Next status event of `kind`, skipping others.
pub async fn next_status(stream: &mut EventStream<StatusEvent>, kind: StatusKind) -> StatusEvent {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = stream.recv().await.expect("status stream closed");
            if event.kind == kind {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for status event")
}

pub async fn next_tags(stream: &mut EventStream<TagEvent>) -> TagEvent {
    tokio::time::timeout(Duration::from_secs(5), stream.recv())
        .await
        .expect("timed out waiting for tag event")
        .expect("tag stream closed")
}
