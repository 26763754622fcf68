//! rfidlink shell.
//!
//! Reads one JSON method call per line from stdin, runs it against a reader
//! session backed by the mock capability, and writes one JSON line per
//! response and per event to stdout:
//!
//! ```text
//! {"method":"initialize"}
//! {"method":"connect","args":{"readerName":"ReaderB"}}
//! {"method":"startInventory"}
//! {"method":"mock.tags","args":{"count":3}}
//! ```
//!
//! `mock.*` methods drive the simulated readers: `mock.tags`, `mock.trigger`,
//! `mock.drop`, `mock.appear` and `mock.disappear`.

mod roster;

use anyhow::{Context, Result, bail};
use rfidlink_hardware::mock::{MockCapability, MockCapabilityHandle, MockReader};
use rfidlink_hardware::{HandheldTriggerEvent, ReaderDevice, StatusNotification, TagData};
use rfidlink_session::{MethodCall, ReaderSession, SessionConfig, dispatch};
use serde_json::{Map, Value, json};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::roster::{DEFAULT_ROSTER, ROSTER_ENV};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let listing = std::env::var(ROSTER_ENV).unwrap_or_else(|_| DEFAULT_ROSTER.to_owned());
    let entries = roster::parse(&listing).with_context(|| format!("invalid {ROSTER_ENV}"))?;

    let (capability, handle) = MockCapability::new();
    let readers = roster::install(&entries, &handle);
    info!(readers = readers.len(), "mock roster installed");

    let session = ReaderSession::spawn(capability, SessionConfig::default());
    let printer = spawn_event_printer(&session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = respond(&session, &handle, &readers, line).await;
        println!("{response}");
    }

    debug!("stdin closed, shutting down");
    session.shutdown().await;
    printer.await.context("event printer failed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Print both event streams until the session shuts down.
fn spawn_event_printer(session: &ReaderSession) -> JoinHandle<()> {
    let mut tags = session.subscribe_tags();
    let mut status = session.subscribe_status();

    tokio::spawn(async move {
        let (mut tags_open, mut status_open) = (true, true);

        while tags_open || status_open {
            tokio::select! {
                event = tags.recv(), if tags_open => match event {
                    Some(event) => println!("{}", json!({ "event": event })),
                    None => tags_open = false,
                },
                event = status.recv(), if status_open => match event {
                    Some(event) => println!("{}", json!({ "event": event })),
                    None => status_open = false,
                },
            }
        }
    })
}

async fn respond(
    session: &ReaderSession,
    capability: &MockCapabilityHandle,
    readers: &[MockReader],
    line: &str,
) -> Value {
    let call: MethodCall = match serde_json::from_str(line) {
        Ok(call) => call,
        Err(e) => {
            return json!({ "error": { "code": "INVALID_ARGUMENT", "message": e.to_string() } });
        }
    };

    if let Some(action) = call.method.strip_prefix("mock.") {
        let action = action.to_owned();
        let capability = capability.clone();
        let readers = readers.to_vec();

        // Mock notifications join their driver thread before returning.
        let outcome = tokio::task::spawn_blocking(move || {
            drive_mock(&action, &call.args, &capability, &readers)
        })
        .await
        .context("mock driver task failed")
        .and_then(|result| result);

        return match outcome {
            Ok(body) => json!({ "ok": body }),
            Err(e) => json!({ "error": { "code": "MOCK_ERROR", "message": format!("{e:#}") } }),
        };
    }

    match dispatch(session, &call).await {
        Ok(body) => json!({ "ok": body }),
        Err(error) => json!({ "error": error }),
    }
}

/// Simulate driver activity on the connected mock readers.
fn drive_mock(
    action: &str,
    args: &Map<String, Value>,
    capability: &MockCapabilityHandle,
    readers: &[MockReader],
) -> Result<Value> {
    let connected: Vec<&MockReader> = readers.iter().filter(|r| r.is_connected()).collect();

    match action {
        "tags" => {
            let count = args.get("count").and_then(Value::as_u64).unwrap_or(1);
            for reader in &connected {
                let host = reader.host_name();
                let batch = (0..count)
                    .map(|i| TagData::new(format!("E280{host}{i:06}"), -55, 1, 1))
                    .collect();
                reader.notify_tags(batch);
            }
            Ok(json!({ "injected": count, "readers": connected.len() }))
        }
        "trigger" => {
            let pressed = args.get("pressed").and_then(Value::as_bool).unwrap_or(true);
            let event = if pressed {
                HandheldTriggerEvent::Pressed
            } else {
                HandheldTriggerEvent::Released
            };
            for reader in &connected {
                reader.fire_status(StatusNotification::HandheldTrigger(event));
            }
            Ok(json!({ "pressed": pressed, "readers": connected.len() }))
        }
        "drop" => {
            for reader in &connected {
                reader.drop_connection();
            }
            Ok(json!({ "dropped": connected.len() }))
        }
        "appear" | "disappear" => {
            let name = args.get("name").and_then(Value::as_str);
            if action == "appear" {
                capability.reader_appeared(name);
            } else {
                capability.reader_disappeared(name);
            }
            Ok(json!({ "notified": capability.discovery_listener_count() }))
        }
        other => bail!("unknown mock action '{other}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfidlink_hardware::TransportKind;
    use rfidlink_hardware::mock::MockCapability;

    fn shell() -> (ReaderSession, MockCapabilityHandle, Vec<MockReader>) {
        let (capability, handle) = MockCapability::new();
        let reader = MockReader::new("ReaderA");
        handle.add_reader(TransportKind::Serial, reader.clone(), None);

        let session = ReaderSession::spawn(capability, SessionConfig::default());
        (session, handle, vec![reader])
    }

    #[tokio::test]
    async fn test_mock_tags_reach_the_tag_stream() {
        let (session, handle, readers) = shell();
        let mut tags = session.subscribe_tags();

        respond(&session, &handle, &readers, r#"{"method":"initialize"}"#).await;
        let connected = respond(&session, &handle, &readers, r#"{"method":"connect"}"#).await;
        assert_eq!(connected["ok"]["readerName"], "ReaderA");

        let injected = respond(
            &session,
            &handle,
            &readers,
            r#"{"method":"mock.tags","args":{"count":3}}"#,
        )
        .await;
        assert_eq!(injected["ok"]["injected"], 3);
        assert_eq!(injected["ok"]["readers"], 1);

        let event = tags.recv().await.unwrap();
        assert_eq!(event.tags.len(), 3);
        assert_eq!(event.tags[0].tag_id, "E280ReaderA000000");
    }

    #[tokio::test]
    async fn test_unknown_mock_action() {
        let (session, handle, readers) = shell();

        let response = respond(&session, &handle, &readers, r#"{"method":"mock.explode"}"#).await;
        assert_eq!(response["error"]["code"], "MOCK_ERROR");
        assert_eq!(
            response["error"]["message"],
            "unknown mock action 'explode'"
        );
    }

    #[tokio::test]
    async fn test_malformed_line() {
        let (session, handle, readers) = shell();

        let response = respond(&session, &handle, &readers, "{not json").await;
        assert_eq!(response["error"]["code"], "INVALID_ARGUMENT");
    }
}
