//! Named method-call boundary.
//!
//! Maps `{"method": ..., "args": {...}}` requests onto session commands and
//! renders results as flat JSON objects. Every success carries `status`, the
//! full session trace; every failure carries it under `details.status`.
//!
//! The reader-prefixed names (`getAllAvailableReaders`, `isReaderConnected`,
//! `connectReader`, `disconnectReader`) are accepted as aliases.

use rfidlink_core::{CommandFailure, CommandReply, CommandResult, ErrorCode, VERSION};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::session::ReaderSession;

/// A request received over the method-call boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,

    #[serde(default)]
    pub args: Map<String, Value>,
}

impl MethodCall {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            args: Map::new(),
        }
    }

    pub fn with_arg(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.args.insert(key.to_owned(), value.into());
        self
    }
}

/// Failure returned over the method-call boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct MethodError {
    pub code: String,
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl MethodError {
    fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.as_str().to_owned(),
            message: message.into(),
            details: None,
        }
    }
}

impl From<CommandFailure> for MethodError {
    fn from(failure: CommandFailure) -> Self {
        Self {
            code: failure.code.as_str().to_owned(),
            message: failure.message,
            details: Some(json!({ "status": failure.status })),
        }
    }
}

pub type MethodResult = Result<Map<String, Value>, MethodError>;

/// Run `call` against `session`.
pub async fn dispatch(session: &ReaderSession, call: &MethodCall) -> MethodResult {
    debug!(method = %call.method, "dispatching method call");

    match call.method.as_str() {
        "initialize" => render(session.initialize().await, |summary| {
            json!({
                "message": summary.message,
                "transport": summary.transport,
                "readerCount": summary.reader_count,
            })
        }),
        "listReaders" | "getAllAvailableReaders" => {
            render(session.list_readers().await, |readers| {
                json!({ "readers": readers })
            })
        }
        "isConnected" | "isReaderConnected" => {
            render(session.is_connected().await, |connected| {
                json!({ "connected": connected })
            })
        }
        "connect" | "connectReader" => {
            let name = optional_str(call, "readerName")?;
            render(session.connect(name).await, |summary| {
                json!({
                    "message": summary.message,
                    "readerName": summary.reader_name,
                })
            })
        }
        "disconnect" | "disconnectReader" => render(session.disconnect().await, message),
        "startInventory" => render(session.start_inventory().await, message),
        "stopInventory" => render(session.stop_inventory().await, message),
        "setAntennaPower" => {
            let level = required_power(call)?;
            render(session.set_antenna_power(level).await, |power| {
                json!({
                    "message": format!("Power set to {power}"),
                    "powerLevel": power,
                })
            })
        }
        "getAntennaPower" => render(session.get_antenna_power().await, |reading| {
            json!({
                "currentPower": reading.current_power,
                "maxPower": reading.max_power,
            })
        }),
        "dispose" => render(session.dispose().await, message),
        "getPlatformVersion" => Ok(object(json!({
            "version": format!("rfidlink {VERSION} ({})", std::env::consts::OS),
        }))),
        other => Err(MethodError::new(
            ErrorCode::NotImplemented,
            format!("Method '{other}' is not implemented"),
        )),
    }
}

fn render<T>(outcome: CommandResult<CommandReply<T>>, fields: impl FnOnce(T) -> Value) -> MethodResult {
    let reply = outcome?.map(|payload| object(fields(payload)));
    let mut body = reply.payload;
    body.insert("status".into(), Value::String(reply.status));
    Ok(body)
}

fn message(text: String) -> Value {
    json!({ "message": text })
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("value".into(), other);
            map
        }
    }
}

fn optional_str<'a>(call: &'a MethodCall, key: &str) -> Result<Option<&'a str>, MethodError> {
    match call.args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(MethodError::new(
            ErrorCode::InvalidArgument,
            format!("{key} must be a string"),
        )),
    }
}

fn required_power(call: &MethodCall) -> Result<i32, MethodError> {
    let level = call
        .args
        .get("powerLevel")
        .and_then(Value::as_i64)
        .ok_or_else(|| MethodError::new(ErrorCode::InvalidArgument, "powerLevel is required"))?;

    // Out-of-range values still reach the session's bounds check.
    Ok(i32::try_from(level).unwrap_or(if level < 0 { i32::MIN } else { i32::MAX }))
}
