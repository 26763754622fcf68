mod common;

use common::Rig;
use rfidlink_hardware::ReaderDevice;
use rfidlink_session::{MethodCall, dispatch};
use serde_json::{Value, json};

async fn call(rig: &Rig, request: Value) -> Result<serde_json::Map<String, Value>, rfidlink_session::MethodError> {
    let call: MethodCall = serde_json::from_value(request).unwrap();
    dispatch(&rig.session, &call).await
}

#[tokio::test]
async fn test_method_flow() {
    let rig = Rig::new();

    let init = call(&rig, json!({"method": "initialize"})).await.unwrap();
    assert_eq!(init["transport"], "SERIAL");
    assert_eq!(init["readerCount"], 2);
    assert!(init["status"].as_str().unwrap().contains("[INIT]"));

    let listed = call(&rig, json!({"method": "listReaders"})).await.unwrap();
    assert_eq!(
        listed["readers"],
        json!([
            {"name": "ReaderA", "address": "N/A", "model": "Unknown"},
            {"name": "ReaderB", "address": "/dev/ttyUSB1", "model": "RFD4031"},
        ])
    );

    let connected = call(
        &rig,
        json!({"method": "connect", "args": {"readerName": "ReaderB"}}),
    )
    .await
    .unwrap();
    assert_eq!(connected["readerName"], "ReaderB");
    assert_eq!(connected["message"], "Connected to ReaderB");

    let linked = call(&rig, json!({"method": "isConnected"})).await.unwrap();
    assert_eq!(linked["connected"], true);

    let set = call(
        &rig,
        json!({"method": "setAntennaPower", "args": {"powerLevel": 100}}),
    )
    .await
    .unwrap();
    assert_eq!(set["powerLevel"], 100);
    assert_eq!(set["message"], "Power set to 100");

    let power = call(&rig, json!({"method": "getAntennaPower"})).await.unwrap();
    assert_eq!(power["currentPower"], 100);
    assert_eq!(power["maxPower"], 270);

    let started = call(&rig, json!({"method": "startInventory"})).await.unwrap();
    assert_eq!(started["message"], "Inventory started");

    let stopped = call(&rig, json!({"method": "stopInventory"})).await.unwrap();
    assert_eq!(stopped["message"], "Inventory stopped");

    let gone = call(&rig, json!({"method": "disconnect"})).await.unwrap();
    assert_eq!(gone["message"], "Disconnected successfully");

    let disposed = call(&rig, json!({"method": "dispose"})).await.unwrap();
    assert_eq!(disposed["message"], "Disposed");
}

#[tokio::test]
async fn test_failures_carry_code_and_trace() {
    let rig = Rig::connected().await;

    let error = call(
        &rig,
        json!({"method": "setAntennaPower", "args": {"powerLevel": 999}}),
    )
    .await
    .unwrap_err();

    assert_eq!(error.code, "INVALID_POWER_LEVEL");
    assert_eq!(error.message, "Invalid power level. Must be 0-270");
    let trace = error.details.unwrap()["status"].as_str().unwrap().to_owned();
    assert!(trace.contains("[SET_POWER] Called with level 999"));
}

#[tokio::test]
async fn test_missing_power_level() {
    let rig = Rig::connected().await;

    let error = call(&rig, json!({"method": "setAntennaPower"}))
        .await
        .unwrap_err();
    assert_eq!(error.code, "INVALID_ARGUMENT");
    assert!(error.details.is_none());
}

#[tokio::test]
async fn test_unknown_method() {
    let rig = Rig::new();

    let error = call(&rig, json!({"method": "readBarcode"})).await.unwrap_err();
    assert_eq!(error.code, "NOT_IMPLEMENTED");
    assert_eq!(error.message, "Method 'readBarcode' is not implemented");
}

#[tokio::test]
async fn test_platform_version() {
    let rig = Rig::new();

    let version = call(&rig, json!({"method": "getPlatformVersion"})).await.unwrap();
    let text = version["version"].as_str().unwrap();
    assert!(text.starts_with("rfidlink "));
    assert!(text.contains(std::env::consts::OS));
}

#[tokio::test]
async fn test_error_serializes_with_details() {
    let rig = Rig::new();

    let error = call(&rig, json!({"method": "getAntennaPower"})).await.unwrap_err();
    let wire = serde_json::to_value(&error).unwrap();

    assert_eq!(wire["code"], "READER_NOT_CONNECTED");
    assert!(wire["details"]["status"].is_string());
}

#[tokio::test]
async fn test_reader_prefixed_method_names() {
    let rig = Rig::new();
    call(&rig, json!({"method": "initialize"})).await.unwrap();

    let listed = call(&rig, json!({"method": "getAllAvailableReaders"}))
        .await
        .unwrap();
    assert_eq!(listed["readers"].as_array().unwrap().len(), 2);

    let connected = call(
        &rig,
        json!({"method": "connectReader", "args": {"readerName": "readerb"}}),
    )
    .await
    .unwrap();
    assert_eq!(connected["readerName"], "ReaderB");

    let linked = call(&rig, json!({"method": "isReaderConnected"}))
        .await
        .unwrap();
    assert_eq!(linked["connected"], true);

    let gone = call(&rig, json!({"method": "disconnectReader"}))
        .await
        .unwrap();
    assert_eq!(gone["message"], "Disconnected successfully");
    assert!(!rig.reader_b.is_connected());
}
