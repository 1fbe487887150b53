//! Test builders — raw protocol notifications and target descriptors.
//!
//! These produce the `(method, params)` pairs a host would push, so the
//! harnesses exercise decoding and formatting together. They are written
//! for readability in assertions, not for production use.

use serde_json::{json, Value};
use tablog_core::{ProtocolEvent, TargetDescriptor};

// ---------------------------------------------------------------------------
// Targets
// ---------------------------------------------------------------------------

/// A `page` target with a title and URL.
pub fn page(id: &str, title: &str) -> TargetDescriptor {
    let mut target = TargetDescriptor::new(id, "page");
    target.title = title.to_string();
    target.url = format!("https://example.test/{id}");
    target
}

/// A target of an arbitrary type (`service_worker`, `iframe`, ...).
pub fn target_of_type(id: &str, kind: &str) -> TargetDescriptor {
    let mut target = TargetDescriptor::new(id, kind);
    target.title = format!("{kind} {id}");
    target
}

// ---------------------------------------------------------------------------
// Console arguments
// ---------------------------------------------------------------------------

pub fn string_arg(value: &str) -> Value {
    json!({ "type": "string", "value": value })
}

pub fn number_arg(value: impl Into<Value>) -> Value {
    json!({ "type": "number", "value": value.into() })
}

pub fn bool_arg(value: bool) -> Value {
    json!({ "type": "boolean", "value": value })
}

/// An object argument whose preview lists `(name, value)` pairs.
pub fn object_arg(properties: &[(&str, &str)], overflow: bool) -> Value {
    let properties: Vec<Value> = properties
        .iter()
        .map(|(name, value)| json!({ "name": name, "type": "string", "value": value }))
        .collect();
    json!({
        "type": "object",
        "className": "Object",
        "description": "Object",
        "preview": {
            "type": "object",
            "overflow": overflow,
            "properties": properties,
        }
    })
}

/// An array argument whose preview lists its elements.
pub fn array_arg(items: &[&str], overflow: bool) -> Value {
    let properties: Vec<Value> = items
        .iter()
        .enumerate()
        .map(|(i, value)| json!({ "name": i.to_string(), "type": "number", "value": value }))
        .collect();
    json!({
        "type": "object",
        "subtype": "array",
        "description": format!("Array({})", items.len()),
        "preview": {
            "type": "object",
            "subtype": "array",
            "overflow": overflow,
            "properties": properties,
        }
    })
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

pub fn console_event(kind: &str, args: Vec<Value>) -> ProtocolEvent {
    ProtocolEvent::new(
        "Runtime.consoleAPICalled",
        json!({ "type": kind, "args": args, "executionContextId": 1, "timestamp": 0 }),
    )
}

/// A console call with a top stack frame.
pub fn console_event_at(kind: &str, args: Vec<Value>, url: &str, line: u64) -> ProtocolEvent {
    ProtocolEvent::new(
        "Runtime.consoleAPICalled",
        json!({
            "type": kind,
            "args": args,
            "stackTrace": {
                "callFrames": [
                    { "functionName": "main", "url": url, "lineNumber": line, "columnNumber": 4 }
                ]
            }
        }),
    )
}

pub fn exception_event(description: &str, url: &str, line: u64) -> ProtocolEvent {
    ProtocolEvent::new(
        "Runtime.exceptionThrown",
        json!({
            "timestamp": 0,
            "exceptionDetails": {
                "exceptionId": 1,
                "text": "Uncaught",
                "lineNumber": line,
                "columnNumber": 0,
                "url": url,
                "exception": { "type": "object", "subtype": "error", "description": description }
            }
        }),
    )
}

pub fn log_added_event(source: &str, level: &str, text: &str) -> ProtocolEvent {
    ProtocolEvent::new(
        "Log.entryAdded",
        json!({ "entry": { "source": source, "level": level, "text": text, "timestamp": 0 } }),
    )
}

pub fn loading_failed_event(error_text: &str, resource_type: &str) -> ProtocolEvent {
    ProtocolEvent::new(
        "Network.loadingFailed",
        json!({
            "requestId": "1000.1",
            "timestamp": 0,
            "type": resource_type,
            "errorText": error_text,
            "canceled": false
        }),
    )
}

pub fn response_event(url: &str, status: u16) -> ProtocolEvent {
    ProtocolEvent::new(
        "Network.responseReceived",
        json!({
            "requestId": "1000.2",
            "type": "XHR",
            "response": { "url": url, "status": status, "statusText": "", "mimeType": "text/html" }
        }),
    )
}
