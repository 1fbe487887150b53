//! Entry formatter — maps protocol payloads onto canonical [`LogEntry`] values.
//!
//! Every function here is pure apart from stamping the capture time: no
//! state, no I/O. Each feed kind gets its own mapping so that feed-specific
//! quirks stay in one small function. Mappings that return `Option` suppress
//! events that are not worth recording.

use serde_json::Value;

use crate::events::{
    ConsoleApiCalled, EntryAdded, ExceptionThrown, FeedEvent, LoadingFailed, ObjectPreview,
    RemoteObject, ResponseReceived,
};
use crate::types::{Category, LogEntry, LogLevel};

/// Failure reason the host reports for loads cancelled by navigation.
pub const ABORTED_REASON: &str = "net::ERR_ABORTED";

// ---------------------------------------------------------------------------
// Levels
// ---------------------------------------------------------------------------

/// Map a console call type or protocol log level onto a [`LogLevel`].
pub fn normalize_level(kind: &str) -> LogLevel {
    match kind {
        "info" => LogLevel::Info,
        "warning" | "warn" => LogLevel::Warn,
        "error" | "assert" | "exception" => LogLevel::Error,
        "debug" | "trace" => LogLevel::Debug,
        // log, dir, table, and everything unknown
        _ => LogLevel::Log,
    }
}

// ---------------------------------------------------------------------------
// Argument rendering
// ---------------------------------------------------------------------------

/// Render console arguments as one space-separated string.
pub fn extract_message(args: &[RemoteObject]) -> String {
    args.iter()
        .map(render_argument)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render a single remote value the way the console would print it.
pub fn render_argument(arg: &RemoteObject) -> String {
    match arg.kind.as_str() {
        "string" | "number" | "boolean" if arg.value.is_some() => {
            arg.value.as_ref().map(render_value).unwrap_or_default()
        }
        "number" => arg
            .unserializable_value
            .clone()
            .or_else(|| arg.description.clone())
            .unwrap_or_else(|| "NaN".to_string()),
        "undefined" => "undefined".to_string(),
        "object" if arg.subtype.as_deref() == Some("null") => "null".to_string(),
        "object" => match &arg.preview {
            Some(preview) => render_preview(preview),
            None => non_empty(&arg.description).unwrap_or_else(|| "[object]".to_string()),
        },
        "function" => non_empty(&arg.description).unwrap_or_else(|| "[function]".to_string()),
        _ => non_empty(&arg.description)
            .or_else(|| truthy(&arg.value).map(render_value))
            .unwrap_or_else(|| arg.kind.clone()),
    }
}

/// An empty description counts as absent.
fn non_empty(text: &Option<String>) -> Option<String> {
    text.as_deref().filter(|t| !t.is_empty()).map(str::to_string)
}

/// Values that carry something worth printing: not null, false, zero or
/// an empty string.
fn truthy(value: &Option<Value>) -> Option<&Value> {
    value.as_ref().filter(|v| match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    })
}

fn render_preview(preview: &ObjectPreview) -> String {
    let is_array = preview.subtype.as_deref() == Some("array") || preview.kind == "array";
    let mut parts: Vec<String> = preview
        .properties
        .iter()
        .map(|p| {
            let value = p.value.as_deref().unwrap_or("undefined");
            if is_array {
                value.to_string()
            } else {
                format!("{}: {}", p.name, value)
            }
        })
        .collect();
    if preview.overflow {
        parts.push("...".to_string());
    }
    let body = parts.join(", ");
    if is_array {
        format!("[{body}]")
    } else {
        format!("{{{body}}}")
    }
}

/// Textual form of a JSON value: strings unquoted, integral floats without
/// a fractional part.
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
                format!("{}", f as i64)
            }
            _ => n.to_string(),
        },
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Feed mappings
// ---------------------------------------------------------------------------

/// `Runtime.consoleAPICalled` → entry at the call's level.
pub fn console_entry(call: &ConsoleApiCalled, tab: Option<&str>) -> LogEntry {
    let frame = call
        .stack_trace
        .as_ref()
        .and_then(|trace| trace.call_frames.first());
    LogEntry::now(normalize_level(&call.kind), extract_message(&call.args))
        .with_location(
            frame.map(|f| f.url.clone()),
            frame.map(|f| f.line_number),
        )
        .with_tab(tab)
}

/// `Runtime.exceptionThrown` → error entry tagged `exception`.
pub fn exception_entry(thrown: &ExceptionThrown, tab: Option<&str>) -> LogEntry {
    let details = &thrown.exception_details;
    let exception = details.exception.as_ref();
    let message = exception
        .and_then(|e| non_empty(&e.description))
        .or_else(|| exception.and_then(|e| truthy(&e.value)).map(render_value))
        .unwrap_or_else(|| details.text.clone());
    LogEntry::now(LogLevel::Error, message)
        .with_category(Category::Exception)
        .with_location(details.url.clone(), details.line_number)
        .with_tab(tab)
}

/// `Log.entryAdded` → entry at the protocol's level, text verbatim.
pub fn log_entry(added: &EntryAdded, tab: Option<&str>) -> LogEntry {
    let entry = &added.entry;
    let mut out = LogEntry::now(normalize_level(&entry.level), entry.text.clone())
        .with_location(entry.url.clone(), entry.line_number)
        .with_tab(tab);
    if let Some(source) = &entry.source {
        out = out.with_extra("source", source.clone());
    }
    out
}

/// `Network.loadingFailed` → error entry, or nothing for aborted loads.
pub fn loading_failed_entry(failed: &LoadingFailed) -> Option<LogEntry> {
    if failed.error_text == ABORTED_REASON {
        return None;
    }
    Some(
        LogEntry::now(
            LogLevel::Error,
            format!("{} ({})", failed.error_text, failed.resource_type),
        )
        .with_category(Category::Network),
    )
}

/// `Network.responseReceived` → error entry for statuses of 400 and above.
pub fn response_entry(received: &ResponseReceived) -> Option<LogEntry> {
    let response = &received.response;
    if response.status < 400 {
        return None;
    }
    let url = response.url.split('?').next().unwrap_or_default();
    Some(
        LogEntry::now(
            LogLevel::Error,
            format!("HTTP {}: {}", response.status, url),
        )
        .with_category(Category::Http)
        .with_extra("status", response.status),
    )
}

/// Informational entry the collector writes about its own lifecycle.
pub fn collector_entry(message: impl Into<String>) -> LogEntry {
    LogEntry::now(LogLevel::Info, message).with_category(Category::Collector)
}

/// Dispatch a decoded event to its mapping.
pub fn format_event(event: &FeedEvent, tab: Option<&str>) -> Option<LogEntry> {
    match event {
        FeedEvent::ConsoleApiCalled(call) => Some(console_entry(call, tab)),
        FeedEvent::ExceptionThrown(thrown) => Some(exception_entry(thrown, tab)),
        FeedEvent::EntryAdded(added) => Some(log_entry(added, tab)),
        FeedEvent::LoadingFailed(failed) => loading_failed_entry(failed),
        FeedEvent::ResponseReceived(received) => response_entry(received),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
