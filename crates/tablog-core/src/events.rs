//! Typed protocol notifications consumed by the formatter.
//!
//! The protocol client hands over raw `(method, params)` pairs. [`FeedEvent::decode`]
//! turns the ones tablog cares about into typed payloads; everything else is
//! ignored. Only the fields the formatter reads are modelled; unknown fields
//! are skipped by serde.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Domains
// ---------------------------------------------------------------------------

/// A protocol domain whose `enable` command turns on one or more feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    /// Console API calls and uncaught exceptions.
    Runtime,
    /// Protocol-level log entries (interventions, violations, network notices).
    Log,
    /// Loading failures and response headers.
    Network,
}

impl Domain {
    /// Domains a session enables, in order.
    pub const ALL: [Domain; 3] = [Domain::Runtime, Domain::Log, Domain::Network];

    pub fn name(self) -> &'static str {
        match self {
            Domain::Runtime => "Runtime",
            Domain::Log => "Log",
            Domain::Network => "Network",
        }
    }

    pub fn enable_method(self) -> &'static str {
        match self {
            Domain::Runtime => "Runtime.enable",
            Domain::Log => "Log.enable",
            Domain::Network => "Network.enable",
        }
    }

    /// Some target types reject `Network.enable`; a session survives without it.
    pub fn is_required(self) -> bool {
        !matches!(self, Domain::Network)
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Raw notification
// ---------------------------------------------------------------------------

/// An unparsed notification pushed by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolEvent {
    pub method: String,
    pub params: Value,
}

impl ProtocolEvent {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }
}

// ---------------------------------------------------------------------------
// Typed payloads
// ---------------------------------------------------------------------------

/// A notification the formatter knows how to map.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    ConsoleApiCalled(ConsoleApiCalled),
    ExceptionThrown(ExceptionThrown),
    EntryAdded(EntryAdded),
    LoadingFailed(LoadingFailed),
    ResponseReceived(ResponseReceived),
}

impl FeedEvent {
    /// Decode a raw notification.
    ///
    /// Returns `Ok(None)` for methods tablog does not record and
    /// [`Error::Format`] when a known method carries a malformed payload.
    pub fn decode(event: &ProtocolEvent) -> Result<Option<Self>> {
        let params = event.params.clone();
        let decoded = match event.method.as_str() {
            "Runtime.consoleAPICalled" => {
                serde_json::from_value(params).map(FeedEvent::ConsoleApiCalled)
            }
            "Runtime.exceptionThrown" => {
                serde_json::from_value(params).map(FeedEvent::ExceptionThrown)
            }
            "Log.entryAdded" => serde_json::from_value(params).map(FeedEvent::EntryAdded),
            "Network.loadingFailed" => {
                serde_json::from_value(params).map(FeedEvent::LoadingFailed)
            }
            "Network.responseReceived" => {
                serde_json::from_value(params).map(FeedEvent::ResponseReceived)
            }
            _ => return Ok(None),
        };
        decoded.map(Some).map_err(|source| Error::Format {
            method: event.method.clone(),
            source,
        })
    }
}

/// `Runtime.consoleAPICalled`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleApiCalled {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub args: Vec<RemoteObject>,
    #[serde(default)]
    pub stack_trace: Option<StackTrace>,
}

/// A mirror of a value living in the target.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObject {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub unserializable_value: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub preview: Option<ObjectPreview>,
}

/// Bounded preview of an object's first properties.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ObjectPreview {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub subtype: Option<String>,
    /// `true` when more properties exist than the preview lists.
    #[serde(default)]
    pub overflow: bool,
    #[serde(default)]
    pub properties: Vec<PropertyPreview>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PropertyPreview {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackTrace {
    #[serde(default)]
    pub call_frames: Vec<CallFrame>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFrame {
    #[serde(default)]
    pub function_name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub line_number: u64,
}

/// `Runtime.exceptionThrown`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionThrown {
    pub exception_details: ExceptionDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionDetails {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub exception: Option<RemoteObject>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub line_number: Option<u64>,
}

/// `Log.entryAdded`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EntryAdded {
    pub entry: ProtocolLogEntry,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolLogEntry {
    #[serde(default)]
    pub source: Option<String>,
    pub level: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub line_number: Option<u64>,
}

/// `Network.loadingFailed`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadingFailed {
    pub error_text: String,
    /// Resource type (`Document`, `Script`, `XHR`, ...).
    #[serde(rename = "type", default)]
    pub resource_type: String,
}

/// `Network.responseReceived`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResponseReceived {
    pub response: Response,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Response {
    pub url: String,
    pub status: u16,
}
