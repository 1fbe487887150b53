//! Core types for tablog-core.
//!
//! This module defines the data shared by every layer: the canonical
//! [`LogEntry`] persisted by the sink, its [`LogLevel`] and [`Category`], and
//! the [`TargetDescriptor`] the host reports for each monitored target.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// A canonical log entry, the only unit the sink ever persists.
///
/// On disk every entry is one JSON object per line. Field names follow the
/// record layout readers already expect (`ts`, `type`, `url`, `line`, `tab`),
/// and `extra` keys are flattened into the top-level object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Capture instant, taken when the entry is formatted.
    #[serde(rename = "ts", serialize_with = "serialize_millis")]
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    /// Origin tag. `None` for ordinary console output and protocol log entries.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    /// Flattened human-readable message. Never null, possibly empty.
    pub message: String,
    #[serde(rename = "url", default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(rename = "line", default, skip_serializing_if = "Option::is_none")]
    pub source_line: Option<u64>,
    /// Label of the originating target (title, falling back to URL).
    #[serde(rename = "tab", default, skip_serializing_if = "Option::is_none")]
    pub tab_label: Option<String>,
    /// Category-specific keys, e.g. `status` for HTTP errors.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl LogEntry {
    /// Start an entry stamped with the current time and no optional fields.
    pub fn now(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            category: None,
            message: message.into(),
            source_url: None,
            source_line: None,
            tab_label: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_location(mut self, url: Option<String>, line: Option<u64>) -> Self {
        self.source_url = url;
        self.source_line = line;
        self
    }

    pub fn with_tab(mut self, tab: Option<&str>) -> Self {
        self.tab_label = tab.map(str::to_string);
        self
    }

    pub fn with_extra(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    /// Serialize to a single newline-terminated JSON record.
    pub fn to_record(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

fn serialize_millis<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Log severity, normalised across every feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Log,
    Info,
    Warn,
    Error,
    Debug,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Log => write!(f, "log"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
            LogLevel::Debug => write!(f, "debug"),
        }
    }
}

/// Which kind of event produced an entry, when it is not plain console output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Exception,
    Network,
    Http,
    /// Entries written by the collector about itself.
    Collector,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Exception => write!(f, "exception"),
            Category::Network => write!(f, "network"),
            Category::Http => write!(f, "http"),
            Category::Collector => write!(f, "collector"),
        }
    }
}

/// A target as reported by the host's listing or discovery notifications.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetDescriptor {
    #[serde(alias = "targetId")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub web_socket_debugger_url: Option<String>,
}

impl TargetDescriptor {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            title: String::new(),
            url: String::new(),
            web_socket_debugger_url: None,
        }
    }

    /// Human label: the title, or the URL when the title is empty.
    pub fn label(&self) -> &str {
        if self.title.is_empty() {
            &self.url
        } else {
            &self.title
        }
    }
}
