//! Static payloads and per-test configuration.
//!
//! The payloads are trimmed captures of what a Chromium host pushes; they
//! keep the fields tablog ignores so decoding is exercised against realistic
//! shapes.

use std::path::Path;

use tablog_core::config::Config;

/// A `/json/list` body with two pages and one service worker.
pub const TARGET_LIST_JSON: &str = r#"[
  {
    "description": "",
    "devtoolsFrontendUrl": "/devtools/inspector.html?ws=localhost:9222/devtools/page/A1",
    "id": "A1",
    "title": "Inbox",
    "type": "page",
    "url": "https://mail.example.test/inbox",
    "webSocketDebuggerUrl": "ws://localhost:9222/devtools/page/A1"
  },
  {
    "description": "",
    "id": "B2",
    "title": "",
    "type": "page",
    "url": "https://docs.example.test/",
    "webSocketDebuggerUrl": "ws://localhost:9222/devtools/page/B2"
  },
  {
    "id": "SW",
    "title": "Service Worker https://mail.example.test/sw.js",
    "type": "service_worker",
    "url": "https://mail.example.test/sw.js"
  }
]"#;

/// A console call carrying a stack trace with several frames.
pub const CONSOLE_ERROR_JSON: &str = r#"{
  "type": "error",
  "args": [
    { "type": "string", "value": "failed to load" },
    { "type": "number", "value": 404, "description": "404" }
  ],
  "executionContextId": 3,
  "timestamp": 1718000000000.5,
  "stackTrace": {
    "callFrames": [
      { "functionName": "load", "scriptId": "42", "url": "https://app.example.test/app.js", "lineNumber": 17, "columnNumber": 9 },
      { "functionName": "", "scriptId": "42", "url": "https://app.example.test/app.js", "lineNumber": 3, "columnNumber": 1 }
    ]
  }
}"#;

/// An exception whose remote object has no description.
pub const EXCEPTION_VALUE_ONLY_JSON: &str = r#"{
  "timestamp": 0,
  "exceptionDetails": {
    "exceptionId": 7,
    "text": "Uncaught",
    "lineNumber": 0,
    "columnNumber": 0,
    "exception": { "type": "string", "value": "plain string thrown" }
  }
}"#;

/// Configuration writing into `dir`, with a fast liveness probe.
pub fn config_in(dir: &Path) -> Config {
    let mut config = Config::defaults();
    config.output.path = dir.join("browser.jsonl");
    config.collector.lock_path = dir.join("collector.pid");
    config.collector.liveness_interval_ms = 50;
    config
}
