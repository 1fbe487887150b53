//! Helpers for reading back the JSONL artifact and asserting on it.
//!
//! Every harness ends by inspecting the file the collector wrote, so these
//! read it as raw JSON values rather than deserializing into `LogEntry`:
//! a record that only round-trips through our own types would hide a
//! format regression.

use std::path::Path;
use std::time::Duration;

use serde_json::Value;

/// Every record in the artifact, in file order. A missing file reads as
/// empty.
pub fn read_records(path: &Path) -> Vec<Value> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => panic!("cannot read {}: {e}", path.display()),
    };
    text.lines()
        .map(|line| {
            serde_json::from_str(line)
                .unwrap_or_else(|e| panic!("torn or invalid record {line:?}: {e}"))
        })
        .collect()
}

/// The `message` field of every record, in file order.
pub fn messages(path: &Path) -> Vec<String> {
    read_records(path)
        .iter()
        .map(|r| r["message"].as_str().unwrap_or_default().to_string())
        .collect()
}

pub fn count_message(path: &Path, message: &str) -> usize {
    messages(path).iter().filter(|m| *m == message).count()
}

/// Poll the artifact until `predicate` holds on its records, or panic after
/// two seconds.
pub async fn wait_for_records<F>(path: &Path, predicate: F) -> Vec<Value>
where
    F: Fn(&[Value]) -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let records = read_records(path);
        if predicate(&records) {
            return records;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!(
                "timed out waiting on {}; records so far:\n{:#?}",
                path.display(),
                records
            );
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Wait until a record with exactly `message` has been written.
pub async fn wait_for_message(path: &Path, message: &str) -> Vec<Value> {
    wait_for_records(path, |records| {
        records.iter().any(|r| r["message"] == message)
    })
    .await
}

/// Assert that a record carries `key` with the expected JSON value.
///
/// ```rust
/// assert_record_field!(record, "level", "error");
/// ```
#[macro_export]
macro_rules! assert_record_field {
    ($record:expr, $key:expr, $value:expr) => {{
        let record: &serde_json::Value = &$record;
        let key: &str = $key;
        let expected = serde_json::json!($value);
        match record.get(key) {
            Some(actual) if *actual == expected => {}
            Some(actual) => panic!(
                "assert_record_field! failed:\n  record[{:?}]\n  expected: {}\n  actual:   {}\n  record:   {}",
                key, expected, actual, record
            ),
            None => panic!(
                "assert_record_field! failed: {:?} missing from record {}",
                key, record
            ),
        }
    }};
}

/// Assert that a record does not carry `key` at all.
#[macro_export]
macro_rules! assert_record_lacks {
    ($record:expr, $key:expr) => {{
        let record: &serde_json::Value = &$record;
        let key: &str = $key;
        if let Some(actual) = record.get(key) {
            panic!(
                "assert_record_lacks! failed: {:?} present with value {} in {}",
                key, actual, record
            );
        }
    }};
}
