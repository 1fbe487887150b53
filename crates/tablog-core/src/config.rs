//! Configuration types for tablog.
//!
//! [`Config::load`] layers, lowest priority first: the embedded defaults,
//! `~/.config/tablog/config.toml` (or an explicit file), the `CDP_HOST`,
//! `CDP_PORT` and `BROWSER_LOG_FILE` environment variables, and finally
//! command-line [`Overrides`]. [`Config::defaults`] returns the embedded
//! defaults without touching the filesystem or environment (useful in tests).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Embedded defaults
// ---------------------------------------------------------------------------

const DEFAULT_CONFIG: &str = r#"
[host]
address = "localhost"
port    = 9222

[output]
path           = "/tmp/browser-ctl-logs.jsonl"
max_size_bytes = 10485760

[collector]
lock_path                = "/tmp/browser-log-collector.pid"
liveness_interval_ms     = 5000
target_type              = "page"
"#;

// ---------------------------------------------------------------------------
// Public config types
// ---------------------------------------------------------------------------

/// Top-level collector configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub host: HostConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub collector: CollectorConfig,
}

/// `[host]` — where the instrumented host listens.
#[derive(Debug, Clone, Deserialize)]
pub struct HostConfig {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_address() -> String { "localhost".to_string() }
fn default_port() -> u16 { 9222 }

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
        }
    }
}

impl HostConfig {
    /// `address:port`, as used in diagnostics and HTTP requests.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// `[output]` — the JSONL artifact and its rotation threshold.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
    #[serde(default = "default_max_size_bytes")]
    pub max_size_bytes: u64,
}

fn default_output_path() -> PathBuf { PathBuf::from("/tmp/browser-ctl-logs.jsonl") }
fn default_max_size_bytes() -> u64 { crate::sink::DEFAULT_MAX_SIZE }

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            max_size_bytes: default_max_size_bytes(),
        }
    }
}

/// `[collector]` — lifecycle knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    #[serde(default = "default_lock_path")]
    pub lock_path: PathBuf,
    #[serde(default = "default_liveness_interval_ms")]
    pub liveness_interval_ms: u64,
    /// Only targets of this type are monitored.
    #[serde(default = "default_target_type")]
    pub target_type: String,
}

fn default_lock_path() -> PathBuf { PathBuf::from(crate::lockfile::DEFAULT_LOCK_PATH) }
fn default_liveness_interval_ms() -> u64 { 5000 }
fn default_target_type() -> String { "page".to_string() }

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            lock_path: default_lock_path(),
            liveness_interval_ms: default_liveness_interval_ms(),
            target_type: default_target_type(),
        }
    }
}

impl CollectorConfig {
    pub fn liveness_interval(&self) -> Duration {
        Duration::from_millis(self.liveness_interval_ms)
    }
}

/// Values given on the command line; `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config_file: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub output: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Config {
    /// Load every layer. A missing config file is not an error.
    pub fn load(overrides: &Overrides) -> anyhow::Result<Self> {
        let file = overrides.config_file.clone().unwrap_or_else(config_path);
        Self::load_from(&file, overrides)
    }

    fn load_from(file: &Path, overrides: &Overrides) -> anyhow::Result<Self> {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .add_source(config::File::from(file).required(false))
            .set_override_option("host.address", std::env::var("CDP_HOST").ok())?
            .set_override_option("host.port", std::env::var("CDP_PORT").ok())?
            .set_override_option("output.path", std::env::var("BROWSER_LOG_FILE").ok())?
            .set_override_option("host.address", overrides.host.clone())?
            .set_override_option("host.port", overrides.port.map(i64::from))?
            .set_override_option(
                "output.path",
                overrides
                    .output
                    .as_ref()
                    .map(|p| p.to_string_lossy().into_owned()),
            )?
            .build()?
            .try_deserialize()
            .map_err(Into::into)
    }

    /// Return the built-in defaults without touching the filesystem.
    pub fn defaults() -> Self {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .build()
            .expect("built-in default config must be valid TOML")
            .try_deserialize()
            .expect("built-in default config must deserialize correctly")
    }
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

fn config_path() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".to_string()))
                .join(".config")
        })
        .join("tablog")
        .join("config.toml")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
