//! DevTools protocol adapter — the production [`ProtocolClient`].
//!
//! Targets are listed and the host probed over HTTP (`/json/list`,
//! `/json/version`). Each target session gets its own WebSocket at the
//! target's debugger URL. Discovery runs on the browser-level WebSocket
//! advertised by `/json/version`, with `Target.setDiscoverTargets`.

mod http;
mod socket;

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tablog_core::{Domain, ProtocolEvent, Result, TargetDescriptor};
use tracing::{debug, warn};

use crate::client::{Connection, Discovery, DiscoveryEvent, ProtocolClient};
use self::http::HttpJson;
use self::socket::DevtoolsSocket;

/// `/json/version` response; only the fields tablog reads.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionInfo {
    #[serde(rename = "Browser", default)]
    pub browser: String,
    #[serde(rename = "Protocol-Version", default)]
    pub protocol_version: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    pub web_socket_debugger_url: String,
}

/// Client for a host listening on `host:port`.
#[derive(Clone)]
pub struct DevtoolsClient {
    host: String,
    port: u16,
    http: HttpJson,
}

impl std::fmt::Debug for DevtoolsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevtoolsClient")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

impl DevtoolsClient {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let host = host.into();
        Self {
            http: HttpJson::new(&host, port),
            host,
            port,
        }
    }

    /// Deadline for each `/json/*` request, body included. Defaults to five
    /// seconds.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http.set_timeout(timeout);
        self
    }

    pub async fn version(&self) -> Result<VersionInfo> {
        self.http.get("/json/version").await
    }

    fn target_url(&self, target: &TargetDescriptor) -> String {
        target
            .web_socket_debugger_url
            .clone()
            .unwrap_or_else(|| {
                format!("ws://{}:{}/devtools/page/{}", self.host, self.port, target.id)
            })
    }
}

#[async_trait]
impl ProtocolClient for DevtoolsClient {
    async fn list_targets(&self) -> Result<Vec<TargetDescriptor>> {
        self.http.get("/json/list").await
    }

    async fn connect(&self, target: &TargetDescriptor) -> Result<Box<dyn Connection>> {
        let socket = DevtoolsSocket::connect(&self.target_url(target)).await?;
        Ok(Box::new(DevtoolsConnection { socket }))
    }

    async fn probe_version(&self) -> Result<()> {
        self.version().await.map(|_| ())
    }

    async fn discover(&self) -> Result<Box<dyn Discovery>> {
        let version = self.version().await?;
        let mut socket = DevtoolsSocket::connect(&version.web_socket_debugger_url).await?;
        socket
            .call("Target.setDiscoverTargets", json!({ "discover": true }))
            .await?;
        debug!(browser = %version.browser, "target discovery enabled");
        Ok(Box::new(DevtoolsDiscovery { socket }))
    }

    fn address(&self) -> String {
        self.http.base().to_string()
    }
}

// ---------------------------------------------------------------------------
// Target connection
// ---------------------------------------------------------------------------

struct DevtoolsConnection {
    socket: DevtoolsSocket,
}

#[async_trait]
impl Connection for DevtoolsConnection {
    async fn enable(&mut self, domain: Domain) -> Result<()> {
        self.socket
            .call(domain.enable_method(), json!({}))
            .await
            .map(|_| ())
    }

    async fn next_event(&mut self) -> Option<ProtocolEvent> {
        self.socket.next_event().await
    }

    async fn close(&mut self) -> Result<()> {
        self.socket.close().await
    }
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

struct DevtoolsDiscovery {
    socket: DevtoolsSocket,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TargetCreated {
    target_info: TargetDescriptor,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TargetDestroyed {
    target_id: String,
}

#[async_trait]
impl Discovery for DevtoolsDiscovery {
    async fn next(&mut self) -> Option<DiscoveryEvent> {
        loop {
            let event = self.socket.next_event().await?;
            let decoded = match event.method.as_str() {
                "Target.targetCreated" => serde_json::from_value::<TargetCreated>(event.params)
                    .map(|created| DiscoveryEvent::Created(created.target_info)),
                "Target.targetDestroyed" => {
                    serde_json::from_value::<TargetDestroyed>(event.params)
                        .map(|destroyed| DiscoveryEvent::Destroyed(destroyed.target_id))
                }
                _ => continue,
            };
            match decoded {
                Ok(event) => return Some(event),
                Err(e) => warn!(method = %event.method, error = %e, "ignoring malformed discovery event"),
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.socket.close().await
    }
}
