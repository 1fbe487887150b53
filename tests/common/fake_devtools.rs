//! Fake DevTools endpoint for adapter tests.
//!
//! Spins up a minimal `axum` server on a random TCP port bound to
//! 127.0.0.1. Serves:
//! - `GET /json/list` — configured targets, each with a debugger URL on this server
//! - `GET /json/version` — browser info and the browser-level WebSocket URL
//! - `GET /devtools/page/{id}` — per-target WebSocket: answers commands, pushes events
//! - `GET /devtools/browser/{id}` — browser WebSocket for target discovery
//!
//! Commands are answered with an empty result unless the method was marked
//! rejected, in which case the reply is a protocol error frame.
//!
//! # Example
//!
//! ```rust,no_run
//! let server = FakeDevtools::start().await.unwrap();
//! server.add_page("A1", "Inbox");
//! server.push_event("A1", "Runtime.consoleAPICalled", json!({"type": "log", "args": []}));
//! let client = DevtoolsClient::new("127.0.0.1", server.port());
//! ```

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

const BROWSER_ID: &str = "fake-browser";

enum Outbound {
    Frame(Value),
    Close,
}

#[derive(Default)]
struct ServerState {
    addr: Option<SocketAddr>,
    targets: Vec<(String, String)>,
    pages: HashMap<String, mpsc::UnboundedSender<Outbound>>,
    backlog: HashMap<String, Vec<Value>>,
    browser: Option<mpsc::UnboundedSender<Outbound>>,
    rejected: HashSet<String>,
    commands: Vec<(String, String)>,
}

type Shared = Arc<Mutex<ServerState>>;

/// Handle to the running fake DevTools server.
pub struct FakeDevtools {
    addr: SocketAddr,
    state: Shared,
}

impl FakeDevtools {
    /// Start the server on a random port. Returns once it is listening.
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state: Shared = Arc::default();
        state.lock().unwrap().addr = Some(addr);

        let app = Router::new()
            .route("/json/list", get(list_targets))
            .route("/json/version", get(version))
            .route("/devtools/page/{id}", get(page_socket))
            .route("/devtools/browser/{id}", get(browser_socket))
            .with_state(Arc::clone(&state));

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Ok(Self { addr, state })
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    fn state(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap()
    }

    pub fn add_page(&self, id: &str, title: &str) {
        self.state().targets.push((id.to_string(), title.to_string()));
    }

    /// Answer `method` with a protocol error from now on.
    pub fn reject(&self, method: &str) {
        self.state().rejected.insert(method.to_string());
    }

    /// Push a notification to a page, buffering it until the page's socket
    /// connects.
    pub fn push_event(&self, id: &str, method: &str, params: Value) {
        let frame = json!({ "method": method, "params": params });
        let mut state = self.state();
        let sent = state
            .pages
            .get(id)
            .is_some_and(|page| page.send(Outbound::Frame(frame.clone())).is_ok());
        if !sent {
            state.backlog.entry(id.to_string()).or_default().push(frame);
        }
    }

    /// Close a page's socket from the server side.
    pub fn drop_page(&self, id: &str) {
        if let Some(page) = self.state().pages.remove(id) {
            let _ = page.send(Outbound::Close);
        }
    }

    /// Push a notification on the browser socket.
    pub fn push_browser_event(&self, method: &str, params: Value) {
        if let Some(browser) = &self.state().browser {
            let _ = browser.send(Outbound::Frame(json!({ "method": method, "params": params })));
        }
    }

    pub fn is_page_connected(&self, id: &str) -> bool {
        self.state().pages.contains_key(id)
    }

    pub fn is_browser_connected(&self) -> bool {
        self.state().browser.is_some()
    }

    /// `(socket, method)` of every command received, in arrival order.
    pub fn commands(&self) -> Vec<(String, String)> {
        self.state().commands.clone()
    }
}

// ---------------------------------------------------------------------------
// HTTP handlers
// ---------------------------------------------------------------------------

async fn list_targets(State(state): State<Shared>) -> impl IntoResponse {
    let state = state.lock().unwrap();
    let addr = state.addr.expect("address recorded at start");
    let targets: Vec<Value> = state
        .targets
        .iter()
        .map(|(id, title)| {
            json!({
                "id": id,
                "type": "page",
                "title": title,
                "url": format!("https://example.test/{id}"),
                "webSocketDebuggerUrl": format!("ws://{addr}/devtools/page/{id}"),
            })
        })
        .collect();
    Json(targets)
}

async fn version(State(state): State<Shared>) -> impl IntoResponse {
    let addr = state.lock().unwrap().addr.expect("address recorded at start");
    Json(json!({
        "Browser": "FakeChrome/1.0",
        "Protocol-Version": "1.3",
        "webSocketDebuggerUrl": format!("ws://{addr}/devtools/browser/{BROWSER_ID}"),
    }))
}

// ---------------------------------------------------------------------------
// WebSocket handlers
// ---------------------------------------------------------------------------

async fn page_socket(
    Path(id): Path<String>,
    State(state): State<Shared>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        let (tx, rx) = mpsc::unbounded_channel();
        {
            let mut state = state.lock().unwrap();
            for frame in state.backlog.remove(&id).unwrap_or_default() {
                let _ = tx.send(Outbound::Frame(frame));
            }
            state.pages.insert(id.clone(), tx);
        }
        serve_socket(socket, rx, state, id).await;
    })
}

async fn browser_socket(
    Path(id): Path<String>,
    State(state): State<Shared>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        let (tx, rx) = mpsc::unbounded_channel();
        state.lock().unwrap().browser = Some(tx);
        serve_socket(socket, rx, state, id).await;
    })
}

async fn serve_socket(
    mut socket: WebSocket,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    state: Shared,
    name: String,
) {
    loop {
        tokio::select! {
            incoming = socket.recv() => {
                let text = match incoming {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(_)) => continue,
                };
                let Ok(command) = serde_json::from_str::<Value>(text.as_str()) else {
                    continue;
                };
                let reply = answer(&state, &name, &command);
                if socket.send(Message::Text(reply.to_string().into())).await.is_err() {
                    break;
                }
            }
            next = outbound.recv() => match next {
                Some(Outbound::Frame(frame)) => {
                    if socket.send(Message::Text(frame.to_string().into())).await.is_err() {
                        break;
                    }
                }
                Some(Outbound::Close) | None => {
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                }
            },
        }
    }
}

fn answer(state: &Shared, socket: &str, command: &Value) -> Value {
    let id = command["id"].clone();
    let method = command["method"].as_str().unwrap_or_default().to_string();
    let mut state = state.lock().unwrap();
    state.commands.push((socket.to_string(), method.clone()));
    if state.rejected.contains(&method) {
        json!({ "id": id, "error": { "code": -32601, "message": format!("'{method}' wasn't found") } })
    } else {
        json!({ "id": id, "result": {} })
    }
}
