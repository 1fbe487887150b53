//! WebSocket command/notification multiplexer.
//!
//! Commands are JSON frames `{id, method, params}`; the host answers with
//! `{id, result}` or `{id, error}` and pushes notifications as
//! `{method, params}`. A reader task routes replies to the waiting caller
//! and queues notifications in arrival order. When the socket closes the
//! notification queue ends, which is how disconnection is observed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tablog_core::{Error, ProtocolEvent, Result};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

const COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value>>>>>;

pub(crate) struct DevtoolsSocket {
    url: String,
    writer: SplitSink<WsStream, Message>,
    pending: Pending,
    events: mpsc::UnboundedReceiver<ProtocolEvent>,
    reader: JoinHandle<()>,
    next_id: u64,
}

#[derive(Deserialize)]
struct Frame {
    id: Option<u64>,
    method: Option<String>,
    #[serde(default)]
    params: Value,
    result: Option<Value>,
    error: Option<FrameError>,
}

#[derive(Deserialize)]
struct FrameError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

impl DevtoolsSocket {
    pub(crate) async fn connect(url: &str) -> Result<Self> {
        let (stream, _) = connect_async(url)
            .await
            .map_err(|e| Error::connection(url, e))?;
        let (writer, reader) = stream.split();

        let pending: Pending = Arc::default();
        let (events_tx, events) = mpsc::unbounded_channel();
        let reader = tokio::spawn(read_loop(
            reader,
            Arc::clone(&pending),
            events_tx,
            url.to_string(),
        ));

        debug!(%url, "websocket connected");
        Ok(Self {
            url: url.to_string(),
            writer,
            pending,
            events,
            reader,
            next_id: 0,
        })
    }

    /// Send a command and wait for its reply.
    pub(crate) async fn call(&mut self, method: &str, params: Value) -> Result<Value> {
        self.next_id += 1;
        let id = self.next_id;
        let (tx, rx) = oneshot::channel();
        lock(&self.pending).insert(id, tx);

        let frame = json!({ "id": id, "method": method, "params": params }).to_string();
        if let Err(e) = self.writer.send(Message::Text(frame.into())).await {
            lock(&self.pending).remove(&id);
            return Err(Error::connection(&self.url, e));
        }

        match tokio::time::timeout(COMMAND_TIMEOUT, rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => Err(Error::connection(
                &self.url,
                format!("socket closed before {method} replied"),
            )),
            Err(_) => {
                lock(&self.pending).remove(&id);
                Err(Error::Protocol(format!("{method} timed out")))
            }
        }
    }

    /// Next queued notification; `None` once the socket is gone.
    pub(crate) async fn next_event(&mut self) -> Option<ProtocolEvent> {
        self.events.recv().await
    }

    pub(crate) async fn close(&mut self) -> Result<()> {
        let closed = self.writer.close().await;
        self.reader.abort();
        closed.map_err(|e| Error::connection(&self.url, e))
    }
}

impl Drop for DevtoolsSocket {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn read_loop(
    mut reader: SplitStream<WsStream>,
    pending: Pending,
    events: mpsc::UnboundedSender<ProtocolEvent>,
    url: String,
) {
    while let Some(message) = reader.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!(%url, error = %e, "websocket read failed");
                break;
            }
        };

        let frame: Frame = match serde_json::from_str(text.as_str()) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(%url, error = %e, "ignoring undecodable frame");
                continue;
            }
        };

        match (frame.id, frame.method) {
            (Some(id), _) => {
                let reply = match frame.error {
                    Some(err) => Err(Error::Protocol(format!("{} ({})", err.message, err.code))),
                    None => Ok(frame.result.unwrap_or(Value::Null)),
                };
                if let Some(waiter) = lock(&pending).remove(&id) {
                    let _ = waiter.send(reply);
                }
            }
            (None, Some(method)) => {
                if events.send(ProtocolEvent::new(method, frame.params)).is_err() {
                    break;
                }
            }
            (None, None) => {}
        }
    }

    debug!(%url, "websocket closed");
    // Dropping the senders wakes every caller still waiting for a reply.
    lock(&pending).clear();
}

fn lock(pending: &Pending) -> std::sync::MutexGuard<'_, HashMap<u64, oneshot::Sender<Result<Value>>>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}
