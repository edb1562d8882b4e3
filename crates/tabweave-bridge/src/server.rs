//! WebSocket bridge to the in-browser glue.
//!
//! The glue connects to this server and services JSON frames
//! `{id, method, params}` with `{id, result}` or `{id, error}` replies.
//! Callers see a plain request/reply interface; correlation ids let replies
//! arrive out of order.

use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("browser glue is not connected")]
    NotConnected,

    #[error("bridge connection lost")]
    ConnectionLost,

    #[error("glue reported an error: {0}")]
    Remote(String),

    #[error("bridge i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad bridge frame: {0}")]
    Frame(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct CommandFrame<'a> {
    id: u64,
    method: &'a str,
    params: &'a serde_json::Value,
}

#[derive(Deserialize)]
struct ReplyFrame {
    id: u64,
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

struct PendingRequest {
    method: String,
    params: serde_json::Value,
    reply: oneshot::Sender<Result<serde_json::Value, BridgeError>>,
}

/// Request/reply handle onto the active glue connection.
#[derive(Clone)]
pub struct Bridge {
    tx: mpsc::Sender<PendingRequest>,
    connected: Arc<AtomicBool>,
}

impl Bridge {
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub async fn request(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, BridgeError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(PendingRequest {
                method: method.to_string(),
                params,
                reply,
            })
            .await
            .map_err(|_| BridgeError::ConnectionLost)?;
        rx.await.map_err(|_| BridgeError::ConnectionLost)?
    }
}

/// Bind the bridge listener and start accepting glue connections. Returns
/// the request handle and the actual bound address.
pub async fn start(addr: SocketAddr) -> Result<(Bridge, SocketAddr), BridgeError> {
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    info!("Bridge listening on {local_addr}");

    let (tx, rx) = mpsc::channel::<PendingRequest>(32);
    let requests = Arc::new(Mutex::new(rx));
    let connected = Arc::new(AtomicBool::new(false));

    let accept_connected = connected.clone();
    tokio::spawn(async move {
        while let Ok((stream, peer)) = listener.accept().await {
            info!("Accepted bridge connection from {peer}");
            let requests = requests.clone();
            let connected = accept_connected.clone();
            tokio::spawn(serve_connection(stream, requests, connected));
        }
    });

    Ok((Bridge { tx, connected }, local_addr))
}

async fn serve_connection(
    stream: TcpStream,
    requests: Arc<Mutex<mpsc::Receiver<PendingRequest>>>,
    connected: Arc<AtomicBool>,
) {
    let ws = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(err) => {
            error!(%err, "websocket handshake failed");
            return;
        }
    };
    // One glue connection at a time holds the request stream; a second
    // connection waits here until the first goes away.
    let mut rx = requests.lock().await;
    connected.store(true, Ordering::SeqCst);

    let (mut sink, mut source) = ws.split();
    let mut pending: HashMap<u64, oneshot::Sender<Result<serde_json::Value, BridgeError>>> =
        HashMap::new();
    let mut next_id: u64 = 0;

    loop {
        tokio::select! {
            request = rx.recv() => {
                let Some(request) = request else { break };
                next_id += 1;
                let frame = CommandFrame {
                    id: next_id,
                    method: &request.method,
                    params: &request.params,
                };
                let text = match serde_json::to_string(&frame) {
                    Ok(text) => text,
                    Err(err) => {
                        let _ = request.reply.send(Err(BridgeError::Frame(err)));
                        continue;
                    }
                };
                pending.insert(next_id, request.reply);
                if let Err(err) = sink.send(Message::Text(text)).await {
                    error!(%err, "failed to send frame to glue");
                    break;
                }
            }

            message = source.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => match serde_json::from_str::<ReplyFrame>(&text) {
                        Ok(reply) => {
                            let Some(sender) = pending.remove(&reply.id) else {
                                warn!(id = reply.id, "reply with no pending request");
                                continue;
                            };
                            let outcome = match reply.error {
                                Some(error) => Err(BridgeError::Remote(error)),
                                None => Ok(reply.result.unwrap_or(serde_json::Value::Null)),
                            };
                            let _ = sender.send(outcome);
                        }
                        Err(err) => error!(%err, "unparseable frame from glue: {text}"),
                    },
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("bridge connection closed");
                        break;
                    }
                    Some(Err(err)) => {
                        error!(%err, "bridge connection error");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    connected.store(false, Ordering::SeqCst);
    // Dropping `pending` resolves every in-flight caller with a lost
    // connection.
}
