//! Client-side connection and pool.
//!
//! [`IpcClient`] is one socket: a write task, a read task routing response
//! lines back to pending requests by id, and an atomic id counter.
//! [`ClientPool`] opens N sockets and assigns commands either round-robin
//! or by context-id affinity; affinity keeps all commands for one context
//! on one connection, so their responses come back in submission order.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;

use owl_wire::{CommandEnvelope, ResponseEnvelope, decode_line, encode_line};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, instrument, trace, warn};

use crate::error::IpcError;

/// Default window for a response to come back.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Outgoing-line channel depth per connection.
const WRITE_QUEUE: usize = 64;

type Pending = Arc<Mutex<HashMap<i64, oneshot::Sender<ResponseEnvelope>>>>;

/// One client connection to the IPC server.
#[derive(Debug)]
pub struct IpcClient {
    tx: mpsc::Sender<String>,
    pending: Pending,
    next_id: AtomicI64,
    _read_handle: tokio::task::JoinHandle<()>,
    _write_handle: tokio::task::JoinHandle<()>,
}

impl IpcClient {
    /// Connect to a server socket.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::Io`] if the socket cannot be reached.
    #[cfg(unix)]
    #[instrument(level = "debug", fields(path = %path.as_ref().display()))]
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self, IpcError> {
        let stream = tokio::net::UnixStream::connect(path.as_ref()).await?;
        let (read_half, mut write_half) = stream.into_split();

        let (tx, mut rx) = mpsc::channel::<String>(WRITE_QUEUE);
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));

        let write_handle = tokio::spawn(async move {
            while let Some(line) = rx.recv().await {
                if write_half.write_all(line.as_bytes()).await.is_err() {
                    warn!("IPC write side closed");
                    break;
                }
                if write_half.flush().await.is_err() {
                    break;
                }
            }
        });

        let read_pending = pending.clone();
        let read_handle = tokio::spawn(async move {
            let mut reader = BufReader::new(read_half);
            let mut line = String::new();
            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {}
                }
                let response: ResponseEnvelope = match decode_line(&line) {
                    Ok(response) => response,
                    Err(err) => {
                        warn!(error = %err, "Dropping unparseable response line");
                        continue;
                    }
                };
                trace!(id = response.id, "Response received");
                if let Some(sender) = read_pending.lock().await.remove(&response.id) {
                    let _ = sender.send(response);
                } else {
                    warn!(id = response.id, "Response for unknown request id");
                }
            }
            debug!("IPC read loop ended");
        });

        Ok(Self {
            tx,
            pending,
            next_id: AtomicI64::new(1),
            _read_handle: read_handle,
            _write_handle: write_handle,
        })
    }

    /// Send a command and wait for its response.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::Timeout`] after the default window, or
    /// [`IpcError::ConnectionLost`] if the server went away.
    pub async fn send(&self, method: &str, params: Value) -> Result<ResponseEnvelope, IpcError> {
        self.send_with_timeout(method, params, DEFAULT_TIMEOUT).await
    }

    /// Send a command with an explicit response window.
    ///
    /// # Errors
    ///
    /// As [`IpcClient::send`].
    pub async fn send_with_timeout(
        &self,
        method: &str,
        params: Value,
        window: Duration,
    ) -> Result<ResponseEnvelope, IpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let envelope = CommandEnvelope::with_params(id, method, normalize(params))?;
        self.send_envelope(&envelope, window).await
    }

    /// Send a pre-built envelope and wait for its response.
    ///
    /// # Errors
    ///
    /// As [`IpcClient::send`].
    pub async fn send_envelope(
        &self,
        envelope: &CommandEnvelope,
        window: Duration,
    ) -> Result<ResponseEnvelope, IpcError> {
        let line = encode_line(envelope)?;
        let (response_tx, response_rx) = oneshot::channel();
        self.pending.lock().await.insert(envelope.id, response_tx);

        if self.tx.send(line).await.is_err() {
            self.pending.lock().await.remove(&envelope.id);
            return Err(IpcError::ConnectionLost);
        }
        trace!(id = envelope.id, method = %envelope.method, "Request queued");

        match timeout(window, response_rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(IpcError::ConnectionLost),
            Err(_) => {
                self.pending.lock().await.remove(&envelope.id);
                Err(IpcError::Timeout(window))
            }
        }
    }

    /// Allocate the next request id (for building envelopes externally).
    pub fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

/// How a pool assigns commands to its connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Affinity {
    /// Rotate across connections.
    RoundRobin,
    /// Hash the context id; the same context always uses the same
    /// connection, preserving per-context submission order.
    #[default]
    ContextId,
}

/// A pool of client connections to one server.
///
/// The pool is the supported way to get true parallel command dispatch
/// from one client process; a single connection serializes.
#[derive(Debug)]
pub struct ClientPool {
    clients: Vec<IpcClient>,
    affinity: Affinity,
    cursor: AtomicUsize,
}

impl ClientPool {
    /// Open `size` connections to the server at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::EmptyPool`] for a zero size, or the first
    /// connect error.
    #[cfg(unix)]
    pub async fn connect(
        path: impl AsRef<Path>,
        size: usize,
        affinity: Affinity,
    ) -> Result<Self, IpcError> {
        if size == 0 {
            return Err(IpcError::EmptyPool);
        }
        let mut clients = Vec::with_capacity(size);
        for _ in 0..size {
            clients.push(IpcClient::connect(path.as_ref()).await?);
        }
        debug!(size, ?affinity, "Client pool connected");
        Ok(Self {
            clients,
            affinity,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Number of pooled connections.
    pub fn size(&self) -> usize {
        self.clients.len()
    }

    /// Send a command, routing by the pool's affinity. The context id is
    /// read from `params` when present.
    ///
    /// # Errors
    ///
    /// As [`IpcClient::send`].
    pub async fn send(&self, method: &str, params: Value) -> Result<ResponseEnvelope, IpcError> {
        let context_id = params
            .get("context_id")
            .and_then(Value::as_str)
            .map(ToString::to_string);
        let slot = self.slot_for(context_id.as_deref());
        self.clients[slot].send(method, params).await
    }

    /// The connection index a command would use.
    fn slot_for(&self, context_id: Option<&str>) -> usize {
        match (self.affinity, context_id) {
            (Affinity::ContextId, Some(context_id)) => {
                hash_slot(context_id, self.clients.len())
            }
            _ => self.cursor.fetch_add(1, Ordering::Relaxed) % self.clients.len(),
        }
    }
}

/// Stable context-id → slot mapping.
fn hash_slot(context_id: &str, slots: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    context_id.hash(&mut hasher);
    (hasher.finish() % slots as u64) as usize
}

/// Clients pass params as any JSON value; only objects carry fields.
fn normalize(params: Value) -> Value {
    match params {
        Value::Object(map) => Value::Object(map),
        Value::Null => Value::Object(serde_json::Map::new()),
        other => {
            let mut map = serde_json::Map::new();
            map.insert("value".to_string(), other);
            Value::Object(map)
        }
    }
}
