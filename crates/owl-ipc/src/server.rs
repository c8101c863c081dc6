//! The multi-connection IPC server.
//!
//! One accept loop, one worker task per connection. A worker reads a line,
//! decodes it, invokes the dispatcher, writes the response line, and loops
//! until EOF. Workers are independent; within one worker requests are
//! strictly serialized, so response N is always written before request N+1
//! is read.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use owl_core::Dispatcher;
use owl_wire::{READY_MARKER, encode_line};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, info, instrument, warn};

use crate::codec::handle_line;
use crate::error::IpcError;

/// Connection and command counters, readable atomically.
#[derive(Debug, Default)]
pub struct ServerStats {
    active_connections: AtomicUsize,
    total_commands: AtomicU64,
}

impl ServerStats {
    /// Currently connected clients.
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Acquire)
    }

    /// Commands processed since the server started.
    pub fn total_commands(&self) -> u64 {
        self.total_commands.load(Ordering::Acquire)
    }
}

/// The IPC server; dropping it stops the accept loop.
pub struct IpcServer {
    path: PathBuf,
    stats: Arc<ServerStats>,
    accept_task: tokio::task::JoinHandle<()>,
}

impl IpcServer {
    /// The conventional socket path for an instance id.
    pub fn socket_path(instance_id: &str) -> PathBuf {
        std::env::temp_dir().join(format!("owl_browser_{instance_id}.sock"))
    }

    /// Bind at the conventional path for `instance_id` and start serving.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::Io`] if the socket cannot be bound.
    pub async fn bind(instance_id: &str, dispatcher: Dispatcher) -> Result<Self, IpcError> {
        Self::bind_at(Self::socket_path(instance_id), dispatcher).await
    }

    /// Bind at an explicit path and start serving.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::Io`] if the socket cannot be bound.
    #[instrument(level = "info", skip(dispatcher), fields(path = %path.as_ref().display()))]
    pub async fn bind_at(
        path: impl AsRef<Path>,
        dispatcher: Dispatcher,
    ) -> Result<Self, IpcError> {
        let path = path.as_ref().to_path_buf();
        // A stale socket from a dead process would fail the bind.
        if path.exists() {
            let _ = std::fs::remove_file(&path);
        }
        let listener = UnixListener::bind(&path)?;
        info!("IPC server listening");

        let stats = Arc::new(ServerStats::default());
        let accept_stats = stats.clone();
        let accept_task = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, _)) => {
                        let dispatcher = dispatcher.clone();
                        let stats = accept_stats.clone();
                        tokio::spawn(async move {
                            stats.active_connections.fetch_add(1, Ordering::AcqRel);
                            debug!("Client connected");
                            if let Err(err) = serve_connection(stream, dispatcher, &stats).await {
                                warn!(error = %err, "Connection worker ended with error");
                            }
                            stats.active_connections.fetch_sub(1, Ordering::AcqRel);
                            debug!("Client disconnected");
                        });
                    }
                    Err(err) => {
                        warn!(error = %err, "Accept failed, stopping accept loop");
                        break;
                    }
                }
            }
        });

        Ok(Self {
            path,
            stats,
            accept_task,
        })
    }

    /// Write the readiness marker to standard output. Clients gate their
    /// first connect on this line.
    pub fn announce_ready(&self) {
        println!("{READY_MARKER}");
    }

    /// The socket path this server is bound to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Live counters.
    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }

    /// Stop accepting and remove the socket file. In-flight workers finish
    /// their current command on their own.
    pub async fn shutdown(self) {
        self.accept_task.abort();
        let _ = std::fs::remove_file(&self.path);
        info!(path = %self.path.display(), "IPC server stopped");
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        self.accept_task.abort();
        let _ = std::fs::remove_file(&self.path);
    }
}

/// One worker: strict read → dispatch → respond loop until EOF.
async fn serve_connection(
    stream: UnixStream,
    dispatcher: Dispatcher,
    stats: &ServerStats,
) -> Result<(), IpcError> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();

    loop {
        line.clear();
        let read = reader.read_line(&mut line).await?;
        if read == 0 {
            return Ok(());
        }
        if line.trim().is_empty() {
            continue;
        }

        let response = handle_line(&dispatcher, &line).await;
        stats.total_commands.fetch_add(1, Ordering::AcqRel);

        let encoded = encode_line(&response)?;
        write_half.write_all(encoded.as_bytes()).await?;
        write_half.flush().await?;
    }
}
