//! IPC transport error types.

use std::time::Duration;
use thiserror::Error;

/// Errors crossing the IPC transport layer.
#[derive(Error, Debug)]
pub enum IpcError {
    /// Socket bind/connect/read/write failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wire encode/decode failure.
    #[error("wire error: {0}")]
    Wire(#[from] owl_wire::WireError),

    /// The connection's background tasks are gone.
    #[error("connection lost")]
    ConnectionLost,

    /// No response arrived within the client-side window.
    #[error("response timeout after {0:?}")]
    Timeout(Duration),

    /// A pool was built with no connections.
    #[error("connection pool is empty")]
    EmptyPool,
}
