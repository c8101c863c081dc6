//! Standard-input/standard-output transport.
//!
//! Semantically identical to the socket transport but single-client: one
//! request line in on stdin, one response line out on stdout. Used in
//! environments where a socket is unavailable.

use owl_core::Dispatcher;
use owl_wire::{READY_MARKER, encode_line};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};

use crate::codec::handle_line;
use crate::error::IpcError;

/// Serve the dispatcher over stdin/stdout until EOF.
///
/// Writes the readiness marker first, then processes one request per line.
/// Requests are strictly serialized; there is exactly one implicit client.
///
/// # Errors
///
/// Returns [`IpcError::Io`] on a broken stdio pipe.
pub async fn serve_stdio(dispatcher: Dispatcher) -> Result<(), IpcError> {
    let mut reader = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();

    stdout
        .write_all(format!("{READY_MARKER}\n").as_bytes())
        .await?;
    stdout.flush().await?;
    info!("stdio transport ready");

    let mut line = String::new();
    loop {
        line.clear();
        let read = reader.read_line(&mut line).await?;
        if read == 0 {
            debug!("stdin closed, stdio transport ending");
            return Ok(());
        }
        if line.trim().is_empty() {
            continue;
        }

        let response = handle_line(&dispatcher, &line).await;
        let encoded = encode_line(&response)?;
        stdout.write_all(encoded.as_bytes()).await?;
        stdout.flush().await?;
    }
}
