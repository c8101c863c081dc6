//! # Owl IPC - Multi-Connection Command Transport
//!
//! Exposes the Owl control core to local clients over a UNIX stream socket
//! at `<tmp>/owl_browser_<instance_id>.sock`, with a semantically identical
//! stdin/stdout fallback for environments without a socket.
//!
//! Framing is newline-delimited UTF-8 JSON: one request object per line in,
//! one response object per line out. Within a connection requests are
//! strictly serialized; across connections commands run in parallel, with
//! per-context ordering provided by the dispatcher's context mutex.
//!
//! ```no_run
//! use owl_core::{Runtime, Dispatcher};
//! use owl_core::engine::sim::SimBrowser;
//! use owl_ipc::{IpcServer, IpcClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let runtime = Runtime::builder(SimBrowser::new()).build();
//! let server = IpcServer::bind("main", Dispatcher::new(runtime)).await?;
//! server.announce_ready();
//!
//! let client = IpcClient::connect(server.path()).await?;
//! let response = client.send("createContext", serde_json::json!({})).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
mod codec;
pub mod error;
#[cfg(unix)]
pub mod server;
pub mod stdio;

pub use client::{Affinity, ClientPool, IpcClient};
pub use error::IpcError;
#[cfg(unix)]
pub use server::{IpcServer, ServerStats};
pub use stdio::serve_stdio;
