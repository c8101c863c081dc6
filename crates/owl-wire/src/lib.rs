//! # Owl Wire - IPC Protocol Types
//!
//! Wire-level types for the Owl Browser automation protocol: the command and
//! response envelopes exchanged over the local IPC socket, the five result
//! shapes clients can discriminate, and the [`ActionResult`] structure with
//! its closed [`StatusCode`] vocabulary.
//!
//! The protocol is newline-delimited UTF-8 JSON: one complete object per
//! line, request and response alike. A request carries an integer `id`, a
//! string `method`, and a flat parameter object; the matching response
//! carries the same `id` and exactly one of `result` or `error`.
//!
//! ```
//! use owl_wire::{CommandEnvelope, ResponseEnvelope, CommandResult};
//!
//! let request: CommandEnvelope =
//!     serde_json::from_str(r#"{"id":1,"method":"navigate","url":"https://example.com"}"#)?;
//! assert_eq!(request.method, "navigate");
//! assert_eq!(request.param_str("url"), Some("https://example.com"));
//!
//! let response = ResponseEnvelope::result(1, CommandResult::Bool(true));
//! assert_eq!(serde_json::to_string(&response)?, r#"{"id":1,"result":true}"#);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod action;
pub mod envelope;
pub mod error;
pub mod framing;

pub use action::{ActionResult, StatusCode};
pub use envelope::{CommandEnvelope, CommandResult, ContextRef, ResponseEnvelope};
pub use error::WireError;
pub use framing::{decode_line, encode_line};

/// Readiness marker emitted on standard output once the IPC server accepts
/// connections. Clients gate their first connect on this line.
pub const READY_MARKER: &str = "MULTI_IPC_READY";
