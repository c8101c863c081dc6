//! Wire-level error types.

use thiserror::Error;

/// Errors produced while encoding or decoding protocol messages.
#[derive(Error, Debug)]
pub enum WireError {
    /// A line was not valid JSON or did not match the expected shape.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A message decoded but is missing a required field.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A response carried both `result` and `error`, or neither.
    #[error("response must carry exactly one of result or error")]
    AmbiguousResponse,
}
