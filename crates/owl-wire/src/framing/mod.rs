//! Newline-delimited JSON framing.
//!
//! One complete JSON object per line; the trailing newline is mandatory and
//! not part of the payload.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::WireError;

/// Encode a message as a single line, newline included.
///
/// # Errors
///
/// Returns [`WireError::Malformed`] if the value cannot be serialized.
pub fn encode_line<T: Serialize>(message: &T) -> Result<String, WireError> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    Ok(line)
}

/// Decode one line into a message. The line may or may not still carry its
/// terminating newline.
///
/// # Errors
///
/// Returns [`WireError::Malformed`] if the line is not valid JSON of the
/// expected shape.
pub fn decode_line<T: DeserializeOwned>(line: &str) -> Result<T, WireError> {
    Ok(serde_json::from_str(line.trim_end_matches(['\r', '\n']))?)
}

#[cfg(test)]
mod tests;
