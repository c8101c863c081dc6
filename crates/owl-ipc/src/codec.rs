//! Shared request-line handling for both transports.

use owl_core::Dispatcher;
use owl_wire::{CommandEnvelope, ResponseEnvelope, decode_line};

/// Decode and dispatch one request line. Never panics on client input:
/// malformed lines become error envelopes that echo whatever id can be
/// recovered from the raw JSON.
pub(crate) async fn handle_line(dispatcher: &Dispatcher, line: &str) -> ResponseEnvelope {
    let envelope: CommandEnvelope = match decode_line(line) {
        Ok(envelope) => envelope,
        Err(err) => {
            let id = serde_json::from_str::<serde_json::Value>(line.trim_end())
                .ok()
                .and_then(|v| v.get("id").and_then(serde_json::Value::as_i64))
                .unwrap_or(0);
            return ResponseEnvelope::error(id, format!("malformed request: {err}"));
        }
    };

    match dispatcher.dispatch(&envelope).await {
        Ok(result) => ResponseEnvelope::result(envelope.id, result),
        Err(err) => ResponseEnvelope::error(envelope.id, err.to_string()),
    }
}
