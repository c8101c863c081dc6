use super::*;
use crate::envelope::{CommandEnvelope, ResponseEnvelope};

#[test]
fn test_encode_appends_newline() {
    let env = CommandEnvelope::new(1, "listContexts");
    let line = encode_line(&env).unwrap();
    assert!(line.ends_with('\n'));
    assert_eq!(line.matches('\n').count(), 1);
}

#[test]
fn test_decode_strips_newline() {
    let env: CommandEnvelope = decode_line("{\"id\":1,\"method\":\"ping\"}\n").unwrap();
    assert_eq!(env.method, "ping");
}

#[test]
fn test_decode_handles_crlf() {
    let env: CommandEnvelope = decode_line("{\"id\":1,\"method\":\"ping\"}\r\n").unwrap();
    assert_eq!(env.id, 1);
}

#[test]
fn test_decode_rejects_garbage() {
    let result: Result<ResponseEnvelope, _> = decode_line("not json\n");
    assert!(result.is_err());
}

#[test]
fn test_round_trip() {
    let env = CommandEnvelope::new(42, "navigate").param("url", "about:blank");
    let line = encode_line(&env).unwrap();
    let back: CommandEnvelope = decode_line(&line).unwrap();
    assert_eq!(back.id, 42);
    assert_eq!(back.param_str("url"), Some("about:blank"));
}
