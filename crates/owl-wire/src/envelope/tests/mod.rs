use serde_json::json;

use super::*;
use crate::action::StatusCode;

// CommandEnvelope tests

#[test]
fn test_command_deserializes_flat_params() {
    let env: CommandEnvelope =
        serde_json::from_str(r#"{"id":2,"method":"navigate","context_id":"ctx_1","url":"about:blank"}"#)
            .unwrap();
    assert_eq!(env.id, 2);
    assert_eq!(env.method, "navigate");
    assert_eq!(env.context_id(), Some("ctx_1"));
    assert_eq!(env.param_str("url"), Some("about:blank"));
}

#[test]
fn test_command_serializes_params_inline() {
    let env = CommandEnvelope::new(7, "click")
        .param("context_id", "ctx_3")
        .param("selector", "#submit");
    let json = serde_json::to_string(&env).unwrap();
    assert!(json.contains(r#""id":7"#));
    assert!(json.contains(r#""method":"click""#));
    assert!(json.contains(r##""selector":"#submit""##));
    // Params must not be nested under a "params" key.
    assert!(!json.contains(r#""params""#));
}

#[test]
fn test_command_without_params() {
    let env: CommandEnvelope = serde_json::from_str(r#"{"id":1,"method":"listContexts"}"#).unwrap();
    assert!(env.params.is_empty());
    assert_eq!(env.context_id(), None);
}

#[test]
fn test_command_typed_param_accessors() {
    let env: CommandEnvelope = serde_json::from_str(
        r#"{"id":9,"method":"scroll","x":10,"y":250.5,"smooth":true}"#,
    )
    .unwrap();
    assert_eq!(env.param_i64("x"), Some(10));
    assert_eq!(env.param_f64("y"), Some(250.5));
    assert_eq!(env.param_bool("smooth"), Some(true));
    assert_eq!(env.param_str("x"), None);
}

#[test]
fn test_command_with_params_rejects_non_object() {
    let err = CommandEnvelope::with_params(1, "navigate", json!([1, 2, 3]));
    assert!(err.is_err());
}

// CommandResult tests

#[test]
fn test_result_bool_shape() {
    let response = ResponseEnvelope::result(3, CommandResult::Bool(true));
    assert_eq!(serde_json::to_string(&response).unwrap(), r#"{"id":3,"result":true}"#);
}

#[test]
fn test_result_context_shape() {
    let response = ResponseEnvelope::result(
        1,
        CommandResult::Context(ContextRef {
            context_id: "ctx_1".to_string(),
        }),
    );
    assert_eq!(
        serde_json::to_string(&response).unwrap(),
        r#"{"id":1,"result":{"context_id":"ctx_1"}}"#
    );
}

#[test]
fn test_result_action_shape_discriminates() {
    let json = r##"{"id":4,"result":{"success":false,"status":"element_not_found","message":"no match","selector":"#nope"}}"##;
    let response: ResponseEnvelope = serde_json::from_str(json).unwrap();
    let result = response.result.unwrap();
    let action = result.as_action().expect("should discriminate as ActionResult");
    assert!(!action.success);
    assert_eq!(action.status, StatusCode::ElementNotFound);
    assert_eq!(action.selector.as_deref(), Some("#nope"));
}

#[test]
fn test_result_context_shape_discriminates() {
    let json = r#"{"id":1,"result":{"context_id":"ctx_12"}}"#;
    let response: ResponseEnvelope = serde_json::from_str(json).unwrap();
    assert_eq!(
        response.result.unwrap().as_context_id(),
        Some("ctx_12")
    );
}

#[test]
fn test_result_text_shape() {
    let json = r#"{"id":5,"result":"iVBORw0KGgo="}"#;
    let response: ResponseEnvelope = serde_json::from_str(json).unwrap();
    assert_eq!(response.result.unwrap().as_text(), Some("iVBORw0KGgo="));
}

#[test]
fn test_result_json_shape_catches_objects() {
    let json = r#"{"id":6,"result":{"title":"Example","url":"https://example.com"}}"#;
    let response: ResponseEnvelope = serde_json::from_str(json).unwrap();
    match response.result.unwrap() {
        CommandResult::Json(value) => {
            assert_eq!(value["title"], "Example");
        }
        other => panic!("expected Json shape, got {other:?}"),
    }
}

// ResponseEnvelope tests

#[test]
fn test_error_response() {
    let response = ResponseEnvelope::error(8, "unknown method: frobnicate");
    let json = serde_json::to_string(&response).unwrap();
    assert_eq!(json, r#"{"id":8,"error":"unknown method: frobnicate"}"#);
    assert!(response.is_error());
}

#[test]
fn test_validate_rejects_empty_response() {
    let response: ResponseEnvelope = serde_json::from_str(r#"{"id":1}"#).unwrap();
    assert!(response.validate().is_err());
}

#[test]
fn test_validate_accepts_result_only() {
    let response: ResponseEnvelope = serde_json::from_str(r#"{"id":1,"result":true}"#).unwrap();
    assert!(response.validate().is_ok());
}
