use super::*;

#[test]
fn test_status_serializes_snake_case() {
    assert_eq!(
        serde_json::to_string(&StatusCode::ElementNotFound).unwrap(),
        r#""element_not_found""#
    );
    assert_eq!(
        serde_json::to_string(&StatusCode::VerificationTimeout).unwrap(),
        r#""verification_timeout""#
    );
    assert_eq!(serde_json::to_string(&StatusCode::Ok).unwrap(), r#""ok""#);
}

#[test]
fn test_status_deserializes_snake_case() {
    let status: StatusCode = serde_json::from_str(r#""click_intercepted""#).unwrap();
    assert_eq!(status, StatusCode::ClickIntercepted);
}

#[test]
fn test_status_display_matches_wire_form() {
    assert_eq!(StatusCode::TypePartial.to_string(), "type_partial");
    assert_eq!(StatusCode::FirewallDetected.to_string(), "firewall_detected");
}

#[test]
fn test_success_iff_ok_or_verification_timeout() {
    let all = [
        StatusCode::Ok,
        StatusCode::BrowserNotFound,
        StatusCode::BrowserNotReady,
        StatusCode::ContextNotFound,
        StatusCode::NavigationFailed,
        StatusCode::NavigationTimeout,
        StatusCode::PageLoadError,
        StatusCode::RedirectDetected,
        StatusCode::CaptchaDetected,
        StatusCode::FirewallDetected,
        StatusCode::ElementNotFound,
        StatusCode::ElementNotVisible,
        StatusCode::ElementNotInteractable,
        StatusCode::ElementStale,
        StatusCode::MultipleElements,
        StatusCode::ClickFailed,
        StatusCode::ClickIntercepted,
        StatusCode::TypeFailed,
        StatusCode::TypePartial,
        StatusCode::ScrollFailed,
        StatusCode::FocusFailed,
        StatusCode::BlurFailed,
        StatusCode::ClearFailed,
        StatusCode::PickFailed,
        StatusCode::OptionNotFound,
        StatusCode::UploadFailed,
        StatusCode::FrameSwitchFailed,
        StatusCode::TabSwitchFailed,
        StatusCode::DialogNotHandled,
        StatusCode::InvalidSelector,
        StatusCode::InvalidUrl,
        StatusCode::InvalidParameter,
        StatusCode::InternalError,
        StatusCode::Timeout,
        StatusCode::NetworkTimeout,
        StatusCode::WaitTimeout,
        StatusCode::VerificationTimeout,
        StatusCode::Unknown,
    ];
    for status in all {
        let result = ActionResult::with_status(status, "x");
        assert!(result.is_consistent());
        assert_eq!(
            result.success,
            matches!(status, StatusCode::Ok | StatusCode::VerificationTimeout),
            "success invariant violated for {status}"
        );
    }
}

#[test]
fn test_optional_fields_omitted_when_absent() {
    let json = serde_json::to_string(&ActionResult::ok("done")).unwrap();
    assert!(!json.contains("selector"));
    assert!(!json.contains("http_status"));
    assert!(!json.contains("element_count"));
}

#[test]
fn test_builder_attaches_detail_fields() {
    let result = ActionResult::failure(StatusCode::ElementNotFound, "no match")
        .with_selector("#nope")
        .with_element_count(0);
    assert!(!result.success);
    assert_eq!(result.selector.as_deref(), Some("#nope"));
    assert_eq!(result.element_count, Some(0));

    let json = serde_json::to_string(&result).unwrap();
    assert!(json.contains(r##""selector":"#nope""##));
    assert!(json.contains(r#""status":"element_not_found""#));
}

#[test]
fn test_type_partial_round_trip() {
    let result = ActionResult::failure(StatusCode::TypePartial, "field truncated input")
        .with_error_code("abc");
    let json = serde_json::to_string(&result).unwrap();
    let back: ActionResult = serde_json::from_str(&json).unwrap();
    assert_eq!(back, result);
    assert_eq!(back.error_code.as_deref(), Some("abc"));
}

#[test]
fn test_retryable_statuses() {
    assert!(StatusCode::WaitTimeout.is_retryable());
    assert!(StatusCode::ElementStale.is_retryable());
    assert!(!StatusCode::InvalidSelector.is_retryable());
    assert!(!StatusCode::OptionNotFound.is_retryable());
}
