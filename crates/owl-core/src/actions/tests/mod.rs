use std::sync::Arc;
use std::time::Duration;

use owl_wire::{CommandEnvelope, CommandResult, StatusCode};
use serde_json::json;

use super::*;
use crate::engine::sim::{ClickEffect, SimBrowser, SimDocument, SimElement};
use crate::error::DispatchError;
use crate::runtime::Runtime;

fn harness() -> (Dispatcher, Arc<SimBrowser>) {
    let browser = SimBrowser::new();
    let runtime = Runtime::builder(browser.clone()).build();
    (Dispatcher::new(runtime), browser)
}

async fn create_context(dispatcher: &Dispatcher) -> String {
    let result = dispatcher
        .dispatch(&CommandEnvelope::new(1, "createContext"))
        .await
        .unwrap();
    result.as_context_id().unwrap().to_string()
}

fn action_of(result: CommandResult) -> owl_wire::ActionResult {
    match result {
        CommandResult::Action(action) => action,
        other => panic!("expected ActionResult, got {other:?}"),
    }
}

#[tokio::test]
async fn test_smoke_round_trip() {
    let (dispatcher, browser) = harness();
    browser.install(SimDocument::new("about:blank"));

    let ctx = create_context(&dispatcher).await;
    assert_eq!(ctx, "ctx_1");

    let nav = dispatcher
        .dispatch(
            &CommandEnvelope::new(2, "navigate")
                .param("context_id", ctx.clone())
                .param("url", "about:blank"),
        )
        .await
        .unwrap();
    let nav = action_of(nav);
    assert!(nav.success);
    assert_eq!(nav.status, StatusCode::Ok);

    let released = dispatcher
        .dispatch(&CommandEnvelope::new(3, "releaseContext").param("context_id", ctx))
        .await
        .unwrap();
    assert_eq!(released.as_bool(), Some(true));
}

#[tokio::test]
async fn test_unknown_method_is_protocol_error() {
    let (dispatcher, _browser) = harness();
    let err = dispatcher
        .dispatch(&CommandEnvelope::new(1, "frobnicate"))
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::UnknownMethod(_)));
}

#[tokio::test]
async fn test_missing_required_param() {
    let (dispatcher, _browser) = harness();
    let ctx = create_context(&dispatcher).await;
    let err = dispatcher
        .dispatch(&CommandEnvelope::new(2, "navigate").param("context_id", ctx))
        .await
        .unwrap_err();
    match err {
        DispatchError::MissingParam { param, .. } => assert_eq!(param, "url"),
        other => panic!("expected MissingParam, got {other}"),
    }
}

#[tokio::test]
async fn test_unknown_param_lists_accepted_schema() {
    let (dispatcher, _browser) = harness();
    let ctx = create_context(&dispatcher).await;
    let err = dispatcher
        .dispatch(
            &CommandEnvelope::new(2, "click")
                .param("context_id", ctx)
                .param("selector", "#x")
                .param("slector", "#typo"),
        )
        .await
        .unwrap_err();
    match err {
        DispatchError::UnknownParam { accepted, .. } => {
            assert!(accepted.contains("selector"));
            assert!(accepted.contains("verification_level"));
        }
        other => panic!("expected UnknownParam, got {other}"),
    }
}

#[tokio::test]
async fn test_click_on_missing_context_is_action_result() {
    let (dispatcher, _browser) = harness();
    let result = dispatcher
        .dispatch(
            &CommandEnvelope::new(1, "click")
                .param("context_id", "ctx_404")
                .param("selector", "#x"),
        )
        .await
        .unwrap();
    let action = action_of(result);
    assert!(!action.success);
    assert_eq!(action.status, StatusCode::BrowserNotFound);
}

#[tokio::test]
async fn test_missing_element_click() {
    let (dispatcher, browser) = harness();
    browser.install(SimDocument::new("https://blank.example"));
    let ctx = create_context(&dispatcher).await;
    dispatcher
        .dispatch(
            &CommandEnvelope::new(2, "navigate")
                .param("context_id", ctx.clone())
                .param("url", "https://blank.example"),
        )
        .await
        .unwrap();

    let action = action_of(
        dispatcher
            .dispatch(
                &CommandEnvelope::new(3, "click")
                    .param("context_id", ctx)
                    .param("selector", "#nope"),
            )
            .await
            .unwrap(),
    );
    assert!(!action.success);
    assert_eq!(action.status, StatusCode::ElementNotFound);
    assert_eq!(action.selector.as_deref(), Some("#nope"));
}

#[tokio::test]
async fn test_type_partial_on_maxlength_field() {
    let (dispatcher, browser) = harness();
    browser.install(
        SimDocument::new("https://form.example")
            .element(SimElement::input("code").with_attribute("maxlength", "3")),
    );
    let ctx = create_context(&dispatcher).await;
    dispatcher
        .dispatch(
            &CommandEnvelope::new(2, "navigate")
                .param("context_id", ctx.clone())
                .param("url", "https://form.example"),
        )
        .await
        .unwrap();

    let action = action_of(
        dispatcher
            .dispatch(
                &CommandEnvelope::new(3, "type")
                    .param("context_id", ctx)
                    .param("selector", "#code")
                    .param("text", "abcdef"),
            )
            .await
            .unwrap(),
    );
    assert!(!action.success);
    assert_eq!(action.status, StatusCode::TypePartial);
    assert_eq!(action.error_code.as_deref(), Some("abc"));
}

#[tokio::test]
async fn test_verification_timeout_preserves_success() {
    let (dispatcher, browser) = harness();
    browser.install(
        SimDocument::new("https://inert.example")
            .element(SimElement::button("deferred").on_click(ClickEffect::None)),
    );
    let ctx = create_context(&dispatcher).await;
    dispatcher
        .dispatch(
            &CommandEnvelope::new(2, "navigate")
                .param("context_id", ctx.clone())
                .param("url", "https://inert.example"),
        )
        .await
        .unwrap();

    let action = action_of(
        dispatcher
            .dispatch(
                &CommandEnvelope::new(3, "click")
                    .param("context_id", ctx)
                    .param("selector", "#deferred"),
            )
            .await
            .unwrap(),
    );
    assert!(action.success);
    assert_eq!(action.status, StatusCode::VerificationTimeout);
}

#[tokio::test]
async fn test_navigation_timeout() {
    let (dispatcher, browser) = harness();
    browser.install(
        SimDocument::new("https://slow.example").load_delay(Duration::from_secs(60)),
    );
    let ctx = create_context(&dispatcher).await;
    let action = action_of(
        dispatcher
            .dispatch(
                &CommandEnvelope::new(2, "navigate")
                    .param("context_id", ctx)
                    .param("url", "https://slow.example")
                    .param("timeout", 50),
            )
            .await
            .unwrap(),
    );
    assert!(!action.success);
    assert_eq!(action.status, StatusCode::NavigationTimeout);
}

#[tokio::test]
async fn test_navigate_to_invalid_url() {
    let (dispatcher, _browser) = harness();
    let ctx = create_context(&dispatcher).await;
    let action = action_of(
        dispatcher
            .dispatch(
                &CommandEnvelope::new(2, "navigate")
                    .param("context_id", ctx)
                    .param("url", "not a url"),
            )
            .await
            .unwrap(),
    );
    assert_eq!(action.status, StatusCode::InvalidUrl);
}

#[tokio::test]
async fn test_captcha_detection_on_navigate() {
    let (dispatcher, browser) = harness();
    browser.install(
        SimDocument::new("https://guard.example")
            .html("<html><body><div class=\"g-recaptcha\" data-sitekey=\"k\"></div></body></html>"),
    );
    let ctx = create_context(&dispatcher).await;
    let action = action_of(
        dispatcher
            .dispatch(
                &CommandEnvelope::new(2, "navigate")
                    .param("context_id", ctx)
                    .param("url", "https://guard.example"),
            )
            .await
            .unwrap(),
    );
    assert!(!action.success);
    assert_eq!(action.status, StatusCode::CaptchaDetected);
}

#[tokio::test]
async fn test_page_load_error_on_http_failure() {
    let (dispatcher, browser) = harness();
    browser.install(
        SimDocument::new("https://missing.example")
            .status(404)
            .html("<html><body>This page could not be located on this server, sorry. Try searching from the homepage instead.</body></html>"),
    );
    let ctx = create_context(&dispatcher).await;
    let action = action_of(
        dispatcher
            .dispatch(
                &CommandEnvelope::new(2, "navigate")
                    .param("context_id", ctx)
                    .param("url", "https://missing.example"),
            )
            .await
            .unwrap(),
    );
    assert_eq!(action.status, StatusCode::PageLoadError);
    assert_eq!(action.http_status, Some(404));
}

#[tokio::test]
async fn test_zero_timeout_wait_for_selector() {
    let (dispatcher, browser) = harness();
    browser.install(
        SimDocument::new("https://w.example").element(SimElement::button("present")),
    );
    let ctx = create_context(&dispatcher).await;
    dispatcher
        .dispatch(
            &CommandEnvelope::new(2, "navigate")
                .param("context_id", ctx.clone())
                .param("url", "https://w.example"),
        )
        .await
        .unwrap();

    // Condition already holds: immediate success.
    let action = action_of(
        dispatcher
            .dispatch(
                &CommandEnvelope::new(3, "waitForSelector")
                    .param("context_id", ctx.clone())
                    .param("selector", "#present")
                    .param("timeout", 0),
            )
            .await
            .unwrap(),
    );
    assert!(action.success);

    // Condition does not hold: immediate wait_timeout.
    let action = action_of(
        dispatcher
            .dispatch(
                &CommandEnvelope::new(4, "waitForSelector")
                    .param("context_id", ctx)
                    .param("selector", "#absent")
                    .param("timeout", 0),
            )
            .await
            .unwrap(),
    );
    assert!(!action.success);
    assert_eq!(action.status, StatusCode::WaitTimeout);
}

#[tokio::test]
async fn test_screenshot_is_base64_png() {
    let (dispatcher, _browser) = harness();
    let ctx = create_context(&dispatcher).await;
    let result = dispatcher
        .dispatch(&CommandEnvelope::new(2, "screenshot").param("context_id", ctx))
        .await
        .unwrap();
    let encoded = result.as_text().unwrap();
    assert!(encoded.starts_with("iVBO"), "png base64 must start with iVBO");
}

#[tokio::test]
async fn test_frozen_frame_screenshots_are_identical() {
    let (dispatcher, browser) = harness();
    browser.install(
        SimDocument::new("https://shot.example")
            .element(SimElement::button("b").on_click(ClickEffect::Mutate)),
    );
    let ctx = create_context(&dispatcher).await;
    dispatcher
        .dispatch(
            &CommandEnvelope::new(2, "navigate")
                .param("context_id", ctx.clone())
                .param("url", "https://shot.example"),
        )
        .await
        .unwrap();

    dispatcher
        .dispatch(&CommandEnvelope::new(3, "freezeFrame").param("context_id", ctx.clone()))
        .await
        .unwrap();
    let first = dispatcher
        .dispatch(&CommandEnvelope::new(4, "screenshot").param("context_id", ctx.clone()))
        .await
        .unwrap();

    // Mutate the page; the frozen cache must not notice.
    dispatcher
        .dispatch(
            &CommandEnvelope::new(5, "click")
                .param("context_id", ctx.clone())
                .param("selector", "#b"),
        )
        .await
        .unwrap();
    let second = dispatcher
        .dispatch(&CommandEnvelope::new(6, "screenshot").param("context_id", ctx.clone()))
        .await
        .unwrap();
    assert_eq!(first.as_text(), second.as_text());

    // Unfreezing resumes live captures.
    dispatcher
        .dispatch(&CommandEnvelope::new(7, "unfreezeFrame").param("context_id", ctx.clone()))
        .await
        .unwrap();
    let third = dispatcher
        .dispatch(&CommandEnvelope::new(8, "screenshot").param("context_id", ctx))
        .await
        .unwrap();
    assert_ne!(first.as_text(), third.as_text());
}

#[tokio::test]
async fn test_natural_language_selector_routes_through_finder() {
    let browser = SimBrowser::new();
    browser.install(
        SimDocument::new("https://nl.example")
            .element(SimElement::button("login").on_click(ClickEffect::Focus)),
    );
    let finder = crate::verify::StaticFinder::new().with_mapping("the login button", "#login");
    let runtime = Runtime::builder(browser.clone())
        .finder(Arc::new(finder))
        .build();
    let dispatcher = Dispatcher::new(runtime);

    let ctx = create_context(&dispatcher).await;
    dispatcher
        .dispatch(
            &CommandEnvelope::new(2, "navigate")
                .param("context_id", ctx.clone())
                .param("url", "https://nl.example"),
        )
        .await
        .unwrap();

    let action = action_of(
        dispatcher
            .dispatch(
                &CommandEnvelope::new(3, "click")
                    .param("context_id", ctx)
                    .param("selector", "the login button"),
            )
            .await
            .unwrap(),
    );
    assert!(action.success, "click through finder should succeed: {action:?}");
}

#[tokio::test]
async fn test_coordinate_selector_click() {
    let (dispatcher, browser) = harness();
    browser.install(
        SimDocument::new("https://xy.example").element(
            SimElement::button("here")
                .with_rect(90.0, 90.0, 40.0, 40.0)
                .on_click(ClickEffect::Focus),
        ),
    );
    let ctx = create_context(&dispatcher).await;
    dispatcher
        .dispatch(
            &CommandEnvelope::new(2, "navigate")
                .param("context_id", ctx.clone())
                .param("url", "https://xy.example"),
        )
        .await
        .unwrap();

    let action = action_of(
        dispatcher
            .dispatch(
                &CommandEnvelope::new(3, "click")
                    .param("context_id", ctx)
                    .param("selector", "100x100"),
            )
            .await
            .unwrap(),
    );
    assert!(action.success);
    assert_eq!(action.status, StatusCode::Ok);
}

#[tokio::test]
async fn test_cookie_round_trip_and_profile() {
    let (dispatcher, _browser) = harness();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("profile.json");
    let ctx = create_context(&dispatcher).await;

    dispatcher
        .dispatch(
            &CommandEnvelope::new(2, "setCookie")
                .param("context_id", ctx.clone())
                .param("name", "session")
                .param("value", "abc123")
                .param("domain", "example.com"),
        )
        .await
        .unwrap();

    let saved = action_of(
        dispatcher
            .dispatch(
                &CommandEnvelope::new(3, "saveProfile")
                    .param("context_id", ctx.clone())
                    .param("path", path.to_str().unwrap()),
            )
            .await
            .unwrap(),
    );
    assert!(saved.success);

    // A context created from the profile carries the same hashes/cookies.
    let restored = dispatcher
        .dispatch(
            &CommandEnvelope::new(4, "createContext")
                .param("profile_path", path.to_str().unwrap()),
        )
        .await
        .unwrap();
    let restored_id = restored.as_context_id().unwrap().to_string();

    let original_fp = dispatcher
        .dispatch(&CommandEnvelope::new(5, "getFingerprint").param("context_id", ctx))
        .await
        .unwrap();
    let restored_fp = dispatcher
        .dispatch(
            &CommandEnvelope::new(6, "getFingerprint").param("context_id", restored_id.clone()),
        )
        .await
        .unwrap();
    let (CommandResult::Json(a), CommandResult::Json(b)) = (original_fp, restored_fp) else {
        panic!("fingerprints must be json");
    };
    assert_eq!(a["hashes"], b["hashes"]);
    assert_eq!(a["seeds"], b["seeds"]);

    let cookies = dispatcher
        .dispatch(&CommandEnvelope::new(7, "getCookies").param("context_id", restored_id))
        .await
        .unwrap();
    let CommandResult::Json(cookies) = cookies else {
        panic!("cookies must be json");
    };
    assert_eq!(cookies[0]["name"], "session");
    assert_eq!(cookies[0]["value"], "abc123");
}

#[tokio::test]
async fn test_parallel_contexts_overlap_navigations() {
    let (dispatcher, browser) = harness();
    browser.install(
        SimDocument::new("https://slow.example").load_delay(Duration::from_millis(120)),
    );
    let a = create_context(&dispatcher).await;
    let b = dispatcher
        .dispatch(&CommandEnvelope::new(2, "createContext"))
        .await
        .unwrap()
        .as_context_id()
        .unwrap()
        .to_string();

    let nav = |ctx: String, id: i64| {
        let dispatcher = dispatcher.clone();
        async move {
            dispatcher
                .dispatch(
                    &CommandEnvelope::new(id, "navigate")
                        .param("context_id", ctx)
                        .param("url", "https://slow.example"),
                )
                .await
                .unwrap()
        }
    };

    let started = std::time::Instant::now();
    let (ra, rb) = tokio::join!(nav(a, 3), nav(b, 4));
    let elapsed = started.elapsed();

    assert!(action_of(ra).success);
    assert!(action_of(rb).success);
    // Both navigations ran concurrently: total is about one delay, not two.
    assert!(
        elapsed < Duration::from_millis(230),
        "navigations serialized: {elapsed:?}"
    );
}

#[tokio::test]
async fn test_same_context_commands_serialize() {
    let (dispatcher, browser) = harness();
    browser.install(SimDocument::new("https://a.example"));
    let ctx = create_context(&dispatcher).await;

    // Two concurrent waits on the same context must run one after the
    // other because of the per-context mutex.
    let wait = |id: i64| {
        let dispatcher = dispatcher.clone();
        let ctx = ctx.clone();
        async move {
            dispatcher
                .dispatch(
                    &CommandEnvelope::new(id, "waitForTimeout")
                        .param("context_id", ctx)
                        .param("timeout", 60),
                )
                .await
                .unwrap()
        }
    };
    let started = std::time::Instant::now();
    let _ = tokio::join!(wait(1), wait(2));
    assert!(
        started.elapsed() >= Duration::from_millis(110),
        "same-context commands must serialize"
    );
}

#[tokio::test]
async fn test_evaluate_returns_json_shape() {
    let (dispatcher, browser) = harness();
    let ctx = create_context(&dispatcher).await;
    let page = browser.page(&ctx).unwrap();
    page.set_eval_result("1 + 1", json!(2));

    let result = dispatcher
        .dispatch(
            &CommandEnvelope::new(2, "evaluate")
                .param("context_id", ctx)
                .param("expression", "1 + 1"),
        )
        .await
        .unwrap();
    assert_eq!(result, CommandResult::Json(json!(2)));
}

#[tokio::test]
async fn test_console_logs_flow_into_store() {
    let (dispatcher, browser) = harness();
    let ctx = create_context(&dispatcher).await;
    browser.page(&ctx).unwrap().emit_console("warn", "low disk");

    let result = dispatcher
        .dispatch(&CommandEnvelope::new(2, "getConsoleLogs").param("context_id", ctx))
        .await
        .unwrap();
    let CommandResult::Json(entries) = result else {
        panic!("console logs must be json");
    };
    assert_eq!(entries[0]["level"], "warn");
    assert_eq!(entries[0]["text"], "low disk");
}

#[tokio::test]
async fn test_tabs_lifecycle_via_dispatch() {
    let (dispatcher, _browser) = harness();
    let ctx = create_context(&dispatcher).await;

    let new_tab = dispatcher
        .dispatch(
            &CommandEnvelope::new(2, "newTab")
                .param("context_id", ctx.clone())
                .param("url", "https://two.example"),
        )
        .await
        .unwrap();
    let CommandResult::Json(new_tab) = new_tab else {
        panic!()
    };
    let tab_id = new_tab["tab_id"].as_str().unwrap().to_string();

    let action = action_of(
        dispatcher
            .dispatch(
                &CommandEnvelope::new(3, "switchTab")
                    .param("context_id", ctx.clone())
                    .param("tab_id", tab_id),
            )
            .await
            .unwrap(),
    );
    assert!(action.success);

    let action = action_of(
        dispatcher
            .dispatch(
                &CommandEnvelope::new(4, "switchTab")
                    .param("context_id", ctx)
                    .param("tab_id", "missing"),
            )
            .await
            .unwrap(),
    );
    assert_eq!(action.status, StatusCode::TabSwitchFailed);
}

#[tokio::test]
async fn test_close_context_through_dispatch() {
    let (dispatcher, _browser) = harness();
    let ctx = create_context(&dispatcher).await;
    let closed = dispatcher
        .dispatch(&CommandEnvelope::new(2, "closeContext").param("context_id", ctx.clone()))
        .await
        .unwrap();
    assert_eq!(closed.as_bool(), Some(true));

    let err = dispatcher
        .dispatch(&CommandEnvelope::new(3, "extractText").param("context_id", ctx))
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::ContextNotFound(_)));
}
