use std::sync::Arc;
use std::time::Duration;

use owl_wire::StatusCode;

use super::*;
use crate::engine::sim::{ClickEffect, SimBrowser, SimDocument, SimElement};
use crate::engine::{BrowserEngine, MouseButton, PageOptions};

async fn page_with(doc: SimDocument) -> Arc<dyn PageEngine> {
    let browser = SimBrowser::new();
    let url = doc.url.clone();
    browser.install(doc);
    let page = browser
        .create_page("ctx_t", &PageOptions::default())
        .await
        .unwrap();
    page.begin_navigate(&url).await.unwrap();
    page.nav_snapshot().await;
    page
}

#[tokio::test]
async fn test_pre_check_passes_visible_element() {
    let page = page_with(
        SimDocument::new("https://t.example").element(SimElement::button("go").with_text("Go")),
    )
    .await;
    let verifier = Verifier::default();
    let target = verifier
        .pre_check(page.as_ref(), &StaticFinder::new(), "#go", VerificationLevel::Standard)
        .await
        .expect("pre-check should pass");
    assert_eq!(target.css(), Some("#go"));
}

#[tokio::test]
async fn test_pre_check_missing_element() {
    let page = page_with(SimDocument::new("https://t.example")).await;
    let verifier = Verifier::default();
    let result = verifier
        .pre_check(page.as_ref(), &StaticFinder::new(), "#nope", VerificationLevel::Standard)
        .await
        .expect_err("missing element must fail");
    assert_eq!(result.status, StatusCode::ElementNotFound);
    assert_eq!(result.selector.as_deref(), Some("#nope"));
    assert!(!result.success);
}

#[tokio::test]
async fn test_pre_check_invalid_selector() {
    let page = page_with(SimDocument::new("https://t.example")).await;
    let result = Verifier::default()
        .pre_check(page.as_ref(), &StaticFinder::new(), "div[[", VerificationLevel::Standard)
        .await
        .expect_err("invalid selector must fail");
    assert_eq!(result.status, StatusCode::InvalidSelector);
}

#[tokio::test]
async fn test_pre_check_multiple_elements() {
    let page = page_with(
        SimDocument::new("https://t.example")
            .element(SimElement::new("input").with_class("field"))
            .element(SimElement::new("input").with_class("field")),
    )
    .await;
    let result = Verifier::default()
        .pre_check(page.as_ref(), &StaticFinder::new(), ".field", VerificationLevel::Standard)
        .await
        .expect_err("ambiguous selector must fail");
    assert_eq!(result.status, StatusCode::MultipleElements);
    assert_eq!(result.element_count, Some(2));
}

#[tokio::test]
async fn test_pre_check_hidden_element() {
    let page = page_with(
        SimDocument::new("https://t.example").element(SimElement::button("ghost").hidden()),
    )
    .await;
    let result = Verifier::default()
        .pre_check(page.as_ref(), &StaticFinder::new(), "#ghost", VerificationLevel::Basic)
        .await
        .expect_err("hidden element must fail");
    assert_eq!(result.status, StatusCode::ElementNotVisible);
}

#[tokio::test]
async fn test_pre_check_covered_element_reports_interceptor() {
    let page = page_with(
        SimDocument::new("https://t.example")
            .element(SimElement::button("buy").covered_by("#overlay")),
    )
    .await;
    let result = Verifier::default()
        .pre_check(page.as_ref(), &StaticFinder::new(), "#buy", VerificationLevel::Standard)
        .await
        .expect_err("covered element must fail at standard");
    assert_eq!(result.status, StatusCode::ClickIntercepted);
    assert_eq!(result.error_code.as_deref(), Some("#overlay"));
}

#[tokio::test]
async fn test_basic_level_ignores_cover() {
    let page = page_with(
        SimDocument::new("https://t.example")
            .element(SimElement::button("buy").covered_by("#overlay")),
    )
    .await;
    assert!(
        Verifier::default()
            .pre_check(page.as_ref(), &StaticFinder::new(), "#buy", VerificationLevel::Basic)
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_none_level_skips_all_checks() {
    let page = page_with(
        SimDocument::new("https://t.example").element(SimElement::button("ghost").hidden()),
    )
    .await;
    assert!(
        Verifier::default()
            .pre_check(page.as_ref(), &StaticFinder::new(), "#ghost", VerificationLevel::None)
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_coordinate_selector_bypasses_element_resolution() {
    let page = page_with(SimDocument::new("https://t.example")).await;
    let target = Verifier::default()
        .pre_check(page.as_ref(), &StaticFinder::new(), "120x300", VerificationLevel::Strict)
        .await
        .unwrap();
    assert_eq!(target.hit_point(), (120.0, 300.0));
}

#[tokio::test]
async fn test_natural_language_resolves_through_finder() {
    let page = page_with(
        SimDocument::new("https://t.example").element(SimElement::button("login")),
    )
    .await;
    let finder = StaticFinder::new().with_mapping("the login button", "#login");
    let target = Verifier::default()
        .pre_check(page.as_ref(), &finder, "the login button", VerificationLevel::Standard)
        .await
        .unwrap();
    assert_eq!(target.css(), Some("#login"));
}

#[tokio::test]
async fn test_unresolvable_description_is_element_not_found() {
    let page = page_with(SimDocument::new("https://t.example")).await;
    let result = Verifier::default()
        .pre_check(
            page.as_ref(),
            &StaticFinder::new(),
            "something vague",
            VerificationLevel::Standard,
        )
        .await
        .expect_err("unresolvable description must fail");
    assert_eq!(result.status, StatusCode::ElementNotFound);
}

#[tokio::test]
async fn test_post_click_times_out_without_observable_change() {
    let page = page_with(
        SimDocument::new("https://t.example")
            .element(SimElement::button("inert").on_click(ClickEffect::None)),
    )
    .await;
    let verifier = Verifier::default();
    let before = PageObservation::capture(page.as_ref()).await;
    page.click_at(60.0, 20.0, MouseButton::Left, 1).await.unwrap();
    let result = verifier.post_click(page.as_ref(), &before).await;
    assert_eq!(result.status, StatusCode::VerificationTimeout);
    assert!(result.success, "verification timeout preserves success");
}

#[tokio::test]
async fn test_post_click_sees_dom_mutation() {
    let page = page_with(
        SimDocument::new("https://t.example")
            .element(SimElement::button("live").on_click(ClickEffect::Mutate)),
    )
    .await;
    let verifier = Verifier::default();
    let before = PageObservation::capture(page.as_ref()).await;
    page.click_at(60.0, 20.0, MouseButton::Left, 1).await.unwrap();
    let result = verifier.post_click(page.as_ref(), &before).await;
    assert_eq!(result.status, StatusCode::Ok);
}

#[tokio::test]
async fn test_post_type_exact_and_partial_and_mismatch() {
    let page = page_with(
        SimDocument::new("https://t.example")
            .element(SimElement::input("limited").with_attribute("maxlength", "3")),
    )
    .await;
    let verifier = Verifier::default();

    page.focus("#limited").await.unwrap();
    page.insert_text("abcdef").await.unwrap();
    let result = verifier.post_type(page.as_ref(), "#limited", "abcdef").await;
    assert_eq!(result.status, StatusCode::TypePartial);
    assert_eq!(result.error_code.as_deref(), Some("abc"));
    assert!(!result.success);

    let result = verifier.post_type(page.as_ref(), "#limited", "abc").await;
    assert_eq!(result.status, StatusCode::Ok);

    let result = verifier.post_type(page.as_ref(), "#limited", "xyz").await;
    assert_eq!(result.status, StatusCode::TypeFailed);
}

#[tokio::test]
async fn test_post_pick_option_not_found() {
    let page = page_with(
        SimDocument::new("https://t.example")
            .element(SimElement::select("color", &["red", "green"])),
    )
    .await;
    let verifier = Verifier::default();
    let result = verifier.post_pick(page.as_ref(), "#color", "blue").await;
    assert_eq!(result.status, StatusCode::OptionNotFound);

    page.select_option("#color", "green").await.unwrap();
    let result = verifier.post_pick(page.as_ref(), "#color", "green").await;
    assert_eq!(result.status, StatusCode::Ok);
}

#[tokio::test]
async fn test_post_focus_and_blur() {
    let page = page_with(
        SimDocument::new("https://t.example").element(SimElement::input("name")),
    )
    .await;
    let verifier = Verifier::default();

    page.focus("#name").await.unwrap();
    assert_eq!(
        verifier.post_focus(page.as_ref(), "#name").await.status,
        StatusCode::Ok
    );
    assert_eq!(
        verifier.post_blur(page.as_ref(), "#name").await.status,
        StatusCode::BlurFailed
    );

    page.blur().await.unwrap();
    assert_eq!(
        verifier.post_blur(page.as_ref(), "#name").await.status,
        StatusCode::Ok
    );
    assert_eq!(
        verifier.post_focus(page.as_ref(), "#name").await.status,
        StatusCode::FocusFailed
    );
}

#[tokio::test]
async fn test_post_clear() {
    let page = page_with(
        SimDocument::new("https://t.example")
            .element(SimElement::input("q").with_value("stale")),
    )
    .await;
    let verifier = Verifier::default();
    let result = verifier.post_clear(page.as_ref(), "#q").await;
    assert_eq!(result.status, StatusCode::ClearFailed);
    assert_eq!(result.error_code.as_deref(), Some("stale"));
}

#[tokio::test]
async fn test_post_scroll_within_one_pixel() {
    let page = page_with(SimDocument::new("https://t.example")).await;
    let verifier = Verifier::default();
    let before = page.scroll_position().await;
    page.scroll_by(0.0, 250.0).await.unwrap();
    let result = verifier
        .post_scroll(page.as_ref(), before, ScrollRequest::By { dx: 0.0, dy: 250.0 })
        .await;
    assert_eq!(result.status, StatusCode::Ok);

    let result = verifier
        .post_scroll(page.as_ref(), before, ScrollRequest::By { dx: 0.0, dy: 500.0 })
        .await;
    assert_eq!(result.status, StatusCode::ScrollFailed);
}

#[tokio::test]
async fn test_stabilization_waits_out_lingering_requests() {
    let browser = SimBrowser::new();
    browser.install(
        SimDocument::new("https://busy.example")
            .lingering_requests(1, Duration::from_millis(30)),
    );
    let page = browser
        .create_page("ctx_s", &PageOptions::default())
        .await
        .unwrap();
    page.begin_navigate("https://busy.example").await.unwrap();
    page.nav_snapshot().await;

    let verifier = Verifier::new(POST_CHECK_TIMEOUT, Duration::from_secs(10));
    assert!(verifier.wait_for_stabilization(page.as_ref()).await);
}

#[tokio::test]
async fn test_stabilization_gives_up_at_bound() {
    let browser = SimBrowser::new();
    browser.install(
        SimDocument::new("https://churn.example")
            .lingering_requests(3, Duration::from_secs(60)),
    );
    let page = browser
        .create_page("ctx_s", &PageOptions::default())
        .await
        .unwrap();
    page.begin_navigate("https://churn.example").await.unwrap();
    page.nav_snapshot().await;

    let verifier = Verifier::new(POST_CHECK_TIMEOUT, Duration::from_millis(100));
    assert!(!verifier.wait_for_stabilization(page.as_ref()).await);
}
