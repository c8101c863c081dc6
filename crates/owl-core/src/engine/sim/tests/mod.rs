use std::time::Duration;

use super::*;
use crate::engine::{BrowserEngine, MouseButton, PageOptions};

async fn page_for(browser: &Arc<SimBrowser>, ctx: &str) -> Arc<dyn PageEngine> {
    browser
        .create_page(ctx, &PageOptions::default())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_navigation_settles_to_installed_document() {
    let browser = SimBrowser::new();
    browser.install(
        SimDocument::new("https://example.com")
            .title("Example")
            .element(SimElement::button("go").with_text("Go")),
    );
    let page = page_for(&browser, "ctx_1").await;

    page.begin_navigate("https://example.com").await.unwrap();
    let snap = page.nav_snapshot().await;
    assert!(!snap.loading);
    assert_eq!(snap.url, "https://example.com");
    assert_eq!(snap.title, "Example");
    assert_eq!(snap.http_status, Some(200));
}

#[tokio::test]
async fn test_documents_installed_after_page_creation_are_visible() {
    let browser = SimBrowser::new();
    let page = page_for(&browser, "ctx_1").await;
    browser.install(SimDocument::new("https://late.example").title("Late"));

    page.begin_navigate("https://late.example").await.unwrap();
    assert_eq!(page.nav_snapshot().await.title, "Late");
}

#[tokio::test]
async fn test_delayed_navigation_stays_loading_until_deadline() {
    let browser = SimBrowser::new();
    browser.install(
        SimDocument::new("https://slow.example").load_delay(Duration::from_millis(50)),
    );
    let page = page_for(&browser, "ctx_1").await;

    page.begin_navigate("https://slow.example").await.unwrap();
    assert!(page.nav_snapshot().await.loading);
    tokio::time::sleep(Duration::from_millis(70)).await;
    assert!(!page.nav_snapshot().await.loading);
}

#[tokio::test]
async fn test_query_by_id_class_and_attribute() {
    let browser = SimBrowser::new();
    browser.install(
        SimDocument::new("https://q.example")
            .element(SimElement::input("email").with_class("field"))
            .element(SimElement::input("name").with_attribute("name", "fullname")),
    );
    let page = page_for(&browser, "ctx_1").await;
    page.begin_navigate("https://q.example").await.unwrap();
    page.nav_snapshot().await;

    assert_eq!(page.query("#email").await.unwrap().len(), 1);
    assert_eq!(page.query(".field").await.unwrap().len(), 1);
    assert_eq!(page.query("input").await.unwrap().len(), 2);
    assert_eq!(page.query("[name=fullname]").await.unwrap().len(), 1);
    assert_eq!(page.query("#missing").await.unwrap().len(), 0);
}

#[tokio::test]
async fn test_invalid_selector_is_rejected() {
    let browser = SimBrowser::new();
    let page = page_for(&browser, "ctx_1").await;
    assert!(page.query("").await.is_err());
    assert!(page.query("div[[").await.is_err());
}

#[tokio::test]
async fn test_insert_text_honours_maxlength() {
    let browser = SimBrowser::new();
    browser.install(
        SimDocument::new("https://form.example")
            .element(SimElement::input("code").with_attribute("maxlength", "3")),
    );
    let page = page_for(&browser, "ctx_1").await;
    page.begin_navigate("https://form.example").await.unwrap();
    page.nav_snapshot().await;

    page.focus("#code").await.unwrap();
    page.insert_text("abcdef").await.unwrap();
    let snap = &page.query("#code").await.unwrap()[0];
    assert_eq!(snap.value.as_deref(), Some("abc"));
}

#[tokio::test]
async fn test_click_hits_topmost_element_and_applies_effect() {
    let browser = SimBrowser::new();
    browser.install(
        SimDocument::new("https://click.example")
            .element(
                SimElement::button("under")
                    .with_rect(0.0, 0.0, 50.0, 50.0)
                    .on_click(ClickEffect::Mutate),
            )
            .element(
                SimElement::new("div")
                    .with_id("over")
                    .with_rect(0.0, 0.0, 50.0, 50.0)
                    .on_click(ClickEffect::Focus),
            ),
    );
    let page = page_for(&browser, "ctx_1").await;
    page.begin_navigate("https://click.example").await.unwrap();
    let before = page.nav_snapshot().await.dom_mutation_count;

    page.click_at(25.0, 25.0, MouseButton::Left, 1).await.unwrap();
    // The overlay was hit, so the mutation effect of the button must not fire.
    assert_eq!(page.nav_snapshot().await.dom_mutation_count, before);
    assert_eq!(page.active_element().await.as_deref(), Some("#over"));
}

#[tokio::test]
async fn test_history_back_and_forward() {
    let browser = SimBrowser::new();
    browser.install(SimDocument::new("https://a.example"));
    browser.install(SimDocument::new("https://b.example"));
    let page = page_for(&browser, "ctx_1").await;

    page.begin_navigate("https://a.example").await.unwrap();
    page.nav_snapshot().await;
    page.begin_navigate("https://b.example").await.unwrap();
    page.nav_snapshot().await;

    assert!(page.can_go_back().await);
    page.go_back().await.unwrap();
    assert_eq!(page.nav_snapshot().await.url, "https://a.example");
    assert!(page.can_go_forward().await);
    page.go_forward().await.unwrap();
    assert_eq!(page.nav_snapshot().await.url, "https://b.example");
}

#[tokio::test]
async fn test_capture_frame_is_png_and_deterministic() {
    let browser = SimBrowser::new();
    let page = page_for(&browser, "ctx_1").await;
    let one = page.capture_frame().await.unwrap();
    let two = page.capture_frame().await.unwrap();
    assert_eq!(one[..8], [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]);
    assert_eq!(one, two);
}

#[tokio::test]
async fn test_lingering_requests_decay() {
    let browser = SimBrowser::new();
    browser.install(
        SimDocument::new("https://busy.example")
            .lingering_requests(2, Duration::from_millis(40)),
    );
    let page = page_for(&browser, "ctx_1").await;
    page.begin_navigate("https://busy.example").await.unwrap();
    assert_eq!(page.nav_snapshot().await.pending_requests, 2);
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(page.nav_snapshot().await.pending_requests, 0);
}

#[tokio::test]
async fn test_uninitialized_browser_rejects_page_creation() {
    let browser = SimBrowser::uninitialized();
    assert!(!browser.is_ready());
    let err = browser.create_page("ctx_1", &PageOptions::default()).await;
    assert!(err.is_err());
    browser.mark_ready();
    assert!(browser.create_page("ctx_1", &PageOptions::default()).await.is_ok());
}

#[tokio::test]
async fn test_scripted_navigation_failure() {
    let browser = SimBrowser::new();
    browser.install(SimDocument::new("https://down.example").fails_with("net::ERR_CONNECTION_REFUSED"));
    let page = page_for(&browser, "ctx_1").await;
    page.begin_navigate("https://down.example").await.unwrap();
    let snap = page.nav_snapshot().await;
    assert!(snap.failed);
    assert!(snap.failure.as_deref().unwrap_or("").contains("REFUSED"));
}
