use super::*;

#[test]
fn test_detects_recaptcha_markup() {
    let rules = DetectorRules::default();
    let html = r#"<html><body><div class="g-recaptcha" data-sitekey="x"></div></body></html>"#;
    assert_eq!(rules.detect(html, Some(200)), Some(Detection::Captcha));
}

#[test]
fn test_detects_turnstile_markup() {
    let rules = DetectorRules::default();
    let html = r#"<div class="cf-turnstile" data-sitekey="y"></div>"#;
    assert_eq!(rules.detect(html, Some(403)), Some(Detection::Captcha));
}

#[test]
fn test_captcha_wins_over_firewall() {
    let rules = DetectorRules::default();
    let html = r#"<title>Attention Required! | Cloudflare</title><div class="g-recaptcha"></div>"#;
    assert_eq!(rules.detect(html, Some(403)), Some(Detection::Captcha));
}

#[test]
fn test_firewall_needs_blocking_status() {
    let rules = DetectorRules::default();
    let html = "<title>Attention Required! | Cloudflare</title> long article about CDNs ".repeat(20);
    assert_eq!(rules.detect(&html, Some(200)), None);
    assert_eq!(rules.detect(&html, Some(403)), Some(Detection::Firewall));
}

#[test]
fn test_tiny_interstitial_with_blocking_status() {
    let rules = DetectorRules::default();
    assert_eq!(
        rules.detect("<html>blocked</html>", Some(429)),
        Some(Detection::Firewall)
    );
}

#[test]
fn test_clean_page_detects_nothing() {
    let rules = DetectorRules::default();
    let html = "<html><head><title>Shop</title></head><body>Welcome</body></html>";
    assert_eq!(rules.detect(html, Some(200)), None);
}

#[test]
fn test_custom_rules_extend_defaults_shape() {
    let rules = DetectorRules::builder()
        .captcha_signature(r"(?i)custom-challenge-widget")
        .firewall_status(418)
        .build();
    assert_eq!(
        rules.detect("<div id='custom-challenge-widget'>", Some(200)),
        Some(Detection::Captcha)
    );
}
