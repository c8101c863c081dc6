use super::*;

#[test]
fn test_console_push_and_read_scoped_by_context() {
    let store = ConsoleStore::new();
    store.push("ctx_1", "log", "hello");
    store.push("ctx_1", "error", "boom");
    store.push("ctx_2", "log", "other");

    let entries = store.read("ctx_1");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].text, "hello");
    assert_eq!(entries[1].level, "error");
    assert_eq!(store.read("ctx_2").len(), 1);
    assert!(store.read("ctx_3").is_empty());
}

#[test]
fn test_console_clear() {
    let store = ConsoleStore::new();
    store.push("ctx_1", "log", "hello");
    store.clear("ctx_1");
    assert!(store.read("ctx_1").is_empty());
}

#[test]
fn test_dialog_policy_defaults_to_dismiss() {
    let store = DialogStore::new();
    assert_eq!(store.policy("ctx_1"), DialogPolicy::Dismiss);
    let record = store.record("ctx_1", "confirm", "Leave page?");
    assert!(!record.accepted);

    store.set_policy("ctx_1", DialogPolicy::Accept);
    let record = store.record("ctx_1", "confirm", "Leave page?");
    assert!(record.accepted);
    assert_eq!(store.history("ctx_1").len(), 2);
}

#[test]
fn test_download_lifecycle() {
    let store = DownloadStore::new();
    let id = store.begin("ctx_1", "https://example.com/f.zip", "/tmp/f.zip");
    assert_eq!(store.list("ctx_1")[0].state, DownloadState::InProgress);
    assert!(store.finish("ctx_1", &id, DownloadState::Completed));
    assert_eq!(store.list("ctx_1")[0].state, DownloadState::Completed);
    assert!(!store.finish("ctx_1", "missing", DownloadState::Failed));
}

#[test]
fn test_tab_switch_and_close() {
    let store = TabStore::new();
    let first = store.init("ctx_1", "about:blank");
    let second = store.open("ctx_1", "https://example.com");

    let tabs = store.list("ctx_1");
    assert_eq!(tabs.len(), 2);
    assert!(tabs.iter().find(|t| t.id == second).unwrap().active);

    assert!(store.switch("ctx_1", &first));
    assert!(store.list("ctx_1").iter().find(|t| t.id == first).unwrap().active);
    assert!(!store.switch("ctx_1", "missing"));

    // Closing the active tab activates the remaining one.
    assert!(store.close("ctx_1", &first));
    let tabs = store.list("ctx_1");
    assert_eq!(tabs.len(), 1);
    assert!(tabs[0].active);

    // The last tab cannot be closed.
    assert!(!store.close("ctx_1", &second));
}

#[test]
fn test_network_rule_matching() {
    let rule = NetworkRule {
        id: "r".to_string(),
        pattern: "*.png".to_string(),
        action: RuleAction::Block,
        resource_types: vec![],
    };
    assert!(rule.matches("https://cdn.example.com/logo.png", "image"));
    assert!(!rule.matches("https://cdn.example.com/app.js", "script"));

    let typed = NetworkRule {
        id: "t".to_string(),
        pattern: "example.com".to_string(),
        action: RuleAction::Block,
        resource_types: vec!["image".to_string()],
    };
    assert!(typed.matches("https://example.com/a.png", "image"));
    assert!(!typed.matches("https://example.com/a.png", "script"));
}

#[test]
fn test_network_rules_first_match_wins() {
    let store = NetworkRuleStore::new();
    store.add("ctx_1", "*.png", RuleAction::Block, vec![]);
    store.add("ctx_1", "cdn.example.com*", RuleAction::Allow, vec![]);

    assert_eq!(
        store.decide("ctx_1", "https://cdn.example.com/x.png", "image"),
        Some(RuleAction::Block)
    );
    assert_eq!(
        store.decide("ctx_1", "https://cdn.example.com/x.js", "script"),
        Some(RuleAction::Allow)
    );
    assert_eq!(store.decide("ctx_1", "https://other.example/x.js", "script"), None);
}

#[test]
fn test_rule_removal() {
    let store = NetworkRuleStore::new();
    let id = store.add("ctx_1", "*.gif", RuleAction::Block, vec![]);
    assert!(store.remove("ctx_1", &id));
    assert!(!store.remove("ctx_1", &id));
    assert!(store.list("ctx_1").is_empty());
}

#[test]
fn test_clear_for_context_sweeps_every_store() {
    let stores = Stores::new();
    stores.console.push("ctx_1", "log", "x");
    stores.dialogs.set_policy("ctx_1", DialogPolicy::Accept);
    stores.downloads.begin("ctx_1", "u", "p");
    stores.tabs.init("ctx_1", "about:blank");
    stores.network_rules.add("ctx_1", "*", RuleAction::Block, vec![]);

    stores.clear_for_context("ctx_1");

    assert!(stores.console.read("ctx_1").is_empty());
    assert_eq!(stores.dialogs.policy("ctx_1"), DialogPolicy::Dismiss);
    assert!(stores.downloads.list("ctx_1").is_empty());
    assert!(stores.tabs.list("ctx_1").is_empty());
    assert!(stores.network_rules.list("ctx_1").is_empty());
}
