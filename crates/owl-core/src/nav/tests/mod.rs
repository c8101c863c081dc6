use std::time::{Duration, Instant};

use super::*;

fn loading_snapshot(url: &str) -> NavSnapshot {
    NavSnapshot {
        url: url.to_string(),
        loading: true,
        ..NavSnapshot::default()
    }
}

fn settled_snapshot(url: &str, mutations: u64) -> NavSnapshot {
    NavSnapshot {
        url: url.to_string(),
        title: "T".to_string(),
        http_status: Some(200),
        loading: false,
        dom_mutation_count: mutations,
        ..NavSnapshot::default()
    }
}

#[test]
fn test_states_are_ordered() {
    assert!(NavigationState::Idle < NavigationState::Starting);
    assert!(NavigationState::Loading < NavigationState::DomLoaded);
    assert!(NavigationState::Complete < NavigationState::Interactive);
    assert!(NavigationState::NetworkIdle < NavigationState::Stable);
}

#[test]
fn test_walks_completion_ladder() {
    let mut tracker = NavigationTracker::new();
    assert_eq!(tracker.state(), NavigationState::Idle);

    tracker.begin("https://example.com");
    assert_eq!(tracker.state(), NavigationState::Starting);

    let t0 = Instant::now();
    tracker.observe_at(&loading_snapshot("https://example.com"), t0);
    assert_eq!(tracker.state(), NavigationState::Loading);

    tracker.observe_at(&settled_snapshot("https://example.com", 1), t0);
    // Settled but network-idle window not yet elapsed.
    assert_eq!(tracker.state(), NavigationState::Interactive);
}

#[test]
fn test_refines_to_network_idle_then_stable() {
    let mut tracker = NavigationTracker::new();
    tracker.begin("https://example.com");
    let t0 = Instant::now();
    tracker.observe_at(&settled_snapshot("https://example.com", 1), t0);

    // After the network-idle window with no DOM change since t0, both
    // refinements unlock (the stable window is measured from the last
    // mutation, which happened at t0).
    tracker.observe_at(
        &settled_snapshot("https://example.com", 1),
        t0 + Duration::from_millis(600),
    );
    assert_eq!(tracker.state(), NavigationState::NetworkIdle);

    tracker.observe_at(
        &settled_snapshot("https://example.com", 1),
        t0 + Duration::from_millis(1100),
    );
    assert_eq!(tracker.state(), NavigationState::Stable);
}

#[test]
fn test_dom_mutations_defer_stable() {
    let mut tracker = NavigationTracker::new();
    tracker.begin("https://example.com");
    let t0 = Instant::now();
    tracker.observe_at(&settled_snapshot("https://example.com", 1), t0);

    // A mutation landing late restarts the stability window.
    tracker.observe_at(
        &settled_snapshot("https://example.com", 2),
        t0 + Duration::from_millis(900),
    );
    tracker.observe_at(
        &settled_snapshot("https://example.com", 2),
        t0 + Duration::from_millis(1200),
    );
    assert_eq!(tracker.state(), NavigationState::NetworkIdle);

    tracker.observe_at(
        &settled_snapshot("https://example.com", 2),
        t0 + Duration::from_millis(2000),
    );
    assert_eq!(tracker.state(), NavigationState::Stable);
}

#[test]
fn test_pending_requests_defer_network_idle() {
    let mut tracker = NavigationTracker::new();
    tracker.begin("https://example.com");
    let t0 = Instant::now();
    let mut snap = settled_snapshot("https://example.com", 1);
    snap.pending_requests = 2;
    tracker.observe_at(&snap, t0);
    tracker.observe_at(&snap, t0 + Duration::from_millis(800));
    assert_eq!(tracker.state(), NavigationState::Interactive);

    snap.pending_requests = 0;
    tracker.observe_at(&snap, t0 + Duration::from_millis(900));
    // Counter change resets the activity clock; idle needs another window.
    assert_eq!(tracker.state(), NavigationState::Interactive);
    tracker.observe_at(&snap, t0 + Duration::from_millis(1500));
    assert!(tracker.state() >= NavigationState::NetworkIdle);
}

#[test]
fn test_failed_is_terminal_until_next_begin() {
    let mut tracker = NavigationTracker::new();
    tracker.begin("https://down.example");
    let snap = NavSnapshot {
        url: "https://down.example".to_string(),
        failed: true,
        failure: Some("net::ERR_CONNECTION_REFUSED".to_string()),
        ..NavSnapshot::default()
    };
    tracker.observe(&snap);
    assert_eq!(tracker.state(), NavigationState::Failed);
    assert!(tracker.failure().unwrap().contains("REFUSED"));

    // Later healthy observations do not resurrect the navigation.
    tracker.observe(&settled_snapshot("https://down.example", 1));
    assert_eq!(tracker.state(), NavigationState::Failed);

    tracker.begin("https://up.example");
    assert_eq!(tracker.state(), NavigationState::Starting);
    assert!(tracker.failure().is_none());
}

#[test]
fn test_info_reports_current_facts() {
    let mut tracker = NavigationTracker::new();
    tracker.begin("https://example.com");
    tracker.observe(&settled_snapshot("https://example.com", 3));
    let info = tracker.info();
    assert_eq!(info.current_url, "https://example.com");
    assert_eq!(info.target_url, "https://example.com");
    assert_eq!(info.http_status, Some(200));
    assert_eq!(info.dom_mutations, 3);
    assert!(info.elapsed_ms.is_some());
}
