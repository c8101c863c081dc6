//! Navigation state tracking.
//!
//! Each context carries a [`NavigationTracker`] that folds raw engine
//! observations ([`NavSnapshot`]) into the monotonic navigation state
//! machine: `Idle → Starting → Loading → DomLoaded → Complete`, refined to
//! `Interactive`, `NetworkIdle` (no requests for 500 ms) and `Stable` (no
//! DOM mutations for 1000 ms). `Failed` is terminal until the next
//! navigation begins.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::engine::NavSnapshot;

/// No-pending-requests window required before `NetworkIdle`.
pub const NETWORK_IDLE_THRESHOLD: Duration = Duration::from_millis(500);

/// No-DOM-mutation window required before `Stable`.
pub const DOM_STABLE_THRESHOLD: Duration = Duration::from_millis(1000);

/// Navigation lifecycle states, ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationState {
    Idle,
    Starting,
    Loading,
    DomLoaded,
    Complete,
    Interactive,
    NetworkIdle,
    Stable,
    Failed,
}

impl NavigationState {
    /// Whether the document has finished its load sequence.
    pub fn is_loaded(self) -> bool {
        self >= Self::Complete && self != Self::Failed
    }
}

/// Point-in-time public view of a context's navigation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationInfo {
    pub state: NavigationState,
    pub current_url: String,
    pub target_url: String,
    pub title: String,
    pub http_status: Option<u16>,
    pub pending_requests: usize,
    pub dom_mutations: u64,
    /// Milliseconds since the navigation started, if one did.
    pub elapsed_ms: Option<u64>,
}

/// Folds engine snapshots into navigation state.
#[derive(Debug)]
pub struct NavigationTracker {
    state: NavigationState,
    current_url: String,
    target_url: String,
    title: String,
    http_status: Option<u16>,
    started_at: Option<Instant>,
    ended_at: Option<Instant>,
    last_network_activity: Instant,
    last_dom_mutation: Instant,
    pending_requests: usize,
    dom_mutations: u64,
    failure: Option<String>,
}

impl Default for NavigationTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationTracker {
    /// A tracker in the `Idle` state.
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            state: NavigationState::Idle,
            current_url: "about:blank".to_string(),
            target_url: String::new(),
            title: String::new(),
            http_status: None,
            started_at: None,
            ended_at: None,
            last_network_activity: now,
            last_dom_mutation: now,
            pending_requests: 0,
            dom_mutations: 0,
            failure: None,
        }
    }

    /// Record the start of a navigation. Resets refinements; a `Failed`
    /// state is cleared here and only here.
    pub fn begin(&mut self, target_url: &str) {
        self.state = NavigationState::Starting;
        self.target_url = target_url.to_string();
        self.http_status = None;
        self.failure = None;
        self.started_at = Some(Instant::now());
        self.ended_at = None;
    }

    /// Record a navigation failure. Terminal until the next [`Self::begin`].
    pub fn fail(&mut self, reason: &str) {
        self.state = NavigationState::Failed;
        self.failure = Some(reason.to_string());
        self.ended_at = Some(Instant::now());
    }

    /// Fold one engine observation into the state machine.
    pub fn observe(&mut self, snapshot: &NavSnapshot) {
        self.observe_at(snapshot, Instant::now());
    }

    /// Fold an observation at an explicit instant (testable form).
    pub fn observe_at(&mut self, snapshot: &NavSnapshot, now: Instant) {
        if snapshot.failed {
            self.fail(snapshot.failure.as_deref().unwrap_or("navigation failed"));
            return;
        }
        if self.state == NavigationState::Failed {
            // Terminal until the next begin().
            return;
        }

        if snapshot.pending_requests != self.pending_requests {
            self.pending_requests = snapshot.pending_requests;
            self.last_network_activity = now;
        }
        if snapshot.dom_mutation_count != self.dom_mutations {
            self.dom_mutations = snapshot.dom_mutation_count;
            self.last_dom_mutation = now;
        }
        self.current_url = snapshot.url.clone();
        self.title = snapshot.title.clone();
        if snapshot.http_status.is_some() {
            self.http_status = snapshot.http_status;
        }

        if snapshot.loading {
            self.advance(NavigationState::Loading);
            return;
        }

        // Document settled: walk the completion ladder, then refine.
        self.advance(NavigationState::DomLoaded);
        self.advance(NavigationState::Complete);
        if self.ended_at.is_none() {
            self.ended_at = Some(now);
        }
        self.advance(NavigationState::Interactive);
        if self.pending_requests == 0
            && now.duration_since(self.last_network_activity) >= NETWORK_IDLE_THRESHOLD
        {
            self.advance(NavigationState::NetworkIdle);
            if now.duration_since(self.last_dom_mutation) >= DOM_STABLE_THRESHOLD {
                self.advance(NavigationState::Stable);
            }
        }
    }

    /// Monotonic transition: never move backwards.
    fn advance(&mut self, to: NavigationState) {
        if to > self.state {
            self.state = to;
        }
    }

    /// Current state.
    pub fn state(&self) -> NavigationState {
        self.state
    }

    /// Failure reason, when `Failed`.
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// HTTP status of the last main-document response.
    pub fn http_status(&self) -> Option<u16> {
        self.http_status
    }

    /// Public snapshot for `getNavigationState` and `getPageInfo`.
    pub fn info(&self) -> NavigationInfo {
        NavigationInfo {
            state: self.state,
            current_url: self.current_url.clone(),
            target_url: self.target_url.clone(),
            title: self.title.clone(),
            http_status: self.http_status,
            pending_requests: self.pending_requests,
            dom_mutations: self.dom_mutations,
            elapsed_ms: self.started_at.map(|started| {
                self.ended_at
                    .unwrap_or_else(Instant::now)
                    .duration_since(started)
                    .as_millis() as u64
            }),
        }
    }
}

#[cfg(test)]
mod tests;
