//! # Action Verifier
//!
//! Gates every interaction with a pre-check and, depending on the
//! verification level, an action-specific post-check. Observations are
//! translated into [`ActionResult`]s; the verifier never throws for an
//! expected condition.
//!
//! | Level | Pre-checks | Post-checks |
//! |---|---|---|
//! | `None` | none | none |
//! | `Basic` | exists, visible | none |
//! | `Standard` | exists, visible, uncovered | action-specific, short timeout |
//! | `Strict` | as Standard | post-check plus stabilization wait |

mod finder;
mod selector;

use std::time::Duration;

use owl_wire::{ActionResult, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::time::{Instant, sleep};
use tracing::{debug, trace};

use crate::engine::{ElementSnapshot, PageEngine};
use crate::error::EngineError;
use crate::nav::{DOM_STABLE_THRESHOLD, NETWORK_IDLE_THRESHOLD};

pub use finder::{Finder, StaticFinder};
pub use selector::Selector;

/// Default post-check window for observable-change checks.
pub const POST_CHECK_TIMEOUT: Duration = Duration::from_millis(10);

/// Default upper bound on the strict stabilization wait.
pub const STABILIZATION_TIMEOUT: Duration = Duration::from_millis(5000);

/// How thoroughly the verifier checks an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationLevel {
    None,
    Basic,
    #[default]
    Standard,
    Strict,
}

impl VerificationLevel {
    /// Parse the wire form; unknown strings fall back to the default.
    pub fn parse(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "none" => Self::None,
            "basic" => Self::Basic,
            "strict" => Self::Strict,
            _ => Self::Standard,
        }
    }

    /// Whether pre-checks run at this level.
    pub fn checks_preconditions(self) -> bool {
        self != Self::None
    }

    /// Whether post-checks run at this level.
    pub fn checks_postconditions(self) -> bool {
        matches!(self, Self::Standard | Self::Strict)
    }
}

/// A target the pre-check cleared for interaction.
#[derive(Debug, Clone)]
pub enum ResolvedTarget {
    /// An element, with its snapshot at check time.
    Element(ElementSnapshot),
    /// A raw viewport coordinate.
    Point { x: f64, y: f64 },
}

impl ResolvedTarget {
    /// The point the interaction should hit.
    pub fn hit_point(&self) -> (f64, f64) {
        match self {
            Self::Element(snapshot) => snapshot.rect.center(),
            Self::Point { x, y } => (*x, *y),
        }
    }

    /// The CSS selector addressing the target, when it is an element.
    pub fn css(&self) -> Option<&str> {
        match self {
            Self::Element(snapshot) => Some(&snapshot.selector),
            Self::Point { .. } => None,
        }
    }
}

/// Page facts captured before an action, compared after it.
#[derive(Debug, Clone)]
pub struct PageObservation {
    pub url: String,
    pub active_element: Option<String>,
    pub dom_mutations: u64,
}

impl PageObservation {
    /// Capture the current observation.
    pub async fn capture(page: &dyn PageEngine) -> Self {
        let snap = page.nav_snapshot().await;
        Self {
            url: snap.url,
            active_element: page.active_element().await,
            dom_mutations: snap.dom_mutation_count,
        }
    }
}

/// The verifier; stateless apart from its timing configuration.
#[derive(Debug, Clone)]
pub struct Verifier {
    post_timeout: Duration,
    stabilization_timeout: Duration,
}

impl Default for Verifier {
    fn default() -> Self {
        Self {
            post_timeout: POST_CHECK_TIMEOUT,
            stabilization_timeout: STABILIZATION_TIMEOUT,
        }
    }
}

impl Verifier {
    /// A verifier with custom windows.
    pub fn new(post_timeout: Duration, stabilization_timeout: Duration) -> Self {
        Self {
            post_timeout,
            stabilization_timeout,
        }
    }

    /// The configured post-check window.
    pub fn post_timeout(&self) -> Duration {
        self.post_timeout
    }

    // =========================================================================
    // Pre-checks
    // =========================================================================

    /// Resolve a raw selector and run the pre-checks for `level`.
    ///
    /// # Errors
    ///
    /// The error side is a ready-to-return [`ActionResult`] describing why
    /// the target is not interactable.
    pub async fn pre_check(
        &self,
        page: &dyn PageEngine,
        finder: &dyn Finder,
        raw_selector: &str,
        level: VerificationLevel,
    ) -> Result<ResolvedTarget, ActionResult> {
        let css = match Selector::parse(raw_selector) {
            Selector::Coordinate { x, y } => {
                trace!(x, y, "Selector is a coordinate, skipping element checks");
                return Ok(ResolvedTarget::Point { x, y });
            }
            Selector::Natural(description) => match finder.resolve(&description, page).await {
                Ok(css) => {
                    debug!(description = %description, css = %css, "Finder resolved description");
                    css
                }
                Err(err) => {
                    return Err(ActionResult::failure(
                        StatusCode::ElementNotFound,
                        format!("no element matches description: {err}"),
                    )
                    .with_selector(raw_selector));
                }
            },
            Selector::Css(css) => css,
        };

        let matches = match page.query(&css).await {
            Ok(matches) => matches,
            Err(EngineError::InvalidSelector(s)) => {
                return Err(ActionResult::failure(
                    StatusCode::InvalidSelector,
                    format!("selector does not parse: {s}"),
                )
                .with_selector(raw_selector));
            }
            Err(err) => {
                return Err(ActionResult::failure(StatusCode::InternalError, err.to_string())
                    .with_selector(raw_selector));
            }
        };

        let snapshot = match matches.len() {
            0 => {
                return Err(ActionResult::failure(
                    StatusCode::ElementNotFound,
                    format!("no element matches {css}"),
                )
                .with_selector(raw_selector)
                .with_element_count(0));
            }
            1 => matches.into_iter().next().unwrap_or_default(),
            n => {
                return Err(ActionResult::failure(
                    StatusCode::MultipleElements,
                    format!("{n} elements match {css}"),
                )
                .with_selector(raw_selector)
                .with_element_count(n));
            }
        };

        if !level.checks_preconditions() {
            return Ok(ResolvedTarget::Element(snapshot));
        }

        if !snapshot.visible {
            return Err(ActionResult::failure(
                StatusCode::ElementNotVisible,
                format!("{css} is not visible"),
            )
            .with_selector(raw_selector));
        }

        if level == VerificationLevel::Basic {
            return Ok(ResolvedTarget::Element(snapshot));
        }

        if !snapshot.enabled {
            return Err(ActionResult::failure(
                StatusCode::ElementNotInteractable,
                format!("{css} is disabled"),
            )
            .with_selector(raw_selector));
        }

        if let Some(covering) = &snapshot.covered_by {
            return Err(ActionResult::failure(
                StatusCode::ClickIntercepted,
                format!("{css} is covered by {covering} at its centroid"),
            )
            .with_selector(raw_selector)
            .with_error_code(covering.clone()));
        }

        Ok(ResolvedTarget::Element(snapshot))
    }

    // =========================================================================
    // Post-checks
    // =========================================================================

    /// Click post-check: look for a focus, URL, or DOM change within the
    /// window. An inconclusive outcome is `verification_timeout` and still
    /// counts as success.
    pub async fn post_click(
        &self,
        page: &dyn PageEngine,
        before: &PageObservation,
    ) -> ActionResult {
        let deadline = Instant::now() + self.post_timeout;
        loop {
            let now_obs = PageObservation::capture(page).await;
            if now_obs.url != before.url {
                return ActionResult::ok("click verified by url change").with_url(now_obs.url);
            }
            if now_obs.active_element != before.active_element {
                return ActionResult::ok("click verified by focus change");
            }
            if now_obs.dom_mutations != before.dom_mutations {
                return ActionResult::ok("click verified by dom mutation");
            }
            if Instant::now() >= deadline {
                return ActionResult::verification_timeout(
                    "no observable change within the verification window",
                );
            }
            sleep(Duration::from_millis(2)).await;
        }
    }

    /// Type post-check: re-read the field and compare against the intent.
    pub async fn post_type(
        &self,
        page: &dyn PageEngine,
        css: &str,
        expected: &str,
    ) -> ActionResult {
        let actual = read_value(page, css).await;
        match actual {
            Some(actual) if actual == expected => {
                ActionResult::ok(format!("typed {} characters", expected.chars().count()))
            }
            Some(actual) if !actual.is_empty() && expected.starts_with(&actual) => {
                ActionResult::failure(
                    StatusCode::TypePartial,
                    format!("field holds a prefix ({} of {} characters)", actual.chars().count(), expected.chars().count()),
                )
                .with_selector(css)
                .with_error_code(actual)
            }
            Some(actual) => ActionResult::failure(
                StatusCode::TypeFailed,
                "field content does not match typed text",
            )
            .with_selector(css)
            .with_error_code(actual),
            None => ActionResult::failure(StatusCode::TypeFailed, "field has no value")
                .with_selector(css),
        }
    }

    /// Pick post-check: re-read the selected value.
    pub async fn post_pick(
        &self,
        page: &dyn PageEngine,
        css: &str,
        expected: &str,
    ) -> ActionResult {
        let snapshot = match page.query(css).await {
            Ok(mut matches) if !matches.is_empty() => matches.swap_remove(0),
            _ => {
                return ActionResult::failure(StatusCode::ElementStale, "element disappeared")
                    .with_selector(css);
            }
        };
        if snapshot.value.as_deref() == Some(expected) {
            return ActionResult::ok(format!("selected {expected}"));
        }
        if !snapshot.options.iter().any(|o| o == expected) {
            return ActionResult::failure(
                StatusCode::OptionNotFound,
                format!("{expected} is not among the options"),
            )
            .with_selector(css)
            .with_element_count(snapshot.options.len());
        }
        ActionResult::failure(StatusCode::PickFailed, "selection did not take")
            .with_selector(css)
            .with_error_code(snapshot.value.unwrap_or_default())
    }

    /// Focus post-check: the document's active element must be the target.
    pub async fn post_focus(&self, page: &dyn PageEngine, css: &str) -> ActionResult {
        if page.active_element().await.as_deref() == Some(css) {
            ActionResult::ok(format!("{css} focused"))
        } else {
            ActionResult::failure(StatusCode::FocusFailed, format!("{css} did not take focus"))
                .with_selector(css)
        }
    }

    /// Blur post-check: the target must no longer be the active element.
    pub async fn post_blur(&self, page: &dyn PageEngine, css: &str) -> ActionResult {
        if page.active_element().await.as_deref() == Some(css) {
            ActionResult::failure(StatusCode::BlurFailed, format!("{css} kept focus"))
                .with_selector(css)
        } else {
            ActionResult::ok(format!("{css} blurred"))
        }
    }

    /// Clear post-check: the field value must be empty.
    pub async fn post_clear(&self, page: &dyn PageEngine, css: &str) -> ActionResult {
        match read_value(page, css).await {
            Some(value) if value.is_empty() => ActionResult::ok("field cleared"),
            Some(value) => ActionResult::failure(
                StatusCode::ClearFailed,
                format!("{} characters remain", value.chars().count()),
            )
            .with_selector(css)
            .with_error_code(value),
            None => ActionResult::failure(StatusCode::ClearFailed, "field has no value")
                .with_selector(css),
        }
    }

    /// Scroll post-check: position moved by the requested delta, or reached
    /// the requested absolute position, within one pixel.
    pub async fn post_scroll(
        &self,
        page: &dyn PageEngine,
        before: (f64, f64),
        request: ScrollRequest,
    ) -> ActionResult {
        let after = page.scroll_position().await;
        let expected = match request {
            ScrollRequest::By { dx, dy } => (before.0 + dx, before.1 + dy),
            ScrollRequest::To { x, y } => (x, y),
        };
        // Engines clamp at document edges; treat a clamped-at-zero axis as
        // satisfied when the request pushed past the edge.
        let satisfied = |got: f64, want: f64| (got - want).abs() <= 1.0 || (got == 0.0 && want < 0.0);
        if satisfied(after.0, expected.0) && satisfied(after.1, expected.1) {
            ActionResult::ok(format!("scrolled to {:.0},{:.0}", after.0, after.1))
        } else {
            ActionResult::failure(
                StatusCode::ScrollFailed,
                format!(
                    "position {:.0},{:.0} does not match requested {:.0},{:.0}",
                    after.0, after.1, expected.0, expected.1
                ),
            )
        }
    }

    /// Strict-level stabilization: wait until the page has had no pending
    /// requests for the network-idle window and no DOM mutations for the
    /// stability window, bounded by the stabilization timeout.
    ///
    /// Returns `true` if the page stabilized within the bound.
    pub async fn wait_for_stabilization(&self, page: &dyn PageEngine) -> bool {
        let deadline = Instant::now() + self.stabilization_timeout;
        let mut last_network = Instant::now();
        let mut last_mutation = Instant::now();
        let mut prev = page.nav_snapshot().await;
        loop {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let snap = page.nav_snapshot().await;
            if snap.pending_requests != prev.pending_requests || snap.pending_requests > 0 {
                last_network = now;
            }
            if snap.dom_mutation_count != prev.dom_mutation_count {
                last_mutation = now;
            }
            if snap.pending_requests == 0
                && now.duration_since(last_network) >= NETWORK_IDLE_THRESHOLD
                && now.duration_since(last_mutation) >= DOM_STABLE_THRESHOLD
            {
                return true;
            }
            prev = snap;
            sleep(Duration::from_millis(25)).await;
        }
    }
}

/// What a scroll action asked for, for the post-check.
#[derive(Debug, Clone, Copy)]
pub enum ScrollRequest {
    /// Relative scroll by a delta.
    By { dx: f64, dy: f64 },
    /// Absolute scroll to a position.
    To { x: f64, y: f64 },
}

async fn read_value(page: &dyn PageEngine, css: &str) -> Option<String> {
    page.query(css)
        .await
        .ok()
        .and_then(|matches| matches.into_iter().next())
        .and_then(|snapshot| snapshot.value)
}

#[cfg(test)]
mod tests;
