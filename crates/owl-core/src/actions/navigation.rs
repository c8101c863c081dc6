//! Navigation operations.

use std::sync::Arc;
use std::time::Duration;

use owl_wire::{ActionResult, CommandEnvelope, CommandResult, StatusCode};
use tokio::time::{Instant, sleep};
use tracing::debug;

use crate::context::ContextHandle;
use crate::detector::Detection;
use crate::error::DispatchError;
use crate::nav::NavigationState;
use crate::runtime::Runtime;

use super::{require_str, sync_console, sync_tab, timeout_ms};

const DEFAULT_NAV_TIMEOUT_MS: u64 = 30_000;
const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub async fn navigate(
    rt: &Runtime,
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let target = require_str(envelope, "url")?;
    if !url_is_navigable(target) {
        return Ok(CommandResult::Action(
            ActionResult::failure(StatusCode::InvalidUrl, format!("cannot navigate to {target}"))
                .with_url(target),
        ));
    }

    let timeout = Duration::from_millis(timeout_ms(envelope, DEFAULT_NAV_TIMEOUT_MS));
    cx.nav().lock().begin(target);
    if let Err(err) = cx.page().begin_navigate(target).await {
        cx.nav().lock().fail(&err.to_string());
        return Ok(CommandResult::Action(
            ActionResult::failure(StatusCode::NavigationFailed, err.to_string()).with_url(target),
        ));
    }
    debug!(url = %target, "Navigation started");

    let result = await_completion(rt, cx, Some(target), timeout).await;
    Ok(CommandResult::Action(result))
}

pub async fn reload(
    rt: &Runtime,
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let timeout = Duration::from_millis(timeout_ms(envelope, DEFAULT_NAV_TIMEOUT_MS));
    let current = cx.page().nav_snapshot().await.url;
    cx.nav().lock().begin(&current);
    if let Err(err) = cx.page().reload().await {
        cx.nav().lock().fail(&err.to_string());
        return Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::NavigationFailed,
            err.to_string(),
        )));
    }
    Ok(CommandResult::Action(
        await_completion(rt, cx, None, timeout).await,
    ))
}

pub async fn go_back(
    rt: &Runtime,
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    history_step(rt, cx, envelope, true).await
}

pub async fn go_forward(
    rt: &Runtime,
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    history_step(rt, cx, envelope, false).await
}

async fn history_step(
    rt: &Runtime,
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
    back: bool,
) -> Result<CommandResult, DispatchError> {
    let possible = if back {
        cx.page().can_go_back().await
    } else {
        cx.page().can_go_forward().await
    };
    if !possible {
        let direction = if back { "back" } else { "forward" };
        return Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::NavigationFailed,
            format!("no {direction} history entry"),
        )));
    }

    let timeout = Duration::from_millis(timeout_ms(envelope, DEFAULT_NAV_TIMEOUT_MS));
    cx.nav().lock().begin("");
    let outcome = if back {
        cx.page().go_back().await
    } else {
        cx.page().go_forward().await
    };
    if let Err(err) = outcome {
        cx.nav().lock().fail(&err.to_string());
        return Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::NavigationFailed,
            err.to_string(),
        )));
    }
    Ok(CommandResult::Action(
        await_completion(rt, cx, None, timeout).await,
    ))
}

pub async fn wait_for_navigation(
    rt: &Runtime,
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let timeout = Duration::from_millis(timeout_ms(envelope, DEFAULT_NAV_TIMEOUT_MS));
    Ok(CommandResult::Action(
        await_completion(rt, cx, None, timeout).await,
    ))
}

pub fn navigation_state(cx: &Arc<ContextHandle>) -> Result<CommandResult, DispatchError> {
    let info = cx.nav().lock().info();
    serde_json::to_value(info)
        .map(CommandResult::Json)
        .map_err(|e| DispatchError::Internal(e.to_string()))
}

/// Poll until the navigation settles, classifying the landing page.
async fn await_completion(
    rt: &Runtime,
    cx: &Arc<ContextHandle>,
    target: Option<&str>,
    timeout: Duration,
) -> ActionResult {
    let deadline = Instant::now() + timeout;
    loop {
        let snap = cx.page().nav_snapshot().await;
        let state = {
            let mut nav = cx.nav().lock();
            nav.observe(&snap);
            nav.state()
        };

        if state == NavigationState::Failed {
            let reason = cx
                .nav()
                .lock()
                .failure()
                .unwrap_or("navigation failed")
                .to_string();
            return ActionResult::failure(StatusCode::NavigationFailed, reason)
                .with_url(snap.url);
        }

        if state.is_loaded() {
            sync_tab(rt, cx).await;
            sync_console(rt, cx).await;
            return classify_landing(rt, cx, target, &snap.url, snap.http_status).await;
        }

        if Instant::now() >= deadline {
            return ActionResult::failure(
                StatusCode::NavigationTimeout,
                format!("navigation incomplete after {} ms", timeout.as_millis()),
            )
            .with_url(snap.url);
        }
        sleep(POLL_INTERVAL).await;
    }
}

/// Decide what the navigation actually landed on.
async fn classify_landing(
    rt: &Runtime,
    cx: &Arc<ContextHandle>,
    target: Option<&str>,
    final_url: &str,
    http_status: Option<u16>,
) -> ActionResult {
    let html = cx.page().page_html().await;
    match rt.detector().detect(&html, http_status) {
        Some(Detection::Captcha) => {
            let mut result =
                ActionResult::failure(StatusCode::CaptchaDetected, "challenge page detected")
                    .with_url(final_url);
            if let Some(status) = http_status {
                result = result.with_http_status(status);
            }
            return result;
        }
        Some(Detection::Firewall) => {
            let mut result =
                ActionResult::failure(StatusCode::FirewallDetected, "firewall block page detected")
                    .with_url(final_url);
            if let Some(status) = http_status {
                result = result.with_http_status(status);
            }
            return result;
        }
        None => {}
    }

    if let Some(status) = http_status {
        if status >= 400 {
            return ActionResult::failure(
                StatusCode::PageLoadError,
                format!("document returned HTTP {status}"),
            )
            .with_url(final_url)
            .with_http_status(status);
        }
    }

    // A cross-host landing is reported, not silently accepted.
    if let Some(target) = target {
        if hosts_differ(target, final_url) {
            let mut result = ActionResult::failure(
                StatusCode::RedirectDetected,
                format!("landed on {final_url} instead of the requested host"),
            )
            .with_url(final_url);
            if let Some(status) = http_status {
                result = result.with_http_status(status);
            }
            return result;
        }
    }

    let mut result = ActionResult::ok("navigation complete").with_url(final_url);
    if let Some(status) = http_status {
        result = result.with_http_status(status);
    }
    result
}

fn url_is_navigable(raw: &str) -> bool {
    if raw.starts_with("about:") {
        return true;
    }
    match url::Url::parse(raw) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https" | "file" | "data"),
        Err(_) => false,
    }
}

fn hosts_differ(a: &str, b: &str) -> bool {
    let host = |raw: &str| url::Url::parse(raw).ok().and_then(|u| u.host_str().map(String::from));
    match (host(a), host(b)) {
        (Some(ha), Some(hb)) => ha != hb,
        _ => false,
    }
}
