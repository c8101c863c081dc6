//! Wait operations.
//!
//! Every wait takes a `timeout` in milliseconds. A zero timeout checks the
//! condition exactly once: it succeeds immediately if the condition already
//! holds and reports the timeout status otherwise.

use std::sync::Arc;
use std::time::Duration;

use owl_wire::{ActionResult, CommandEnvelope, CommandResult, StatusCode};
use serde_json::Value;
use tokio::time::{Instant, sleep};

use crate::context::ContextHandle;
use crate::error::DispatchError;
use crate::nav::{DOM_STABLE_THRESHOLD, NETWORK_IDLE_THRESHOLD};

use super::{require_str, timeout_ms};

const DEFAULT_WAIT_TIMEOUT_MS: u64 = 30_000;
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Poll `condition` until it reports success or the timeout elapses.
async fn poll_until<F, Fut>(
    timeout: Duration,
    timeout_status: StatusCode,
    timeout_message: String,
    mut condition: F,
) -> ActionResult
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<ActionResult>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(result) = condition().await {
            return result;
        }
        if Instant::now() >= deadline {
            return ActionResult::failure(timeout_status, timeout_message);
        }
        sleep(POLL_INTERVAL.min(timeout.max(Duration::from_millis(1)))).await;
    }
}

pub async fn wait_for_selector(
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let selector = require_str(envelope, "selector")?.to_string();
    let timeout = Duration::from_millis(timeout_ms(envelope, DEFAULT_WAIT_TIMEOUT_MS));
    let page = cx.page().clone();

    let result = poll_until(
        timeout,
        StatusCode::WaitTimeout,
        format!("{selector} did not appear within {} ms", timeout.as_millis()),
        || {
            let page = page.clone();
            let selector = selector.clone();
            async move {
                match page.query(&selector).await {
                    Ok(matches) if matches.iter().any(|m| m.visible) => Some(
                        ActionResult::ok("element present")
                            .with_selector(&selector)
                            .with_element_count(matches.len()),
                    ),
                    Ok(_) => None,
                    Err(err) => Some(
                        ActionResult::failure(StatusCode::InvalidSelector, err.to_string())
                            .with_selector(&selector),
                    ),
                }
            }
        },
    )
    .await;
    Ok(CommandResult::Action(if result.status == StatusCode::WaitTimeout {
        result.with_selector(selector)
    } else {
        result
    }))
}

pub async fn wait_for_timeout(envelope: &CommandEnvelope) -> Result<CommandResult, DispatchError> {
    let ms = timeout_ms(envelope, 0);
    sleep(Duration::from_millis(ms)).await;
    Ok(CommandResult::Action(ActionResult::ok(format!(
        "waited {ms} ms"
    ))))
}

pub async fn wait_for_network_idle(
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let timeout = Duration::from_millis(timeout_ms(envelope, DEFAULT_WAIT_TIMEOUT_MS));
    let deadline = Instant::now() + timeout;
    let mut quiet_since: Option<Instant> = None;

    loop {
        let snap = cx.page().nav_snapshot().await;
        if snap.pending_requests == 0 {
            let since = quiet_since.get_or_insert_with(Instant::now);
            if since.elapsed() >= NETWORK_IDLE_THRESHOLD {
                return Ok(CommandResult::Action(ActionResult::ok("network idle")));
            }
        } else {
            quiet_since = None;
        }
        if Instant::now() >= deadline {
            return Ok(CommandResult::Action(ActionResult::failure(
                StatusCode::NetworkTimeout,
                format!(
                    "{} requests still pending after {} ms",
                    snap.pending_requests,
                    timeout.as_millis()
                ),
            )));
        }
        sleep(POLL_INTERVAL).await;
    }
}

pub async fn wait_for_function(
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let expression = require_str(envelope, "expression")?.to_string();
    let timeout = Duration::from_millis(timeout_ms(envelope, DEFAULT_WAIT_TIMEOUT_MS));
    let page = cx.page().clone();

    let result = poll_until(
        timeout,
        StatusCode::WaitTimeout,
        format!("expression stayed falsy for {} ms", timeout.as_millis()),
        || {
            let page = page.clone();
            let expression = expression.clone();
            async move {
                match page.evaluate(&expression).await {
                    Ok(value) if is_truthy(&value) => {
                        Some(ActionResult::ok("expression became truthy"))
                    }
                    Ok(_) => None,
                    Err(err) => Some(ActionResult::failure(
                        StatusCode::InternalError,
                        err.to_string(),
                    )),
                }
            }
        },
    )
    .await;
    Ok(CommandResult::Action(result))
}

pub async fn wait_for_url(
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let pattern = require_str(envelope, "pattern")?.to_string();
    let timeout = Duration::from_millis(timeout_ms(envelope, DEFAULT_WAIT_TIMEOUT_MS));
    let page = cx.page().clone();

    let result = poll_until(
        timeout,
        StatusCode::WaitTimeout,
        format!("url did not match {pattern} within {} ms", timeout.as_millis()),
        || {
            let page = page.clone();
            let pattern = pattern.clone();
            async move {
                let url = page.nav_snapshot().await.url;
                if url_matches(&url, &pattern) {
                    Some(ActionResult::ok("url matched").with_url(url))
                } else {
                    None
                }
            }
        },
    )
    .await;
    Ok(CommandResult::Action(result))
}

pub async fn wait_for_dom_stable(
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let timeout = Duration::from_millis(timeout_ms(envelope, DEFAULT_WAIT_TIMEOUT_MS));
    let deadline = Instant::now() + timeout;
    let mut last_count = cx.page().nav_snapshot().await.dom_mutation_count;
    let mut stable_since = Instant::now();

    loop {
        let count = cx.page().nav_snapshot().await.dom_mutation_count;
        if count != last_count {
            last_count = count;
            stable_since = Instant::now();
        } else if stable_since.elapsed() >= DOM_STABLE_THRESHOLD {
            return Ok(CommandResult::Action(ActionResult::ok("dom stable")));
        }
        if Instant::now() >= deadline {
            return Ok(CommandResult::Action(ActionResult::failure(
                StatusCode::WaitTimeout,
                format!("dom kept mutating for {} ms", timeout.as_millis()),
            )));
        }
        sleep(POLL_INTERVAL).await;
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Substring match, with `*` wildcards at either end.
fn url_matches(url: &str, pattern: &str) -> bool {
    if let Some(rest) = pattern.strip_prefix('*') {
        if let Some(middle) = rest.strip_suffix('*') {
            return url.contains(middle);
        }
        return url.ends_with(rest);
    }
    if let Some(prefix) = pattern.strip_suffix('*') {
        return url.starts_with(prefix);
    }
    url.contains(pattern)
}
