//! Frames, network rules, downloads, dialogs, and tabs.

use std::sync::Arc;
use std::time::Duration;

use owl_wire::{ActionResult, CommandEnvelope, CommandResult, StatusCode};
use serde_json::{Value, json};
use tokio::time::{Instant, sleep};

use crate::context::ContextHandle;
use crate::error::DispatchError;
use crate::runtime::Runtime;
use crate::stores::{DialogPolicy, DownloadState, RuleAction};

use super::{require_str, timeout_ms};

// --- Frames ---

pub async fn list_frames(cx: &Arc<ContextHandle>) -> Result<CommandResult, DispatchError> {
    serde_json::to_value(cx.page().frame_tree().await)
        .map(CommandResult::Json)
        .map_err(|e| DispatchError::Internal(e.to_string()))
}

pub async fn switch_to_frame(
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let frame_id = require_str(envelope, "frame_id")?;
    match cx.page().switch_frame(frame_id).await {
        Ok(()) => Ok(CommandResult::Action(ActionResult::ok(format!(
            "in frame {frame_id}"
        )))),
        Err(err) => Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::FrameSwitchFailed,
            err.to_string(),
        ))),
    }
}

pub async fn switch_to_parent_frame(
    cx: &Arc<ContextHandle>,
) -> Result<CommandResult, DispatchError> {
    match cx.page().switch_to_parent_frame().await {
        Ok(()) => Ok(CommandResult::Action(ActionResult::ok("in parent frame"))),
        Err(err) => Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::FrameSwitchFailed,
            err.to_string(),
        ))),
    }
}

pub async fn switch_to_main_frame(
    cx: &Arc<ContextHandle>,
) -> Result<CommandResult, DispatchError> {
    match cx.page().switch_to_main_frame().await {
        Ok(()) => Ok(CommandResult::Action(ActionResult::ok("in main frame"))),
        Err(err) => Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::FrameSwitchFailed,
            err.to_string(),
        ))),
    }
}

// --- Network rules ---

pub fn add_rule(
    rt: &Runtime,
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let pattern = require_str(envelope, "pattern")?;
    let action = match require_str(envelope, "action")? {
        "block" => RuleAction::Block,
        "allow" => RuleAction::Allow,
        other => {
            return Err(DispatchError::InvalidParam {
                method: envelope.method.clone(),
                param: "action".to_string(),
                reason: format!("expected block or allow, got {other}"),
            });
        }
    };
    let resource_types = envelope
        .param_value("resource_types")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default();
    let rule_id = rt
        .stores()
        .network_rules
        .add(cx.id(), pattern, action, resource_types);
    Ok(CommandResult::Json(json!({ "rule_id": rule_id })))
}

pub fn remove_rule(
    rt: &Runtime,
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let rule_id = require_str(envelope, "rule_id")?;
    Ok(CommandResult::Bool(
        rt.stores().network_rules.remove(cx.id(), rule_id),
    ))
}

pub fn list_rules(rt: &Runtime, cx: &Arc<ContextHandle>) -> Result<CommandResult, DispatchError> {
    serde_json::to_value(rt.stores().network_rules.list(cx.id()))
        .map(CommandResult::Json)
        .map_err(|e| DispatchError::Internal(e.to_string()))
}

pub fn clear_rules(rt: &Runtime, cx: &Arc<ContextHandle>) -> Result<CommandResult, DispatchError> {
    rt.stores().network_rules.clear(cx.id());
    Ok(CommandResult::Bool(true))
}

/// Resource types blanket-blocked by `setResourceBlocking`.
const HEAVY_RESOURCES: &[&str] = &["image", "media", "font"];

pub fn set_resource_blocking(
    rt: &Runtime,
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let enabled = envelope
        .param_bool("enabled")
        .ok_or_else(|| DispatchError::InvalidParam {
            method: envelope.method.clone(),
            param: "enabled".to_string(),
            reason: "expected a boolean".to_string(),
        })?;
    let rules = &rt.stores().network_rules;
    // Reset any previous blanket rule before possibly re-adding it.
    for rule in rules.list(cx.id()) {
        if rule.pattern == "*"
            && rule.action == RuleAction::Block
            && rule.resource_types.iter().any(|t| HEAVY_RESOURCES.contains(&t.as_str()))
        {
            rules.remove(cx.id(), &rule.id);
        }
    }
    if enabled {
        rules.add(
            cx.id(),
            "*",
            RuleAction::Block,
            HEAVY_RESOURCES.iter().map(|s| (*s).to_string()).collect(),
        );
    }
    Ok(CommandResult::Bool(true))
}

// --- Downloads ---

pub fn list_downloads(
    rt: &Runtime,
    cx: &Arc<ContextHandle>,
) -> Result<CommandResult, DispatchError> {
    serde_json::to_value(rt.stores().downloads.list(cx.id()))
        .map(CommandResult::Json)
        .map_err(|e| DispatchError::Internal(e.to_string()))
}

pub async fn wait_for_download(
    rt: &Runtime,
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let timeout = Duration::from_millis(timeout_ms(envelope, 30_000));
    let deadline = Instant::now() + timeout;
    loop {
        let completed = rt
            .stores()
            .downloads
            .list(cx.id())
            .into_iter()
            .find(|d| d.state == DownloadState::Completed);
        if let Some(download) = completed {
            return Ok(CommandResult::Action(
                ActionResult::ok(format!("download complete: {}", download.path))
                    .with_url(download.url)
                    .with_error_code(download.id),
            ));
        }
        if Instant::now() >= deadline {
            return Ok(CommandResult::Action(ActionResult::failure(
                StatusCode::WaitTimeout,
                format!("no download completed within {} ms", timeout.as_millis()),
            )));
        }
        sleep(Duration::from_millis(25)).await;
    }
}

pub fn clear_downloads(
    rt: &Runtime,
    cx: &Arc<ContextHandle>,
) -> Result<CommandResult, DispatchError> {
    rt.stores().downloads.clear(cx.id());
    Ok(CommandResult::Bool(true))
}

// --- Dialogs ---

pub fn set_dialog_policy(
    rt: &Runtime,
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let policy = match require_str(envelope, "policy")? {
        "accept" => match envelope.param_str("text") {
            Some(text) => DialogPolicy::AcceptWithText(text.to_string()),
            None => DialogPolicy::Accept,
        },
        "dismiss" => DialogPolicy::Dismiss,
        other => {
            return Err(DispatchError::InvalidParam {
                method: envelope.method.clone(),
                param: "policy".to_string(),
                reason: format!("expected accept or dismiss, got {other}"),
            });
        }
    };
    rt.stores().dialogs.set_policy(cx.id(), policy);
    Ok(CommandResult::Bool(true))
}

pub fn last_dialog(rt: &Runtime, cx: &Arc<ContextHandle>) -> Result<CommandResult, DispatchError> {
    let last = rt.stores().dialogs.history(cx.id()).into_iter().next_back();
    serde_json::to_value(last)
        .map(CommandResult::Json)
        .map_err(|e| DispatchError::Internal(e.to_string()))
}

pub fn list_dialogs(rt: &Runtime, cx: &Arc<ContextHandle>) -> Result<CommandResult, DispatchError> {
    serde_json::to_value(rt.stores().dialogs.history(cx.id()))
        .map(CommandResult::Json)
        .map_err(|e| DispatchError::Internal(e.to_string()))
}

// --- Tabs ---

pub fn list_tabs(rt: &Runtime, cx: &Arc<ContextHandle>) -> Result<CommandResult, DispatchError> {
    serde_json::to_value(rt.stores().tabs.list(cx.id()))
        .map(CommandResult::Json)
        .map_err(|e| DispatchError::Internal(e.to_string()))
}

pub fn new_tab(
    rt: &Runtime,
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let url = envelope.param_str("url").unwrap_or("about:blank");
    let tab_id = rt.stores().tabs.open(cx.id(), url);
    Ok(CommandResult::Json(json!({ "tab_id": tab_id })))
}

pub fn switch_tab(
    rt: &Runtime,
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let tab_id = require_str(envelope, "tab_id")?;
    if rt.stores().tabs.switch(cx.id(), tab_id) {
        Ok(CommandResult::Action(ActionResult::ok(format!(
            "tab {tab_id} active"
        ))))
    } else {
        Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::TabSwitchFailed,
            format!("no tab with id {tab_id}"),
        )))
    }
}

pub fn close_tab(
    rt: &Runtime,
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let tab_id = require_str(envelope, "tab_id")?;
    if rt.stores().tabs.close(cx.id(), tab_id) {
        Ok(CommandResult::Action(ActionResult::ok(format!(
            "tab {tab_id} closed"
        ))))
    } else {
        Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::TabSwitchFailed,
            format!("cannot close tab {tab_id}"),
        )))
    }
}
