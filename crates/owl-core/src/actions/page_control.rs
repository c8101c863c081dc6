//! Page control: viewport, evaluation, zoom, console access.

use std::sync::Arc;

use owl_wire::{ActionResult, CommandEnvelope, CommandResult, StatusCode};
use serde_json::json;

use crate::context::ContextHandle;
use crate::error::DispatchError;
use crate::runtime::Runtime;

use super::{require_str, require_u32, sync_console};

pub async fn set_viewport(
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let width = require_u32(envelope, "width")?;
    let height = require_u32(envelope, "height")?;
    if width == 0 || height == 0 {
        return Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::InvalidParameter,
            "viewport dimensions must be positive",
        )));
    }
    match cx.page().set_viewport(width, height).await {
        Ok(()) => Ok(CommandResult::Action(ActionResult::ok(format!(
            "viewport {width}x{height}"
        )))),
        Err(err) => Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::InternalError,
            err.to_string(),
        ))),
    }
}

pub async fn evaluate(
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let expression = require_str(envelope, "expression")?;
    cx.page()
        .evaluate(expression)
        .await
        .map(CommandResult::Json)
        .map_err(|e| DispatchError::Internal(e.to_string()))
}

pub async fn zoom_step(
    cx: &Arc<ContextHandle>,
    delta: f64,
) -> Result<CommandResult, DispatchError> {
    let current = cx.page().zoom().await;
    let next = (current + delta).clamp(0.25, 5.0);
    match cx.page().set_zoom(next).await {
        Ok(()) => Ok(CommandResult::Action(ActionResult::ok(format!(
            "zoom {next:.2}"
        )))),
        Err(err) => Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::InternalError,
            err.to_string(),
        ))),
    }
}

pub async fn zoom_reset(cx: &Arc<ContextHandle>) -> Result<CommandResult, DispatchError> {
    match cx.page().set_zoom(1.0).await {
        Ok(()) => Ok(CommandResult::Action(ActionResult::ok("zoom reset"))),
        Err(err) => Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::InternalError,
            err.to_string(),
        ))),
    }
}

pub async fn get_zoom(cx: &Arc<ContextHandle>) -> Result<CommandResult, DispatchError> {
    Ok(CommandResult::Json(json!(cx.page().zoom().await)))
}

pub async fn console_logs(
    rt: &Runtime,
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    sync_console(rt, cx).await;
    let mut entries = rt.stores().console.read(cx.id());
    if let Some(level) = envelope.param_str("level") {
        entries.retain(|e| e.level == level);
    }
    serde_json::to_value(entries)
        .map(CommandResult::Json)
        .map_err(|e| DispatchError::Internal(e.to_string()))
}

pub async fn clear_console_logs(
    rt: &Runtime,
    cx: &Arc<ContextHandle>,
) -> Result<CommandResult, DispatchError> {
    // Drain the engine buffer too so stale lines do not reappear.
    let _ = cx.page().drain_console().await;
    rt.stores().console.clear(cx.id());
    Ok(CommandResult::Bool(true))
}
