//! Scrolling operations.

use std::sync::Arc;

use owl_wire::{ActionResult, CommandEnvelope, CommandResult, StatusCode};
use serde_json::json;

use crate::context::ContextHandle;
use crate::error::DispatchError;
use crate::runtime::Runtime;
use crate::verify::ScrollRequest;

use super::{require_f64, require_str, verification_level};

pub async fn scroll_by(
    rt: &Runtime,
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let dx = require_f64(envelope, "dx")?;
    let dy = require_f64(envelope, "dy")?;
    let level = verification_level(envelope);

    let before = cx.page().scroll_position().await;
    if let Err(err) = cx.page().scroll_by(dx, dy).await {
        return Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::ScrollFailed,
            err.to_string(),
        )));
    }
    let result = if level.checks_postconditions() {
        rt.verifier()
            .post_scroll(cx.page().as_ref(), before, ScrollRequest::By { dx, dy })
            .await
    } else {
        ActionResult::ok("scrolled")
    };
    Ok(CommandResult::Action(result))
}

pub async fn scroll_to(
    rt: &Runtime,
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let x = require_f64(envelope, "x")?;
    let y = require_f64(envelope, "y")?;
    let level = verification_level(envelope);

    let before = cx.page().scroll_position().await;
    if let Err(err) = cx.page().scroll_to(x, y).await {
        return Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::ScrollFailed,
            err.to_string(),
        )));
    }
    let result = if level.checks_postconditions() {
        rt.verifier()
            .post_scroll(cx.page().as_ref(), before, ScrollRequest::To { x, y })
            .await
    } else {
        ActionResult::ok("scrolled")
    };
    Ok(CommandResult::Action(result))
}

pub async fn scroll_to_element(
    rt: &Runtime,
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let selector = require_str(envelope, "selector")?;
    let level = verification_level(envelope);

    let target = match rt
        .verifier()
        .pre_check(cx.page().as_ref(), rt.finder().as_ref(), selector, level)
        .await
    {
        Ok(target) => target,
        Err(rejection) => return Ok(CommandResult::Action(rejection)),
    };
    let Some(css) = target.css() else {
        return Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::ScrollFailed,
            "scrollToElement requires an element selector",
        )));
    };
    match cx.page().scroll_into_view(css).await {
        Ok(()) => Ok(CommandResult::Action(
            ActionResult::ok("element scrolled into view").with_selector(selector),
        )),
        Err(err) => Ok(CommandResult::Action(
            ActionResult::failure(StatusCode::ScrollFailed, err.to_string())
                .with_selector(selector),
        )),
    }
}

pub async fn scroll_to_top(cx: &Arc<ContextHandle>) -> Result<CommandResult, DispatchError> {
    match cx.page().scroll_to(0.0, 0.0).await {
        Ok(()) => Ok(CommandResult::Action(ActionResult::ok("at top"))),
        Err(err) => Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::ScrollFailed,
            err.to_string(),
        ))),
    }
}

pub async fn scroll_to_bottom(cx: &Arc<ContextHandle>) -> Result<CommandResult, DispatchError> {
    // Engines clamp to the document height.
    match cx.page().scroll_to(0.0, 1.0e9).await {
        Ok(()) => {
            let (_, y) = cx.page().scroll_position().await;
            Ok(CommandResult::Action(ActionResult::ok(format!(
                "at bottom (y={y:.0})"
            ))))
        }
        Err(err) => Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::ScrollFailed,
            err.to_string(),
        ))),
    }
}

pub async fn scroll_position(cx: &Arc<ContextHandle>) -> Result<CommandResult, DispatchError> {
    let (x, y) = cx.page().scroll_position().await;
    Ok(CommandResult::Json(json!({ "x": x, "y": y })))
}
