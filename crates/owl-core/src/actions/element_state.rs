//! Element state queries.

use std::sync::Arc;

use owl_wire::{CommandEnvelope, CommandResult};
use serde_json::{Value, json};

use crate::context::ContextHandle;
use crate::engine::ElementSnapshot;
use crate::error::DispatchError;

use super::require_str;

/// First match for a selector, with the selector error surfaced as a
/// parameter problem.
async fn first_match(
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<Option<ElementSnapshot>, DispatchError> {
    let selector = require_str(envelope, "selector")?;
    cx.page()
        .query(selector)
        .await
        .map(|matches| matches.into_iter().next())
        .map_err(|e| DispatchError::InvalidParam {
            method: envelope.method.clone(),
            param: "selector".to_string(),
            reason: e.to_string(),
        })
}

pub async fn exists(
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    Ok(CommandResult::Bool(first_match(cx, envelope).await?.is_some()))
}

pub async fn is_visible(
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    Ok(CommandResult::Bool(
        first_match(cx, envelope).await?.is_some_and(|s| s.visible),
    ))
}

pub async fn is_enabled(
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    Ok(CommandResult::Bool(
        first_match(cx, envelope).await?.is_some_and(|s| s.enabled),
    ))
}

pub async fn is_checked(
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    Ok(CommandResult::Bool(
        first_match(cx, envelope)
            .await?
            .and_then(|s| s.checked)
            .unwrap_or(false),
    ))
}

pub async fn attribute(
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let name = require_str(envelope, "name")?.to_string();
    let value = first_match(cx, envelope)
        .await?
        .and_then(|s| s.attributes.get(&name).cloned());
    Ok(CommandResult::Json(match value {
        Some(v) => Value::String(v),
        None => Value::Null,
    }))
}

pub async fn bounding_box(
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let rect = first_match(cx, envelope).await?.map(|s| s.rect);
    Ok(CommandResult::Json(match rect {
        Some(rect) => json!({
            "x": rect.x, "y": rect.y, "width": rect.width, "height": rect.height,
        }),
        None => Value::Null,
    }))
}

pub async fn count(
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let selector = require_str(envelope, "selector")?;
    let count = cx
        .page()
        .query(selector)
        .await
        .map(|matches| matches.len())
        .map_err(|e| DispatchError::InvalidParam {
            method: envelope.method.clone(),
            param: "selector".to_string(),
            reason: e.to_string(),
        })?;
    Ok(CommandResult::Json(json!(count)))
}

pub async fn text(
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    Ok(CommandResult::Text(
        first_match(cx, envelope)
            .await?
            .map(|s| s.text)
            .unwrap_or_default(),
    ))
}

pub async fn input_value(
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    Ok(CommandResult::Text(
        first_match(cx, envelope)
            .await?
            .and_then(|s| s.value)
            .unwrap_or_default(),
    ))
}
