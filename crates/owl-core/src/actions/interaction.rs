//! Interaction operations: click, type, pick, keys, drag, upload.

use std::sync::Arc;

use owl_wire::{ActionResult, CommandEnvelope, CommandResult, StatusCode};
use serde_json::Value;

use crate::context::ContextHandle;
use crate::engine::MouseButton;
use crate::error::DispatchError;
use crate::runtime::Runtime;
use crate::verify::{PageObservation, ResolvedTarget, VerificationLevel};

use super::{ClickKind, require_f64, require_str, verification_level};

/// Shared pre-check, returning early with the rejection result.
async fn checked_target(
    rt: &Runtime,
    cx: &Arc<ContextHandle>,
    selector: &str,
    level: VerificationLevel,
) -> Result<ResolvedTarget, Box<ActionResult>> {
    rt.verifier()
        .pre_check(cx.page().as_ref(), rt.finder().as_ref(), selector, level)
        .await
        .map_err(Box::new)
}

fn with_selector(mut result: ActionResult, selector: &str) -> ActionResult {
    if result.selector.is_none() {
        result.selector = Some(selector.to_string());
    }
    result
}

pub async fn click(
    rt: &Runtime,
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
    kind: ClickKind,
) -> Result<CommandResult, DispatchError> {
    let selector = require_str(envelope, "selector")?;
    let level = verification_level(envelope);

    let target = match checked_target(rt, cx, selector, level).await {
        Ok(target) => target,
        Err(rejection) => return Ok(CommandResult::Action(*rejection)),
    };

    let before = PageObservation::capture(cx.page().as_ref()).await;
    let (x, y) = target.hit_point();
    let (button, clicks) = match kind {
        ClickKind::Single => (MouseButton::Left, 1),
        ClickKind::Double => (MouseButton::Left, 2),
        ClickKind::Right => (MouseButton::Right, 1),
    };
    if let Err(err) = cx.page().click_at(x, y, button, clicks).await {
        return Ok(CommandResult::Action(with_selector(
            ActionResult::failure(StatusCode::ClickFailed, err.to_string()),
            selector,
        )));
    }

    let result = if level.checks_postconditions() {
        rt.verifier().post_click(cx.page().as_ref(), &before).await
    } else {
        ActionResult::ok("click dispatched")
    };
    if level == VerificationLevel::Strict {
        rt.verifier().wait_for_stabilization(cx.page().as_ref()).await;
    }
    Ok(CommandResult::Action(with_selector(result, selector)))
}

pub async fn type_text(
    rt: &Runtime,
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let selector = require_str(envelope, "selector")?;
    let text = require_str(envelope, "text")?;
    let level = verification_level(envelope);

    let target = match checked_target(rt, cx, selector, level).await {
        Ok(target) => target,
        Err(rejection) => return Ok(CommandResult::Action(*rejection)),
    };

    match &target {
        ResolvedTarget::Element(snapshot) => {
            if let Err(err) = cx.page().focus(&snapshot.selector).await {
                return Ok(CommandResult::Action(with_selector(
                    ActionResult::failure(StatusCode::TypeFailed, err.to_string()),
                    selector,
                )));
            }
        }
        ResolvedTarget::Point { x, y } => {
            // Coordinate targets get a click to place the caret.
            let _ = cx.page().click_at(*x, *y, MouseButton::Left, 1).await;
        }
    }

    if let Err(err) = cx.page().insert_text(text).await {
        return Ok(CommandResult::Action(with_selector(
            ActionResult::failure(StatusCode::TypeFailed, err.to_string()),
            selector,
        )));
    }

    let result = match (level.checks_postconditions(), target.css()) {
        (true, Some(css)) => rt.verifier().post_type(cx.page().as_ref(), css, text).await,
        _ => ActionResult::ok(format!("typed {} characters", text.chars().count())),
    };
    Ok(CommandResult::Action(with_selector(result, selector)))
}

pub async fn pick(
    rt: &Runtime,
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let selector = require_str(envelope, "selector")?;
    let value = require_str(envelope, "value")?;
    let level = verification_level(envelope);

    let target = match checked_target(rt, cx, selector, level).await {
        Ok(target) => target,
        Err(rejection) => return Ok(CommandResult::Action(*rejection)),
    };
    let Some(css) = target.css().map(String::from) else {
        return Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::PickFailed,
            "pick requires an element selector",
        )));
    };

    if let Err(err) = cx.page().select_option(&css, value).await {
        return Ok(CommandResult::Action(with_selector(
            ActionResult::failure(StatusCode::PickFailed, err.to_string()),
            selector,
        )));
    }

    let result = if level.checks_postconditions() {
        rt.verifier().post_pick(cx.page().as_ref(), &css, value).await
    } else {
        ActionResult::ok(format!("picked {value}"))
    };
    Ok(CommandResult::Action(with_selector(result, selector)))
}

pub async fn press_key(
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let key = require_str(envelope, "key")?;
    let modifiers = string_array(envelope, "modifiers");
    match cx.page().press_key(key, &modifiers).await {
        Ok(()) => Ok(CommandResult::Action(ActionResult::ok(format!("pressed {key}")))),
        Err(err) => Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::InternalError,
            err.to_string(),
        ))),
    }
}

pub async fn keyboard_combo(
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let combo = require_str(envelope, "combo")?;
    let mut parts: Vec<&str> = combo.split('+').map(str::trim).collect();
    let Some(key) = parts.pop().filter(|k| !k.is_empty()) else {
        return Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::InvalidParameter,
            format!("combo does not parse: {combo}"),
        )));
    };
    let modifiers: Vec<String> = parts.iter().map(|s| (*s).to_string()).collect();
    match cx.page().press_key(key, &modifiers).await {
        Ok(()) => Ok(CommandResult::Action(ActionResult::ok(format!("pressed {combo}")))),
        Err(err) => Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::InternalError,
            err.to_string(),
        ))),
    }
}

pub async fn submit_form(
    rt: &Runtime,
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let selector = require_str(envelope, "selector")?;
    let level = verification_level(envelope);

    let target = match checked_target(rt, cx, selector, level).await {
        Ok(target) => target,
        Err(rejection) => return Ok(CommandResult::Action(*rejection)),
    };
    let before = PageObservation::capture(cx.page().as_ref()).await;
    if let Some(css) = target.css() {
        let _ = cx.page().focus(css).await;
    }
    if let Err(err) = cx.page().press_key("Enter", &[]).await {
        return Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::InternalError,
            err.to_string(),
        )));
    }
    let result = if level.checks_postconditions() {
        rt.verifier().post_click(cx.page().as_ref(), &before).await
    } else {
        ActionResult::ok("form submitted")
    };
    Ok(CommandResult::Action(with_selector(result, selector)))
}

pub async fn hover(
    rt: &Runtime,
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let selector = require_str(envelope, "selector")?;
    let level = verification_level(envelope);
    let target = match checked_target(rt, cx, selector, level).await {
        Ok(target) => target,
        Err(rejection) => return Ok(CommandResult::Action(*rejection)),
    };
    let (x, y) = target.hit_point();
    match cx.page().move_mouse(x, y).await {
        Ok(()) => Ok(CommandResult::Action(with_selector(
            ActionResult::ok("hovering"),
            selector,
        ))),
        Err(err) => Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::InternalError,
            err.to_string(),
        ))),
    }
}

pub async fn clear_input(
    rt: &Runtime,
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let selector = require_str(envelope, "selector")?;
    let level = verification_level(envelope);
    let target = match checked_target(rt, cx, selector, level).await {
        Ok(target) => target,
        Err(rejection) => return Ok(CommandResult::Action(*rejection)),
    };
    let Some(css) = target.css().map(String::from) else {
        return Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::ClearFailed,
            "clear requires an element selector",
        )));
    };

    let current_len = match &target {
        ResolvedTarget::Element(snapshot) => snapshot
            .value
            .as_ref()
            .map_or(0, |v| v.chars().count()),
        ResolvedTarget::Point { .. } => 0,
    };
    if let Err(err) = cx.page().focus(&css).await {
        return Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::ClearFailed,
            err.to_string(),
        )));
    }
    for _ in 0..current_len {
        let _ = cx.page().press_key("Backspace", &[]).await;
    }

    let result = if level.checks_postconditions() {
        rt.verifier().post_clear(cx.page().as_ref(), &css).await
    } else {
        ActionResult::ok("input cleared")
    };
    Ok(CommandResult::Action(with_selector(result, selector)))
}

pub async fn focus(
    rt: &Runtime,
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let selector = require_str(envelope, "selector")?;
    let level = verification_level(envelope);
    let target = match checked_target(rt, cx, selector, level).await {
        Ok(target) => target,
        Err(rejection) => return Ok(CommandResult::Action(*rejection)),
    };
    let Some(css) = target.css().map(String::from) else {
        return Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::FocusFailed,
            "focus requires an element selector",
        )));
    };
    if let Err(err) = cx.page().focus(&css).await {
        return Ok(CommandResult::Action(with_selector(
            ActionResult::failure(StatusCode::FocusFailed, err.to_string()),
            selector,
        )));
    }
    let result = if level.checks_postconditions() {
        rt.verifier().post_focus(cx.page().as_ref(), &css).await
    } else {
        ActionResult::ok("focused")
    };
    Ok(CommandResult::Action(with_selector(result, selector)))
}

pub async fn blur(
    rt: &Runtime,
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let selector = require_str(envelope, "selector")?;
    let level = verification_level(envelope);
    let target = match checked_target(rt, cx, selector, level).await {
        Ok(target) => target,
        Err(rejection) => return Ok(CommandResult::Action(*rejection)),
    };
    if let Err(err) = cx.page().blur().await {
        return Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::BlurFailed,
            err.to_string(),
        )));
    }
    let result = match (level.checks_postconditions(), target.css()) {
        (true, Some(css)) => rt.verifier().post_blur(cx.page().as_ref(), css).await,
        _ => ActionResult::ok("blurred"),
    };
    Ok(CommandResult::Action(with_selector(result, selector)))
}

pub async fn select_all(
    rt: &Runtime,
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let selector = require_str(envelope, "selector")?;
    let level = verification_level(envelope);
    let target = match checked_target(rt, cx, selector, level).await {
        Ok(target) => target,
        Err(rejection) => return Ok(CommandResult::Action(*rejection)),
    };
    if let Some(css) = target.css() {
        if let Err(err) = cx.page().focus(css).await {
            return Ok(CommandResult::Action(ActionResult::failure(
                StatusCode::InternalError,
                err.to_string(),
            )));
        }
    }
    let _ = cx.page().press_key("a", &["Control".to_string()]).await;
    Ok(CommandResult::Action(with_selector(
        ActionResult::ok("selection extended to all content"),
        selector,
    )))
}

pub async fn drag_drop(
    rt: &Runtime,
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let source = require_str(envelope, "source")?;
    let target_sel = require_str(envelope, "target")?;
    let level = verification_level(envelope);

    let source_target = match checked_target(rt, cx, source, level).await {
        Ok(target) => target,
        Err(rejection) => return Ok(CommandResult::Action(*rejection)),
    };
    let drop_target = match checked_target(rt, cx, target_sel, level).await {
        Ok(target) => target,
        Err(rejection) => return Ok(CommandResult::Action(*rejection)),
    };

    let (sx, sy) = source_target.hit_point();
    let (tx, ty) = drop_target.hit_point();
    let _ = cx.page().move_mouse(sx, sy).await;
    let _ = cx.page().move_mouse(tx, ty).await;
    if let Err(err) = cx.page().click_at(tx, ty, MouseButton::Left, 1).await {
        return Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::InternalError,
            err.to_string(),
        )));
    }
    Ok(CommandResult::Action(
        ActionResult::ok("drag dispatched").with_selector(source),
    ))
}

pub async fn html5_drag_drop(
    rt: &Runtime,
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let source = require_str(envelope, "source")?;
    let target_sel = require_str(envelope, "target")?;

    let source_target = match checked_target(rt, cx, source, VerificationLevel::Basic).await {
        Ok(target) => target,
        Err(rejection) => return Ok(CommandResult::Action(*rejection)),
    };
    let drop_target = match checked_target(rt, cx, target_sel, VerificationLevel::Basic).await {
        Ok(target) => target,
        Err(rejection) => return Ok(CommandResult::Action(*rejection)),
    };
    let (Some(src_css), Some(dst_css)) = (source_target.css(), drop_target.css()) else {
        return Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::InvalidParameter,
            "html5 drag needs element selectors on both ends",
        )));
    };

    let script = format!(
        "(() => {{ \
           const src = document.querySelector('{src_css}'); \
           const dst = document.querySelector('{dst_css}'); \
           if (!src || !dst) return false; \
           const dt = new DataTransfer(); \
           for (const type of ['dragstart', 'dragover', 'drop', 'dragend']) {{ \
             const target = type === 'dragstart' || type === 'dragend' ? src : dst; \
             target.dispatchEvent(new DragEvent(type, {{ bubbles: true, dataTransfer: dt }})); \
           }} \
           return true; \
         }})()"
    );
    match cx.page().evaluate(&script).await {
        Ok(Value::Bool(true)) => Ok(CommandResult::Action(
            ActionResult::ok("html5 drag sequence dispatched").with_selector(source),
        )),
        Ok(_) => Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::ElementStale,
            "element vanished during drag",
        ))),
        Err(err) => Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::InternalError,
            err.to_string(),
        ))),
    }
}

pub async fn mouse_move(
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let x = require_f64(envelope, "x")?;
    let y = require_f64(envelope, "y")?;
    match cx.page().move_mouse(x, y).await {
        Ok(()) => Ok(CommandResult::Action(ActionResult::ok(format!(
            "cursor at {x:.0},{y:.0}"
        )))),
        Err(err) => Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::InternalError,
            err.to_string(),
        ))),
    }
}

pub async fn upload_file(
    rt: &Runtime,
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let selector = require_str(envelope, "selector")?;
    let files = string_array(envelope, "files");
    if files.is_empty() {
        return Err(DispatchError::InvalidParam {
            method: envelope.method.clone(),
            param: "files".to_string(),
            reason: "expected a non-empty array of paths".to_string(),
        });
    }
    let level = verification_level(envelope);
    let target = match checked_target(rt, cx, selector, level).await {
        Ok(target) => target,
        Err(rejection) => return Ok(CommandResult::Action(*rejection)),
    };
    let Some(css) = target.css().map(String::from) else {
        return Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::UploadFailed,
            "upload requires a file input selector",
        )));
    };

    if let Err(err) = cx.page().set_files(&css, &files).await {
        return Ok(CommandResult::Action(with_selector(
            ActionResult::failure(StatusCode::UploadFailed, err.to_string()),
            selector,
        )));
    }
    let attached = cx
        .page()
        .query(&css)
        .await
        .ok()
        .and_then(|m| m.into_iter().next())
        .and_then(|snapshot| snapshot.value)
        .is_some_and(|value| !value.is_empty());
    let result = if attached {
        ActionResult::ok(format!("{} file(s) attached", files.len()))
            .with_element_count(files.len())
    } else {
        ActionResult::failure(StatusCode::UploadFailed, "file input did not take the files")
    };
    Ok(CommandResult::Action(with_selector(result, selector)))
}

fn string_array(envelope: &CommandEnvelope, key: &str) -> Vec<String> {
    envelope
        .param_value(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}
