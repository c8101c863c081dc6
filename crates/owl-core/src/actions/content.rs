//! Content extraction: text, markup, structured data, screenshots.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use owl_wire::{ActionResult, CommandEnvelope, CommandResult, StatusCode};
use serde_json::json;

use crate::context::ContextHandle;
use crate::error::DispatchError;
use crate::runtime::Runtime;

use super::require_str;

/// Site templates the extractor recognizes. Patterns are data, matched as
/// URL substrings.
struct SiteTemplate {
    name: &'static str,
    patterns: &'static [&'static str],
}

static SITE_TEMPLATES: &[SiteTemplate] = &[
    SiteTemplate { name: "article", patterns: &["/blog/", "/news/", "/article", "/post/"] },
    SiteTemplate { name: "product", patterns: &["/product", "/item/", "/dp/", "/p/"] },
    SiteTemplate { name: "search", patterns: &["/search", "?q=", "&q=", "?query="] },
    SiteTemplate { name: "login", patterns: &["/login", "/signin", "/auth"] },
    SiteTemplate { name: "checkout", patterns: &["/cart", "/checkout", "/basket"] },
];

fn template_for(url: &str) -> Option<&'static str> {
    SITE_TEMPLATES
        .iter()
        .find(|t| t.patterns.iter().any(|p| url.contains(p)))
        .map(|t| t.name)
}

pub async fn extract_text(
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let text = match envelope.param_str("selector") {
        Some(selector) => cx
            .page()
            .query(selector)
            .await
            .map_err(|e| DispatchError::InvalidParam {
                method: envelope.method.clone(),
                param: "selector".to_string(),
                reason: e.to_string(),
            })?
            .into_iter()
            .map(|snapshot| snapshot.text)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        None => cx.page().page_text().await,
    };
    Ok(CommandResult::Text(text))
}

pub async fn get_html(cx: &Arc<ContextHandle>) -> Result<CommandResult, DispatchError> {
    Ok(CommandResult::Text(cx.page().page_html().await))
}

pub async fn get_markdown(cx: &Arc<ContextHandle>) -> Result<CommandResult, DispatchError> {
    let snap = cx.page().nav_snapshot().await;
    let text = cx.page().page_text().await;
    let markdown = if snap.title.is_empty() {
        text
    } else {
        format!("# {}\n\n{}", snap.title, text)
    };
    Ok(CommandResult::Text(markdown))
}

pub async fn extract_json(
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let snap = cx.page().nav_snapshot().await;
    let template = envelope
        .param_str("template")
        .or_else(|| template_for(&snap.url));
    Ok(CommandResult::Json(json!({
        "template": template,
        "url": snap.url,
        "title": snap.title,
        "text": cx.page().page_text().await,
    })))
}

pub async fn detect_site(cx: &Arc<ContextHandle>) -> Result<CommandResult, DispatchError> {
    let snap = cx.page().nav_snapshot().await;
    Ok(CommandResult::Json(json!({
        "url": snap.url,
        "template": template_for(&snap.url),
    })))
}

pub fn list_templates() -> Result<CommandResult, DispatchError> {
    let names: Vec<&str> = SITE_TEMPLATES.iter().map(|t| t.name).collect();
    Ok(CommandResult::Json(json!(names)))
}

pub async fn page_info(cx: &Arc<ContextHandle>) -> Result<CommandResult, DispatchError> {
    let info = cx.nav().lock().info();
    let (width, height) = cx.page().viewport().await;
    let (sx, sy) = cx.page().scroll_position().await;
    Ok(CommandResult::Json(json!({
        "url": info.current_url,
        "title": info.title,
        "state": info.state,
        "http_status": info.http_status,
        "viewport": { "width": width, "height": height },
        "zoom": cx.page().zoom().await,
        "scroll": { "x": sx, "y": sy },
    })))
}

pub async fn screenshot(
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let mode = envelope.param_str("mode").unwrap_or("viewport");
    if !matches!(mode, "viewport" | "element" | "fullpage") {
        return Err(DispatchError::InvalidParam {
            method: envelope.method.clone(),
            param: "mode".to_string(),
            reason: format!("unknown mode {mode} (viewport|element|fullpage)"),
        });
    }
    if mode == "element" {
        let selector = require_str(envelope, "selector")?;
        let found = cx
            .page()
            .query(selector)
            .await
            .map(|matches| !matches.is_empty())
            .unwrap_or(false);
        if !found {
            return Err(DispatchError::InvalidParam {
                method: envelope.method.clone(),
                param: "selector".to_string(),
                reason: format!("no element matches {selector}"),
            });
        }
    }

    // While frozen, every read returns the cached frame byte-for-byte.
    let frame = match cx.frame_cache().is_frozen() {
        true => cx
            .frame_cache()
            .read()
            .ok_or_else(|| DispatchError::Internal("frozen cache is empty".to_string()))?,
        false => {
            let frame = cx
                .page()
                .capture_frame()
                .await
                .map_err(|e| DispatchError::Internal(e.to_string()))?;
            cx.frame_cache().store(frame.clone());
            frame
        }
    };
    Ok(CommandResult::Text(BASE64.encode(frame)))
}

pub async fn freeze_frame(cx: &Arc<ContextHandle>) -> Result<CommandResult, DispatchError> {
    let frame = cx
        .page()
        .capture_frame()
        .await
        .map_err(|e| DispatchError::Internal(e.to_string()))?;
    cx.frame_cache().freeze(frame);
    Ok(CommandResult::Bool(true))
}

pub fn unfreeze_frame(cx: &Arc<ContextHandle>) -> Result<CommandResult, DispatchError> {
    cx.frame_cache().unfreeze();
    Ok(CommandResult::Bool(true))
}

pub async fn highlight(
    rt: &Runtime,
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let selector = require_str(envelope, "selector")?;
    let target = match rt
        .verifier()
        .pre_check(
            cx.page().as_ref(),
            rt.finder().as_ref(),
            selector,
            crate::verify::VerificationLevel::Basic,
        )
        .await
    {
        Ok(target) => target,
        Err(rejection) => return Ok(CommandResult::Action(rejection)),
    };
    let Some(css) = target.css() else {
        return Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::InvalidSelector,
            "highlight requires an element selector",
        )));
    };
    let script = format!(
        "document.querySelector('{css}')?.style.setProperty('outline', '2px solid #f60', 'important')"
    );
    match cx.page().evaluate(&script).await {
        Ok(_) => Ok(CommandResult::Action(
            ActionResult::ok("highlighted").with_selector(selector),
        )),
        Err(err) => Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::InternalError,
            err.to_string(),
        ))),
    }
}

pub async fn show_grid(
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let spacing = envelope.param_i64("spacing").unwrap_or(100).max(10);
    let script = format!(
        "(() => {{ \
           let grid = document.getElementById('__owl_grid__'); \
           if (!grid) {{ \
             grid = document.createElement('div'); \
             grid.id = '__owl_grid__'; \
             grid.style.cssText = 'position:fixed;inset:0;pointer-events:none;z-index:2147483647;' + \
               'background-image:linear-gradient(#0002 1px, transparent 1px),' + \
               'linear-gradient(90deg, #0002 1px, transparent 1px);' + \
               'background-size:{spacing}px {spacing}px;'; \
             document.body.appendChild(grid); \
           }} \
           return true; \
         }})()"
    );
    match cx.page().evaluate(&script).await {
        Ok(_) => Ok(CommandResult::Action(ActionResult::ok("grid overlay shown"))),
        Err(err) => Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::InternalError,
            err.to_string(),
        ))),
    }
}

pub async fn hide_grid(cx: &Arc<ContextHandle>) -> Result<CommandResult, DispatchError> {
    let script = "document.getElementById('__owl_grid__')?.remove()";
    match cx.page().evaluate(script).await {
        Ok(_) => Ok(CommandResult::Action(ActionResult::ok("grid overlay removed"))),
        Err(err) => Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::InternalError,
            err.to_string(),
        ))),
    }
}
