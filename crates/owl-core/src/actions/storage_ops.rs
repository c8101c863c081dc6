//! Cookies, proxy, profiles, clipboard, and license.

use std::sync::Arc;

use chrono::Utc;
use owl_wire::{ActionResult, CommandEnvelope, CommandResult, StatusCode};
use serde_json::json;

use crate::context::{ContextHandle, Cookie, ProxyConfig, SameSite};
use crate::error::DispatchError;
use crate::profile::Profile;
use crate::runtime::Runtime;
use crate::vm::VmFilter;

use super::require_str;

pub fn get_cookies(cx: &Arc<ContextHandle>) -> Result<CommandResult, DispatchError> {
    serde_json::to_value(&*cx.cookies().lock())
        .map(CommandResult::Json)
        .map_err(|e| DispatchError::Internal(e.to_string()))
}

pub fn set_cookie(
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let name = require_str(envelope, "name")?;
    let value = require_str(envelope, "value")?;
    let mut cookie = Cookie::new(name, value);
    if let Some(domain) = envelope.param_str("domain") {
        cookie = cookie.domain(domain);
    }
    if let Some(path) = envelope.param_str("path") {
        cookie = cookie.path(path);
    }
    cookie.expires = envelope.param_f64("expires");
    if let Some(http_only) = envelope.param_bool("http_only") {
        cookie = cookie.http_only(http_only);
    }
    if let Some(secure) = envelope.param_bool("secure") {
        cookie = cookie.secure(secure);
    }
    if let Some(same_site) = envelope.param_str("same_site") {
        cookie.same_site = match same_site {
            "Strict" => Some(SameSite::Strict),
            "Lax" => Some(SameSite::Lax),
            "None" => Some(SameSite::None),
            other => {
                return Ok(CommandResult::Action(ActionResult::failure(
                    StatusCode::InvalidParameter,
                    format!("unknown same_site value: {other}"),
                )));
            }
        };
    }

    let mut jar = cx.cookies().lock();
    // Same name + domain + path replaces.
    jar.retain(|c| {
        !(c.name == cookie.name && c.domain == cookie.domain && c.path == cookie.path)
    });
    jar.push(cookie);
    Ok(CommandResult::Action(ActionResult::ok(format!(
        "cookie {name} set"
    ))))
}

pub fn delete_cookie(
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let name = require_str(envelope, "name")?;
    let mut jar = cx.cookies().lock();
    let before = jar.len();
    jar.retain(|c| c.name != name);
    Ok(CommandResult::Bool(jar.len() != before))
}

pub fn clear_cookies(cx: &Arc<ContextHandle>) -> Result<CommandResult, DispatchError> {
    cx.cookies().lock().clear();
    Ok(CommandResult::Bool(true))
}

pub fn set_proxy(
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let server = require_str(envelope, "server")?;
    *cx.proxy().lock() = Some(ProxyConfig {
        server: server.to_string(),
        username: envelope.param_str("username").map(ToString::to_string),
        password: envelope.param_str("password").map(ToString::to_string),
    });
    Ok(CommandResult::Action(ActionResult::ok(format!(
        "proxy set to {server}"
    ))))
}

pub fn get_proxy(cx: &Arc<ContextHandle>) -> Result<CommandResult, DispatchError> {
    let proxy = cx.proxy().lock().clone();
    serde_json::to_value(proxy)
        .map(CommandResult::Json)
        .map_err(|e| DispatchError::Internal(e.to_string()))
}

pub fn clear_proxy(cx: &Arc<ContextHandle>) -> Result<CommandResult, DispatchError> {
    *cx.proxy().lock() = None;
    Ok(CommandResult::Bool(true))
}

pub async fn save_profile(
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let path = require_str(envelope, "path")?;
    let fingerprint = cx.fingerprint();
    let profile = Profile {
        seeds: fingerprint.seeds,
        hashes: fingerprint.hashes.clone(),
        resolved_vm: fingerprint.vm.clone(),
        cookies: cx.cookies().lock().clone(),
        local_storage: cx.local_storage().lock().clone(),
        saved_at: Utc::now(),
    };
    match profile.save(path).await {
        Ok(()) => Ok(CommandResult::Action(ActionResult::ok(format!(
            "profile saved to {path}"
        )))),
        Err(err) => Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::InternalError,
            err.to_string(),
        ))),
    }
}

pub async fn load_profile(
    rt: &Runtime,
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let path = require_str(envelope, "path")?;
    let profile = match Profile::load(path).await {
        Ok(profile) => profile,
        Err(err) => {
            return Ok(CommandResult::Action(ActionResult::failure(
                StatusCode::InternalError,
                err.to_string(),
            )));
        }
    };
    // Seeds take effect in the VM cache for future resolutions; cookies
    // and storage apply to the live context immediately.
    if let Err(err) = rt
        .vm()
        .set_seeds(cx.id(), profile.seeds, &VmFilter::default())
    {
        return Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::InternalError,
            err.to_string(),
        )));
    }
    *cx.cookies().lock() = profile.cookies;
    *cx.local_storage().lock() = profile.local_storage;
    Ok(CommandResult::Action(ActionResult::ok(format!(
        "profile loaded from {path}"
    ))))
}

pub async fn clipboard_read(cx: &Arc<ContextHandle>) -> Result<CommandResult, DispatchError> {
    Ok(CommandResult::Text(cx.page().clipboard().await))
}

pub async fn clipboard_write(
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let text = require_str(envelope, "text")?;
    match cx.page().set_clipboard(text).await {
        Ok(()) => Ok(CommandResult::Action(ActionResult::ok(format!(
            "{} characters on clipboard",
            text.chars().count()
        )))),
        Err(err) => Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::InternalError,
            err.to_string(),
        ))),
    }
}

pub fn license_status() -> Result<CommandResult, DispatchError> {
    Ok(CommandResult::Json(json!({
        "valid": true,
        "edition": "community",
    })))
}
