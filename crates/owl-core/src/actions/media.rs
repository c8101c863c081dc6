//! Video recording, live streaming, demographics, and captcha surface.
//!
//! Encoding is a collaborator outside the core: recording and streaming
//! here are the frame-tap book-keeping the encoder drives.

use std::sync::Arc;

use chrono::Utc;
use owl_wire::{ActionResult, CommandEnvelope, CommandResult, StatusCode};
use serde_json::json;

use crate::context::{ContextHandle, RecordingState, StreamState};
use crate::detector::Detection;
use crate::error::DispatchError;
use crate::runtime::Runtime;

pub fn start_video(
    cx: &Arc<ContextHandle>,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let path = envelope
        .param_str("path")
        .map_or_else(|| format!("{}.webm", cx.id()), ToString::to_string);
    let mut video = cx.video().lock();
    if video.is_some() {
        return Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::InternalError,
            "recording already in progress",
        )));
    }
    *video = Some(RecordingState {
        path: path.clone(),
        started_at: Utc::now(),
    });
    Ok(CommandResult::Action(
        ActionResult::ok(format!("recording to {path}")),
    ))
}

pub fn stop_video(cx: &Arc<ContextHandle>) -> Result<CommandResult, DispatchError> {
    match cx.video().lock().take() {
        Some(state) => Ok(CommandResult::Action(
            ActionResult::ok(format!("recording stopped, output at {}", state.path)),
        )),
        None => Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::InternalError,
            "no recording in progress",
        ))),
    }
}

pub fn video_status(cx: &Arc<ContextHandle>) -> Result<CommandResult, DispatchError> {
    let status = match cx.video().lock().as_ref() {
        Some(state) => json!({
            "recording": true,
            "path": state.path,
            "started_at": state.started_at,
        }),
        None => json!({ "recording": false }),
    };
    Ok(CommandResult::Json(status))
}

pub fn start_stream(cx: &Arc<ContextHandle>) -> Result<CommandResult, DispatchError> {
    let mut stream = cx.stream().lock();
    if stream.is_some() {
        return Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::InternalError,
            "stream already active",
        )));
    }
    *stream = Some(StreamState {
        started_at: Utc::now(),
    });
    Ok(CommandResult::Action(ActionResult::ok("stream started")))
}

pub fn stop_stream(cx: &Arc<ContextHandle>) -> Result<CommandResult, DispatchError> {
    match cx.stream().lock().take() {
        Some(_) => Ok(CommandResult::Action(ActionResult::ok("stream stopped"))),
        None => Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::InternalError,
            "no active stream",
        ))),
    }
}

pub fn stream_status(cx: &Arc<ContextHandle>) -> Result<CommandResult, DispatchError> {
    let status = match cx.stream().lock().as_ref() {
        Some(state) => json!({ "streaming": true, "started_at": state.started_at }),
        None => json!({ "streaming": false }),
    };
    Ok(CommandResult::Json(status))
}

pub fn demographics(cx: &Arc<ContextHandle>) -> Result<CommandResult, DispatchError> {
    let vm = &cx.fingerprint().vm;
    Ok(CommandResult::Json(json!({
        "os": { "name": vm.os.name, "version": vm.os.version },
        "browser": { "name": vm.browser.name, "version": vm.browser.version },
        "screen": { "width": vm.screen.width, "height": vm.screen.height },
        "timezone": vm.timezone.name,
        "language": vm.language.language,
        "gpu": vm.gpu.unmasked_renderer,
    })))
}

pub async fn detect_captcha(
    rt: &Runtime,
    cx: &Arc<ContextHandle>,
) -> Result<CommandResult, DispatchError> {
    let html = cx.page().page_html().await;
    let status = cx.page().nav_snapshot().await.http_status;
    let detection = rt.detector().detect(&html, status);
    Ok(CommandResult::Json(json!({
        "detected": detection.is_some(),
        "kind": detection.map(|d| match d {
            Detection::Captcha => "captcha",
            Detection::Firewall => "firewall",
        }),
    })))
}

pub async fn solve_captcha(
    rt: &Runtime,
    cx: &Arc<ContextHandle>,
) -> Result<CommandResult, DispatchError> {
    let html = cx.page().page_html().await;
    let status = cx.page().nav_snapshot().await.http_status;
    match rt.detector().detect(&html, status) {
        None => Ok(CommandResult::Action(ActionResult::ok(
            "no challenge present",
        ))),
        Some(_) if rt.llm().is_none() => Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::CaptchaDetected,
            "challenge present and no vision collaborator is configured",
        ))),
        Some(_) => Ok(CommandResult::Action(ActionResult::failure(
            StatusCode::CaptchaDetected,
            "challenge present; solving is delegated to the vision collaborator",
        ))),
    }
}
