//! # Action Surface
//!
//! The named operations the IPC server routes, glued to the browser engine
//! through the verifier. [`Dispatcher::dispatch`] is the single entry
//! point: it validates parameters against the [`registry`], resolves the
//! target context, serializes on the context's operation mutex, and runs
//! the handler for the method's category.
//!
//! Two failure channels exist, matching the wire contract: schema and
//! infrastructure problems surface as [`DispatchError`] (the IPC layer
//! turns them into `{"error": ...}`), while anything an operation can
//! express in its own vocabulary travels inside the result as an
//! `ActionResult`.

mod content;
mod context_ops;
mod element_state;
mod interaction;
mod media;
mod navigation;
mod network_ops;
mod page_control;
pub mod registry;
mod scrolling;
mod storage_ops;
mod wait_ops;

use std::sync::Arc;

use owl_wire::{ActionResult, CommandEnvelope, CommandResult, StatusCode};
use tracing::{debug, instrument, warn};

use crate::context::ContextHandle;
use crate::error::DispatchError;
use crate::runtime::Runtime;
use crate::verify::VerificationLevel;

use registry::{ContextUse, MethodSpec, ResultShape, method_spec};

/// Routes validated commands to their handlers.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    runtime: Arc<Runtime>,
}

impl Dispatcher {
    /// A dispatcher over the runtime.
    pub fn new(runtime: Arc<Runtime>) -> Self {
        Self { runtime }
    }

    /// The runtime this dispatcher serves.
    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    /// Validate and execute one command.
    ///
    /// # Errors
    ///
    /// [`DispatchError`] for schema violations, unknown methods, and
    /// failures the method's result shape cannot express.
    #[instrument(level = "debug", skip(self, envelope), fields(id = envelope.id, method = %envelope.method))]
    pub async fn dispatch(&self, envelope: &CommandEnvelope) -> Result<CommandResult, DispatchError> {
        let spec = method_spec(&envelope.method)
            .ok_or_else(|| DispatchError::UnknownMethod(envelope.method.clone()))?;
        validate_params(spec, envelope)?;

        if spec.context == ContextUse::Global {
            return self.route_global(spec, envelope).await;
        }

        let context_id = envelope
            .context_id()
            .ok_or_else(|| DispatchError::MissingParam {
                method: spec.name.to_string(),
                param: "context_id".to_string(),
            })?;

        // Context destruction manages its own draining; taking the op
        // guard here would deadlock the close against itself.
        if spec.name == "closeContext" {
            return context_ops::close_context(&self.runtime, context_id).await;
        }

        let handle = match self.runtime.manager().get(context_id).await {
            Ok(handle) => handle,
            Err(_) => return missing_context(spec, context_id),
        };

        // Commands on the same context serialize on its mutex; the active-op
        // guard keeps the cleanup task away for the duration.
        let guard = handle.begin_op();
        let ops = handle.lock_ops().await;
        let outcome = self.route_context(spec, &handle, envelope).await;
        drop(ops);
        drop(guard);

        if let Err(err) = &outcome {
            warn!(method = %spec.name, error = %err, "Command failed at dispatch level");
        }
        outcome
    }

    async fn route_global(
        &self,
        spec: &MethodSpec,
        envelope: &CommandEnvelope,
    ) -> Result<CommandResult, DispatchError> {
        let rt = &self.runtime;
        match spec.name {
            "createContext" => context_ops::create_context(rt, envelope).await,
            "listContexts" => context_ops::list_contexts(rt).await,
            "listTemplates" => content::list_templates(),
            "getLLMStatus" => context_ops::llm_status(rt),
            "getLicenseStatus" => storage_ops::license_status(),
            "ping" => Ok(CommandResult::Text("pong".to_string())),
            other => Err(DispatchError::Internal(format!(
                "method {other} registered but not routed"
            ))),
        }
    }

    async fn route_context(
        &self,
        spec: &MethodSpec,
        cx: &Arc<ContextHandle>,
        envelope: &CommandEnvelope,
    ) -> Result<CommandResult, DispatchError> {
        let rt = &self.runtime;
        debug!(context_id = %cx.id(), "Executing context command");
        match spec.name {
            // Context
            "releaseContext" => context_ops::release_context(rt, cx).await,
            "getFingerprint" => context_ops::get_fingerprint(cx),
            "getVirtualMachine" => context_ops::get_virtual_machine(cx),

            // Navigation
            "navigate" => navigation::navigate(rt, cx, envelope).await,
            "reload" => navigation::reload(rt, cx, envelope).await,
            "goBack" => navigation::go_back(rt, cx, envelope).await,
            "goForward" => navigation::go_forward(rt, cx, envelope).await,
            "canGoBack" => Ok(CommandResult::Bool(cx.page().can_go_back().await)),
            "canGoForward" => Ok(CommandResult::Bool(cx.page().can_go_forward().await)),
            "waitForNavigation" => navigation::wait_for_navigation(rt, cx, envelope).await,
            "getNavigationState" => navigation::navigation_state(cx),

            // Interaction
            "click" => interaction::click(rt, cx, envelope, ClickKind::Single).await,
            "doubleClick" => interaction::click(rt, cx, envelope, ClickKind::Double).await,
            "rightClick" => interaction::click(rt, cx, envelope, ClickKind::Right).await,
            "type" => interaction::type_text(rt, cx, envelope).await,
            "pick" => interaction::pick(rt, cx, envelope).await,
            "pressKey" => interaction::press_key(cx, envelope).await,
            "keyboardCombo" => interaction::keyboard_combo(cx, envelope).await,
            "submitForm" => interaction::submit_form(rt, cx, envelope).await,
            "hover" => interaction::hover(rt, cx, envelope).await,
            "clearInput" => interaction::clear_input(rt, cx, envelope).await,
            "focus" => interaction::focus(rt, cx, envelope).await,
            "blur" => interaction::blur(rt, cx, envelope).await,
            "selectAll" => interaction::select_all(rt, cx, envelope).await,
            "dragDrop" => interaction::drag_drop(rt, cx, envelope).await,
            "html5DragDrop" => interaction::html5_drag_drop(rt, cx, envelope).await,
            "mouseMove" => interaction::mouse_move(cx, envelope).await,
            "uploadFile" => interaction::upload_file(rt, cx, envelope).await,

            // Scrolling
            "scroll" => scrolling::scroll_by(rt, cx, envelope).await,
            "scrollTo" => scrolling::scroll_to(rt, cx, envelope).await,
            "scrollToElement" => scrolling::scroll_to_element(rt, cx, envelope).await,
            "scrollToTop" => scrolling::scroll_to_top(cx).await,
            "scrollToBottom" => scrolling::scroll_to_bottom(cx).await,
            "getScrollPosition" => scrolling::scroll_position(cx).await,

            // Content extraction
            "extractText" => content::extract_text(cx, envelope).await,
            "getHTML" => content::get_html(cx).await,
            "getMarkdown" => content::get_markdown(cx).await,
            "extractJSON" => content::extract_json(cx, envelope).await,
            "detectSite" => content::detect_site(cx).await,
            "getPageInfo" => content::page_info(cx).await,
            "screenshot" => content::screenshot(cx, envelope).await,
            "freezeFrame" => content::freeze_frame(cx).await,
            "unfreezeFrame" => content::unfreeze_frame(cx),
            "highlight" => content::highlight(rt, cx, envelope).await,
            "showGrid" => content::show_grid(cx, envelope).await,
            "hideGrid" => content::hide_grid(cx).await,

            // Element state
            "elementExists" => element_state::exists(cx, envelope).await,
            "isVisible" => element_state::is_visible(cx, envelope).await,
            "isEnabled" => element_state::is_enabled(cx, envelope).await,
            "isChecked" => element_state::is_checked(cx, envelope).await,
            "getAttribute" => element_state::attribute(cx, envelope).await,
            "getBoundingBox" => element_state::bounding_box(cx, envelope).await,
            "countElements" => element_state::count(cx, envelope).await,
            "getElementText" => element_state::text(cx, envelope).await,
            "getInputValue" => element_state::input_value(cx, envelope).await,

            // Wait
            "waitForSelector" => wait_ops::wait_for_selector(cx, envelope).await,
            "waitForTimeout" => wait_ops::wait_for_timeout(envelope).await,
            "waitForNetworkIdle" => wait_ops::wait_for_network_idle(cx, envelope).await,
            "waitForFunction" => wait_ops::wait_for_function(cx, envelope).await,
            "waitForUrl" => wait_ops::wait_for_url(cx, envelope).await,
            "waitForDomStable" => wait_ops::wait_for_dom_stable(cx, envelope).await,

            // Page control
            "setViewport" => page_control::set_viewport(cx, envelope).await,
            "evaluate" => page_control::evaluate(cx, envelope).await,
            "zoomIn" => page_control::zoom_step(cx, 0.25).await,
            "zoomOut" => page_control::zoom_step(cx, -0.25).await,
            "zoomReset" => page_control::zoom_reset(cx).await,
            "getZoom" => page_control::get_zoom(cx).await,
            "getConsoleLogs" => page_control::console_logs(rt, cx, envelope).await,
            "clearConsoleLogs" => page_control::clear_console_logs(rt, cx).await,

            // Video & streaming
            "startVideoRecording" => media::start_video(cx, envelope),
            "stopVideoRecording" => media::stop_video(cx),
            "getVideoStatus" => media::video_status(cx),
            "startStream" => media::start_stream(cx),
            "stopStream" => media::stop_stream(cx),
            "getStreamStatus" => media::stream_status(cx),

            // Demographics & captcha
            "getDemographics" => media::demographics(cx),
            "detectCaptcha" => media::detect_captcha(rt, cx).await,
            "solveCaptcha" => media::solve_captcha(rt, cx).await,

            // Cookies, proxy, profiles, clipboard
            "getCookies" => storage_ops::get_cookies(cx),
            "setCookie" => storage_ops::set_cookie(cx, envelope),
            "deleteCookie" => storage_ops::delete_cookie(cx, envelope),
            "clearCookies" => storage_ops::clear_cookies(cx),
            "setProxy" => storage_ops::set_proxy(cx, envelope),
            "getProxy" => storage_ops::get_proxy(cx),
            "clearProxy" => storage_ops::clear_proxy(cx),
            "saveProfile" => storage_ops::save_profile(cx, envelope).await,
            "loadProfile" => storage_ops::load_profile(rt, cx, envelope).await,
            "clipboardRead" => storage_ops::clipboard_read(cx).await,
            "clipboardWrite" => storage_ops::clipboard_write(cx, envelope).await,

            // Frames
            "listFrames" => network_ops::list_frames(cx).await,
            "switchToFrame" => network_ops::switch_to_frame(cx, envelope).await,
            "switchToParentFrame" => network_ops::switch_to_parent_frame(cx).await,
            "switchToMainFrame" => network_ops::switch_to_main_frame(cx).await,

            // Network rules
            "addNetworkRule" => network_ops::add_rule(rt, cx, envelope),
            "removeNetworkRule" => network_ops::remove_rule(rt, cx, envelope),
            "listNetworkRules" => network_ops::list_rules(rt, cx),
            "clearNetworkRules" => network_ops::clear_rules(rt, cx),
            "setResourceBlocking" => network_ops::set_resource_blocking(rt, cx, envelope),

            // Downloads
            "listDownloads" => network_ops::list_downloads(rt, cx),
            "waitForDownload" => network_ops::wait_for_download(rt, cx, envelope).await,
            "clearDownloads" => network_ops::clear_downloads(rt, cx),

            // Dialogs
            "setDialogPolicy" => network_ops::set_dialog_policy(rt, cx, envelope),
            "getLastDialog" => network_ops::last_dialog(rt, cx),
            "listDialogs" => network_ops::list_dialogs(rt, cx),

            // Tabs
            "listTabs" => network_ops::list_tabs(rt, cx),
            "newTab" => network_ops::new_tab(rt, cx, envelope),
            "switchTab" => network_ops::switch_tab(rt, cx, envelope),
            "closeTab" => network_ops::close_tab(rt, cx, envelope),

            other => Err(DispatchError::Internal(format!(
                "method {other} registered but not routed"
            ))),
        }
    }
}

/// Click variants sharing one handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClickKind {
    Single,
    Double,
    Right,
}

/// Schema validation: required fields present, no fields outside the schema.
fn validate_params(spec: &MethodSpec, envelope: &CommandEnvelope) -> Result<(), DispatchError> {
    for required in spec.required {
        if !envelope.params.contains_key(*required) {
            return Err(DispatchError::MissingParam {
                method: spec.name.to_string(),
                param: (*required).to_string(),
            });
        }
    }
    for key in envelope.params.keys() {
        let known = (key == "context_id" && spec.context == ContextUse::Required)
            || spec.required.contains(&key.as_str())
            || spec.optional.contains(&key.as_str());
        if !known {
            return Err(DispatchError::UnknownParam {
                method: spec.name.to_string(),
                param: key.clone(),
                accepted: spec.accepted(),
            });
        }
    }
    Ok(())
}

/// A context id that did not resolve: expressible methods get an
/// `ActionResult`, everything else a protocol error.
fn missing_context(
    spec: &MethodSpec,
    context_id: &str,
) -> Result<CommandResult, DispatchError> {
    if spec.shape == ResultShape::Action {
        Ok(CommandResult::Action(
            ActionResult::failure(
                StatusCode::BrowserNotFound,
                format!("no context with id {context_id}"),
            ),
        ))
    } else {
        Err(DispatchError::ContextNotFound(context_id.to_string()))
    }
}

// --- shared parameter helpers ---

pub(crate) fn require_str<'a>(
    envelope: &'a CommandEnvelope,
    key: &str,
) -> Result<&'a str, DispatchError> {
    envelope
        .param_str(key)
        .ok_or_else(|| DispatchError::InvalidParam {
            method: envelope.method.clone(),
            param: key.to_string(),
            reason: "expected a string".to_string(),
        })
}

pub(crate) fn require_f64(envelope: &CommandEnvelope, key: &str) -> Result<f64, DispatchError> {
    envelope
        .param_f64(key)
        .ok_or_else(|| DispatchError::InvalidParam {
            method: envelope.method.clone(),
            param: key.to_string(),
            reason: "expected a number".to_string(),
        })
}

pub(crate) fn require_u32(envelope: &CommandEnvelope, key: &str) -> Result<u32, DispatchError> {
    envelope
        .param_i64(key)
        .filter(|v| *v >= 0 && *v <= i64::from(u32::MAX))
        .map(|v| v as u32)
        .ok_or_else(|| DispatchError::InvalidParam {
            method: envelope.method.clone(),
            param: key.to_string(),
            reason: "expected a non-negative integer".to_string(),
        })
}

/// Timeout parameter in milliseconds, with a per-method default.
pub(crate) fn timeout_ms(envelope: &CommandEnvelope, default_ms: u64) -> u64 {
    envelope
        .param_i64("timeout")
        .filter(|v| *v >= 0)
        .map_or(default_ms, |v| v as u64)
}

/// The `verification_level` parameter, defaulting to `Standard`.
pub(crate) fn verification_level(envelope: &CommandEnvelope) -> VerificationLevel {
    envelope
        .param_str("verification_level")
        .map_or(VerificationLevel::Standard, VerificationLevel::parse)
}

/// Drain page console output into the store.
pub(crate) async fn sync_console(rt: &Runtime, cx: &ContextHandle) {
    for line in cx.page().drain_console().await {
        rt.stores().console.push(cx.id(), &line.level, &line.text);
    }
}

/// Keep the active tab record in step with the page.
pub(crate) async fn sync_tab(rt: &Runtime, cx: &ContextHandle) {
    let snap = cx.page().nav_snapshot().await;
    rt.stores().tabs.sync_active(cx.id(), &snap.url, &snap.title);
}

#[cfg(test)]
mod tests;
