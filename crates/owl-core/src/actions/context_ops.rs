//! Context lifecycle operations.

use std::sync::Arc;

use owl_wire::{CommandEnvelope, CommandResult, ContextRef};
use serde_json::json;

use crate::context::{ContextHandle, ContextOptions, LlmConfig, ProxyConfig};
use crate::error::{ContextError, DispatchError};
use crate::runtime::Runtime;

pub async fn create_context(
    rt: &Runtime,
    envelope: &CommandEnvelope,
) -> Result<CommandResult, DispatchError> {
    let mut builder = ContextOptions::builder();

    if let Some(os) = envelope.param_str("os") {
        builder = builder.os_filter(os);
    }
    if let Some(gpu) = envelope.param_str("gpu") {
        builder = builder.gpu_filter(gpu);
    }
    if let Some(path) = envelope.param_str("profile_path") {
        builder = builder.profile_path(path);
    }
    if let Some(block) = envelope.param_bool("block_resources") {
        builder = builder.block_resources(block);
    }
    if let Some(proxy) = envelope.param_value("proxy") {
        let proxy: ProxyConfig =
            serde_json::from_value(proxy.clone()).map_err(|e| DispatchError::InvalidParam {
                method: envelope.method.clone(),
                param: "proxy".to_string(),
                reason: e.to_string(),
            })?;
        builder = builder.proxy(proxy);
    }
    if let Some(llm) = envelope.param_value("llm") {
        let llm: LlmConfig =
            serde_json::from_value(llm.clone()).map_err(|e| DispatchError::InvalidParam {
                method: envelope.method.clone(),
                param: "llm".to_string(),
                reason: e.to_string(),
            })?;
        builder = builder.llm(llm);
    }

    match rt.manager().create_context(builder.build()).await {
        Ok(context_id) => Ok(CommandResult::Context(ContextRef { context_id })),
        Err(ContextError::NotReady) => Err(DispatchError::BrowserNotReady),
        Err(err) => Err(DispatchError::Internal(err.to_string())),
    }
}

pub async fn release_context(
    rt: &Runtime,
    cx: &Arc<ContextHandle>,
) -> Result<CommandResult, DispatchError> {
    rt.manager()
        .release_context(cx.id())
        .await
        .map_err(|e| DispatchError::Internal(e.to_string()))?;
    Ok(CommandResult::Bool(true))
}

pub async fn close_context(rt: &Runtime, context_id: &str) -> Result<CommandResult, DispatchError> {
    match rt.manager().close_context(context_id).await {
        Ok(()) => Ok(CommandResult::Bool(true)),
        Err(ContextError::NotFound(id)) => Err(DispatchError::ContextNotFound(id)),
        Err(err) => Err(DispatchError::Internal(err.to_string())),
    }
}

pub async fn list_contexts(rt: &Runtime) -> Result<CommandResult, DispatchError> {
    Ok(CommandResult::Json(json!(rt.manager().list().await)))
}

pub fn get_fingerprint(cx: &Arc<ContextHandle>) -> Result<CommandResult, DispatchError> {
    serde_json::to_value(cx.fingerprint())
        .map(CommandResult::Json)
        .map_err(|e| DispatchError::Internal(e.to_string()))
}

pub fn get_virtual_machine(cx: &Arc<ContextHandle>) -> Result<CommandResult, DispatchError> {
    serde_json::to_value(&cx.fingerprint().vm)
        .map(CommandResult::Json)
        .map_err(|e| DispatchError::Internal(e.to_string()))
}

pub fn llm_status(rt: &Runtime) -> Result<CommandResult, DispatchError> {
    let status = match rt.llm() {
        Some(llm) => json!({
            "configured": true,
            "provider": llm.provider,
            "model": llm.model,
        }),
        None => json!({ "configured": false }),
    };
    Ok(CommandResult::Json(status))
}
