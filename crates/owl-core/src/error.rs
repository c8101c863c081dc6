//! Core error types.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur in the control core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Engine contract error.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// Context error.
    #[error("context error: {0}")]
    Context(#[from] ContextError),

    /// Fingerprint engine error.
    #[error("vm error: {0}")]
    Vm(#[from] VmError),

    /// Verification error.
    #[error("verify error: {0}")]
    Verify(#[from] VerifyError),

    /// Profile persistence error.
    #[error("profile error: {0}")]
    Profile(#[from] ProfileError),

    /// Command dispatch error.
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

/// Errors crossing the browser-engine contract boundary.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine has not finished initializing.
    #[error("browser engine is not ready")]
    NotReady,

    /// The page backing a context is gone.
    #[error("page is closed")]
    PageClosed,

    /// A selector could not be parsed by the engine.
    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    /// A frame id did not resolve.
    #[error("unknown frame: {0}")]
    UnknownFrame(String),

    /// Script evaluation failed inside the engine.
    #[error("script error: {0}")]
    Script(String),

    /// The engine rejected the operation.
    #[error("engine rejected operation: {0}")]
    Rejected(String),
}

/// Errors related to context lifecycle and the registry.
#[derive(Error, Debug)]
pub enum ContextError {
    /// No context with the given id.
    #[error("context not found: {0}")]
    NotFound(String),

    /// The engine is not ready to create contexts.
    #[error("browser engine is not ready")]
    NotReady,

    /// Caps are exceeded and no context is evictable.
    #[error("context pool exhausted: {0}")]
    PoolExhausted(String),

    /// The manager is shutting down and refuses new contexts.
    #[error("context manager is shutting down")]
    ShuttingDown,

    /// Waiting for in-flight operations to drain timed out.
    #[error("drain timeout after {0:?} ({1} operations still active)")]
    DrainTimeout(Duration, u32),

    /// Failed to create the context.
    #[error("failed to create context: {0}")]
    CreateFailed(String),

    /// Engine error during a context operation.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// Profile error during context creation.
    #[error("profile error: {0}")]
    Profile(#[from] ProfileError),
}

/// Errors from the fingerprint (virtual machine) engine.
#[derive(Error, Debug)]
pub enum VmError {
    /// No template satisfies the requested OS/GPU filters.
    #[error("no VM template matches filters (os: {os:?}, gpu: {gpu:?})")]
    NoMatchingTemplate {
        /// Requested OS filter.
        os: Option<String>,
        /// Requested GPU filter.
        gpu: Option<String>,
    },

    /// Persisted seeds failed validation.
    #[error("invalid seeds: {0}")]
    InvalidSeeds(String),
}

/// Errors from the action verifier.
#[derive(Error, Debug)]
pub enum VerifyError {
    /// The natural-language finder could not resolve a description.
    #[error("finder could not resolve: {0}")]
    FinderUnresolved(String),

    /// Engine error during a check.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Errors reading or writing persisted profiles.
#[derive(Error, Debug)]
pub enum ProfileError {
    /// Filesystem error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The profile document did not parse.
    #[error("malformed profile: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Errors surfaced to the IPC layer as protocol errors.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The method name is not in the registry.
    #[error("unknown method: {0}")]
    UnknownMethod(String),

    /// A required parameter is absent.
    #[error("missing required parameter '{param}' for method '{method}'")]
    MissingParam {
        /// Method name.
        method: String,
        /// Parameter name.
        param: String,
    },

    /// A parameter is present but has the wrong type or value.
    #[error("invalid parameter '{param}' for method '{method}': {reason}")]
    InvalidParam {
        /// Method name.
        method: String,
        /// Parameter name.
        param: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A parameter is not part of the method's schema.
    #[error("unknown parameter '{param}' for method '{method}' (accepted: {accepted})")]
    UnknownParam {
        /// Method name.
        method: String,
        /// Parameter name.
        param: String,
        /// Comma-separated accepted parameter names.
        accepted: String,
    },

    /// The context id did not resolve and the method cannot express that
    /// as an action result.
    #[error("context_not_found: {0}")]
    ContextNotFound(String),

    /// The engine is not ready.
    #[error("browser_not_ready: the engine is not initialized")]
    BrowserNotReady,

    /// Anything unexpected; the message is never empty.
    #[error("internal error: {0}")]
    Internal(String),
}
