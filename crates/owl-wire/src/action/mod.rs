//! Structured action outcomes.
//!
//! Every operation with observable side effects resolves to an
//! [`ActionResult`]: a success flag, a status from the closed [`StatusCode`]
//! vocabulary, a human-readable message, and optional detail fields.
//!
//! The one invariant that matters to callers: `success == true` if and only
//! if the status is [`StatusCode::Ok`] or [`StatusCode::VerificationTimeout`].
//! The constructors on [`ActionResult`] uphold it; build results through
//! them rather than struct literals.

use serde::{Deserialize, Serialize};

/// The closed status vocabulary of [`ActionResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    Ok,
    BrowserNotFound,
    BrowserNotReady,
    ContextNotFound,
    NavigationFailed,
    NavigationTimeout,
    PageLoadError,
    RedirectDetected,
    CaptchaDetected,
    FirewallDetected,
    ElementNotFound,
    ElementNotVisible,
    ElementNotInteractable,
    ElementStale,
    MultipleElements,
    ClickFailed,
    ClickIntercepted,
    TypeFailed,
    TypePartial,
    ScrollFailed,
    FocusFailed,
    BlurFailed,
    ClearFailed,
    PickFailed,
    OptionNotFound,
    UploadFailed,
    FrameSwitchFailed,
    TabSwitchFailed,
    DialogNotHandled,
    InvalidSelector,
    InvalidUrl,
    InvalidParameter,
    InternalError,
    Timeout,
    NetworkTimeout,
    WaitTimeout,
    VerificationTimeout,
    Unknown,
}

impl StatusCode {
    /// Whether this status counts as success.
    ///
    /// `VerificationTimeout` is the single status that preserves success
    /// despite an inconclusive post-check: the action was dispatched and no
    /// contradicting observation arrived within the window.
    pub fn is_success(self) -> bool {
        matches!(self, Self::Ok | Self::VerificationTimeout)
    }

    /// Whether a caller can reasonably retry an operation that returned
    /// this status.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::NavigationTimeout
                | Self::WaitTimeout
                | Self::NetworkTimeout
                | Self::ElementStale
                | Self::VerificationTimeout
        )
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Reuse the serde rename so logs and the wire agree.
        let s = serde_json::to_value(self).map_err(|_| std::fmt::Error)?;
        match s {
            serde_json::Value::String(s) => f.write_str(&s),
            _ => Err(std::fmt::Error),
        }
    }
}

/// The outcome of an operation with observable side effects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionResult {
    /// Whether the action succeeded.
    pub success: bool,
    /// Status from the closed vocabulary.
    pub status: StatusCode,
    /// Human-readable description of the outcome.
    pub message: String,
    /// Selector the action targeted, when relevant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    /// URL involved in the action, when relevant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Machine-readable error detail (e.g. the partial text a type action
    /// actually produced).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// HTTP status observed during the action, when relevant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    /// Number of elements matched, when relevant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_count: Option<usize>,
}

impl ActionResult {
    /// A successful result with status `ok`.
    pub fn ok(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::Ok, message)
    }

    /// A result for an inconclusive post-check. Counts as success.
    pub fn verification_timeout(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::VerificationTimeout, message)
    }

    /// A failed result with the given status.
    ///
    /// # Panics
    ///
    /// Panics (debug builds) if called with a success-preserving status;
    /// use [`ActionResult::ok`] or [`ActionResult::verification_timeout`].
    pub fn failure(status: StatusCode, message: impl Into<String>) -> Self {
        debug_assert!(!status.is_success(), "failure() called with {status}");
        Self::with_status(status, message)
    }

    /// Build a result from a status, deriving `success` from it.
    pub fn with_status(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            success: status.is_success(),
            status,
            message: message.into(),
            selector: None,
            url: None,
            error_code: None,
            http_status: None,
            element_count: None,
        }
    }

    /// Attach the selector the action targeted.
    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    /// Attach the URL involved in the action.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Attach a machine-readable error detail.
    pub fn with_error_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }

    /// Attach the HTTP status observed during the action.
    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    /// Attach the number of elements matched.
    pub fn with_element_count(mut self, count: usize) -> Self {
        self.element_count = Some(count);
        self
    }

    /// Verify the success/status invariant holds.
    pub fn is_consistent(&self) -> bool {
        self.success == self.status.is_success()
    }
}

#[cfg(test)]
mod tests;
