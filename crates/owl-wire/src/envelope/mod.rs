//! Command and response envelopes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::action::ActionResult;
use crate::error::WireError;

/// A command as it arrives on the wire.
///
/// Parameters are a flat object inlined at the top level next to `id` and
/// `method`; the accessor methods pull typed values out of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEnvelope {
    /// Request id, echoed back in the response.
    pub id: i64,
    /// Method name (e.g. "navigate", "click", "createContext").
    pub method: String,
    /// Flat parameter object.
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl CommandEnvelope {
    /// Build an envelope with no parameters.
    pub fn new(id: i64, method: impl Into<String>) -> Self {
        Self {
            id,
            method: method.into(),
            params: Map::new(),
        }
    }

    /// Build an envelope from a parameter object.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::MissingField`] if `params` is not a JSON object.
    pub fn with_params(id: i64, method: impl Into<String>, params: Value) -> Result<Self, WireError> {
        match params {
            Value::Object(map) => Ok(Self {
                id,
                method: method.into(),
                params: map,
            }),
            _ => Err(WireError::MissingField("params object")),
        }
    }

    /// Set a single parameter, consuming and returning the envelope.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Get a string parameter.
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }

    /// Get an integer parameter.
    pub fn param_i64(&self, key: &str) -> Option<i64> {
        self.params.get(key).and_then(Value::as_i64)
    }

    /// Get a float parameter.
    pub fn param_f64(&self, key: &str) -> Option<f64> {
        self.params.get(key).and_then(Value::as_f64)
    }

    /// Get a boolean parameter.
    pub fn param_bool(&self, key: &str) -> Option<bool> {
        self.params.get(key).and_then(Value::as_bool)
    }

    /// Get a raw parameter value.
    pub fn param_value(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    /// The context id parameter, if present.
    pub fn context_id(&self) -> Option<&str> {
        self.param_str("context_id")
    }
}

/// A context id wrapped in the shape `createContext` returns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContextRef {
    /// Opaque context id, form `ctx_<n>`.
    pub context_id: String,
}

/// The five result shapes a successful response can carry.
///
/// Variant order matters: `serde(untagged)` tries variants top to bottom,
/// so the structured shapes must precede the catch-all `Json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CommandResult {
    /// An action outcome (`{success, status, message, ...}`).
    Action(ActionResult),
    /// A context id object (`{"context_id": "ctx_..."}`).
    Context(ContextRef),
    /// A bare boolean (e.g. `canGoBack`).
    Bool(bool),
    /// A bare string (extracted text, html, base64 screenshot).
    Text(String),
    /// Arbitrary JSON (e.g. `getPageInfo`).
    Json(Value),
}

impl CommandResult {
    /// The contained action result, if this is the action shape.
    pub fn as_action(&self) -> Option<&ActionResult> {
        match self {
            Self::Action(result) => Some(result),
            _ => None,
        }
    }

    /// The contained context id, if this is the context shape.
    pub fn as_context_id(&self) -> Option<&str> {
        match self {
            Self::Context(r) => Some(&r.context_id),
            _ => None,
        }
    }

    /// The contained boolean, if this is the boolean shape.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The contained string, if this is the text shape.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// A response as it goes out on the wire: `id` plus exactly one of
/// `result` or `error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Request id this responds to.
    pub id: i64,
    /// Successful result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<CommandResult>,
    /// Hard error message (unknown method, malformed request, internal).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResponseEnvelope {
    /// A successful response.
    pub fn result(id: i64, result: CommandResult) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    /// A hard-error response.
    pub fn error(id: i64, message: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(message.into()),
        }
    }

    /// Validate the exactly-one-of invariant after deserialization.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::AmbiguousResponse`] if both or neither side is set.
    pub fn validate(self) -> Result<Self, WireError> {
        match (&self.result, &self.error) {
            (Some(_), None) | (None, Some(_)) => Ok(self),
            _ => Err(WireError::AmbiguousResponse),
        }
    }

    /// Whether this is an error response.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests;
