use crate::descriptors::{Preposition, Span};
use crate::value::TypedValue;
use std::fmt;

/// All errors produced by the action execution engine (spec.md §7).
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("undefined variable `{0}`")]
    UndefinedVariable(String),

    #[error("property `{property}` not found on `{on}`")]
    PropertyNotFound { property: String, on: String },

    #[error("type mismatch: expected {expected}, got {actual}{}", .variable.as_ref().map(|v| format!(" (variable `{v}`)")).unwrap_or_default())]
    TypeMismatch {
        expected: String,
        actual: String,
        variable: Option<String>,
    },

    #[error("`{action}` does not accept preposition `{received}` (expected one of {expected})")]
    InvalidPreposition {
        action: String,
        received: Preposition,
        expected: String,
    },

    #[error("invalid input: {message} (received: {received})")]
    InvalidInput { message: String, received: String },

    #[error("missing required field `{0}`")]
    MissingRequiredField(String),

    #[error("missing service `{0}`")]
    MissingService(String),

    #[error("`{0}` is not a repository and not a bound variable")]
    UndefinedRepository(String),

    #[error("cannot rebind `{0}` without allowRebind")]
    ImmutabilityViolation(String),

    #[error(
        "Cannot accept state {expected_from}->{expected_to} on {obj}: {field}. Current state is \"{actual}\"."
    )]
    AcceptStateError {
        expected_from: String,
        expected_to: String,
        actual: String,
        obj: String,
        field: String,
    },

    #[error("{reason}")]
    Thrown {
        r#type: String,
        reason: String,
        context: String,
    },

    #[error("assertion failed: {message}")]
    AssertionError {
        message: String,
        expected: Option<TypedValue>,
        actual: Option<TypedValue>,
        variable: String,
    },

    #[error("{0}")]
    RuntimeError(String),
}

impl ActionError {
    pub fn runtime(msg: impl Into<String>) -> Self {
        ActionError::RuntimeError(msg.into())
    }

    /// Best-effort span this error originated at, when the caller attached one.
    /// The core itself doesn't carry spans through every error path (most
    /// variants are raised far from the parser-facing span), so this is an
    /// annotation helper rather than a field on every variant.
    pub fn at(self, span: Span) -> SpannedActionError {
        SpannedActionError { error: self, span }
    }
}

#[derive(Debug)]
pub struct SpannedActionError {
    pub error: ActionError,
    pub span: Span,
}

impl fmt::Display for SpannedActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.error, self.span)
    }
}

impl std::error::Error for SpannedActionError {}

impl From<anyhow::Error> for ActionError {
    fn from(e: anyhow::Error) -> Self {
        ActionError::RuntimeError(e.to_string())
    }
}

impl From<std::io::Error> for ActionError {
    fn from(e: std::io::Error) -> Self {
        ActionError::RuntimeError(format!("io: {e}"))
    }
}

impl From<globset::Error> for ActionError {
    fn from(e: globset::Error) -> Self {
        ActionError::InvalidInput {
            message: format!("invalid glob pattern: {e}"),
            received: e.to_string(),
        }
    }
}

impl From<reqwest::Error> for ActionError {
    fn from(e: reqwest::Error) -> Self {
        ActionError::RuntimeError(format!("http: {e}"))
    }
}

impl From<serde_json::Error> for ActionError {
    fn from(e: serde_json::Error) -> Self {
        ActionError::InvalidInput {
            message: format!("invalid json: {e}"),
            received: e.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ActionError>;
