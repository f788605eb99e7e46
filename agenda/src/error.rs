//! Decision error taxonomy
//!
//! Every failure leaving the core is one of six kinds. None are retried
//! internally: `Conflict` and `NotFound` need the caller to re-read state,
//! `Internal` is surfaced for the caller to decide.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ladder::{AgendaStatus, DecisionType, PermissionRange};
use crate::store::StoreError;

/// Result type alias for decision operations
pub type DecisionResult<T> = Result<T, DecisionError>;

/// Errors returned by the decision engine and the expired resolver.
#[derive(Error, Debug)]
pub enum DecisionError {
    /// Missing or malformed input
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Decider's level is outside the rung's authorized range
    #[error("Permission denied: {decider_id} (level {level:?}) may not act on {status}; requires {required}")]
    PermissionDenied {
        decider_id: String,
        level: Option<f64>,
        status: AgendaStatus,
        required: PermissionRange,
    },

    /// Proposal or record absent
    #[error("Not found: {what}")]
    NotFound { what: String },

    /// Decision not on the menu for the current status
    #[error("Invalid transition: {decision} is not allowed in status {status}")]
    InvalidTransition {
        status: AgendaStatus,
        decision: String,
    },

    /// Status changed between read and write
    #[error("Conflict on {post_id}: expected status {expected}, found {actual}")]
    Conflict {
        post_id: String,
        expected: AgendaStatus,
        actual: AgendaStatus,
    },

    /// Storage failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DecisionError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn invalid_transition(status: AgendaStatus, decision: DecisionType) -> Self {
        Self::InvalidTransition {
            status,
            decision: decision.to_string(),
        }
    }

    /// Wire-level kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::ValidationError,
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Internal(_) => ErrorKind::InternalError,
        }
    }

    /// What the caller should do next.
    pub fn recovery_action(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "Correct the request and resubmit",
            Self::PermissionDenied { .. } => {
                "Ask a decider with the rung's permission level to act"
            }
            Self::NotFound { .. } => "Re-fetch the proposal and resubmit",
            Self::InvalidTransition { .. } => {
                "Re-fetch the proposal and choose a decision from its current menu"
            }
            Self::Conflict { .. } => {
                "Another decider acted first; re-fetch the proposal before resubmitting"
            }
            Self::Internal(_) => "Retry later or contact an administrator",
        }
    }
}

impl From<StoreError> for DecisionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::StatusChanged {
                post_id,
                expected,
                actual,
            } => Self::Conflict {
                post_id,
                expected,
                actual,
            },
            StoreError::NotFound(what) => Self::NotFound { what },
            err @ StoreError::ScoreDecreased { .. } => Self::validation(err.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

/// Wire-level error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum ErrorKind {
    ValidationError,
    PermissionDenied,
    NotFound,
    InvalidTransition,
    Conflict,
    InternalError,
}

impl ErrorKind {
    /// Conventional HTTP status for the calling API layer.
    pub fn http_status(self) -> u16 {
        match self {
            Self::ValidationError => 400,
            Self::PermissionDenied => 403,
            Self::NotFound => 404,
            Self::InvalidTransition => 422,
            Self::Conflict => 409,
            Self::InternalError => 500,
        }
    }

    /// Only storage failures are worth retrying unchanged.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::InternalError)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ValidationError => write!(f, "ValidationError"),
            Self::PermissionDenied => write!(f, "PermissionDenied"),
            Self::NotFound => write!(f, "NotFound"),
            Self::InvalidTransition => write!(f, "InvalidTransition"),
            Self::Conflict => write!(f, "Conflict"),
            Self::InternalError => write!(f, "InternalError"),
        }
    }
}
