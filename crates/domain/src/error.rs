//! Domain error types.

use std::time::Duration;

use market_store::{LotId, LotStatus, StoreError};
use serde::Serialize;
use thiserror::Error;

/// Caller-facing classification of a [`DomainError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    AlreadyClaimed,
    InvalidState,
    Conflict,
    Timeout,
    Validation,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::AlreadyClaimed => "already_claimed",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Validation => "validation",
            ErrorKind::Internal => "internal",
        }
    }

    /// Only a timed-out call may be retried as-is; every other kind reflects
    /// state that a retry would observe again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Timeout)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The lot was not available when the conditional claim write ran.
    #[error("Lot {lot_id} is already claimed (status {status})")]
    AlreadyClaimed { lot_id: LotId, status: LotStatus },

    #[error("Cannot {action} while {current}")]
    InvalidState {
        action: &'static str,
        current: String,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store call {operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::NotFound { .. } => ErrorKind::NotFound,
            DomainError::AlreadyClaimed { .. } => ErrorKind::AlreadyClaimed,
            DomainError::InvalidState { .. } => ErrorKind::InvalidState,
            DomainError::Conflict(_) => ErrorKind::Conflict,
            DomainError::Timeout { .. } => ErrorKind::Timeout,
            DomainError::Validation(_) => ErrorKind::Validation,
            DomainError::Store(_) => ErrorKind::Internal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    pub(crate) fn invalid_state(action: &'static str, current: impl ToString) -> Self {
        DomainError::InvalidState {
            action,
            current: current.to_string(),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        DomainError::Validation(message.into())
    }
}

impl From<StoreError> for DomainError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::LotNotFound(id) => DomainError::NotFound {
                entity: "Lot",
                id: id.to_string(),
            },
            StoreError::ClaimNotFound(id) => DomainError::NotFound {
                entity: "Claim",
                id: id.to_string(),
            },
            StoreError::MakerNotFound(id) => DomainError::NotFound {
                entity: "Maker profile",
                id: id.to_string(),
            },
            StoreError::StatusMismatch { lot_id, actual, .. } => DomainError::InvalidState {
                action: "change lot status",
                current: format!("lot {lot_id} is {actual}"),
            },
            StoreError::InvalidQuery(message) => DomainError::Validation(message),
            StoreError::HasClaims(lot_id) => {
                DomainError::Conflict(format!("lot {lot_id} has claims and cannot be removed"))
            }
            e @ (StoreError::ConcurrencyConflict { .. } | StoreError::Duplicate { .. }) => {
                DomainError::Conflict(e.to_string())
            }
            other => DomainError::Store(other),
        }
    }
}
