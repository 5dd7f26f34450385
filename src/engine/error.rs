//! The engine's closed error sum, mapped to HTTP at the handler boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0}")]
    Validation(String),

    #[error("Slot not found")]
    NotFound,

    #[error("Slot is no longer available")]
    AlreadyClaimed,

    #[error("Slot has not been claimed")]
    SlotNotClaimed,

    #[error("Claim is already cancelled")]
    AlreadyCancelled,

    #[error("Work on this slot is already completed")]
    AlreadyCompleted,

    #[error("Cancellation lost a concurrent update, retry the request")]
    CancelFailed,

    /// A concurrent request carrying the same idempotency key committed
    /// first. Resolved internally by re-reading the stored result; it only
    /// surfaces when the colliding key belongs to another tenant.
    #[error("Request identifier is already in use")]
    RequestIdConflict,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),
}

impl EngineError {
    /// Stable machine-readable code, the `code` field of the error body.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Validation(_) | EngineError::RequestIdConflict => "VALIDATION",
            EngineError::NotFound => "NOT_FOUND",
            EngineError::AlreadyClaimed => "ALREADY_CLAIMED",
            EngineError::SlotNotClaimed => "SLOT_NOT_CLAIMED",
            EngineError::AlreadyCancelled => "ALREADY_CANCELLED",
            EngineError::AlreadyCompleted => "ALREADY_COMPLETED",
            EngineError::CancelFailed => "CANCEL_FAILED",
            EngineError::Internal(_) | EngineError::Database(_) => "INTERNAL",
        }
    }

    pub fn http_status(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;

        match self {
            EngineError::Validation(_) | EngineError::RequestIdConflict => StatusCode::BAD_REQUEST,
            EngineError::NotFound => StatusCode::NOT_FOUND,
            EngineError::AlreadyClaimed
            | EngineError::SlotNotClaimed
            | EngineError::AlreadyCancelled
            | EngineError::AlreadyCompleted
            | EngineError::CancelFailed => StatusCode::CONFLICT,
            EngineError::Internal(_) | EngineError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
