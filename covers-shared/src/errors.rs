use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{area}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E1xxx: Booking lifecycle errors
/// - E2xxx: Loyalty errors
/// - E3xxx: Notification/outbox errors
/// - E4xxx: Subscription registry errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    Unauthorized,
    Forbidden,
    ServiceUnavailable,
    BadRequest,
    TokenExpired,
    TokenInvalid,

    // Booking (E1xxx)
    BookingNotFound,
    InvalidStatusTransition,
    ConcurrentUpdate,
    SignatureInvalid,
    UnknownEventType,
    StaleEventTimestamp,

    // Loyalty (E2xxx)
    DuplicateLoyaltyAward,

    // Notification (E3xxx)
    EmptyBroadcastTarget,
    UnknownChannel,
    DeliveryFailed,

    // Registry (E4xxx)
    SubscriptionNotFound,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::NotFound => "E0003",
            Self::Unauthorized => "E0004",
            Self::Forbidden => "E0005",
            Self::ServiceUnavailable => "E0006",
            Self::BadRequest => "E0007",
            Self::TokenExpired => "E0008",
            Self::TokenInvalid => "E0009",

            // Booking
            Self::BookingNotFound => "E1001",
            Self::InvalidStatusTransition => "E1002",
            Self::ConcurrentUpdate => "E1003",
            Self::SignatureInvalid => "E1004",
            Self::UnknownEventType => "E1005",
            Self::StaleEventTimestamp => "E1006",

            // Loyalty
            Self::DuplicateLoyaltyAward => "E2001",

            // Notification
            Self::EmptyBroadcastTarget => "E3001",
            Self::UnknownChannel => "E3002",
            Self::DeliveryFailed => "E3003",

            // Registry
            Self::SubscriptionNotFound => "E4001",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError | Self::ServiceUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ValidationError | Self::BadRequest | Self::UnknownEventType
            | Self::EmptyBroadcastTarget | Self::UnknownChannel => StatusCode::BAD_REQUEST,
            Self::NotFound | Self::BookingNotFound | Self::SubscriptionNotFound => {
                StatusCode::NOT_FOUND
            }
            Self::Unauthorized | Self::TokenExpired | Self::TokenInvalid
            | Self::SignatureInvalid | Self::StaleEventTimestamp => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::InvalidStatusTransition | Self::ConcurrentUpdate
            | Self::DuplicateLoyaltyAward => StatusCode::CONFLICT,
            Self::DeliveryFailed => StatusCode::BAD_GATEWAY,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known {
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Conflict raised when a booking status edge is not in the transition graph.
    pub fn invalid_transition(from: &str, to: &str) -> Self {
        Self::new(
            ErrorCode::InvalidStatusTransition,
            format!("cannot transition booking from '{from}' to '{to}'"),
        )
    }

    /// Conflict raised when optimistic concurrency retries are exhausted.
    pub fn concurrent_update(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConcurrentUpdate, message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Known { code, message, details } => {
                let status = code.status_code();
                let mut resp = ApiErrorResponse::new(code.code(), message);
                if let Some(d) = details {
                    resp = resp.with_details(d.clone());
                }
                (status, resp)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new("E0001", "internal server error"),
                )
            }
            AppError::Database(err) => {
                tracing::error!(error = %err, "database error");
                match err {
                    diesel::result::Error::NotFound => (
                        StatusCode::NOT_FOUND,
                        ApiErrorResponse::new("E0003", "resource not found"),
                    ),
                    _ => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ApiErrorResponse::new("E0001", "database error"),
                    ),
                }
            }
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ApiErrorResponse::new("E0002", msg),
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_codes_map_to_409() {
        assert_eq!(
            ErrorCode::InvalidStatusTransition.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(ErrorCode::ConcurrentUpdate.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn signature_codes_map_to_401() {
        assert_eq!(ErrorCode::SignatureInvalid.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ErrorCode::StaleEventTimestamp.status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn unknown_event_maps_to_400() {
        assert_eq!(ErrorCode::UnknownEventType.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::UnknownEventType.code(), "E1005");
    }

    #[test]
    fn invalid_transition_message_names_both_states() {
        let err = AppError::invalid_transition("completed", "seated");
        let AppError::Known { code, message, .. } = err else {
            panic!("expected a known error");
        };
        assert_eq!(code, ErrorCode::InvalidStatusTransition);
        assert!(message.contains("completed"));
        assert!(message.contains("seated"));
    }
}
