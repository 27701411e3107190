//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{
    payment_providers::PaymentError, services::gateway::GatewayError, store::StoreError,
};

/// Application-wide error type.
///
/// Each variant maps to a specific HTTP status code and error message.
///
/// # Error Categories
///
/// - **Validation**: malformed or out-of-enum input (400)
/// - **Authentication**: missing/invalid session token or API key (401/403)
/// - **Authorization**: insufficient credits (402)
/// - **Not found**: referential lookup miss (404)
/// - **Upstream**: the inference provider failed (500, message passed through)
/// - **Internal**: storage or logic faults (500, details hidden from the client)
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Storage backend failed.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// No `Authorization` header on a session-authenticated route.
    #[error("No token provided")]
    NoTokenProvided,

    /// `Authorization` header present but carries no token after the scheme.
    #[error("Token missing")]
    TokenMissing,

    /// Session token failed signature or expiry verification.
    #[error("Invalid token")]
    InvalidToken,

    /// Unknown deployment or API key mismatch; the two are indistinguishable on purpose.
    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("User not found")]
    UserNotFound,

    /// Balance does not cover the invocation price.
    ///
    /// Returns HTTP 402 Payment Required.
    #[error("Insufficient tokens/credits")]
    InsufficientCredits,

    /// Request body or parameters are invalid.
    ///
    /// The String contains details about what was invalid.
    #[error("Invalid request")]
    InvalidRequest(String),

    /// The inference provider failed or timed out.
    #[error("{0}")]
    Upstream(String),

    /// The payment processor rejected or failed a call.
    #[error("Payment provider error: {0}")]
    Payment(String),

    #[error("Invalid webhook signature")]
    InvalidWebhookSignature,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// # Status Code Mapping
///
/// - `InvalidRequest`, `InvalidWebhookSignature` → 400 Bad Request
/// - `NoTokenProvided`, `TokenMissing` → 401 Unauthorized
/// - `InsufficientCredits` → 402 Payment Required
/// - `InvalidToken`, `InvalidApiKey` → 403 Forbidden
/// - `UserNotFound` → 404 Not Found
/// - `Payment` → 502 Bad Gateway
/// - `Upstream` → 500 with the provider's message
/// - `Store`, `Internal` → 500 Internal Server Error (hides details from client)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::InvalidRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::InvalidWebhookSignature => (
                StatusCode::BAD_REQUEST,
                "invalid_webhook_signature",
                self.to_string(),
            ),
            AppError::NoTokenProvided => (
                StatusCode::UNAUTHORIZED,
                "no_token_provided",
                self.to_string(),
            ),
            AppError::TokenMissing => {
                (StatusCode::UNAUTHORIZED, "token_missing", self.to_string())
            }
            AppError::InsufficientCredits => (
                StatusCode::PAYMENT_REQUIRED,
                "insufficient_credits",
                self.to_string(),
            ),
            AppError::InvalidToken => (StatusCode::FORBIDDEN, "invalid_token", self.to_string()),
            AppError::InvalidApiKey => {
                (StatusCode::FORBIDDEN, "invalid_api_key", self.to_string())
            }
            AppError::UserNotFound => (StatusCode::NOT_FOUND, "user_not_found", self.to_string()),
            AppError::Payment(ref msg) => {
                tracing::error!(error = %msg, "payment provider call failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "payment_provider_error",
                    self.to_string(),
                )
            }
            AppError::Upstream(ref msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "upstream_error", msg.clone())
            }
            AppError::Store(StoreError::BalanceOverflow) => (
                StatusCode::BAD_REQUEST,
                "invalid_request",
                "Credit amount too large".to_string(),
            ),
            AppError::Store(ref e) => {
                tracing::error!(error = %e, "storage failure");
                internal_error()
            }
            AppError::Internal(ref msg) => {
                tracing::error!(error = %msg, "internal failure");
                internal_error()
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

fn internal_error() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "An internal error occurred".to_string(),
    )
}

/// Malformed JSON bodies become validation errors in the standard envelope.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::InvalidMaxTokens => {
                AppError::InvalidRequest("maxTokens must be a positive integer".to_string())
            }
            GatewayError::UnknownDeployment | GatewayError::InvalidApiKey => AppError::InvalidApiKey,
            GatewayError::UserNotFound => AppError::UserNotFound,
            GatewayError::InsufficientCredits { .. } => AppError::InsufficientCredits,
            GatewayError::Upstream(e) => AppError::Upstream(e.to_string()),
            GatewayError::Store(e) => AppError::Store(e),
        }
    }
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::InvalidSignature => AppError::InvalidWebhookSignature,
            PaymentError::InvalidData(msg) => AppError::InvalidRequest(msg),
            PaymentError::ProviderApi(msg) => AppError::Payment(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(error: AppError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_insufficient_credits_envelope() {
        let (status, body) = body_of(AppError::InsufficientCredits).await;
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(body["error"]["code"], "insufficient_credits");
        assert_eq!(body["error"]["message"], "Insufficient tokens/credits");
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let (status, body) = body_of(AppError::Internal("pool exhausted".to_string())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn test_invalid_max_tokens_is_validation_error() {
        let (status, body) = body_of(GatewayError::InvalidMaxTokens.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "invalid_request");
        assert_eq!(body["error"]["message"], "maxTokens must be a positive integer");
    }

    #[tokio::test]
    async fn test_balance_overflow_is_validation_error() {
        let (status, body) = body_of(StoreError::BalanceOverflow.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "Credit amount too large");
    }

    #[tokio::test]
    async fn test_upstream_message_passed_through() {
        let (status, body) = body_of(AppError::Upstream("Upstream returned 503: busy".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "upstream_error");
        assert_eq!(body["error"]["message"], "Upstream returned 503: busy");
    }

    #[test]
    fn test_unknown_deployment_indistinguishable_from_bad_key() {
        assert!(matches!(
            AppError::from(GatewayError::UnknownDeployment),
            AppError::InvalidApiKey
        ));
        assert!(matches!(
            AppError::from(GatewayError::InvalidApiKey),
            AppError::InvalidApiKey
        ));
    }
}
