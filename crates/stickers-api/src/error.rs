//! Sticker rewards API error types.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use stickers_core::error::{DomainError, FieldErrors};
use thiserror::Error;
use tracing::error;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Applying schema migrations failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
    /// Field-level validation messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<FieldErrors>,
    /// The shopper that could not be found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shopper_id: Option<String>,
}

/// HTTP-layer wrapper around `DomainError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

/// Malformed or wrongly typed request bodies are reported as validation
/// errors against the whole body.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(DomainError::Validation(FieldErrors::single(
            "body",
            rejection.body_text(),
        )))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self.0 {
            DomainError::Validation(details) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "validation_error",
                    message: "Invalid input".to_string(),
                    details: Some(details),
                    shopper_id: None,
                },
            ),
            DomainError::ShopperNotFound(shopper_id) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    error: "shopper_not_found",
                    message: "Shopper not found".to_string(),
                    details: None,
                    shopper_id: Some(shopper_id),
                },
            ),
            err @ DomainError::DuplicateTransaction(_) => (
                StatusCode::CONFLICT,
                ErrorBody {
                    error: "duplicate_transaction",
                    message: err.to_string(),
                    details: None,
                    shopper_id: None,
                },
            ),
            err @ DomainError::Infrastructure(_) => {
                error!(error = %err, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "infrastructure_error",
                        message: "internal server error".to_string(),
                        details: None,
                        shopper_id: None,
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use serde_json::Value;

    fn status_of(err: DomainError) -> StatusCode {
        let response = ApiError(err).into_response();
        response.status()
    }

    async fn body_of(err: DomainError) -> Value {
        let response = ApiError(err).into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_validation_maps_to_400() {
        assert_eq!(
            status_of(DomainError::Validation(FieldErrors::single(
                "items",
                "This list may not be empty."
            ))),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_shopper_not_found_maps_to_404() {
        assert_eq!(
            status_of(DomainError::ShopperNotFound("shopper-1".into())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_duplicate_transaction_maps_to_409() {
        assert_eq!(
            status_of(DomainError::DuplicateTransaction("txn-1".into())),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_infrastructure_maps_to_500() {
        assert_eq!(
            status_of(DomainError::Infrastructure("db down".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_validation_body_carries_field_details() {
        let json = body_of(DomainError::Validation(FieldErrors::single(
            "items[0].quantity",
            "Ensure this value is greater than or equal to 1.",
        )))
        .await;

        assert_eq!(json["error"], "validation_error");
        assert_eq!(json["message"], "Invalid input");
        assert_eq!(
            json["details"]["items[0].quantity"][0],
            "Ensure this value is greater than or equal to 1."
        );
        assert!(json.get("shopper_id").is_none());
    }

    #[tokio::test]
    async fn test_not_found_body_carries_shopper_id() {
        let json = body_of(DomainError::ShopperNotFound("shopper-9".into())).await;

        assert_eq!(json["error"], "shopper_not_found");
        assert_eq!(json["shopper_id"], "shopper-9");
        assert!(json.get("details").is_none());
    }

    #[tokio::test]
    async fn test_infrastructure_body_hides_internal_message() {
        let json = body_of(DomainError::Infrastructure("password=hunter2".into())).await;

        assert_eq!(json["error"], "infrastructure_error");
        assert!(!json["message"].as_str().unwrap().contains("hunter2"));
    }
}
