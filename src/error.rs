use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::gateway::GatewayError;
use crate::ports::RepositoryError;
use crate::services::{SettlementError, SignatureError};
use crate::use_cases::InitiateError;
use crate::validation::ValidationError;

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";
pub const INITIATION_FAILED_MESSAGE: &str = "payment failed to initiate";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Repository(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }

    /// Message written to the wire. Server-side failures stay opaque.
    fn public_message(&self) -> String {
        match self {
            AppError::Repository(_) | AppError::Internal(_) => INTERNAL_ERROR_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::warn!(error = %self, "Request rejected");
        }

        let body = Json(json!({
            "error": self.public_message(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl From<SignatureError> for AppError {
    fn from(e: SignatureError) -> Self {
        AppError::Unauthorized(e.to_string())
    }
}

impl From<InitiateError> for AppError {
    fn from(e: InitiateError) -> Self {
        match e {
            InitiateError::Gateway(GatewayError::Rejected(payload)) => {
                tracing::warn!(provider_response = %payload, "Gateway rejected cash-in");
                AppError::BadRequest(INITIATION_FAILED_MESSAGE.to_string())
            }
            InitiateError::Gateway(other) => AppError::Internal(other.to_string()),
            ledger @ InitiateError::Ledger { .. } => AppError::Internal(ledger.to_string()),
        }
    }
}

impl From<SettlementError> for AppError {
    fn from(e: SettlementError) -> Self {
        match e {
            SettlementError::UnknownReference(reference) => {
                AppError::NotFound(format!("transaction {}", reference))
            }
            SettlementError::Ledger(e) => AppError::Repository(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_status_code() {
        let error = AppError::Validation("Invalid input".to_string());
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_not_found_error_status_code() {
        let error = AppError::NotFound("Resource not found".to_string());
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_repository_error_status_code() {
        let error = AppError::Repository(RepositoryError::Database(sqlx::Error::RowNotFound));
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_unauthorized_error_status_code() {
        let error = AppError::from(SignatureError::Mismatch);
        assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_internal_errors_are_opaque() {
        let error = AppError::Internal("token endpoint returned 503 for client abc".to_string());
        assert_eq!(error.public_message(), INTERNAL_ERROR_MESSAGE);
    }

    #[test]
    fn test_gateway_rejection_maps_to_bad_request() {
        let error = AppError::from(InitiateError::Gateway(GatewayError::Rejected(
            json!({"message": "insufficient balance"}),
        )));
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(error.public_message(), format!("Bad request: {}", INITIATION_FAILED_MESSAGE));
    }

    #[test]
    fn test_gateway_auth_failure_maps_to_internal() {
        let error = AppError::from(InitiateError::Gateway(GatewayError::Auth(
            "status 401".to_string(),
        )));
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_unknown_reference_maps_to_not_found() {
        let error = AppError::from(SettlementError::UnknownReference("r1".to_string()));
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_validation_error_response() {
        let error = AppError::Validation("amount: must be greater than zero".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_repository_error_response() {
        let error = AppError::Repository(RepositoryError::Unavailable("down".to_string()));
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
