//! Error handler for converting AppError to HTTP responses.
//!
//! Implements IntoResponse for AppError with status code mapping and
//! sanitized messages: internal sources are logged, never echoed.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::api::dto::ErrorResponse;
use crate::error::AppError;

impl IntoResponse for AppError {
    /// # Status Code Mapping
    /// - NotFound → 404
    /// - Duplicate → 409
    /// - Validation / ValidationErrors / BadRequest → 400
    /// - UnprocessableContent → 422
    /// - Unauthorized → 401, Forbidden → 403
    /// - Database / Configuration / Internal → 500
    /// - ConnectionPool → 503
    fn into_response(self) -> Response {
        let (status, error_response) = error_to_parts(&self);

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        (status, Json(error_response)).into_response()
    }
}

/// Maps an AppError onto its status code and response body.
pub fn error_to_parts(error: &AppError) -> (StatusCode, ErrorResponse) {
    match error {
        AppError::NotFound {
            entity,
            field,
            value,
        } => (
            StatusCode::NOT_FOUND,
            ErrorResponse::not_found_error(entity, field, value),
        ),
        AppError::Duplicate {
            entity,
            field,
            value,
        } => (
            StatusCode::CONFLICT,
            ErrorResponse::duplicate_error(entity, field, value),
        ),
        AppError::Validation { field, reason } => (
            StatusCode::BAD_REQUEST,
            ErrorResponse::validation_error(field, reason),
        ),
        AppError::ValidationErrors { errors } => (
            StatusCode::BAD_REQUEST,
            ErrorResponse::new("VALIDATION_ERROR", "Request validation failed").with_details(
                json!({
                    "errors": errors,
                }),
            ),
        ),
        AppError::BadRequest { message } => (
            StatusCode::BAD_REQUEST,
            ErrorResponse::new("BAD_REQUEST", message),
        ),
        AppError::UnprocessableContent { message } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorResponse::new("UNPROCESSABLE_CONTENT", message),
        ),
        AppError::Unauthorized { message } => (
            StatusCode::UNAUTHORIZED,
            ErrorResponse::new("UNAUTHORIZED", message),
        ),
        AppError::Forbidden { message } => (
            StatusCode::FORBIDDEN,
            ErrorResponse::new("FORBIDDEN", message),
        ),
        AppError::Database { operation, .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse::new(
                "DATABASE_ERROR",
                &format!("Database operation failed: {}", operation),
            ),
        ),
        AppError::Configuration { key, .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse::new("CONFIGURATION_ERROR", &format!("Configuration error: {}", key)),
        ),
        AppError::ConnectionPool { .. } => (
            StatusCode::SERVICE_UNAVAILABLE,
            ErrorResponse::new("SERVICE_UNAVAILABLE", "Database connection unavailable"),
        ),
        AppError::Internal { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse::new("INTERNAL_ERROR", "An internal error occurred"),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let error = AppError::NotFound {
            entity: "Campaign".to_string(),
            field: "id".to_string(),
            value: "9".to_string(),
        };
        let (status, body) = error_to_parts(&error);
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.code, "NOT_FOUND");
    }

    #[test]
    fn bad_request_maps_to_400() {
        let error = AppError::BadRequest {
            message: "Campaign is already running".to_string(),
        };
        let (status, body) = error_to_parts(&error);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.message, "Campaign is already running");
    }

    #[test]
    fn internal_error_is_sanitized() {
        let error = AppError::Internal {
            source: anyhow::anyhow!("connection string with password"),
        };
        let (status, body) = error_to_parts(&error);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.message.contains("password"));
    }

    #[test]
    fn validation_errors_carry_field_details() {
        let error = AppError::ValidationErrors {
            errors: vec![crate::error::ValidationFieldError {
                field: "daily_cap".to_string(),
                message: "out of range".to_string(),
            }],
        };
        let (status, body) = error_to_parts(&error);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let details = body.details.unwrap();
        assert_eq!(details["errors"][0]["field"], "daily_cap");
    }

    #[test]
    fn pool_errors_are_service_unavailable() {
        let error = AppError::ConnectionPool {
            source: anyhow::anyhow!("pool exhausted"),
        };
        let (status, _) = error_to_parts(&error);
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
