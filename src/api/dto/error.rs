//! Error response DTOs.

use serde::Serialize;
use serde_json::Value as JsonValue;
use utoipa::ToSchema;

/// Standard error response format.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ErrorResponse {
    /// Creates a new error response with code and message.
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            details: None,
            request_id: None,
        }
    }

    /// Adds structured details to the error response.
    pub fn with_details(mut self, details: JsonValue) -> Self {
        self.details = Some(details);
        self
    }

    /// Adds request ID to the error response for correlation.
    pub fn with_request_id(mut self, request_id: &str) -> Self {
        self.request_id = Some(request_id.to_string());
        self
    }

    pub fn not_found_error(entity: &str, field: &str, value: &str) -> Self {
        Self::new(
            "NOT_FOUND",
            &format!("{} with {}={} was not found", entity, field, value),
        )
    }

    pub fn duplicate_error(entity: &str, field: &str, value: &str) -> Self {
        Self::new(
            "DUPLICATE_ENTRY",
            &format!("{}.{} = '{}' already exists", entity, field, value),
        )
    }

    pub fn validation_error(field: &str, reason: &str) -> Self {
        Self::new("VALIDATION_ERROR", &format!("{}: {}", field, reason))
    }
}
