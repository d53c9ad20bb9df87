// Error handling types for the API

use axum::{
    http::{HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::fmt;
use tracing::error;

use super::validation::ValidationResult;
use crate::db::DbError;
use crate::services::google::GoogleError;
use crate::services::users::UserError;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    BadRequest(String),
    NotFound(String),
    InternalServer(String),
    ServiceUnavailable(String),
    NotImplemented(String),
    DatabaseError(DbError),
    ValidationError(String),
    RateLimited { retry_after: u64 },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ApiError::InternalServer(msg) => write!(f, "Internal Server Error: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service Unavailable: {}", msg),
            ApiError::NotImplemented(msg) => write!(f, "Not Implemented: {}", msg),
            ApiError::DatabaseError(e) => write!(f, "Database Error: {}", e),
            ApiError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
            ApiError::RateLimited { retry_after } => {
                write!(f, "Rate limit exceeded, retry after {}s", retry_after)
            }
        }
    }
}

/// JSON error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let mut retry_after = None;
        let (status, error_message, code) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, "UNAUTHORIZED"),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, "BAD_REQUEST"),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, "NOT_FOUND"),
            ApiError::InternalServer(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                msg,
                "INTERNAL_SERVER_ERROR",
            ),
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                msg,
                "SERVICE_UNAVAILABLE",
            ),
            ApiError::NotImplemented(msg) => (StatusCode::NOT_IMPLEMENTED, msg, "NOT_IMPLEMENTED"),
            ApiError::DatabaseError(DbError::StoreUnavailable(target)) => (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("{} store unavailable", target),
                "SERVICE_UNAVAILABLE",
            ),
            ApiError::DatabaseError(e) => {
                error!(error = %e, "Database error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database operation failed".to_string(),
                    "DATABASE_ERROR",
                )
            }
            ApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg, "VALIDATION_ERROR"),
            ApiError::RateLimited { retry_after: secs } => {
                retry_after = Some(secs);
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    "Rate limit exceeded. Please try again later.".to_string(),
                    "RATE_LIMIT_EXCEEDED",
                )
            }
        };

        let error_response = ErrorResponse {
            error: error_message,
            code: code.to_string(),
            retry_after,
        };

        let mut response = (status, Json(error_response)).into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert("retry-after", value);
            }
        }
        response
    }
}

/// Helper function to convert ValidationResult to ApiError
impl From<ValidationResult> for ApiError {
    fn from(result: ValidationResult) -> Self {
        if result.is_valid {
            ApiError::InternalServer(
                "Validation result was valid but converted to error".to_string(),
            )
        } else {
            let error_messages: Vec<String> = result
                .errors
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect();
            ApiError::ValidationError(error_messages.join(", "))
        }
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        ApiError::DatabaseError(e)
    }
}

impl From<UserError> for ApiError {
    fn from(e: UserError) -> Self {
        match e {
            UserError::DuplicateEmail => {
                ApiError::BadRequest("User with this email already exists".to_string())
            }
            UserError::EmailRegisteredWithOtherMethod => ApiError::BadRequest(
                "Email already registered with different method".to_string(),
            ),
            UserError::InvalidCredentials => {
                ApiError::Unauthorized("Invalid credentials".to_string())
            }
            UserError::NotFound => ApiError::NotFound("User not found".to_string()),
            UserError::PasswordHash(msg) => {
                error!(error = %msg, "Password hashing failed");
                ApiError::InternalServer("Operation failed".to_string())
            }
            UserError::Database(db) => ApiError::DatabaseError(db),
        }
    }
}

impl From<GoogleError> for ApiError {
    fn from(e: GoogleError) -> Self {
        match e {
            GoogleError::NotConfigured => {
                ApiError::NotImplemented("Google OAuth not configured".to_string())
            }
            GoogleError::InvalidToken(msg) => ApiError::Unauthorized(msg),
            GoogleError::MissingClaims => {
                ApiError::BadRequest("token missing required fields".to_string())
            }
            GoogleError::RequestFailed(msg) => {
                error!(error = %msg, "Google token validation request failed");
                ApiError::ServiceUnavailable(
                    "google token validation service unavailable".to_string(),
                )
            }
        }
    }
}
