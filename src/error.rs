//! Error types for Biblio server

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Stable numeric error codes returned in every error body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    Forbidden = 3,
    NoSuchUser = 4,
    NoSuchBook = 5,
    Duplicate = 8,
    BadValue = 18,
    RateLimited = 22,
    Misconfigured = 23,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing, invalid or expired credentials (HTTP 401)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Authenticated but not allowed (HTTP 403)
    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Too many requests: {message}")]
    TooManyRequests { message: String, retry_after: u64 },

    /// Raised while assembling the application state; never at request time
    #[error("Misconfigured: {0}")]
    Misconfigured(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) | AppError::UserNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Misconfigured(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (code, message) = match &self {
            AppError::Authentication(msg) => (ErrorCode::NotAuthorized, msg.clone()),
            AppError::Authorization(msg) => (ErrorCode::Forbidden, msg.clone()),
            AppError::NotFound(msg) => (ErrorCode::NoSuchBook, msg.clone()),
            AppError::UserNotFound(msg) => (ErrorCode::NoSuchUser, msg.clone()),
            AppError::Validation(msg) => (ErrorCode::BadValue, msg.clone()),
            AppError::Conflict(msg) => (ErrorCode::Duplicate, msg.clone()),
            AppError::TooManyRequests { message, .. } => {
                (ErrorCode::RateLimited, message.clone())
            }
            AppError::Misconfigured(msg) => {
                tracing::error!("Misconfiguration reached a request: {}", msg);
                (
                    ErrorCode::Misconfigured,
                    "Server is misconfigured".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (ErrorCode::Failure, "Internal server error".to_string())
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        let mut response = (status, body).into_response();
        match &self {
            AppError::Authentication(_) => {
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
            }
            AppError::TooManyRequests { retry_after, .. } => {
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(*retry_after));
            }
            _ => {}
        }
        response
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
