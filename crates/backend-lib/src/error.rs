// crates/backend-lib/src/error.rs

//! Central error type + Axum integration.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use finance_common::{ErrorBody, ErrorDetail};
use thiserror::Error;

/// Failures raised while issuing, verifying or resolving credentials.
///
/// None of these ever escape the authentication interceptor; they only
/// reach a client through the login endpoint or through an extractor that
/// demands an identity.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Malformed token")]
    MalformedToken,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Unknown subject: {0}")]
    UnknownSubject(String),

    #[error("Key material error: {0}")]
    KeyMaterial(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account disabled")]
    AccountDisabled,
}

/// Application error types with error codes and context
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Missing required role: {0}")]
    Forbidden(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Auth(_) | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Auth(AuthError::MalformedToken) => "AUTH_001",
            AppError::Auth(AuthError::InvalidSignature) => "AUTH_002",
            AppError::Auth(AuthError::ExpiredToken) => "AUTH_003",
            AppError::Auth(AuthError::UnknownSubject(_)) => "AUTH_004",
            AppError::Auth(AuthError::KeyMaterial(_)) => "AUTH_005",
            AppError::Auth(AuthError::InvalidCredentials) => "AUTH_006",
            AppError::Auth(AuthError::AccountDisabled) => "AUTH_007",
            AppError::Unauthorized => "AUTH_401",
            AppError::Forbidden(_) => "AUTH_403",
            AppError::InvalidInput(_) => "VAL_001",
            AppError::Conflict(_) => "VAL_002",
            AppError::Internal(_) => "INT_001",
            AppError::Config(_) => "CFG_001",
            AppError::Json(_) => "JSON_001",
        }
    }

    /// Get a sanitized message suitable for production use
    pub fn sanitized_message(&self) -> String {
        match self {
            AppError::Auth(AuthError::InvalidCredentials) => {
                "Invalid username or password".to_string()
            },
            AppError::Auth(_) | AppError::Unauthorized => "Authentication failed".to_string(),
            AppError::Forbidden(_) => "Access denied".to_string(),
            AppError::InvalidInput(_) => "Invalid input provided".to_string(),
            AppError::Conflict(_) => "Resource already exists".to_string(),
            AppError::Json(_) => "Invalid request format".to_string(),
            AppError::Internal(_) | AppError::Config(_) => {
                "An internal server error occurred".to_string()
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Use detailed messages in development, sanitized in production
        let message = if cfg!(debug_assertions) {
            self.to_string()
        } else {
            self.sanitized_message()
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message,
            },
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Internal(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Internal(msg.to_string())
    }
}
