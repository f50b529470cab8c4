// ================
// common/src/lib.rs
// ================
//! Common types and structures
//! used for communication between finance API clients and the backend.
//! This module defines the authentication request/response bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scheme reported alongside every issued token
pub const TOKEN_TYPE: &str = "Bearer";

/// Credentials posted to the login endpoint
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Successful login
/// # Fields
/// * `token` - Signed bearer token
/// * `token_type` - Always `"Bearer"`
/// * `roles` - Comma-joined role list as stored for the account
/// * `expires_at` - Instant after which the token is rejected
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    #[serde(rename = "type")]
    pub token_type: String,
    pub username: String,
    pub email: String,
    pub roles: String,
    pub expires_at: DateTime<Utc>,
}

/// Account creation request
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Newly created account
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub roles: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

/// Result of asking whether the presented token established an identity
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ValidateResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authorities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// The authenticated caller as seen by `/auth/me`
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub roles: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

/// Error envelope returned by every failing endpoint
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Machine-readable code plus a human-readable message
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_response_uses_camel_case_and_type_field() {
        let response = LoginResponse {
            token: "a.b.c".to_string(),
            token_type: TOKEN_TYPE.to_string(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            roles: "USER,ADMIN".to_string(),
            expires_at: Utc::now(),
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["type"], "Bearer");
        assert!(json.get("expiresAt").is_some());
        assert!(json.get("token_type").is_none());
    }

    #[test]
    fn validate_response_omits_empty_fields() {
        let response = ValidateResponse {
            valid: false,
            username: None,
            authorities: Vec::new(),
            message: Some("Token invalid or expired".to_string()),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(
            json,
            r#"{"valid":false,"message":"Token invalid or expired"}"#
        );
    }
}
