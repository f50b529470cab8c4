use async_trait::async_trait;
use finance_common::{CurrentUser, LoginResponse, RegisterRequest, RegisterResponse};

use crate::error::AppError;

/// Account-facing authentication operations
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Check credentials and issue a bearer token
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, AppError>;

    /// Create a new enabled account with the `USER` role
    async fn register(&self, request: RegisterRequest) -> Result<RegisterResponse, AppError>;

    /// Create an account with the given roles unless the username exists.
    /// Returns whether an account was created.
    async fn ensure_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        roles: &str,
    ) -> Result<bool, AppError>;

    /// Profile of an existing account
    async fn current_user(&self, username: &str) -> Result<CurrentUser, AppError>;
}
