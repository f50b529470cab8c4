use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use finance_common::{CurrentUser, LoginResponse, RegisterRequest, RegisterResponse, TOKEN_TYPE};
use tracing::{info, warn};

use crate::auth::{
    hash_password, now_ms, verify_password, AuthService, IdentityStore, TokenCodec, UserRecord,
};
use crate::error::{AppError, AuthError};
use crate::id::IdGenerator;

/// Role given to self-registered accounts
pub const DEFAULT_ROLE: &str = "USER";

const USERNAME_LEN: std::ops::RangeInclusive<usize> = 3..=50;
const MIN_PASSWORD_LEN: usize = 6;

pub struct DefaultAuth {
    store: Arc<dyn IdentityStore>,
    tokens: Arc<TokenCodec>,
    ids: Arc<IdGenerator>,
}

impl DefaultAuth {
    pub fn new(
        store: Arc<dyn IdentityStore>,
        tokens: Arc<TokenCodec>,
        ids: Arc<IdGenerator>,
    ) -> Self {
        Self { store, tokens, ids }
    }

    async fn create_account(
        &self,
        username: &str,
        email: &str,
        password: &str,
        roles: &str,
    ) -> Result<UserRecord, AppError> {
        let plain = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&plain))
            .await
            .map_err(|e| AppError::Internal(format!("hashing task failed: {e}")))??;

        let record = UserRecord {
            id: self.ids.next(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            roles: roles.to_string(),
            enabled: true,
            created_at: Utc::now(),
        };
        self.store.insert(record.clone()).await?;
        info!(username, id = %record.id, "account created");
        Ok(record)
    }
}

fn validate_registration(request: &RegisterRequest) -> Result<(), AppError> {
    let username = request.username.trim();
    if !USERNAME_LEN.contains(&username.chars().count()) {
        return Err(AppError::InvalidInput(
            "username must be between 3 and 50 characters".to_string(),
        ));
    }
    if username != request.username {
        return Err(AppError::InvalidInput(
            "username must not start or end with whitespace".to_string(),
        ));
    }
    if !request.email.contains('@') {
        return Err(AppError::InvalidInput("email is not valid".to_string()));
    }
    if request.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::InvalidInput(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

#[async_trait]
impl AuthService for DefaultAuth {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, AppError> {
        let Some(record) = self.store.find_by_username(username).await? else {
            warn!(username, "login for unknown account");
            return Err(AuthError::InvalidCredentials.into());
        };

        let hash = record.password_hash.clone();
        let plain = password.to_string();
        let matches = tokio::task::spawn_blocking(move || verify_password(&hash, &plain))
            .await
            .map_err(|e| AppError::Internal(format!("verification task failed: {e}")))?;
        if !matches {
            warn!(username, "login with wrong password");
            return Err(AuthError::InvalidCredentials.into());
        }
        if !record.enabled {
            warn!(username, "login for disabled account");
            return Err(AuthError::AccountDisabled.into());
        }

        let issued_at = now_ms();
        let token = self.tokens.issue(&record.username, &record.roles, issued_at)?;
        let ttl = i64::try_from(self.tokens.ttl_ms()).unwrap_or(i64::MAX);
        let expires_at = DateTime::<Utc>::from_timestamp_millis(issued_at.saturating_add(ttl))
            .ok_or_else(|| AppError::Internal("token expiry out of range".to_string()))?;

        info!(username, "login succeeded");
        Ok(LoginResponse {
            token,
            token_type: TOKEN_TYPE.to_string(),
            username: record.username,
            email: record.email,
            roles: record.roles,
            expires_at,
        })
    }

    async fn register(&self, request: RegisterRequest) -> Result<RegisterResponse, AppError> {
        validate_registration(&request)?;
        if self.store.find_by_username(&request.username).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "username '{}' already exists",
                request.username
            )));
        }
        if self.store.find_by_email(&request.email).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "email '{}' already exists",
                request.email
            )));
        }

        let record = self
            .create_account(&request.username, &request.email, &request.password, DEFAULT_ROLE)
            .await?;

        Ok(RegisterResponse {
            id: record.id,
            username: record.username,
            email: record.email,
            roles: record.roles,
            enabled: record.enabled,
            created_at: record.created_at,
        })
    }

    async fn ensure_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        roles: &str,
    ) -> Result<bool, AppError> {
        if self.store.find_by_username(username).await?.is_some() {
            info!(username, "account already exists");
            return Ok(false);
        }
        self.create_account(username, email, password, roles).await?;
        Ok(true)
    }

    async fn current_user(&self, username: &str) -> Result<CurrentUser, AppError> {
        let record = self
            .store
            .find_by_username(username)
            .await?
            .ok_or_else(|| AuthError::UnknownSubject(username.to_string()))?;

        Ok(CurrentUser {
            id: record.id,
            username: record.username,
            email: record.email,
            roles: record.roles,
            enabled: record.enabled,
            created_at: record.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{InMemoryIdentityStore, SigningKey};

    fn service() -> (DefaultAuth, Arc<InMemoryIdentityStore>, Arc<TokenCodec>) {
        let store = Arc::new(InMemoryIdentityStore::new());
        let tokens = Arc::new(TokenCodec::new(SigningKey::derive("service-secret"), 60_000));
        let auth = DefaultAuth::new(store.clone(), tokens.clone(), Arc::new(IdGenerator::new()));
        (auth, store, tokens)
    }

    fn registration(username: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn register_then_login() {
        let (auth, _store, tokens) = service();

        let created = auth.register(registration("alice", "secret123")).await.unwrap();
        assert!(IdGenerator::validate(&created.id));
        assert_eq!(created.roles, "USER");
        assert!(created.enabled);

        let login = auth.login("alice", "secret123").await.unwrap();
        assert_eq!(login.token_type, "Bearer");
        assert_eq!(login.roles, "USER");
        assert!(login.expires_at > Utc::now());

        let claims = tokens.verify(&login.token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.roles, "USER");
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_look_the_same() {
        let (auth, _store, _tokens) = service();
        auth.register(registration("alice", "secret123")).await.unwrap();

        let wrong = auth.login("alice", "nope").await.unwrap_err();
        let unknown = auth.login("ghost", "secret123").await.unwrap_err();
        assert!(matches!(wrong, AppError::Auth(AuthError::InvalidCredentials)));
        assert!(matches!(unknown, AppError::Auth(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn disabled_account_cannot_log_in() {
        let (auth, store, _tokens) = service();
        store
            .insert(UserRecord {
                id: IdGenerator::new().next(),
                username: "dora".to_string(),
                email: "dora@example.com".to_string(),
                password_hash: hash_password("secret123").unwrap(),
                roles: "USER".to_string(),
                enabled: false,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let err = auth.login("dora", "secret123").await.unwrap_err();
        assert!(matches!(err, AppError::Auth(AuthError::AccountDisabled)));
    }

    #[tokio::test]
    async fn registration_is_validated() {
        let (auth, _store, _tokens) = service();

        for request in [
            registration("al", "secret123"),
            registration(&"x".repeat(51), "secret123"),
            registration(" alice", "secret123"),
            registration("alice", "short"),
            RegisterRequest {
                username: "alice".to_string(),
                email: "not-an-email".to_string(),
                password: "secret123".to_string(),
            },
        ] {
            let err = auth.register(request).await.unwrap_err();
            assert!(matches!(err, AppError::InvalidInput(_)));
        }
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let (auth, _store, _tokens) = service();
        auth.register(registration("alice", "secret123")).await.unwrap();

        let err = auth.register(registration("alice", "other-pass")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let (auth, store, _tokens) = service();
        let mut alice = registration("alice", "secret123");
        alice.email = "same@example.com".to_string();
        auth.register(alice).await.unwrap();

        let mut bob = registration("bob", "secret123");
        bob.email = "same@example.com".to_string();
        let err = auth.register(bob).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref msg) if msg.contains("email")));
        assert!(store.find_by_username("bob").await.unwrap().is_none());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn ensure_user_is_idempotent() {
        let (auth, store, _tokens) = service();

        for expected in [true, false] {
            let created = auth
                .ensure_user("admin", "admin@example.com", "changeme", "USER,ADMIN")
                .await
                .unwrap();
            assert_eq!(created, expected);
        }
        assert_eq!(store.len(), 1);

        let me = auth.current_user("admin").await.unwrap();
        assert_eq!(me.roles, "USER,ADMIN");
    }

    #[tokio::test]
    async fn current_user_for_missing_account() {
        let (auth, _store, _tokens) = service();
        let err = auth.current_user("ghost").await.unwrap_err();
        assert!(matches!(err, AppError::Auth(AuthError::UnknownSubject(_))));
    }
}
