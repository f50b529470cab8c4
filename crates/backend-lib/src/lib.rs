// ============================
// finance-backend-lib/src/lib.rs
// ============================
//! Authentication core and identifier generation for the finance backend.

pub mod auth;
pub mod config;
pub mod error;
pub mod id;
pub mod middleware;
pub mod router;

use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::{
    AuthService, DefaultAuth, IdentityResolver, IdentityStore, InMemoryIdentityStore, TokenCodec,
};
use crate::config::Settings;
use crate::error::AppError;
use crate::id::IdGenerator;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Settings the state was built from
    pub settings: Arc<Settings>,
    /// Token issuing and verification
    pub tokens: Arc<TokenCodec>,
    /// Username to principal lookup
    pub identities: Arc<IdentityResolver>,
    /// Identifier source for new records
    pub ids: Arc<IdGenerator>,
    /// Login and account service
    pub auth: Arc<dyn AuthService>,
}

impl AppState {
    /// Create a new application state over an identity store
    pub fn new(settings: Settings, store: Arc<dyn IdentityStore>) -> Result<Self, AppError> {
        settings.validate()?;
        if settings.jwt.uses_default_secret() {
            warn!("jwt.secret is the built-in default; override it for any real deployment");
        }

        let tokens = Arc::new(TokenCodec::from_settings(&settings.jwt));
        let ids = Arc::new(IdGenerator::new());
        let identities = Arc::new(IdentityResolver::new(store.clone()));
        let auth = Arc::new(DefaultAuth::new(store, tokens.clone(), ids.clone()));

        Ok(Self {
            settings: Arc::new(settings),
            tokens,
            identities,
            ids,
            auth,
        })
    }

    /// Create a new application state backed by an in-memory identity store
    pub fn in_memory(settings: Settings) -> Result<Self, AppError> {
        Self::new(settings, Arc::new(InMemoryIdentityStore::new()))
    }

    /// Seed the configured bootstrap account, if any
    pub async fn seed_bootstrap_user(&self) -> Result<(), AppError> {
        let Some(user) = self.settings.bootstrap_user.as_ref() else {
            return Ok(());
        };

        let created = self
            .auth
            .ensure_user(
                &user.username,
                &user.email,
                user.password.expose_secret(),
                &user.roles,
            )
            .await?;
        if created {
            info!(username = %user.username, "bootstrap account created");
        }
        Ok(())
    }
}
