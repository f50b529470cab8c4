// ============================
// crates/backend-lib/src/auth/identity.rs
// ============================
//! Identity lookup: username → principal.
use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

use crate::error::{AppError, AuthError};

/// Marker prepended to every normalized role tag
pub const ROLE_PREFIX: &str = "ROLE_";

/// A stored account, as the identity store hands it out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    /// Comma-joined role names, e.g. `"USER,ADMIN"`
    pub roles: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

/// Normalized role tags (`ROLE_USER`, `ROLE_ADMIN`, ...)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSet(BTreeSet<String>);

impl RoleSet {
    /// Parse a comma-joined role list: entries are trimmed, empty entries
    /// dropped, names uppercased and prefixed with [`ROLE_PREFIX`].
    pub fn from_csv(csv: &str) -> Self {
        Self(
            csv.split(',')
                .map(str::trim)
                .filter(|role| !role.is_empty())
                .map(|role| format!("{ROLE_PREFIX}{}", role.to_uppercase()))
                .collect(),
        )
    }

    /// Accepts either `"ADMIN"` or `"ROLE_ADMIN"`
    pub fn contains(&self, role: &str) -> bool {
        let upper = role.to_uppercase();
        if upper.starts_with(ROLE_PREFIX) {
            self.0.contains(&upper)
        } else {
            self.0.contains(&format!("{ROLE_PREFIX}{upper}"))
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The identity backing an authenticated user. Read-only to this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub username: String,
    pub password_hash: String,
    pub roles: RoleSet,
    pub enabled: bool,
}

impl From<&UserRecord> for Principal {
    fn from(record: &UserRecord) -> Self {
        Self {
            username: record.username.clone(),
            password_hash: record.password_hash.clone(),
            roles: RoleSet::from_csv(&record.roles),
            enabled: record.enabled,
        }
    }
}

/// Account storage the authentication layer reads from
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Look an account up by its exact username
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, AppError>;

    /// Look an account up by its exact email address
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError>;

    /// Persist a new account; fails with `Conflict` when the username or the
    /// email is taken
    async fn insert(&self, record: UserRecord) -> Result<(), AppError>;
}

/// In-process identity store keyed by username, with a secondary email index
#[derive(Debug, Clone, Default)]
pub struct InMemoryIdentityStore {
    users: Arc<DashMap<String, UserRecord>>,
    /// email -> username
    emails: Arc<DashMap<String, String>>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, AppError> {
        Ok(self.users.get(username).map(|entry| entry.value().clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError> {
        let Some(username) = self.emails.get(email).map(|entry| entry.value().clone()) else {
            return Ok(None);
        };
        Ok(self.users.get(&username).map(|entry| entry.value().clone()))
    }

    async fn insert(&self, record: UserRecord) -> Result<(), AppError> {
        let username = record.username.clone();
        let email = record.email.clone();

        // email claim precedes the username insert and is released on a username conflict
        let mut email_claimed = false;
        self.emails.entry(email.clone()).or_insert_with(|| {
            email_claimed = true;
            username.clone()
        });
        if !email_claimed {
            return Err(AppError::Conflict(format!("email '{email}' already exists")));
        }

        let mut inserted = false;
        self.users.entry(username.clone()).or_insert_with(|| {
            inserted = true;
            record
        });

        if inserted {
            Ok(())
        } else {
            self.emails.remove(&email);
            Err(AppError::Conflict(format!("username '{username}' already exists")))
        }
    }
}

/// Turns usernames into principals via an [`IdentityStore`]
#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn IdentityStore>,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn IdentityStore> {
        &self.store
    }

    /// Resolve `username` to a principal with normalized roles
    pub async fn resolve(&self, username: &str) -> Result<Principal, AppError> {
        match self.store.find_by_username(username).await? {
            Some(record) => Ok(Principal::from(&record)),
            None => {
                debug!(username, "no identity for subject");
                Err(AuthError::UnknownSubject(username.to_string()).into())
            },
        }
    }
}
