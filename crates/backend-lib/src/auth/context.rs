// ============================
// crates/backend-lib/src/auth/context.rs
// ============================
//! Per-request identity and the extractors handlers use to demand it.
use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};

use super::identity::{Principal, RoleSet};
use crate::error::AppError;

/// Identity bound to a single request by the authentication middleware.
///
/// Lives in the request's extensions; it is created for one request and
/// dropped with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestIdentityContext {
    pub username: String,
    pub roles: RoleSet,
}

impl RequestIdentityContext {
    /// `Forbidden` unless the identity carries `role` (with or without the `ROLE_` marker)
    pub fn require_role(&self, role: &str) -> Result<(), AppError> {
        if self.roles.contains(role) {
            Ok(())
        } else {
            Err(AppError::Forbidden(role.to_string()))
        }
    }
}

impl From<Principal> for RequestIdentityContext {
    fn from(principal: Principal) -> Self {
        Self {
            username: principal.username,
            roles: principal.roles,
        }
    }
}

/// Extractor for handlers that require an authenticated caller.
/// Rejects with 401 when no identity was bound.
#[derive(Debug, Clone)]
pub struct CurrentIdentity(pub RequestIdentityContext);

impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestIdentityContext>()
            .cloned()
            .map(CurrentIdentity)
            .ok_or(AppError::Unauthorized)
    }
}

/// Extractor that never rejects; `None` for anonymous requests.
#[derive(Debug, Clone)]
pub struct MaybeIdentity(pub Option<RequestIdentityContext>);

impl<S> FromRequestParts<S> for MaybeIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeIdentity(
            parts.extensions.get::<RequestIdentityContext>().cloned(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn identity(roles: &str) -> RequestIdentityContext {
        RequestIdentityContext {
            username: "alice".to_string(),
            roles: RoleSet::from_csv(roles),
        }
    }

    #[test]
    fn require_role() {
        let ctx = identity("USER,ADMIN");
        assert!(ctx.require_role("ADMIN").is_ok());
        assert!(ctx.require_role("ROLE_USER").is_ok());
        assert!(matches!(
            identity("USER").require_role("ADMIN"),
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn extractors_read_request_extensions() {
        let (mut parts, _) = Request::new(()).into_parts();

        assert!(matches!(
            CurrentIdentity::from_request_parts(&mut parts, &()).await,
            Err(AppError::Unauthorized)
        ));
        let MaybeIdentity(none) = MaybeIdentity::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(none.is_none());

        parts.extensions.insert(identity("USER"));
        let CurrentIdentity(found) = CurrentIdentity::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(found.username, "alice");
    }
}
