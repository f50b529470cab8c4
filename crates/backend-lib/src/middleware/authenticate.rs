// ============================
// crates/backend-lib/src/middleware/authenticate.rs
// ============================
//! Bearer-token authentication middleware.
//!
//! Runs once per request and walks `Start → TokenExtracted → Verified → Bound`.
//! Every failure ends the walk with no identity bound and the request keeps
//! going down the chain; rejecting anonymous callers is left to the
//! [`CurrentIdentity`](crate::auth::CurrentIdentity) extractor. A request
//! that already carries an identity is passed through without touching the
//! token or the identity store.
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crate::auth::{IdentityResolver, RequestIdentityContext, TokenCodec};
use crate::AppState;

/// Exact, case-sensitive scheme prefix of the Authorization header
pub const BEARER_PREFIX: &str = "Bearer ";

/// Where the authentication walk stopped, for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    TokenExtracted,
    Verified,
    Bound,
}

/// Token carried by an `Authorization: Bearer <token>` header, if any
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
}

/// Verify the request's bearer token and resolve its subject.
///
/// Returns `None` for every failure; the reason is only logged.
pub async fn establish_identity(
    tokens: &TokenCodec,
    identities: &IdentityResolver,
    headers: &HeaderMap,
) -> Option<RequestIdentityContext> {
    let Some(token) = bearer_token(headers) else {
        debug!(stage = ?Stage::Start, "no bearer token on request");
        return None;
    };

    let claims = match tokens.verify(token) {
        Ok(claims) => claims,
        Err(e) => {
            warn!(stage = ?Stage::TokenExtracted, reason = %e, "bearer token rejected");
            return None;
        },
    };

    let principal = match identities.resolve(&claims.sub).await {
        Ok(principal) => principal,
        Err(e) => {
            warn!(
                stage = ?Stage::Verified,
                username = %claims.sub,
                reason = %e,
                "token subject not resolved"
            );
            return None;
        },
    };
    if !principal.enabled {
        warn!(
            stage = ?Stage::Verified,
            username = %principal.username,
            "token subject is disabled"
        );
        return None;
    }

    Some(RequestIdentityContext::from(principal))
}

/// Axum middleware binding a [`RequestIdentityContext`] to authenticated requests
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    if request.extensions().get::<RequestIdentityContext>().is_some() {
        debug!(stage = ?Stage::Start, "identity already bound, skipping token");
        return next.run(request).await;
    }

    if let Some(identity) =
        establish_identity(&state.tokens, &state.identities, request.headers()).await
    {
        debug!(stage = ?Stage::Bound, username = %identity.username, "identity bound");
        request.extensions_mut().insert(identity);
    }

    next.run(request).await
}
