// ============================
// finance-backend-lib/src/router.rs
// ============================
//! HTTP routes for the authentication surface.
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use finance_common::{
    CurrentUser, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, ValidateResponse,
};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::{CurrentIdentity, MaybeIdentity};
use crate::error::AppError;
use crate::middleware::authenticate;
use crate::AppState;

/// Create the router. Every route sits behind the authentication middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .route("/auth/validate", get(validate))
        .route("/auth/health", get(health))
        .layer(middleware::from_fn_with_state(state.clone(), authenticate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let response = state.auth.login(&request.username, &request.password).await?;
    Ok(Json(response))
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let response = state.auth.register(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Tokens are stateless: nothing is revoked, the caller just drops its token
async fn logout(MaybeIdentity(identity): MaybeIdentity) -> Json<Value> {
    if let Some(identity) = identity {
        info!(username = %identity.username, "logout");
    }
    Json(json!({
        "message": "Logged out",
        "note": "The token stays valid until it expires",
    }))
}

async fn me(
    State(state): State<Arc<AppState>>,
    CurrentIdentity(identity): CurrentIdentity,
) -> Result<Json<CurrentUser>, AppError> {
    Ok(Json(state.auth.current_user(&identity.username).await?))
}

async fn validate(MaybeIdentity(identity): MaybeIdentity) -> (StatusCode, Json<ValidateResponse>) {
    match identity {
        Some(identity) => (
            StatusCode::OK,
            Json(ValidateResponse {
                valid: true,
                authorities: identity.roles.iter().map(str::to_string).collect(),
                username: Some(identity.username),
                message: None,
            }),
        ),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(ValidateResponse {
                valid: false,
                username: None,
                authorities: Vec::new(),
                message: Some("Token invalid or expired".to_string()),
            }),
        ),
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "UP" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::Request,
    };
    use tower::ServiceExt;

    use crate::config::Settings;

    fn app() -> Router {
        create_router(Arc::new(AppState::in_memory(Settings::default()).unwrap()))
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_with_token(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_is_public() {
        let (status, body) = send(&app(), get_with_token("/auth/health", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "UP");
    }

    #[tokio::test]
    async fn register_login_me_flow() {
        let app = app();

        let (status, created) = send(
            &app,
            post_json(
                "/auth/register",
                json!({"username": "alice", "email": "alice@example.com", "password": "secret123"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(created["id"].as_str().unwrap().starts_with('c'));

        let (status, login) = send(
            &app,
            post_json("/auth/login", json!({"username": "alice", "password": "secret123"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(login["type"], "Bearer");
        let token = login["token"].as_str().unwrap().to_string();

        let (status, me) = send(&app, get_with_token("/auth/me", Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["username"], "alice");
        assert_eq!(me["id"], created["id"]);

        let (status, validated) = send(&app, get_with_token("/auth/validate", Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(validated["valid"], true);
        assert_eq!(validated["authorities"], json!(["ROLE_USER"]));
    }

    #[tokio::test]
    async fn logout_does_not_revoke_the_token() {
        let app = app();
        send(
            &app,
            post_json(
                "/auth/register",
                json!({"username": "alice", "email": "alice@example.com", "password": "secret123"}),
            ),
        )
        .await;
        let (_, login) = send(
            &app,
            post_json("/auth/login", json!({"username": "alice", "password": "secret123"})),
        )
        .await;
        let token = login["token"].as_str().unwrap().to_string();

        let logout = Request::builder()
            .method("POST")
            .uri("/auth/logout")
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, logout).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Logged out");

        let (status, me) = send(&app, get_with_token("/auth/me", Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["username"], "alice");

        // anonymous logout is accepted too
        let anonymous = Request::builder()
            .method("POST")
            .uri("/auth/logout")
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&app, anonymous).await.0, StatusCode::OK);
    }

    #[tokio::test]
    async fn duplicate_email_registration_conflicts() {
        let app = app();
        let (status, _) = send(
            &app,
            post_json(
                "/auth/register",
                json!({"username": "alice", "email": "same@example.com", "password": "secret123"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(
            &app,
            post_json(
                "/auth/register",
                json!({"username": "bob", "email": "same@example.com", "password": "secret123"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "VAL_002");
    }

    #[tokio::test]
    async fn bad_credentials_are_unauthorized() {
        let (status, body) = send(
            &app(),
            post_json("/auth/login", json!({"username": "ghost", "password": "whatever"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "AUTH_006");
    }

    #[tokio::test]
    async fn protected_routes_reject_anonymous_callers() {
        let app = app();

        let (status, _) = send(&app, get_with_token("/auth/me", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) =
            send(&app, get_with_token("/auth/validate", Some("not-a-real-token"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["valid"], false);
    }
}
