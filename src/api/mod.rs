// HTTP surface: login/logout flow, token introspection, and the sample
// scope-gated API routes.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::auth::{
    AuthInfo, AuthLayer, Authenticator, Credential, Outcome, Principal, RequireScopes, Sessions,
    Strategy, bearer_token, form_pairs,
};
use crate::config::AppConfig;
use crate::store::TokenStore;

/// Shared service state, one instance per process.
pub struct App {
    pub authenticator: Authenticator,
    pub sessions: Sessions,
    pub tokens: Arc<dyn TokenStore>,
    pub config: AppConfig,
}

pub type AppState = Arc<App>;

pub fn create_router(state: AppState) -> Router {
    let auth = state.authenticator.clone();

    // Scoped client-API surface: bearer access token, then per-route
    // scope gate.
    let api = Router::new()
        .route(
            "/api/profile",
            get(api_profile).layer(RequireScopes::new(["profile"])),
        )
        .route(
            "/api/journeys",
            get(api_journeys).layer(RequireScopes::new(["journeys"])),
        )
        .route_layer(AuthLayer::single(auth.clone(), Strategy::ClientApi));

    Router::new()
        .route("/health", get(health_check))
        .route("/connect", get(connect))
        .route("/disconnect", get(disconnect))
        .route("/session/profile", get(session_profile))
        .route(
            "/introspect",
            post(introspect).layer(AuthLayer::new(
                auth,
                &[Strategy::ClientBasic, Strategy::ClientBody],
            )),
        )
        .merge(api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn health_check() -> Result<Json<Value>, StatusCode> {
    Ok(Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

/// Mail-link login: redeem the one-time token from the emailed link and
/// establish a session.
///
/// Success redirects to the recorded return target (local paths only) or
/// the configured success path; an invalid or already-used link redirects
/// to the configured failure path. Only a store failure is an error.
async fn connect(State(state): State<AppState>, req: Request) -> Response {
    let (parts, _body) = req.into_parts();

    let return_to = parts
        .uri
        .query()
        .and_then(|query| {
            form_pairs(query)
                .into_iter()
                .find(|(name, _)| name == "return_to")
                .map(|(_, value)| value)
        })
        .filter(|target| is_local_path(target));

    let Some(token) = bearer_token(&parts) else {
        return Redirect::to(&state.config.redirects.failure).into_response();
    };

    match state
        .authenticator
        .authenticate(Strategy::MailAuth, Credential::Bearer(token))
        .await
    {
        Outcome::Resolved(Principal::User(user), _info) => {
            let session_id = state.sessions.establish(&user);
            let target = return_to.unwrap_or_else(|| state.config.redirects.success.clone());
            (
                [(header::SET_COOKIE, state.sessions.session_cookie(&session_id))],
                Redirect::to(&target),
            )
                .into_response()
        }
        Outcome::Resolved(..) | Outcome::Rejected => {
            Redirect::to(&state.config.redirects.failure).into_response()
        }
        Outcome::Failed(err) => {
            error!(error = %err, "mail-link login failed against the stores");
            server_error()
        }
    }
}

/// Logout: destroy the session and send the browser back to the login
/// entry point.
async fn disconnect(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(session_id) = state.sessions.session_from_headers(&headers) {
        state.sessions.destroy(&session_id);
    }
    (
        [(header::SET_COOKIE, state.sessions.clear_cookie())],
        Redirect::to(&state.config.redirects.login),
    )
        .into_response()
}

/// Who the current session belongs to. Exercises session rehydration
/// through the principal store.
async fn session_profile(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(session_id) = state.sessions.session_from_headers(&headers) else {
        return no_session();
    };

    match state.sessions.resolve(&session_id).await {
        Ok(Some(Principal::User(user))) => Json(json!({
            "user_id": user.id,
            "email": user.email,
            "display_name": user.display_name,
        }))
        .into_response(),
        Ok(_) => no_session(),
        Err(err) => {
            error!(error = %err, "session rehydration failed against the principal store");
            server_error()
        }
    }
}

/// RFC 7662-shaped token introspection, for authenticated clients only.
///
/// Looks the presented access token up read-only; an unknown, expired, or
/// revoked token is simply `active: false`.
async fn introspect(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let Some(token) = token_field(&headers, &body) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"status": 400, "message": "Missing token parameter"})),
        )
            .into_response();
    };

    match state.tokens.find_access_token(&token).await {
        Ok(Some(record)) => {
            let mut scopes: Vec<&str> = record.scopes.iter().map(|s| s.as_str()).collect();
            scopes.sort_unstable();
            Json(json!({
                "active": true,
                "user_id": record.user_id,
                "client_id": record.client_id,
                "scope": scopes.join(" "),
                "exp": record.expires_at.map(|at| at.timestamp()),
            }))
            .into_response()
        }
        Ok(None) => Json(json!({"active": false})).into_response(),
        Err(err) => {
            error!(error = %err, "introspection lookup failed against the token store");
            server_error()
        }
    }
}

/// Profile of the user the access token acts for.
async fn api_profile(
    axum::Extension(principal): axum::Extension<Principal>,
    axum::Extension(info): axum::Extension<AuthInfo>,
) -> Response {
    let Some(user) = principal.as_user() else {
        return no_session();
    };
    let mut scopes: Vec<&str> = info
        .scopes()
        .map(|set| set.iter().map(|s| s.as_str()).collect())
        .unwrap_or_default();
    scopes.sort_unstable();
    Json(json!({
        "user_id": user.id,
        "email": user.email,
        "display_name": user.display_name,
        "scopes": scopes,
    }))
    .into_response()
}

/// Sample scoped resource route.
async fn api_journeys(axum::Extension(principal): axum::Extension<Principal>) -> Response {
    let Some(user) = principal.as_user() else {
        return no_session();
    };
    Json(json!({
        "user_id": user.id,
        "journeys": [],
        "count": 0,
    }))
    .into_response()
}

/// The introspected token, from a form or JSON body.
fn token_field(headers: &HeaderMap, body: &Bytes) -> Option<String> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if content_type.starts_with("application/json") {
        let value: Value = serde_json::from_slice(body).ok()?;
        return value.get("token")?.as_str().map(|s| s.to_string());
    }

    let body = std::str::from_utf8(body).ok()?;
    form_pairs(body)
        .into_iter()
        .find(|(name, _)| name == "token")
        .map(|(_, value)| value)
        .filter(|token| !token.is_empty())
}

/// A return target is honored only if it stays on this host.
fn is_local_path(target: &str) -> bool {
    target.starts_with('/') && !target.starts_with("//")
}

fn no_session() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"status": 401, "message": "Authentication required"})),
    )
        .into_response()
}

fn server_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"status": 500, "message": "Internal server error"})),
    )
        .into_response()
}
