//! End-to-end tests of the HTTP auth surface: mail-link login, session
//! lifecycle, client credentials, and the scope gate.

use axum::Router;
use axum::body::{Body, to_bytes};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Duration;
use http::{Request, StatusCode, header};
use serde_json::Value;
use tower::ServiceExt;

use linkgate::{AppConfig, AppState, Client, MemoryStore, Scope, User, UserId, hash_secret};

fn test_app() -> (AppState, MemoryStore, Router) {
    let (state, store) = linkgate::create_app(AppConfig::default());
    store.add_user(
        User::new("u42")
            .with_email("ada@example.com")
            .with_display_name("Ada"),
    );
    store.add_client(Client::new("mobility-app", hash_secret("s3cret")));
    let router = linkgate::create_router(state.clone());
    (state, store, router)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn location(response: &http::Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .expect("redirect should carry a Location header")
        .to_str()
        .unwrap()
}

/// First `name=value` pair of the Set-Cookie header.
fn session_cookie(response: &http::Response<Body>) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .expect("response should set the session cookie")
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string()
}

async fn json_body(response: http::Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn basic_auth(id: &str, secret: &str) -> String {
    format!("Basic {}", BASE64.encode(format!("{}:{}", id, secret)))
}

#[tokio::test]
async fn health_is_open() {
    let (_, _, router) = test_app();
    let response = router.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn mail_link_login_establishes_session_and_consumes_token() {
    let (_, store, router) = test_app();
    let token = store.issue_mail_token(&UserId::new("u42"), Duration::minutes(30));

    // Follow the emailed link.
    let response = router
        .clone()
        .oneshot(get(&format!("/connect?access_token={}", token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/welcome");
    let cookie = session_cookie(&response);

    // The session resolves back to the user.
    let profile = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/session/profile")
                .header(header::COOKIE, cookie.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(profile.status(), StatusCode::OK);
    let body = json_body(profile).await;
    assert_eq!(body["user_id"], "u42");
    assert_eq!(body["email"], "ada@example.com");

    // The link is single-use: replaying it is an ordinary rejection.
    let replay = router
        .oneshot(get(&format!("/connect?access_token={}", token)))
        .await
        .unwrap();
    assert_eq!(replay.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&replay), "/invalid-link");
}

#[tokio::test]
async fn concurrent_redemption_has_exactly_one_winner() {
    let (_, store, router) = test_app();
    let token = store.issue_mail_token(&UserId::new("u42"), Duration::minutes(30));
    let uri = format!("/connect?access_token={}", token);

    let (first, second) = tokio::join!(
        router.clone().oneshot(get(&uri)),
        router.clone().oneshot(get(&uri)),
    );
    let locations = [
        location(first.as_ref().unwrap()).to_string(),
        location(second.as_ref().unwrap()).to_string(),
    ];

    let wins = locations.iter().filter(|l| *l == "/welcome").count();
    let losses = locations.iter().filter(|l| *l == "/invalid-link").count();
    assert_eq!(wins, 1);
    assert_eq!(losses, 1);
}

#[tokio::test]
async fn connect_honors_local_return_target_only() {
    let (_, store, router) = test_app();
    let user_id = UserId::new("u42");

    let token = store.issue_mail_token(&user_id, Duration::minutes(30));
    let response = router
        .clone()
        .oneshot(get(&format!(
            "/connect?access_token={}&return_to=%2Faccount%2Fjourneys",
            token
        )))
        .await
        .unwrap();
    assert_eq!(location(&response), "/account/journeys");

    // An absolute or protocol-relative target falls back to the default.
    let token = store.issue_mail_token(&user_id, Duration::minutes(30));
    let response = router
        .clone()
        .oneshot(get(&format!(
            "/connect?access_token={}&return_to=%2F%2Fevil.example.com",
            token
        )))
        .await
        .unwrap();
    assert_eq!(location(&response), "/welcome");
}

#[tokio::test]
async fn connect_without_or_with_bad_token_redirects_to_failure() {
    let (_, _, router) = test_app();

    let missing = router.clone().oneshot(get("/connect")).await.unwrap();
    assert_eq!(location(&missing), "/invalid-link");

    let bad = router
        .oneshot(get("/connect?access_token=never-issued"))
        .await
        .unwrap();
    assert_eq!(location(&bad), "/invalid-link");
}

#[tokio::test]
async fn disconnect_destroys_the_session() {
    let (_, store, router) = test_app();
    let token = store.issue_mail_token(&UserId::new("u42"), Duration::minutes(30));

    let login = router
        .clone()
        .oneshot(get(&format!("/connect?access_token={}", token)))
        .await
        .unwrap();
    let cookie = session_cookie(&login);

    let logout = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/disconnect")
                .header(header::COOKIE, cookie.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(logout.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&logout), "/login");
    assert!(
        logout
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .contains("Max-Age=0")
    );

    let profile = router
        .oneshot(
            Request::builder()
                .uri("/session/profile")
                .header(header::COOKIE, cookie.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(profile.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn access_token_gates_api_routes_by_scope() {
    let (_, store, router) = test_app();
    let token = store.issue_access_token(
        &UserId::new("u42"),
        Some(&"mobility-app".into()),
        [Scope::new("profile")],
        Some(Duration::hours(1)),
    );

    // Granted scope: pass. The token is multi-use.
    for _ in 0..2 {
        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/profile")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["user_id"], "u42");
        assert_eq!(body["scopes"], serde_json::json!(["profile"]));
    }

    // Authenticated but missing the required scope: 403 with the fixed
    // denial body, not 401.
    let denied = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/journeys")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);
    let body = json_body(denied).await;
    assert_eq!(body["status"], 403);
    assert_eq!(body["message"], "No authorization to see this page");

    // No credential at all: 401, the other failure channel.
    let anonymous = router.clone().oneshot(get("/api/profile")).await.unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
    assert!(anonymous.headers().contains_key(header::WWW_AUTHENTICATE));

    let bad_token = router
        .oneshot(
            Request::builder()
                .uri("/api/profile")
                .header(header::AUTHORIZATION, "Bearer never-issued")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(bad_token.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn introspection_requires_client_credentials() {
    let (_, store, router) = test_app();
    let token = store.issue_access_token(
        &UserId::new("u42"),
        Some(&"mobility-app".into()),
        [Scope::new("journeys"), Scope::new("profile")],
        Some(Duration::hours(1)),
    );

    // Basic header credentials.
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/introspect")
                .header(header::AUTHORIZATION, basic_auth("mobility-app", "s3cret"))
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(format!("token={}", token)))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["active"], true);
    assert_eq!(body["user_id"], "u42");
    assert_eq!(body["client_id"], "mobility-app");
    assert_eq!(body["scope"], "journeys profile");

    // Body credentials behave identically.
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/introspect")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(format!(
                    "client_id=mobility-app&client_secret=s3cret&token={}",
                    token
                )))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["active"], true);

    // An unknown token is inactive, not an error.
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/introspect")
                .header(header::AUTHORIZATION, basic_auth("mobility-app", "s3cret"))
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("token=never-issued"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(json_body(response).await["active"], false);

    // Bad or missing client credentials never reach the lookup.
    for authorization in [Some(basic_auth("mobility-app", "wrong")), None] {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/introspect")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(value) = &authorization {
            builder = builder.header(header::AUTHORIZATION, value.as_str());
        }
        let response = router
            .clone()
            .oneshot(builder.body(Body::from(format!("token={}", token))).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn session_routes_reject_client_api_tokens() {
    // A bearer access token is not a session; the session surface ignores it.
    let (_, store, router) = test_app();
    let token = store.issue_access_token(
        &UserId::new("u42"),
        None,
        [Scope::new("profile")],
        Some(Duration::hours(1)),
    );

    let response = router
        .oneshot(
            Request::builder()
                .uri("/session/profile")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
