//! Integration tests for the credential-grant flow.
//!
//! Drives the full pipeline: form-encoded grant request → grant handler →
//! token codec → signed token response, plus bearer validation of the
//! issued tokens.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::get;
use axum::{Extension, Json, Router};
use tower::ServiceExt;

use jwt_oauth::config::{OAuthConfig, default_claims_filler, default_verifier};
use jwt_oauth::identity::Identity;
use jwt_oauth::server::{create_router, protect};
use jwt_oauth::token::JwtTokenFormat;

const ISSUER: &str = "https://issuer.example.com";
const AUDIENCE: &str = "test-audience";
const SECRET_B64: &str = "c3VwZXItc2VjcmV0LXNpZ25pbmcta2V5"; // "super-secret-signing-key"

fn demo_config() -> OAuthConfig {
    OAuthConfig::permissive(ISSUER, AUDIENCE, SECRET_B64).unwrap()
}

fn build_test_router() -> Router {
    create_router(&demo_config())
}

fn grant_request(username: &str, password: &str) -> Request<Body> {
    form_request(&[("grant_type", "password"), ("username", username), ("password", password)])
}

fn form_request(fields: &[(&str, &str)]) -> Request<Body> {
    let body = serde_urlencoded::to_string(fields).unwrap();
    Request::post("/oauth/token")
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

// ─── Token issuance ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_valid_grant_issues_bearer_token() {
    let app = build_test_router();

    let response = app.oneshot(grant_request("alice", "alice")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("cache-control").unwrap(), "no-store");
    assert_eq!(response.headers().get("pragma").unwrap(), "no-cache");
    assert_eq!(response.headers().get("access-control-allow-origin").unwrap(), "*");

    let json = body_json(response).await;
    assert_eq!(json["token_type"], "Bearer");
    assert_eq!(json["expires_in"], 86_400);
    assert_eq!(json["access_token"].as_str().unwrap().split('.').count(), 3);
}

#[tokio::test]
async fn test_issued_token_carries_identity_claims() {
    let app = build_test_router();

    let response = app.oneshot(grant_request("alice", "alice")).await.unwrap();
    let json = body_json(response).await;
    let token = json["access_token"].as_str().unwrap().to_owned();

    let codec = JwtTokenFormat::from_config(&demo_config());
    let ticket = codec.decode(&token).unwrap();

    assert_eq!(ticket.identity.name(), Some("alice"));
    assert!(ticket.identity.has_claim("role", "alice"));
    let issued = ticket.issued_utc.unwrap();
    let expires = ticket.expires_utc.unwrap();
    assert_eq!((expires - issued).num_seconds(), 86_400);
}

#[tokio::test]
async fn test_wrong_password_rejected_without_detail() {
    let app = build_test_router();

    let response = app.oneshot(grant_request("alice", "wrong")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    // Origin policy applies to failed grants too.
    assert_eq!(response.headers().get("access-control-allow-origin").unwrap(), "*");

    let json = body_json(response).await;
    assert_eq!(json["error"], "invalid_grant");
    assert_eq!(json["error_description"], "The user name or password is incorrect.");
}

#[tokio::test]
async fn test_unknown_grant_type_rejected() {
    let app = build_test_router();

    let response = app
        .oneshot(form_request(&[("grant_type", "client_credentials")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "unsupported_grant_type");
}

#[tokio::test]
async fn test_missing_credentials_rejected() {
    let app = build_test_router();

    let response = app.oneshot(form_request(&[("grant_type", "password")])).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "invalid_request");
}

// ─── Transport security ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_plain_http_rejected_when_insecure_forbidden() {
    let config = OAuthConfig::new(
        ISSUER,
        AUDIENCE,
        SECRET_B64,
        default_verifier(),
        default_claims_filler(),
    )
    .unwrap();
    let app = create_router(&config);

    let response = app.oneshot(grant_request("alice", "alice")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "invalid_request");
}

#[tokio::test]
async fn test_forwarded_https_accepted_when_insecure_forbidden() {
    let config = OAuthConfig::new(
        ISSUER,
        AUDIENCE,
        SECRET_B64,
        default_verifier(),
        default_claims_filler(),
    )
    .unwrap();
    let app = create_router(&config);

    let body = serde_urlencoded::to_string([
        ("grant_type", "password"),
        ("username", "alice"),
        ("password", "alice"),
    ])
    .unwrap();
    let request = Request::post("/oauth/token")
        .header("Content-Type", "application/x-www-form-urlencoded")
        .header("x-forwarded-proto", "https")
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// ─── Origin policy ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_explicit_origin_echoed_on_failure() {
    let config = demo_config()
        .with_allowed_origins(jwt_oauth::AllowedOrigins::new(["https://app.example.com"]));
    let app = create_router(&config);

    let response = app.oneshot(grant_request("alice", "wrong")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "https://app.example.com"
    );
}

// ─── Token consumption ───────────────────────────────────────────────────────

fn protected_app() -> Router {
    let codec = Arc::new(JwtTokenFormat::from_config(&demo_config()));
    let api = Router::new().route(
        "/me",
        get(|Extension(identity): Extension<Identity>| async move {
            Json(serde_json::json!({ "name": identity.name() }))
        }),
    );
    protect(api, codec)
}

async fn issue_token() -> String {
    let response =
        build_test_router().oneshot(grant_request("alice", "alice")).await.unwrap();
    let json = body_json(response).await;
    json["access_token"].as_str().unwrap().to_owned()
}

#[tokio::test]
async fn test_bearer_required() {
    let app = protected_app();

    let response =
        app.oneshot(Request::get("/me").body(Body::empty()).unwrap()).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let www_auth = response.headers().get("www-authenticate").unwrap().to_str().unwrap();
    assert!(www_auth.starts_with("Bearer"));
}

#[tokio::test]
async fn test_issued_token_admitted() {
    let token = issue_token().await;
    let app = protected_app();

    let response = app
        .oneshot(
            Request::get("/me")
                .header("Authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["name"], "alice");
}

#[tokio::test]
async fn test_tampered_token_rejected() {
    let mut token = issue_token().await;
    // Flip a character in the signature segment.
    let tail = token.pop().unwrap();
    token.push(if tail == 'A' { 'B' } else { 'A' });

    let app = protected_app();
    let response = app
        .oneshot(
            Request::get("/me")
                .header("Authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ─── Health ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health_check() {
    let app = build_test_router();

    let response =
        app.oneshot(Request::get("/health").body(Body::empty()).unwrap()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
}
