//! Pipeline wiring for the grant endpoint and bearer-token consumption.
//!
//! Token generation and token consumption are two independent concerns, both
//! configured from the same issuer/audience/secret triple:
//! [`create_router`] mounts the grant endpoint that issues tokens, and
//! [`protect`] wraps any router with bearer validation of previously issued
//! tokens.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Form, Json, Router,
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, Uri, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::TypedHeader;
use axum_extra::headers::{Authorization, authorization::Bearer};
use chrono::{TimeDelta, Utc};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::config::OAuthConfig;
use crate::credentials::{Credentials, Password, UserName};
use crate::error::GrantError;
use crate::grant::PasswordGrantHandler;
use crate::token::JwtTokenFormat;

/// Shared state for the grant endpoint.
pub struct PipelineState {
    handler: PasswordGrantHandler,
    token_format: JwtTokenFormat,
    access_token_lifetime: TimeDelta,
    expires_in_secs: u64,
    allow_insecure_http: bool,
}

impl PipelineState {
    /// Build the per-process pipeline state from a configuration.
    #[must_use]
    pub fn new(config: &OAuthConfig) -> Self {
        let access_token_lifetime = TimeDelta::from_std(config.access_token_lifetime)
            .unwrap_or_else(|_| {
                tracing::warn!("Access token lifetime out of range, falling back to 1 day");
                TimeDelta::days(1)
            });

        Self {
            handler: PasswordGrantHandler::new(
                config.allowed_origins.clone(),
                config.authentication_type.clone(),
                Arc::clone(&config.verify_credentials),
                Arc::clone(&config.fill_claims),
            ),
            token_format: JwtTokenFormat::from_config(config),
            access_token_lifetime,
            expires_in_secs: config.access_token_lifetime.as_secs(),
            allow_insecure_http: config.allow_insecure_http,
        }
    }
}

impl std::fmt::Debug for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineState")
            .field("token_format", &self.token_format)
            .field("allow_insecure_http", &self.allow_insecure_http)
            .finish_non_exhaustive()
    }
}

/// Body of a token endpoint request (RFC 6749 §4.3.2).
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub grant_type: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Create the router serving the configured token endpoint.
///
/// The grant endpoint is mounted at `config.token_endpoint_path`; a
/// `/health` probe is included for deployment plumbing.
#[must_use]
pub fn create_router(config: &OAuthConfig) -> Router {
    let state = Arc::new(PipelineState::new(config));

    Router::new()
        .route("/health", get(health_check))
        .route(&config.token_endpoint_path, post(handle_token))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "jwt-oauth",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// `POST <token_endpoint_path>`
///
/// Exchange resource-owner credentials for a signed bearer token.
async fn handle_token(
    State(state): State<Arc<PipelineState>>,
    uri: Uri,
    request_headers: HeaderMap,
    Form(form): Form<TokenRequest>,
) -> Response {
    if !state.allow_insecure_http && !is_secure(&uri, &request_headers) {
        return token_error("invalid_request", "HTTPS is required");
    }

    if form.grant_type != "password" {
        return token_error("unsupported_grant_type", "Only the password grant is supported");
    }
    let (Some(username), Some(password)) = (form.username, form.password) else {
        return token_error("invalid_request", "Missing username or password");
    };
    let credentials = Credentials::new(UserName::new(username), Password::new(password));

    let mut response_headers = HeaderMap::new();
    let ticket = match state.handler.evaluate(credentials, &mut response_headers).await {
        Ok(ticket) => ticket,
        Err(error) => return grant_error(&error, response_headers),
    };

    // The grant handler leaves the validity window unset; the issuance layer
    // stamps it.
    let now = Utc::now();
    let ticket = ticket.with_validity(now, now + state.access_token_lifetime);

    match state.token_format.encode(&ticket) {
        Ok(access_token) => {
            tracing::info!("Issued access token");
            token_success(&access_token, state.expires_in_secs, response_headers)
        }
        Err(error) => {
            tracing::error!(%error, "Failed to encode access token");
            let mut response = (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "server_error" })),
            )
                .into_response();
            response.headers_mut().extend(response_headers);
            response
        }
    }
}

/// Build a token response with required OAuth 2.0 cache headers (RFC 6749 §5.1).
fn token_success(access_token: &str, expires_in: u64, extra_headers: HeaderMap) -> Response {
    let mut response = Json(serde_json::json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "expires_in": expires_in
    }))
    .into_response();

    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.extend(extra_headers);
    response
}

fn grant_error(error: &GrantError, extra_headers: HeaderMap) -> Response {
    let mut response = (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({
            "error": error.error_code(),
            "error_description": error.description()
        })),
    )
        .into_response();
    response.headers_mut().extend(extra_headers);
    response
}

fn token_error(error: &str, description: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({
            "error": error,
            "error_description": description
        })),
    )
        .into_response()
}

/// Whether the request arrived over HTTPS, directly or behind a proxy.
fn is_secure(uri: &Uri, headers: &HeaderMap) -> bool {
    if let Some(proto) = headers.get("x-forwarded-proto") {
        return proto.as_bytes().eq_ignore_ascii_case(b"https");
    }
    uri.scheme_str() == Some("https")
}

// ─── Token consumption ───────────────────────────────────────────────────────

/// Wrap a router with bearer-token validation.
///
/// Every request must carry `Authorization: Bearer <token>` where the token
/// verifies against the codec's issuer, audience, and secret. The decoded
/// [`Identity`](crate::identity::Identity) is inserted into request
/// extensions for downstream handlers; any validation failure is a 401 with
/// a `WWW-Authenticate` challenge and no partial trust.
#[must_use]
pub fn protect(router: Router, token_format: Arc<JwtTokenFormat>) -> Router {
    router.layer(middleware::from_fn_with_state(token_format, require_bearer))
}

async fn require_bearer(
    State(token_format): State<Arc<JwtTokenFormat>>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(TypedHeader(Authorization(bearer))) = bearer else {
        return unauthorized("Missing bearer token");
    };

    match token_format.decode(bearer.token()) {
        Ok(ticket) => {
            request.extensions_mut().insert(ticket.identity);
            next.run(request).await
        }
        Err(error) => {
            tracing::debug!(%error, "Rejected bearer token");
            unauthorized("invalid_token")
        }
    }
}

fn unauthorized(detail: &str) -> Response {
    let challenge = format!(r#"Bearer error="{detail}""#);
    let mut response = StatusCode::UNAUTHORIZED.into_response();
    if let Ok(value) = HeaderValue::from_str(&challenge) {
        response.headers_mut().insert(header::WWW_AUTHENTICATE, value);
    }
    response
}

// ─── Serving ─────────────────────────────────────────────────────────────────

/// Bind and serve the grant endpoint until ctrl-c.
///
/// # Errors
///
/// Returns error on bind or server failure.
pub async fn serve(config: &OAuthConfig, port: u16) -> anyhow::Result<()> {
    let router = create_router(config);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(
        "Token endpoint listening on http://{}{}",
        addr,
        config.token_endpoint_path
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;

    tracing::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "Failed to listen for shutdown signal");
    }
}
