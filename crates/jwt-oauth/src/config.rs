//! Configuration for the OAuth token issuance pipeline.
//!
//! An [`OAuthConfig`] is built once at startup, is immutable thereafter, and
//! is shared read-only (behind an `Arc`) by every grant evaluation. The two
//! extension points — credential verification and claims filling — are
//! plain asynchronous function values rather than trait objects; both run
//! inside the request task, so cancelling the request cancels them.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use futures::future::BoxFuture;

use crate::credentials::{Password, UserName};
use crate::error::ConfigError;
use crate::identity::{Claim, Identity};
use crate::origins::AllowedOrigins;

/// Default values shared by every construction mode.
pub mod defaults {
    use std::time::Duration;

    /// Path the grant endpoint is mounted at.
    pub const TOKEN_ENDPOINT_PATH: &str = "/oauth/token";

    /// Access token lifetime: 1 day.
    pub const ACCESS_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 3600);

    /// Authentication scheme recorded on issued identities.
    pub const AUTHENTICATION_TYPE: &str = "Bearer";
}

/// Environment variable names read by [`OAuthConfig::from_env`].
pub mod env {
    /// Token issuer.
    pub const ISSUER: &str = "OAUTH_ISSUER";
    /// Audience identifier.
    pub const AUDIENCE_ID: &str = "OAUTH_AUDIENCE_ID";
    /// URL-safe base64 signing secret.
    pub const AUDIENCE_SECRET: &str = "OAUTH_AUDIENCE_SECRET";
}

/// Async credential check: does this username/password pair identify a user?
///
/// `Err(_)` is treated exactly like `Ok(false)` — a single `invalid_grant`
/// path that leaks nothing about which part was wrong.
pub type VerifyCredentials =
    Arc<dyn Fn(UserName, Password) -> BoxFuture<'static, anyhow::Result<bool>> + Send + Sync>;

/// Async claim augmentation: given the verified user name, take the base
/// identity (name claim already present) and return it with any
/// application-specific claims appended.
pub type FillClaims =
    Arc<dyn Fn(UserName, Identity) -> BoxFuture<'static, Identity> + Send + Sync>;

/// Lift a plain async fn into a [`VerifyCredentials`] value.
pub fn verifier<F, Fut>(f: F) -> VerifyCredentials
where
    F: Fn(UserName, Password) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
{
    Arc::new(move |username, password| Box::pin(f(username, password)))
}

/// Lift a plain async fn into a [`FillClaims`] value.
pub fn claims_filler<F, Fut>(f: F) -> FillClaims
where
    F: Fn(UserName, Identity) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Identity> + Send + 'static,
{
    Arc::new(move |username, identity| Box::pin(f(username, identity)))
}

/// Immutable configuration for the token issuance pipeline.
#[derive(Clone)]
pub struct OAuthConfig {
    /// Token issuer (`iss` claim).
    pub issuer: String,

    /// Audience identifier (`aud` claim).
    pub audience_id: String,

    /// Raw HMAC key material, already decoded from URL-safe base64.
    pub audience_secret: Vec<u8>,

    /// Path the grant endpoint is mounted at.
    pub token_endpoint_path: String,

    /// Validity window stamped onto issued tokens.
    pub access_token_lifetime: Duration,

    /// Whether grant requests over plain HTTP are accepted.
    pub allow_insecure_http: bool,

    /// Origins allowed to receive the `Access-Control-Allow-Origin` header.
    pub allowed_origins: AllowedOrigins,

    /// Authentication scheme recorded on issued identities.
    pub authentication_type: String,

    /// Credential verification extension point.
    pub verify_credentials: VerifyCredentials,

    /// Claim augmentation extension point.
    pub fill_claims: FillClaims,
}

impl OAuthConfig {
    /// Create a configuration from explicit values.
    ///
    /// `audience_secret` is a URL-safe base64 string; it is decoded exactly
    /// once, here. Defaults: endpoint path `/oauth/token`, lifetime 1 day,
    /// all origins, HTTPS required.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the secret is empty or not valid base64.
    pub fn new(
        issuer: impl Into<String>,
        audience_id: impl Into<String>,
        audience_secret: &str,
        verify_credentials: VerifyCredentials,
        fill_claims: FillClaims,
    ) -> Result<Self, ConfigError> {
        let audience_secret = decode_secret(audience_secret)?;
        Ok(Self {
            issuer: issuer.into(),
            audience_id: audience_id.into(),
            audience_secret,
            token_endpoint_path: defaults::TOKEN_ENDPOINT_PATH.to_string(),
            access_token_lifetime: defaults::ACCESS_TOKEN_LIFETIME,
            allow_insecure_http: false,
            allowed_origins: AllowedOrigins::all(),
            authentication_type: defaults::AUTHENTICATION_TYPE.to_string(),
            verify_credentials,
            fill_claims,
        })
    }

    /// Create a configuration from environment variables
    /// (`OAUTH_ISSUER`, `OAUTH_AUDIENCE_ID`, `OAUTH_AUDIENCE_SECRET`).
    ///
    /// This entry point requires HTTPS; opt in to insecure transport
    /// explicitly with [`with_allow_insecure_http`](Self::with_allow_insecure_http).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is missing or the secret is
    /// invalid.
    pub fn from_env(
        verify_credentials: VerifyCredentials,
        fill_claims: FillClaims,
    ) -> Result<Self, ConfigError> {
        let issuer =
            std::env::var(env::ISSUER).map_err(|_| ConfigError::MissingVar(env::ISSUER))?;
        let audience_id = std::env::var(env::AUDIENCE_ID)
            .map_err(|_| ConfigError::MissingVar(env::AUDIENCE_ID))?;
        let audience_secret = std::env::var(env::AUDIENCE_SECRET)
            .map_err(|_| ConfigError::MissingVar(env::AUDIENCE_SECRET))?;
        Self::new(issuer, audience_id, &audience_secret, verify_credentials, fill_claims)
    }

    /// Create the most permissive demo configuration.
    ///
    /// Insecure HTTP is allowed, the verifier treats a grant as valid iff
    /// the password equals the user name, and the filler adds one role claim
    /// named after the user. The verifier is a toy reference policy — never
    /// deploy it; supply a real one via [`OAuthConfig::new`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the secret is empty or not valid base64.
    pub fn permissive(
        issuer: impl Into<String>,
        audience_id: impl Into<String>,
        audience_secret: &str,
    ) -> Result<Self, ConfigError> {
        Ok(Self::new(
            issuer,
            audience_id,
            audience_secret,
            default_verifier(),
            default_claims_filler(),
        )?
        .with_allow_insecure_http(true))
    }

    /// Override the grant endpoint path.
    #[must_use]
    pub fn with_token_endpoint_path(mut self, path: impl Into<String>) -> Self {
        self.token_endpoint_path = path.into();
        self
    }

    /// Override the access token lifetime.
    #[must_use]
    pub fn with_access_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.access_token_lifetime = lifetime;
        self
    }

    /// Override the origin policy.
    #[must_use]
    pub fn with_allowed_origins(mut self, origins: AllowedOrigins) -> Self {
        self.allowed_origins = origins;
        self
    }

    /// Allow or forbid grant requests over plain HTTP.
    #[must_use]
    pub fn with_allow_insecure_http(mut self, allow: bool) -> Self {
        self.allow_insecure_http = allow;
        self
    }

    /// Override the authentication scheme recorded on identities.
    #[must_use]
    pub fn with_authentication_type(mut self, authentication_type: impl Into<String>) -> Self {
        self.authentication_type = authentication_type.into();
        self
    }
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("issuer", &self.issuer)
            .field("audience_id", &self.audience_id)
            .field("audience_secret", &"<redacted>")
            .field("token_endpoint_path", &self.token_endpoint_path)
            .field("access_token_lifetime", &self.access_token_lifetime)
            .field("allow_insecure_http", &self.allow_insecure_http)
            .field("allowed_origins", &self.allowed_origins)
            .field("authentication_type", &self.authentication_type)
            .finish_non_exhaustive()
    }
}

/// Decode a URL-safe base64 secret into raw key material.
fn decode_secret(secret: &str) -> Result<Vec<u8>, ConfigError> {
    let decoded = URL_SAFE_NO_PAD.decode(secret.trim_end_matches('='))?;
    if decoded.is_empty() {
        return Err(ConfigError::EmptySecret);
    }
    Ok(decoded)
}

/// The demo verifier: a grant is valid iff the password equals the user name.
#[must_use]
pub fn default_verifier() -> VerifyCredentials {
    verifier(|username: UserName, password: Password| async move {
        Ok(username.as_str() == password.as_str())
    })
}

/// The demo filler: adds one role claim whose value is the user name.
#[must_use]
pub fn default_claims_filler() -> FillClaims {
    claims_filler(|username: UserName, mut identity: Identity| async move {
        identity.add_claim(Claim::role(username.as_str()));
        identity
    })
}
