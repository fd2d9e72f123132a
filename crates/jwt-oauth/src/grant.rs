//! The resource-owner-password grant handler.
//!
//! One [`PasswordGrantHandler`] is built from the pipeline configuration at
//! startup and shared by every grant evaluation. Each evaluation is a single
//! request-scoped async task: the handler suspends on the caller-supplied
//! verifier and claims filler, and dropping the request future cancels both.

use axum::http::{HeaderMap, header};

use crate::config::{FillClaims, VerifyCredentials};
use crate::credentials::Credentials;
use crate::error::GrantError;
use crate::identity::{AuthenticationTicket, Identity};
use crate::origins::AllowedOrigins;

/// Orchestrates one credential grant: origin header, verification, identity
/// construction, claim filling.
#[derive(Clone)]
pub struct PasswordGrantHandler {
    allowed_origins: AllowedOrigins,
    authentication_type: String,
    verify_credentials: VerifyCredentials,
    fill_claims: FillClaims,
}

impl PasswordGrantHandler {
    /// Create a handler from its configured collaborators.
    #[must_use]
    pub fn new(
        allowed_origins: AllowedOrigins,
        authentication_type: impl Into<String>,
        verify_credentials: VerifyCredentials,
        fill_claims: FillClaims,
    ) -> Self {
        Self {
            allowed_origins,
            authentication_type: authentication_type.into(),
            verify_credentials,
            fill_claims,
        }
    }

    /// Evaluate one grant.
    ///
    /// The `Access-Control-Allow-Origin` header is written into
    /// `response_headers` before credentials are looked at, so it reaches the
    /// caller on success and failure alike — origin policy is a transport
    /// concern independent of auth outcome.
    ///
    /// The returned ticket carries no validity window; the token endpoint
    /// stamps one just before encoding.
    pub async fn evaluate(
        &self,
        credentials: Credentials,
        response_headers: &mut HeaderMap,
    ) -> Result<AuthenticationTicket, GrantError> {
        self.allow_origins(response_headers);

        let Credentials { username, password } = credentials;

        let valid = match (self.verify_credentials)(username.clone(), password).await {
            Ok(valid) => valid,
            Err(error) => {
                // A failing verifier is indistinguishable from bad credentials.
                tracing::warn!(%error, "Credential verifier failed");
                false
            }
        };
        if !valid {
            tracing::debug!(user = %username, "Rejected credential grant");
            return Err(GrantError::InvalidGrant);
        }

        let identity = Identity::with_name(&self.authentication_type, &username);
        let identity = (self.fill_claims)(username, identity).await;

        Ok(AuthenticationTicket::new(identity))
    }

    /// The origin policy this handler applies.
    #[must_use]
    pub fn allowed_origins(&self) -> &AllowedOrigins {
        &self.allowed_origins
    }

    fn allow_origins(&self, response_headers: &mut HeaderMap) {
        match self.allowed_origins.as_header_value() {
            Some(value) => {
                response_headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
            }
            None => {
                tracing::warn!("Configured origin is not a valid header value; header skipped");
            }
        }
    }
}

impl std::fmt::Debug for PasswordGrantHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordGrantHandler")
            .field("allowed_origins", &self.allowed_origins)
            .field("authentication_type", &self.authentication_type)
            .finish_non_exhaustive()
    }
}
