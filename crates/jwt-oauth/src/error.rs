//! Error types for the OAuth grant and token layers.
//!
//! Uses `thiserror` for structured error handling. Grant failures are
//! deliberately coarse: every credential problem collapses into a single
//! `invalid_grant` result that never distinguishes a bad user name from a
//! bad password.

/// The fixed, non-discriminating description returned for every failed grant.
pub const INVALID_GRANT_DESCRIPTION: &str = "The user name or password is incorrect.";

/// Errors from evaluating a resource-owner-password grant.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum GrantError {
    /// Credential verification returned false or failed.
    #[error("{INVALID_GRANT_DESCRIPTION}")]
    InvalidGrant,
}

impl GrantError {
    /// The OAuth error code for the wire response.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidGrant => "invalid_grant",
        }
    }

    /// The human-readable error description for the wire response.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::InvalidGrant => INVALID_GRANT_DESCRIPTION,
        }
    }
}

/// Errors from encoding or decoding a signed compact token.
///
/// Every decode failure rejects the token outright; there is no fallback to
/// an unsigned or partially-trusted identity.
#[derive(thiserror::Error, Debug)]
pub enum TokenError {
    /// The token is not a well-formed three-segment compact token.
    #[error("Malformed token")]
    Malformed,

    /// The signature does not match the configured secret.
    #[error("Invalid token signature")]
    InvalidSignature,

    /// The token carries an `exp` claim in the past.
    #[error("Token has expired")]
    Expired,

    /// The issuer claim does not match the configured issuer.
    #[error("Token issuer mismatch")]
    IssuerMismatch,

    /// The audience claim does not match the configured audience id.
    #[error("Token audience mismatch")]
    AudienceMismatch,

    /// Signing failed while encoding a token.
    #[error("Failed to sign token")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// Errors from building an [`OAuthConfig`](crate::config::OAuthConfig).
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingVar(&'static str),

    /// The audience secret is not valid URL-safe base64.
    #[error("Audience secret is not valid URL-safe base64: {0}")]
    InvalidSecret(#[from] base64::DecodeError),

    /// The audience secret decoded to zero bytes.
    #[error("Audience secret must not be empty")]
    EmptySecret,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_grant_wire_fields() {
        let err = GrantError::InvalidGrant;
        assert_eq!(err.error_code(), "invalid_grant");
        assert_eq!(err.description(), "The user name or password is incorrect.");
        assert_eq!(err.to_string(), err.description());
    }

    #[test]
    fn test_token_error_messages_carry_no_material() {
        for err in [
            TokenError::Malformed,
            TokenError::InvalidSignature,
            TokenError::Expired,
            TokenError::IssuerMismatch,
            TokenError::AudienceMismatch,
        ] {
            let message = err.to_string();
            assert!(!message.is_empty());
            assert!(!message.contains('.'), "no token segments in {message}");
        }
    }
}
