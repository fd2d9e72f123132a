//! The signed compact token codec.
//!
//! [`JwtTokenFormat`] turns an [`AuthenticationTicket`] into a three-segment
//! HMAC-SHA-256 signed compact token and parses one back. The payload
//! carries the standard `iss`/`aud`/`iat`/`exp` claims plus every claim of
//! the ticket's identity; repeated claim types serialize as a JSON array.
//!
//! Decoding rejects outright on any failure — bad signature, expired `exp`,
//! issuer or audience mismatch — with no fallback to a partially-trusted
//! identity.

use std::collections::BTreeMap;

use chrono::DateTime;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};

use crate::config::OAuthConfig;
use crate::error::TokenError;
use crate::identity::{AuthenticationTicket, Claim, Identity};

/// Claim names materialized as token structure rather than identity facts.
const REGISTERED_CLAIMS: [&str; 4] = ["iss", "aud", "iat", "exp"];

/// Wire payload of a signed token.
#[derive(Debug, Serialize, Deserialize)]
struct JwtClaims {
    iss: String,
    aud: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    iat: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exp: Option<i64>,
    /// Identity claims; a repeated claim type folds into an array.
    #[serde(flatten)]
    extra: BTreeMap<String, serde_json::Value>,
}

/// Encoder/decoder for HMAC-SHA-256 signed compact tokens bound to one
/// issuer, audience, and secret.
pub struct JwtTokenFormat {
    issuer: String,
    audience_id: String,
    authentication_type: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtTokenFormat {
    /// Create a codec from an issuer, audience id, and raw secret bytes.
    #[must_use]
    pub fn new(issuer: impl Into<String>, audience_id: impl Into<String>, secret: &[u8]) -> Self {
        let issuer = issuer.into();
        let audience_id = audience_id.into();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&issuer]);
        validation.set_audience(&[&audience_id]);
        // `exp` is enforced when present but a token without one is legal.
        validation.set_required_spec_claims::<&str>(&[]);
        validation.leeway = 0;

        Self {
            issuer,
            audience_id,
            authentication_type: crate::config::defaults::AUTHENTICATION_TYPE.to_string(),
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Create a codec from a pipeline configuration.
    #[must_use]
    pub fn from_config(config: &OAuthConfig) -> Self {
        let mut format = Self::new(&config.issuer, &config.audience_id, &config.audience_secret);
        format.authentication_type = config.authentication_type.clone();
        format
    }

    /// Serialize a ticket into a signed compact token string.
    ///
    /// Absent `issued_utc`/`expires_utc` produce a token with no `iat`/`exp`
    /// claims and therefore no enforced expiry; callers wanting enforceable
    /// expiry must stamp both before encoding.
    pub fn encode(&self, ticket: &AuthenticationTicket) -> Result<String, TokenError> {
        let claims = JwtClaims {
            iss: self.issuer.clone(),
            aud: self.audience_id.clone(),
            iat: ticket.issued_utc.map(|t| t.timestamp()),
            exp: ticket.expires_utc.map(|t| t.timestamp()),
            extra: fold_claims(&ticket.identity),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(TokenError::Signing)
    }

    /// Parse and verify a compact token, rebuilding the ticket it carries.
    pub fn decode(&self, token: &str) -> Result<AuthenticationTicket, TokenError> {
        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| map_decode_error(&e))?;

        let claims = data.claims;
        let identity =
            Identity::from_claims(self.authentication_type.clone(), unfold_claims(&claims.extra));

        Ok(AuthenticationTicket {
            identity,
            issued_utc: claims.iat.and_then(|secs| DateTime::from_timestamp(secs, 0)),
            expires_utc: claims.exp.and_then(|secs| DateTime::from_timestamp(secs, 0)),
        })
    }
}

impl std::fmt::Debug for JwtTokenFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtTokenFormat")
            .field("issuer", &self.issuer)
            .field("audience_id", &self.audience_id)
            .finish_non_exhaustive()
    }
}

/// Fold an identity's claim list into a JSON map: one string per singleton
/// type, an array for repeated types. Claims shadowing registered names are
/// dropped; those are token structure, not identity facts.
fn fold_claims(identity: &Identity) -> BTreeMap<String, serde_json::Value> {
    use std::collections::btree_map::Entry;

    let mut map: BTreeMap<String, serde_json::Value> = BTreeMap::new();
    for claim in identity.claims() {
        if REGISTERED_CLAIMS.contains(&claim.claim_type.as_str()) {
            tracing::warn!(claim_type = %claim.claim_type, "Dropping claim shadowing a registered token claim");
            continue;
        }
        let value = serde_json::Value::String(claim.value.clone());
        match map.entry(claim.claim_type.clone()) {
            Entry::Vacant(entry) => {
                entry.insert(value);
            }
            Entry::Occupied(mut entry) => match entry.get_mut() {
                serde_json::Value::Array(values) => values.push(value),
                existing => {
                    let first = existing.take();
                    *existing = serde_json::Value::Array(vec![first, value]);
                }
            },
        }
    }
    map
}

/// Unfold a decoded JSON claim map back into a claim list.
fn unfold_claims(extra: &BTreeMap<String, serde_json::Value>) -> Vec<Claim> {
    let mut claims = Vec::new();
    for (claim_type, value) in extra {
        match value {
            serde_json::Value::String(s) => claims.push(Claim::new(claim_type.as_str(), s.as_str())),
            serde_json::Value::Array(values) => {
                for v in values {
                    if let Some(s) = v.as_str() {
                        claims.push(Claim::new(claim_type.as_str(), s));
                    }
                }
            }
            serde_json::Value::Number(n) => {
                claims.push(Claim::new(claim_type.as_str(), n.to_string()));
            }
            serde_json::Value::Bool(b) => {
                claims.push(Claim::new(claim_type.as_str(), b.to_string()));
            }
            _ => {}
        }
    }
    claims
}

fn map_decode_error(error: &jsonwebtoken::errors::Error) -> TokenError {
    match error.kind() {
        ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::InvalidIssuer => TokenError::IssuerMismatch,
        ErrorKind::InvalidAudience => TokenError::AudienceMismatch,
        _ => TokenError::Malformed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::UserName;
    use chrono::{TimeDelta, Utc};

    const SECRET: &[u8] = b"super-secret-signing-key";
    const ISSUER: &str = "https://issuer.example.com";
    const AUDIENCE: &str = "test-audience";

    fn format() -> JwtTokenFormat {
        JwtTokenFormat::new(ISSUER, AUDIENCE, SECRET)
    }

    fn ticket_for(username: &str) -> AuthenticationTicket {
        let mut identity = Identity::with_name("Bearer", &UserName::new(username));
        identity.add_claim(Claim::role("admin"));
        identity.add_claim(Claim::role("ops"));
        let now = Utc::now();
        AuthenticationTicket::new(identity).with_validity(now, now + TimeDelta::hours(1))
    }

    #[test]
    fn test_encode_produces_compact_form() {
        let token = format().encode(&ticket_for("alice")).unwrap();
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn test_round_trip_preserves_claims_and_window() {
        let ticket = ticket_for("alice");
        let token = format().encode(&ticket).unwrap();
        let decoded = format().decode(&token).unwrap();

        assert_eq!(decoded.identity.name(), Some("alice"));
        let roles: Vec<&str> = decoded.identity.values_of("role").collect();
        assert_eq!(roles, vec!["admin", "ops"]);
        assert_eq!(decoded.identity.claims().len(), ticket.identity.claims().len());

        // Second precision survives the wire format.
        assert_eq!(
            decoded.issued_utc.unwrap().timestamp(),
            ticket.issued_utc.unwrap().timestamp()
        );
        assert_eq!(
            decoded.expires_utc.unwrap().timestamp(),
            ticket.expires_utc.unwrap().timestamp()
        );
    }

    #[test]
    fn test_token_without_window_has_no_expiry() {
        let identity = Identity::with_name("Bearer", &UserName::new("alice"));
        let token = format().encode(&AuthenticationTicket::new(identity)).unwrap();

        let decoded = format().decode(&token).unwrap();
        assert!(decoded.issued_utc.is_none());
        assert!(decoded.expires_utc.is_none());
    }

    #[test]
    fn test_expired_token_rejected() {
        let identity = Identity::with_name("Bearer", &UserName::new("alice"));
        let past = Utc::now() - TimeDelta::hours(2);
        let ticket =
            AuthenticationTicket::new(identity).with_validity(past, past + TimeDelta::hours(1));

        let token = format().encode(&ticket).unwrap();
        assert!(matches!(format().decode(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = format().encode(&ticket_for("alice")).unwrap();
        let other = JwtTokenFormat::new(ISSUER, AUDIENCE, b"a-different-secret");
        assert!(matches!(other.decode(&token), Err(TokenError::InvalidSignature)));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let token = format().encode(&ticket_for("alice")).unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_payload = "eyJuYW1lIjoibWFsbG9yeSJ9";
        parts[1] = forged_payload;
        let tampered = parts.join(".");
        assert!(matches!(format().decode(&tampered), Err(TokenError::InvalidSignature)));
    }

    #[test]
    fn test_issuer_mismatch_rejected() {
        let token = format().encode(&ticket_for("alice")).unwrap();
        let other = JwtTokenFormat::new("https://other.example.com", AUDIENCE, SECRET);
        assert!(matches!(other.decode(&token), Err(TokenError::IssuerMismatch)));
    }

    #[test]
    fn test_audience_mismatch_rejected() {
        let token = format().encode(&ticket_for("alice")).unwrap();
        let other = JwtTokenFormat::new(ISSUER, "other-audience", SECRET);
        assert!(matches!(other.decode(&token), Err(TokenError::AudienceMismatch)));
    }

    #[test]
    fn test_garbage_rejected_as_malformed() {
        assert!(matches!(format().decode("not-a-token"), Err(TokenError::Malformed)));
        assert!(matches!(format().decode(""), Err(TokenError::Malformed)));
    }

    #[test]
    fn test_registered_claim_shadowing_dropped() {
        let mut identity = Identity::with_name("Bearer", &UserName::new("alice"));
        identity.add_claim(Claim::new("iss", "https://evil.example.com"));

        let token = format().encode(&AuthenticationTicket::new(identity)).unwrap();
        let decoded = format().decode(&token).unwrap();
        assert!(decoded.identity.find_first("iss").is_none());
        assert_eq!(decoded.identity.name(), Some("alice"));
    }
}
