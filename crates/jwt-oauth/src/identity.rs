//! Authenticated identities and authentication tickets.
//!
//! An [`Identity`] is a set of typed claims built fresh for each successful
//! grant. It always carries a name claim equal to the verified user name;
//! the configured claims filler may append anything else (roles, tenant ids,
//! custom facts). Once wrapped in an [`AuthenticationTicket`] the identity is
//! read-only and consumed exactly once by the token codec.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::credentials::UserName;

/// Well-known claim type names.
pub mod claim_types {
    /// The mandatory name claim carried by every identity.
    pub const NAME: &str = "name";

    /// Role membership claim; may appear multiple times.
    pub const ROLE: &str = "role";
}

/// A typed key/value fact attached to an identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Claim {
    /// The claim type, e.g. `name` or `role`.
    #[serde(rename = "type")]
    pub claim_type: String,
    /// The claim value.
    pub value: String,
}

impl Claim {
    /// Create a claim from a type and value.
    #[must_use]
    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self { claim_type: claim_type.into(), value: value.into() }
    }

    /// Create a name claim.
    #[must_use]
    pub fn name(value: impl Into<String>) -> Self {
        Self::new(claim_types::NAME, value)
    }

    /// Create a role claim.
    #[must_use]
    pub fn role(value: impl Into<String>) -> Self {
        Self::new(claim_types::ROLE, value)
    }
}

/// An authenticated identity: an authentication scheme plus a claim set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// The authentication scheme this identity was established under.
    pub authentication_type: String,
    claims: Vec<Claim>,
}

impl Identity {
    /// Create an identity carrying the mandatory name claim for `username`.
    #[must_use]
    pub fn with_name(authentication_type: impl Into<String>, username: &UserName) -> Self {
        Self {
            authentication_type: authentication_type.into(),
            claims: vec![Claim::name(username.as_str())],
        }
    }

    /// Create an identity from an already-assembled claim set.
    ///
    /// Used when rebuilding an identity from a decoded token.
    #[must_use]
    pub fn from_claims(authentication_type: impl Into<String>, claims: Vec<Claim>) -> Self {
        Self { authentication_type: authentication_type.into(), claims }
    }

    /// Append a claim.
    pub fn add_claim(&mut self, claim: Claim) {
        self.claims.push(claim);
    }

    /// The full claim set, in insertion order.
    #[must_use]
    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    /// The value of the name claim, if present.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.find_first(claim_types::NAME)
    }

    /// All values carried under a claim type.
    pub fn values_of<'a, 'b>(
        &'a self,
        claim_type: &'b str,
    ) -> impl Iterator<Item = &'a str> + use<'a, 'b> {
        self.claims
            .iter()
            .filter(move |c| c.claim_type == claim_type)
            .map(|c| c.value.as_str())
    }

    /// The first value carried under a claim type.
    #[must_use]
    pub fn find_first(&self, claim_type: &str) -> Option<&str> {
        self.values_of(claim_type).next()
    }

    /// Whether the identity carries a specific claim.
    #[must_use]
    pub fn has_claim(&self, claim_type: &str, value: &str) -> bool {
        self.values_of(claim_type).any(|v| v == value)
    }
}

/// The bundle of identity and validity window produced by a successful
/// grant, prior to signing.
///
/// The grant handler leaves both timestamps unset; the token endpoint stamps
/// them (`now` / `now + lifetime`) just before encoding. A ticket encoded
/// without timestamps yields a token with no `iat`/`exp` claims and therefore
/// no enforced expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationTicket {
    /// The authenticated identity.
    pub identity: Identity,
    /// When the token was issued.
    pub issued_utc: Option<DateTime<Utc>>,
    /// When the token expires.
    pub expires_utc: Option<DateTime<Utc>>,
}

impl AuthenticationTicket {
    /// Wrap an identity with no validity window.
    #[must_use]
    pub fn new(identity: Identity) -> Self {
        Self { identity, issued_utc: None, expires_utc: None }
    }

    /// Return the ticket with its validity window stamped.
    #[must_use]
    pub fn with_validity(mut self, issued: DateTime<Utc>, expires: DateTime<Utc>) -> Self {
        self.issued_utc = Some(issued);
        self.expires_utc = Some(expires);
        self
    }
}
