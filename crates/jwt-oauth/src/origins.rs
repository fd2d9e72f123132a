//! CORS origin policy.
//!
//! An [`AllowedOrigins`] value describes which origins may receive the
//! `Access-Control-Allow-Origin` response header. It is built once at
//! configuration time and shared read-only across all grant evaluations.

use axum::http::HeaderValue;

/// The wildcard origin admitting every caller.
const WILDCARD: &str = "*";

/// An ordered, non-empty list of origins allowed to receive the
/// `Access-Control-Allow-Origin` header.
///
/// Origin strings are taken as-is; no URL validation is performed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedOrigins {
    origins: Vec<String>,
}

impl AllowedOrigins {
    /// Allow all origins (`*`).
    #[must_use]
    pub fn all() -> Self {
        Self { origins: vec![WILDCARD.to_string()] }
    }

    /// Allow an explicit list of origins.
    ///
    /// An empty list collapses to [`AllowedOrigins::all`], keeping the
    /// non-empty invariant without a fallible constructor.
    #[must_use]
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let origins: Vec<String> = origins.into_iter().map(Into::into).collect();
        if origins.is_empty() {
            return Self::all();
        }
        Self { origins }
    }

    /// Whether this policy is the wildcard.
    #[must_use]
    pub fn is_all(&self) -> bool {
        self.origins.len() == 1 && self.origins[0] == WILDCARD
    }

    /// The configured origin strings.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.origins
    }

    /// Render the policy as the `Access-Control-Allow-Origin` header value.
    ///
    /// Multiple origins are comma-joined, matching how multi-valued response
    /// headers are folded on the wire.
    #[must_use]
    pub fn header_value(&self) -> String {
        self.origins.join(", ")
    }

    /// The policy as an HTTP header value, if the configured strings are
    /// representable in a header.
    #[must_use]
    pub fn as_header_value(&self) -> Option<HeaderValue> {
        HeaderValue::from_str(&self.header_value()).ok()
    }
}

impl Default for AllowedOrigins {
    fn default() -> Self {
        Self::all()
    }
}
