//! Credential value objects.
//!
//! [`UserName`] and [`Password`] are deliberately distinct wrapper types so a
//! transposed call site fails to compile instead of silently swapping the
//! two strings. Construction and access are explicit; there is no implicit
//! coercion to or from `&str`.

/// A user name presented in a resource-owner-password grant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserName(String);

impl UserName {
    /// Wrap a user name string.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Unwrap into the underlying string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for UserName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A password presented in a resource-owner-password grant.
///
/// Never logged and never displayed; the `Debug` impl redacts the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    /// Wrap a password string.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Unwrap into the underlying string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(<redacted>)")
    }
}

/// A username/password pair extracted from one grant request.
///
/// Constructed per request and discarded once the grant completes.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: UserName,
    pub password: Password,
}

impl Credentials {
    /// Pair a user name with a password.
    #[must_use]
    pub fn new(username: UserName, password: Password) -> Self {
        Self { username, password }
    }
}
