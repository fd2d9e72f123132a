//! JWT OAuth for axum
//!
//! Issues and validates signed bearer tokens for a resource-owner-password
//! OAuth flow, pluggable into an axum request pipeline. A grant handler
//! validates a username/password pair through a caller-supplied verifier,
//! builds an authenticated identity augmented by a caller-supplied claims
//! filler, and a token codec signs the result into a compact HMAC-SHA-256
//! token bounded by the configured lifetime.
//!
//! # Example
//!
//! ```no_run
//! use jwt_oauth::config::{OAuthConfig, claims_filler, verifier};
//! use jwt_oauth::server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = OAuthConfig::new(
//!         "https://issuer.example.com",
//!         "my-audience",
//!         "c3VwZXItc2VjcmV0LXNpZ25pbmcta2V5",
//!         verifier(|username, password| async move {
//!             // Replace with a real credential store lookup.
//!             Ok(username.as_str() == password.as_str())
//!         }),
//!         claims_filler(|_username, identity| async move { identity }),
//!     )?;
//!
//!     server::serve(&config, 8000).await
//! }
//! ```

pub mod config;
pub mod credentials;
pub mod error;
pub mod grant;
pub mod identity;
pub mod origins;
pub mod server;
pub mod token;

pub use config::OAuthConfig;
pub use credentials::{Credentials, Password, UserName};
pub use error::{ConfigError, GrantError, TokenError};
pub use grant::PasswordGrantHandler;
pub use identity::{AuthenticationTicket, Claim, Identity};
pub use origins::AllowedOrigins;
pub use token::JwtTokenFormat;
