//! Request authentication.
//!
//! # Data Flow
//! ```text
//! Request headers
//!     → gate.rs AuthGate::evaluate (any_of over schemes, in order)
//!         → secure_token.rs  Authorization: SecureToken <secret>
//!         → jwt.rs           Authorization: Bearer <jwt>
//!     → Accepted(Identity)  → request proceeds, Identity in extensions
//!     → Rejected            → 401 + one WWW-Authenticate per scheme
//! ```
//!
//! # Design Decisions
//! - Schemes are built once at bootstrap and only read afterwards
//! - An unconfigured scheme rejects; an empty gate rejects everything
//! - Misconfigured authority/audience fails bootstrap

pub mod gate;
pub mod jwt;
pub mod middleware;
pub mod secure_token;

use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderValue};
use serde::Serialize;
use thiserror::Error;

pub use gate::{any_of, compose, compose_with_resolver, AuthGate};
pub use jwt::{JwksKeyResolver, JwtBearerOptions, JwtBearerScheme, KeyResolver, StaticKeyResolver};
pub use middleware::require_authentication;
pub use secure_token::{SecureTokenOptions, SecureTokenScheme};

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub subject: String,
    pub scheme: String,
}

/// Result of evaluating one scheme or the whole gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Accepted(Identity),
    Rejected,
}

impl AuthOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, AuthOutcome::Accepted(_))
    }
}

/// Kind of credential a scheme validates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SchemeKind {
    SharedSecret,
    BearerJwt,
}

/// Static description of a configured scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthSchemeDescriptor {
    pub scheme_name: String,
    pub kind: SchemeKind,
    /// Realm for shared-secret schemes, authority for bearer schemes.
    pub realm_or_authority: Option<String>,
    pub configured: bool,
}

/// An authentication scheme evaluated per request.
#[async_trait]
pub trait AuthScheme: Send + Sync {
    fn descriptor(&self) -> AuthSchemeDescriptor;

    /// Value for the `WWW-Authenticate` header when every scheme rejects.
    fn challenge(&self) -> HeaderValue;

    async fn authenticate(&self, headers: &HeaderMap) -> AuthOutcome;
}

/// Invalid scheme configuration detected at composition time.
#[derive(Debug, Clone, Error)]
pub enum AuthSchemeConfigError {
    #[error("invalid OAuth authority {value:?}: {reason}")]
    InvalidAuthority { value: String, reason: String },

    #[error("invalid OAuth audience {value:?}: {reason}")]
    InvalidAudience { value: String, reason: String },

    #[error("invalid challenge for scheme {scheme}: {reason}")]
    InvalidChallenge { scheme: String, reason: String },
}

/// Credentials following `<scheme> ` in any `Authorization` header.
pub(crate) fn credentials_for<'a>(headers: &'a HeaderMap, scheme: &str) -> Option<&'a str> {
    headers
        .get_all(axum::http::header::AUTHORIZATION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|value| {
            let (name, rest) = value.trim().split_once(' ')?;
            if name.eq_ignore_ascii_case(scheme) {
                Some(rest.trim()).filter(|c| !c.is_empty())
            } else {
                None
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::AUTHORIZATION;

    #[test]
    fn test_credentials_for_matches_scheme_case_insensitively() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("securetoken  abc "));
        assert_eq!(credentials_for(&headers, "SecureToken"), Some("abc"));
        assert_eq!(credentials_for(&headers, "Bearer"), None);
    }

    #[test]
    fn test_credentials_for_scans_every_header() {
        let mut headers = HeaderMap::new();
        headers.append(AUTHORIZATION, HeaderValue::from_static("Bearer token"));
        headers.append(AUTHORIZATION, HeaderValue::from_static("SecureToken abc"));
        assert_eq!(credentials_for(&headers, "SecureToken"), Some("abc"));
        assert_eq!(credentials_for(&headers, "Bearer"), Some("token"));
    }

    #[test]
    fn test_empty_credentials_are_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer"));
        assert_eq!(credentials_for(&headers, "Bearer"), None);
    }
}
