//! Shared-secret authentication (`Authorization: SecureToken <secret>`).

use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderValue};

use crate::auth::{
    credentials_for, AuthOutcome, AuthScheme, AuthSchemeConfigError, AuthSchemeDescriptor,
    Identity, SchemeKind,
};

pub const SECURE_TOKEN_SCHEME: &str = "SecureToken";
pub const DEFAULT_REALM: &str = "search-indexer";

#[derive(Debug, Clone)]
pub struct SecureTokenOptions {
    /// Expected secret; `None` or blank disables the scheme.
    pub secure_token: Option<String>,
    pub scheme: String,
    pub realm: String,
}

impl Default for SecureTokenOptions {
    fn default() -> Self {
        Self {
            secure_token: None,
            scheme: SECURE_TOKEN_SCHEME.to_string(),
            realm: DEFAULT_REALM.to_string(),
        }
    }
}

impl SecureTokenOptions {
    pub fn with_token(token: Option<String>) -> Self {
        Self {
            secure_token: token,
            ..Self::default()
        }
    }
}

pub struct SecureTokenScheme {
    secret: Option<Vec<u8>>,
    scheme: String,
    realm: String,
    challenge: HeaderValue,
}

impl std::fmt::Debug for SecureTokenScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureTokenScheme")
            .field("scheme", &self.scheme)
            .field("realm", &self.realm)
            .field("configured", &self.secret.is_some())
            .finish()
    }
}

impl SecureTokenScheme {
    pub fn new(options: SecureTokenOptions) -> Result<Self, AuthSchemeConfigError> {
        let challenge = HeaderValue::from_str(&format!(
            "{} realm=\"{}\"",
            options.scheme, options.realm
        ))
        .map_err(|e| AuthSchemeConfigError::InvalidChallenge {
            scheme: options.scheme.clone(),
            reason: e.to_string(),
        })?;

        let secret = options
            .secure_token
            .filter(|s| !s.trim().is_empty())
            .map(String::into_bytes);

        Ok(Self {
            secret,
            scheme: options.scheme,
            realm: options.realm,
            challenge,
        })
    }
}

/// Compare without short-circuiting on the first differing byte.
///
/// Length is not hidden; the secret length is not considered sensitive.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[async_trait]
impl AuthScheme for SecureTokenScheme {
    fn descriptor(&self) -> AuthSchemeDescriptor {
        AuthSchemeDescriptor {
            scheme_name: self.scheme.clone(),
            kind: SchemeKind::SharedSecret,
            realm_or_authority: Some(self.realm.clone()),
            configured: self.secret.is_some(),
        }
    }

    fn challenge(&self) -> HeaderValue {
        self.challenge.clone()
    }

    async fn authenticate(&self, headers: &HeaderMap) -> AuthOutcome {
        let Some(secret) = self.secret.as_deref() else {
            return AuthOutcome::Rejected;
        };
        let Some(presented) = credentials_for(headers, &self.scheme) else {
            return AuthOutcome::Rejected;
        };

        if constant_time_eq(presented.as_bytes(), secret) {
            AuthOutcome::Accepted(Identity {
                subject: self.realm.clone(),
                scheme: self.scheme.clone(),
            })
        } else {
            tracing::debug!(scheme = %self.scheme, "Secure token mismatch");
            AuthOutcome::Rejected
        }
    }
}
