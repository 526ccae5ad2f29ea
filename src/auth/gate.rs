//! Composite authorization policy over the configured schemes.

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::WWW_AUTHENTICATE;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;

use crate::auth::jwt::{JwtBearerOptions, JwtBearerScheme, KeyResolver};
use crate::auth::secure_token::{SecureTokenOptions, SecureTokenScheme};
use crate::auth::{AuthOutcome, AuthScheme, AuthSchemeConfigError, AuthSchemeDescriptor};
use crate::config::AuthSettings;
use crate::observability::metrics;

/// Accepts a request when any of its schemes accepts.
pub struct AuthGate {
    schemes: Vec<Box<dyn AuthScheme>>,
}

impl AuthGate {
    pub fn new(schemes: Vec<Box<dyn AuthScheme>>) -> Self {
        Self { schemes }
    }

    /// Build both schemes from settings. `keys` replaces the JWKS resolver.
    pub fn from_settings(
        settings: &AuthSettings,
        keys: Option<Arc<dyn KeyResolver>>,
    ) -> Result<Self, AuthSchemeConfigError> {
        let secret = SecureTokenOptions::with_token(settings.secure_token.clone());
        let bearer = JwtBearerOptions {
            authority: settings.oauth_authority.clone(),
            audience: settings.oauth_audience.clone(),
        };
        match keys {
            Some(keys) => compose_with_resolver(secret, bearer, keys),
            None => compose(secret, bearer),
        }
    }

    /// Evaluate schemes in order; the first acceptance wins.
    pub async fn evaluate(&self, headers: &HeaderMap) -> AuthOutcome {
        for scheme in &self.schemes {
            let name = scheme.descriptor().scheme_name;
            let outcome = scheme.authenticate(headers).await;
            if outcome.is_accepted() {
                metrics::record_auth_decision(&name, true);
                return outcome;
            }
        }
        metrics::record_auth_decision("any", false);
        AuthOutcome::Rejected
    }

    pub fn challenges(&self) -> Vec<HeaderValue> {
        self.schemes.iter().map(|s| s.challenge()).collect()
    }

    pub fn descriptors(&self) -> Vec<AuthSchemeDescriptor> {
        self.schemes.iter().map(|s| s.descriptor()).collect()
    }

    pub fn has_configured_scheme(&self) -> bool {
        self.schemes.iter().any(|s| s.descriptor().configured)
    }

    /// `401` with one `WWW-Authenticate` header per scheme.
    pub fn challenge_response(&self) -> Response {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::UNAUTHORIZED;
        for challenge in self.challenges() {
            response.headers_mut().append(WWW_AUTHENTICATE, challenge);
        }
        response
    }
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate")
            .field("schemes", &self.descriptors())
            .finish()
    }
}

/// Policy accepting either scheme.
pub fn any_of(first: impl AuthScheme + 'static, second: impl AuthScheme + 'static) -> AuthGate {
    AuthGate::new(vec![Box::new(first), Box::new(second)])
}

/// Shared secret first, then bearer JWT with keys from the authority's JWKS.
pub fn compose(
    secret: SecureTokenOptions,
    bearer: JwtBearerOptions,
) -> Result<AuthGate, AuthSchemeConfigError> {
    let gate = any_of(SecureTokenScheme::new(secret)?, JwtBearerScheme::new(bearer)?);
    log_composed(&gate);
    Ok(gate)
}

pub fn compose_with_resolver(
    secret: SecureTokenOptions,
    bearer: JwtBearerOptions,
    keys: Arc<dyn KeyResolver>,
) -> Result<AuthGate, AuthSchemeConfigError> {
    let gate = any_of(
        SecureTokenScheme::new(secret)?,
        JwtBearerScheme::with_key_resolver(bearer, keys)?,
    );
    log_composed(&gate);
    Ok(gate)
}

fn log_composed(gate: &AuthGate) {
    for descriptor in gate.descriptors() {
        tracing::info!(
            scheme = %descriptor.scheme_name,
            kind = ?descriptor.kind,
            configured = descriptor.configured,
            "Authentication scheme composed"
        );
    }
    if !gate.has_configured_scheme() {
        tracing::warn!("No authentication scheme configured; every /api request will be rejected");
    }
}
