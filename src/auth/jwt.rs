//! Bearer JWT authentication (`Authorization: Bearer <jwt>`).
//!
//! Tokens are checked for signature, expiry, issuer and audience. Signing
//! keys come from a [`KeyResolver`]; the default resolver reads the
//! authority's OpenID discovery document and JWKS on first use and caches the
//! key set. Building the scheme performs no I/O.

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderValue};
use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tokio::sync::Mutex;
use url::Url;

use crate::auth::{
    credentials_for, AuthOutcome, AuthScheme, AuthSchemeConfigError, AuthSchemeDescriptor,
    Identity, SchemeKind,
};

pub const BEARER_SCHEME: &str = "Bearer";

/// Minimum spacing between JWKS refetches triggered by an unknown key id.
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(300);

/// Key sets older than this are refetched before use.
const MAX_KEY_SET_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Per-request bound on discovery and JWKS fetches.
pub const JWKS_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Default)]
pub struct JwtBearerOptions {
    pub authority: Option<String>,
    pub audience: Option<String>,
}

/// Supplies verification keys for a token's `kid` and `alg`.
#[async_trait]
pub trait KeyResolver: Send + Sync {
    async fn resolve(&self, kid: Option<&str>, alg: Algorithm) -> Option<DecodingKey>;
}

/// A single fixed key. Useful for symmetric deployments and tests.
pub struct StaticKeyResolver {
    key: DecodingKey,
    algorithm: Algorithm,
}

impl StaticKeyResolver {
    pub fn new(key: DecodingKey, algorithm: Algorithm) -> Self {
        Self { key, algorithm }
    }

    pub fn hmac(secret: &[u8]) -> Self {
        Self::new(DecodingKey::from_secret(secret), Algorithm::HS256)
    }
}

#[async_trait]
impl KeyResolver for StaticKeyResolver {
    async fn resolve(&self, _kid: Option<&str>, alg: Algorithm) -> Option<DecodingKey> {
        (alg == self.algorithm).then(|| self.key.clone())
    }
}

#[derive(Debug, Deserialize)]
struct OpenIdMetadata {
    jwks_uri: String,
}

struct CachedKeys {
    keys: JwkSet,
    fetched_at: Instant,
}

/// Keys from `{authority}/.well-known/openid-configuration` → `jwks_uri`.
///
/// Refreshes run one at a time. A failed refresh is not retried for
/// `MIN_REFRESH_INTERVAL`, so an unavailable authority costs one fetch per
/// interval rather than one per request.
pub struct JwksKeyResolver {
    http: reqwest::Client,
    metadata_url: Url,
    cache: ArcSwapOption<CachedKeys>,
    last_failure: ArcSwapOption<Instant>,
    refresh_lock: Mutex<()>,
}

impl JwksKeyResolver {
    pub fn new(authority: &Url) -> Result<Self, AuthSchemeConfigError> {
        Self::with_timeout(authority, JWKS_FETCH_TIMEOUT)
    }

    pub fn with_timeout(authority: &Url, timeout: Duration) -> Result<Self, AuthSchemeConfigError> {
        let mut base = authority.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let metadata_url = base.join(".well-known/openid-configuration").map_err(|e| {
            AuthSchemeConfigError::InvalidAuthority {
                value: authority.to_string(),
                reason: e.to_string(),
            }
        })?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default HTTP client for key discovery");
                reqwest::Client::new()
            });

        Ok(Self {
            http,
            metadata_url,
            cache: ArcSwapOption::empty(),
            last_failure: ArcSwapOption::empty(),
            refresh_lock: Mutex::new(()),
        })
    }

    pub fn metadata_url(&self) -> &Url {
        &self.metadata_url
    }

    async fn refresh(&self) -> Result<Arc<CachedKeys>, reqwest::Error> {
        let metadata: OpenIdMetadata = self
            .http
            .get(self.metadata_url.clone())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let keys: JwkSet = self
            .http
            .get(&metadata.jwks_uri)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        tracing::info!(
            jwks_uri = %metadata.jwks_uri,
            keys = keys.keys.len(),
            "Fetched signing keys"
        );

        let cached = Arc::new(CachedKeys {
            keys,
            fetched_at: Instant::now(),
        });
        self.cache.store(Some(cached.clone()));
        Ok(cached)
    }

    /// `Some(answer)` when no refetch is due for this lookup.
    fn lookup_cached(&self, kid: Option<&str>, alg: Algorithm) -> Option<Option<DecodingKey>> {
        if let Some(cached) = self.cache.load_full() {
            let age = cached.fetched_at.elapsed();
            if age < MAX_KEY_SET_AGE {
                if let Some(key) = select_key(&cached.keys, kid, alg) {
                    return Some(Some(key));
                }
                if age < MIN_REFRESH_INTERVAL {
                    return Some(None);
                }
            }
        }

        let recently_failed = self
            .last_failure
            .load_full()
            .is_some_and(|failed_at| failed_at.elapsed() < MIN_REFRESH_INTERVAL);
        recently_failed.then_some(None)
    }
}

#[async_trait]
impl KeyResolver for JwksKeyResolver {
    async fn resolve(&self, kid: Option<&str>, alg: Algorithm) -> Option<DecodingKey> {
        if !is_asymmetric(alg) {
            return None;
        }

        if let Some(answer) = self.lookup_cached(kid, alg) {
            return answer;
        }

        let _refreshing = self.refresh_lock.lock().await;
        if let Some(answer) = self.lookup_cached(kid, alg) {
            return answer;
        }

        match self.refresh().await {
            Ok(cached) => {
                self.last_failure.store(None);
                select_key(&cached.keys, kid, alg)
            }
            Err(e) => {
                self.last_failure.store(Some(Arc::new(Instant::now())));
                tracing::warn!(
                    metadata_url = %self.metadata_url,
                    error = %e,
                    "Failed to fetch signing keys"
                );
                None
            }
        }
    }
}

/// JWKS keys are public keys; symmetric algorithms never verify against them.
fn is_asymmetric(alg: Algorithm) -> bool {
    !matches!(alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)
}

fn key_matches(jwk: &Jwk, alg: Algorithm) -> bool {
    use Algorithm::*;
    match &jwk.algorithm {
        AlgorithmParameters::RSA(_) => matches!(alg, RS256 | RS384 | RS512 | PS256 | PS384 | PS512),
        AlgorithmParameters::EllipticCurve(_) => matches!(alg, ES256 | ES384),
        AlgorithmParameters::OctetKeyPair(_) => matches!(alg, EdDSA),
        AlgorithmParameters::OctetKey(_) => false,
    }
}

fn select_key(set: &JwkSet, kid: Option<&str>, alg: Algorithm) -> Option<DecodingKey> {
    let candidates: Vec<&Jwk> = match kid {
        Some(kid) => set.find(kid).into_iter().collect(),
        None => set.keys.iter().collect(),
    };
    candidates
        .into_iter()
        .filter(|jwk| key_matches(jwk, alg))
        .find_map(|jwk| DecodingKey::from_jwk(jwk).ok())
}

#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(default)]
    sub: Option<String>,
}

enum BearerState {
    Disabled { reason: &'static str },
    Enabled {
        authority: Url,
        issuers: Vec<String>,
        audience: String,
        keys: Arc<dyn KeyResolver>,
    },
}

pub struct JwtBearerScheme {
    state: BearerState,
}

impl JwtBearerScheme {
    /// Build with keys from the authority's JWKS.
    pub fn new(options: JwtBearerOptions) -> Result<Self, AuthSchemeConfigError> {
        Self::build(options, None)
    }

    /// Build with an explicit key source.
    pub fn with_key_resolver(
        options: JwtBearerOptions,
        keys: Arc<dyn KeyResolver>,
    ) -> Result<Self, AuthSchemeConfigError> {
        Self::build(options, Some(keys))
    }

    fn build(
        options: JwtBearerOptions,
        keys: Option<Arc<dyn KeyResolver>>,
    ) -> Result<Self, AuthSchemeConfigError> {
        let authority = options.authority.filter(|a| !a.trim().is_empty());
        let audience = options.audience.filter(|a| !a.trim().is_empty());

        let authority = authority
            .map(|raw| parse_authority(raw.trim()))
            .transpose()?;
        if let Some(audience) = audience.as_deref() {
            validate_audience(audience)?;
        }

        let (authority, audience) = match (authority, audience) {
            (Some(authority), Some(audience)) => (authority, audience),
            (None, _) => {
                return Ok(Self {
                    state: BearerState::Disabled {
                        reason: "no OAuth authority configured",
                    },
                })
            }
            (_, None) => {
                return Ok(Self {
                    state: BearerState::Disabled {
                        reason: "no OAuth audience configured",
                    },
                })
            }
        };

        let keys = match keys {
            Some(keys) => keys,
            None => Arc::new(JwksKeyResolver::new(&authority)?),
        };

        let trimmed = authority.as_str().trim_end_matches('/').to_string();
        let issuers = vec![trimmed.clone(), format!("{}/", trimmed)];

        Ok(Self {
            state: BearerState::Enabled {
                authority,
                issuers,
                audience: audience.trim().to_string(),
                keys,
            },
        })
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self.state, BearerState::Enabled { .. })
    }
}

fn parse_authority(raw: &str) -> Result<Url, AuthSchemeConfigError> {
    let url = Url::parse(raw).map_err(|e| AuthSchemeConfigError::InvalidAuthority {
        value: raw.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(AuthSchemeConfigError::InvalidAuthority {
            value: raw.to_string(),
            reason: "authority must be an absolute http(s) URL".to_string(),
        });
    }
    Ok(url)
}

/// Audiences may be plain identifiers; anything that looks like a URL must parse.
fn validate_audience(raw: &str) -> Result<(), AuthSchemeConfigError> {
    if raw.contains("://") {
        Url::parse(raw.trim()).map_err(|e| AuthSchemeConfigError::InvalidAudience {
            value: raw.to_string(),
            reason: e.to_string(),
        })?;
    }
    Ok(())
}

#[async_trait]
impl AuthScheme for JwtBearerScheme {
    fn descriptor(&self) -> AuthSchemeDescriptor {
        AuthSchemeDescriptor {
            scheme_name: BEARER_SCHEME.to_string(),
            kind: SchemeKind::BearerJwt,
            realm_or_authority: match &self.state {
                BearerState::Enabled { authority, .. } => Some(authority.to_string()),
                BearerState::Disabled { .. } => None,
            },
            configured: self.is_enabled(),
        }
    }

    fn challenge(&self) -> HeaderValue {
        HeaderValue::from_static(BEARER_SCHEME)
    }

    async fn authenticate(&self, headers: &HeaderMap) -> AuthOutcome {
        let (issuers, audience, keys) = match &self.state {
            BearerState::Enabled {
                issuers,
                audience,
                keys,
                ..
            } => (issuers, audience, keys),
            BearerState::Disabled { reason } => {
                tracing::trace!(reason, "Bearer scheme disabled");
                return AuthOutcome::Rejected;
            }
        };

        let Some(token) = credentials_for(headers, BEARER_SCHEME) else {
            return AuthOutcome::Rejected;
        };

        let header = match decode_header(token) {
            Ok(header) => header,
            Err(e) => {
                tracing::debug!(error = %e, "Malformed bearer token");
                return AuthOutcome::Rejected;
            }
        };

        let Some(key) = keys.resolve(header.kid.as_deref(), header.alg).await else {
            tracing::debug!(kid = ?header.kid, alg = ?header.alg, "No signing key for bearer token");
            return AuthOutcome::Rejected;
        };

        let mut validation = Validation::new(header.alg);
        validation.set_issuer(issuers.as_slice());
        validation.set_audience(&[audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);

        match decode::<Claims>(token, &key, &validation) {
            Ok(data) => AuthOutcome::Accepted(Identity {
                subject: data.claims.sub.unwrap_or_default(),
                scheme: BEARER_SCHEME.to_string(),
            }),
            Err(e) => {
                tracing::debug!(error = %e, "Bearer token rejected");
                AuthOutcome::Rejected
            }
        }
    }
}
