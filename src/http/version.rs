//! API version negotiation for `/api` routes.
//!
//! The version is read from the `api-version` query parameter or header.
//! Absent means the default version. Every response advertises the supported
//! versions in `api-supported-versions`.

use std::fmt;
use std::str::FromStr;

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

pub const API_VERSION_PARAM: &str = "api-version";
pub static API_VERSION_HEADER: HeaderName = HeaderName::from_static("api-version");
pub static SUPPORTED_VERSIONS_HEADER: HeaderName = HeaderName::from_static("api-supported-versions");

pub const DEFAULT_VERSION: ApiVersion = ApiVersion { major: 1, minor: 0 };
pub const SUPPORTED_VERSIONS: &[ApiVersion] = &[DEFAULT_VERSION];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ApiVersion {
    pub major: u16,
    pub minor: u16,
}

impl Default for ApiVersion {
    fn default() -> Self {
        DEFAULT_VERSION
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for ApiVersion {
    type Err = VersionError;

    /// `1` and `1.0` are the same version.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let invalid = || VersionError::Invalid(raw.to_string());
        let (major, minor) = match raw.split_once('.') {
            Some((major, minor)) => (major, Some(minor)),
            None => (raw, None),
        };
        let major = major.parse().map_err(|_| invalid())?;
        let minor = match minor {
            Some(minor) => minor.parse().map_err(|_| invalid())?,
            None => 0,
        };
        Ok(Self { major, minor })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("'{0}' is not a valid API version")]
    Invalid(String),

    #[error("API version {0} is not supported")]
    Unsupported(ApiVersion),

    #[error("API version requested as both {0} and {1}")]
    Ambiguous(ApiVersion, ApiVersion),
}

impl VersionError {
    fn code(&self) -> &'static str {
        match self {
            VersionError::Invalid(_) => "InvalidApiVersion",
            VersionError::Unsupported(_) => "UnsupportedApiVersion",
            VersionError::Ambiguous(..) => "AmbiguousApiVersion",
        }
    }
}

/// Resolve the requested version from the raw query string and header value.
pub fn resolve_version(query: Option<&str>, header: Option<&str>) -> Result<ApiVersion, VersionError> {
    let from_query = query
        .and_then(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .find(|(k, _)| k.eq_ignore_ascii_case(API_VERSION_PARAM))
                .map(|(_, v)| v.into_owned())
        })
        .map(|v| v.parse::<ApiVersion>())
        .transpose()?;
    let from_header = header.map(str::parse::<ApiVersion>).transpose()?;

    let requested = match (from_query, from_header) {
        (Some(q), Some(h)) if q != h => return Err(VersionError::Ambiguous(q, h)),
        (Some(v), _) | (None, Some(v)) => v,
        (None, None) => DEFAULT_VERSION,
    };

    if SUPPORTED_VERSIONS.contains(&requested) {
        Ok(requested)
    } else {
        Err(VersionError::Unsupported(requested))
    }
}

fn supported_versions_value() -> HeaderValue {
    let joined = SUPPORTED_VERSIONS
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    HeaderValue::from_str(&joined).unwrap_or_else(|_| HeaderValue::from_static("1.0"))
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

/// Middleware: resolve the version, store it in request extensions, answer
/// `400` for bad or unsupported versions.
pub async fn negotiate_version(mut request: Request<Body>, next: Next) -> Response {
    let header = request
        .headers()
        .get(&API_VERSION_HEADER)
        .and_then(|v| v.to_str().ok());

    let mut response = match resolve_version(request.uri().query(), header) {
        Ok(version) => {
            request.extensions_mut().insert(version);
            next.run(request).await
        }
        Err(e) => {
            tracing::debug!(error = %e, "API version rejected");
            let body = ErrorBody {
                error: ErrorDetail {
                    code: e.code(),
                    message: e.to_string(),
                },
            };
            (StatusCode::BAD_REQUEST, Json(body)).into_response()
        }
    };

    response
        .headers_mut()
        .insert(SUPPORTED_VERSIONS_HEADER.clone(), supported_versions_value());
    response
}
