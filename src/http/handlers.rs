//! Route handlers.

use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use serde::Serialize;

use crate::auth::Identity;
use crate::discovery::RegistrationStatus;
use crate::http::version::ApiVersion;
use crate::lifecycle::ReadyService;
use crate::search::SyncOutcome;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// `GET /health`: public liveness probe.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Serialize)]
pub struct IndexStatusResponse {
    pub index: String,
    pub outcome: SyncOutcome,
    pub search_enabled: bool,
    pub registration: RegistrationStatus,
    pub api_version: String,
}

/// `GET /api/index`: what bootstrap did with the index and the registration.
pub async fn index_status(
    State(ready): State<Arc<ReadyService>>,
    Extension(version): Extension<ApiVersion>,
) -> Json<IndexStatusResponse> {
    Json(IndexStatusResponse {
        index: ready.settings.search.index_name.clone(),
        outcome: ready.index,
        search_enabled: ready.settings.search.api_key.is_some(),
        registration: ready.registration.clone(),
        api_version: version.to_string(),
    })
}

#[derive(Debug, Serialize)]
pub struct IdentityResponse {
    #[serde(flatten)]
    pub identity: Identity,
    pub api_version: String,
}

/// `GET /api/identity`: the authenticated caller.
pub async fn identity(
    Extension(identity): Extension<Identity>,
    Extension(version): Extension<ApiVersion>,
) -> Json<IdentityResponse> {
    Json(IdentityResponse {
        identity,
        api_version: version.to_string(),
    })
}
