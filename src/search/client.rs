//! Search backend client.
//!
//! [`IndexBackend`] abstracts the remote index service; [`AzureSearchClient`]
//! implements it over the Azure Search REST API with `reqwest`.

use async_trait::async_trait;
use reqwest::StatusCode;
use url::Url;

use crate::config::SearchSettings;
use crate::search::schema::IndexDefinition;
use crate::search::IndexSyncError;

/// REST API version the schema types are written against.
pub const API_VERSION: &str = "2017-11-11";

/// Remote index operations needed by schema synchronization.
#[async_trait]
pub trait IndexBackend: Send + Sync {
    /// Fetch the index definition, `None` if the index does not exist.
    async fn get_index(
        &self,
        api_key: &str,
        name: &str,
    ) -> Result<Option<IndexDefinition>, IndexSyncError>;

    /// Create the index or replace its definition.
    async fn create_or_update_index(
        &self,
        api_key: &str,
        definition: &IndexDefinition,
    ) -> Result<(), IndexSyncError>;
}

/// Azure Search REST client.
#[derive(Debug, Clone)]
pub struct AzureSearchClient {
    http: reqwest::Client,
    /// Unparsed endpoint; validated per call so a bad value only matters when sync runs.
    endpoint: Option<String>,
}

impl AzureSearchClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: Some(endpoint.into()),
        }
    }

    /// Explicit endpoint, else `https://{service}.search.windows.net`.
    pub fn from_settings(settings: &SearchSettings) -> Self {
        let endpoint = settings.endpoint.clone().or_else(|| {
            settings
                .service_name
                .as_ref()
                .map(|name| format!("https://{}.search.windows.net", name))
        });
        Self {
            http: reqwest::Client::new(),
            endpoint,
        }
    }

    fn index_url(&self, name: &str) -> Result<Url, IndexSyncError> {
        let endpoint = self.endpoint.as_deref().ok_or_else(|| {
            IndexSyncError::InvalidEndpoint(
                "neither AzureSearchEndpoint nor AzureSearchServiceName is configured".to_string(),
            )
        })?;

        let mut url = Url::parse(&format!("{}/indexes/{}", endpoint.trim_end_matches('/'), name))
            .map_err(|e| IndexSyncError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(IndexSyncError::InvalidEndpoint(format!(
                "{}: unsupported scheme",
                endpoint
            )));
        }
        url.query_pairs_mut().append_pair("api-version", API_VERSION);
        Ok(url)
    }
}

fn transport_error(e: reqwest::Error) -> IndexSyncError {
    if e.is_timeout() {
        IndexSyncError::Network(format!("request timed out: {}", e))
    } else {
        IndexSyncError::Network(e.to_string())
    }
}

#[async_trait]
impl IndexBackend for AzureSearchClient {
    async fn get_index(
        &self,
        api_key: &str,
        name: &str,
    ) -> Result<Option<IndexDefinition>, IndexSyncError> {
        let url = self.index_url(name)?;
        tracing::debug!(url = %url, "Fetching index definition");

        let response = self
            .http
            .get(url)
            .header("api-key", api_key)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IndexSyncError::from_status(status.as_u16(), body));
        }

        response
            .json::<IndexDefinition>()
            .await
            .map(Some)
            .map_err(|e| IndexSyncError::Decode(e.to_string()))
    }

    async fn create_or_update_index(
        &self,
        api_key: &str,
        definition: &IndexDefinition,
    ) -> Result<(), IndexSyncError> {
        let url = self.index_url(&definition.name)?;
        tracing::debug!(url = %url, "Writing index definition");

        let response = self
            .http
            .put(url)
            .header("api-key", api_key)
            .json(definition)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(IndexSyncError::from_status(status.as_u16(), body))
        }
    }
}
