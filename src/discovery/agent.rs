//! Discovery agent client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use url::Url;

use crate::discovery::descriptor::RegistrationDescriptor;
use crate::discovery::RegistrationError;

/// A service registry that can record this instance.
#[async_trait]
pub trait DiscoveryAgent: Send + Sync {
    async fn register(&self, descriptor: &RegistrationDescriptor) -> Result<(), RegistrationError>;
}

/// Consul agent HTTP API.
#[derive(Debug, Clone)]
pub struct ConsulAgent {
    http: reqwest::Client,
}

/// Body of `PUT /v1/agent/service/register`.
#[derive(Debug, Serialize)]
struct ConsulRegistration<'a> {
    #[serde(rename = "ID")]
    id: &'a str,
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "Port")]
    port: u16,
}

impl ConsulAgent {
    pub fn new(timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default HTTP client for discovery agent");
                reqwest::Client::new()
            });
        Self { http }
    }

    fn register_url(descriptor: &RegistrationDescriptor) -> Result<Url, RegistrationError> {
        let agent = descriptor
            .agent_address
            .as_deref()
            .ok_or_else(|| RegistrationError::InvalidAgentAddress("not configured".to_string()))?;

        let mut url = Url::parse(&format!(
            "{}/v1/agent/service/register",
            agent.trim_end_matches('/')
        ))
        .map_err(|e| RegistrationError::InvalidAgentAddress(format!("{}: {}", agent, e)))?;

        if let Some(dc) = descriptor.datacenter.as_deref() {
            url.query_pairs_mut().append_pair("dc", dc);
        }
        Ok(url)
    }
}

impl Default for ConsulAgent {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[async_trait]
impl DiscoveryAgent for ConsulAgent {
    async fn register(&self, descriptor: &RegistrationDescriptor) -> Result<(), RegistrationError> {
        let url = Self::register_url(descriptor)?;
        let body = ConsulRegistration {
            id: &descriptor.service_id,
            name: &descriptor.service_name,
            port: descriptor.port,
        };

        let response = self
            .http
            .put(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RegistrationError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(RegistrationError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}
