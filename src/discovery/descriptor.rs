//! Registration descriptor and port derivation.

use serde::Serialize;
use url::Url;

use crate::config::{DiscoverySettings, ServerSettings};

/// Port used when `server.urls` is absent or unusable.
pub const DEFAULT_PORT: u16 = 5000;

/// Service name used when none is configured.
pub const DEFAULT_SERVICE_NAME: &str = "search-indexer-api";

/// Everything the discovery agent needs to register this instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationDescriptor {
    pub service_id: String,
    pub service_name: String,
    pub agent_address: Option<String>,
    pub datacenter: Option<String>,
    pub port: u16,
}

impl RegistrationDescriptor {
    pub fn from_settings(discovery: &DiscoverySettings, server: &ServerSettings) -> Self {
        let service_name = discovery
            .service_name
            .clone()
            .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string());
        let service_id = discovery
            .service_id
            .clone()
            .unwrap_or_else(|| format!("{}-{}", service_name, uuid::Uuid::new_v4()));

        Self {
            service_id,
            service_name,
            agent_address: discovery.agent_address.clone(),
            datacenter: discovery.datacenter.clone(),
            port: resolve_port(server.urls.as_deref()),
        }
    }
}

/// Derive the listening port from a `server.urls` value.
///
/// Uses the first `;`-separated entry. An explicit port wins, then the
/// scheme's default. Anything unusable yields [`DEFAULT_PORT`]; this never fails.
pub fn resolve_port(server_urls: Option<&str>) -> u16 {
    let first = server_urls
        .and_then(|urls| urls.split(';').map(str::trim).find(|u| !u.is_empty()));

    let Some(address) = first else {
        return DEFAULT_PORT;
    };

    match Url::parse(address) {
        Ok(url) => url.port_or_known_default().unwrap_or(DEFAULT_PORT),
        Err(e) => {
            tracing::warn!(
                server_urls = %address,
                error = %e,
                default_port = DEFAULT_PORT,
                "Unparseable listen address, using default port"
            );
            DEFAULT_PORT
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_from_url() {
        assert_eq!(resolve_port(Some("http://0.0.0.0:8080")), 8080);
        assert_eq!(resolve_port(Some(" http://indexer.local:7001 ")), 7001);
        assert_eq!(resolve_port(Some("http://localhost:6000;https://localhost:6001")), 6000);
    }

    #[test]
    fn test_scheme_default_port() {
        assert_eq!(resolve_port(Some("http://indexer.local")), 80);
        assert_eq!(resolve_port(Some("https://indexer.local")), 443);
    }

    #[test]
    fn test_fallback_port() {
        assert_eq!(resolve_port(None), DEFAULT_PORT);
        assert_eq!(resolve_port(Some("")), DEFAULT_PORT);
        assert_eq!(resolve_port(Some("   ;  ")), DEFAULT_PORT);
        assert_eq!(resolve_port(Some("not a url")), DEFAULT_PORT);
        assert_eq!(resolve_port(Some("0.0.0.0:8080")), DEFAULT_PORT);
        assert_eq!(resolve_port(Some("http://host:99999")), DEFAULT_PORT);
    }

    #[test]
    fn test_descriptor_from_settings() {
        let discovery = DiscoverySettings {
            service_id: Some("indexer-1".into()),
            service_name: Some("indexer".into()),
            agent_address: Some("http://consul:8500".into()),
            datacenter: Some("dc1".into()),
            ..DiscoverySettings::default()
        };
        let server = ServerSettings {
            urls: Some("http://0.0.0.0:8080".into()),
            ..ServerSettings::default()
        };

        let descriptor = RegistrationDescriptor::from_settings(&discovery, &server);
        assert_eq!(descriptor.service_id, "indexer-1");
        assert_eq!(descriptor.service_name, "indexer");
        assert_eq!(descriptor.datacenter.as_deref(), Some("dc1"));
        assert_eq!(descriptor.port, 8080);
    }

    #[test]
    fn test_generated_service_id() {
        let descriptor =
            RegistrationDescriptor::from_settings(&DiscoverySettings::default(), &ServerSettings::default());
        assert!(descriptor.service_id.starts_with("search-indexer-api-"));
        assert_eq!(descriptor.port, DEFAULT_PORT);
    }
}
