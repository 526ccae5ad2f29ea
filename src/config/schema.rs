//! Typed service settings.
//!
//! Extracted once from a [`ResolvedConfig`]. Blank strings are treated as
//! unset so that an empty environment variable cannot masquerade as a secret.

use serde::Serialize;

use crate::config::loader::ConfigError;
use crate::config::source::ResolvedConfig;

/// Root settings for the service.
#[derive(Debug, Clone, Serialize, Default)]
pub struct ServiceSettings {
    pub search: SearchSettings,
    pub auth: AuthSettings,
    pub discovery: DiscoverySettings,
    pub server: ServerSettings,
    pub observability: ObservabilitySettings,
}

/// Azure Search backend settings.
#[derive(Debug, Clone, Serialize)]
pub struct SearchSettings {
    /// Admin API key. Absent means the service runs without index sync.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Search service name, used to derive the endpoint.
    pub service_name: Option<String>,

    /// Explicit endpoint, overrides the derived one.
    pub endpoint: Option<String>,

    pub index_name: String,

    /// Per-call timeout for schema synchronization.
    pub sync_timeout_secs: u64,

    /// Upper bound on synchronization attempts.
    pub sync_max_attempts: u32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            service_name: None,
            endpoint: None,
            index_name: "documents".to_string(),
            sync_timeout_secs: 30,
            sync_max_attempts: 3,
        }
    }
}

/// Authentication scheme settings.
#[derive(Debug, Clone, Serialize, Default)]
pub struct AuthSettings {
    #[serde(skip_serializing)]
    pub secure_token: Option<String>,
    pub oauth_authority: Option<String>,
    pub oauth_audience: Option<String>,
}

/// Service discovery settings.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoverySettings {
    pub enabled: bool,
    pub service_id: Option<String>,
    pub service_name: Option<String>,
    pub agent_address: Option<String>,
    pub datacenter: Option<String>,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            service_id: None,
            service_name: None,
            agent_address: None,
            datacenter: None,
            max_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 2000,
        }
    }
}

/// Listener settings.
#[derive(Debug, Clone, Serialize)]
pub struct ServerSettings {
    /// `server.urls`, possibly several addresses separated by `;`.
    pub urls: Option<String>,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            urls: None,
            request_timeout_secs: 30,
        }
    }
}

/// Logging and metrics settings.
#[derive(Debug, Clone, Serialize)]
pub struct ObservabilitySettings {
    pub log_level: String,
    pub metrics_enabled: bool,
    pub metrics_address: String,
}

impl Default for ObservabilitySettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

impl ServiceSettings {
    /// Extract typed settings. Fails on values that are present but malformed.
    pub fn from_config(config: &ResolvedConfig) -> Result<Self, ConfigError> {
        let owned = |key: &str| config.get_non_blank(key).map(|v| v.trim().to_string());

        let search_defaults = SearchSettings::default();
        let search = SearchSettings {
            api_key: owned("AzureSearchApiKey"),
            service_name: owned("AzureSearchServiceName"),
            endpoint: owned("AzureSearchEndpoint"),
            index_name: owned("AzureSearchIndexName").unwrap_or(search_defaults.index_name),
            sync_timeout_secs: config
                .parse_or("AzureSearchSyncTimeoutSecs", search_defaults.sync_timeout_secs)?,
            sync_max_attempts: config
                .parse_or("AzureSearchSyncMaxAttempts", search_defaults.sync_max_attempts)?,
        };

        let auth = AuthSettings {
            secure_token: config.get_non_blank("SecureToken").map(str::to_string),
            oauth_authority: owned("OAuthAuthority"),
            oauth_audience: owned("OAuthAudience"),
        };

        let discovery_defaults = DiscoverySettings::default();
        let discovery = DiscoverySettings {
            enabled: config.bool_or("ServiceDiscovery.Enabled", discovery_defaults.enabled)?,
            service_id: owned("ServiceDiscovery.ServiceId"),
            service_name: owned("ServiceDiscovery.ServiceName"),
            agent_address: owned("ServiceDiscovery.AgentAddress"),
            datacenter: owned("ServiceDiscovery.Datacenter"),
            max_attempts: config
                .parse_or("ServiceDiscovery.MaxAttempts", discovery_defaults.max_attempts)?,
            base_delay_ms: config
                .parse_or("ServiceDiscovery.BaseDelayMs", discovery_defaults.base_delay_ms)?,
            max_delay_ms: config
                .parse_or("ServiceDiscovery.MaxDelayMs", discovery_defaults.max_delay_ms)?,
        };

        let server_defaults = ServerSettings::default();
        let server = ServerSettings {
            urls: owned("server.urls"),
            request_timeout_secs: config
                .parse_or("RequestTimeoutSecs", server_defaults.request_timeout_secs)?,
        };

        let observability_defaults = ObservabilitySettings::default();
        let observability = ObservabilitySettings {
            log_level: owned("Logging.Level").unwrap_or(observability_defaults.log_level),
            metrics_enabled: config
                .bool_or("Metrics.Enabled", observability_defaults.metrics_enabled)?,
            metrics_address: owned("Metrics.Address")
                .unwrap_or(observability_defaults.metrics_address),
        };

        Ok(Self {
            search,
            auth,
            discovery,
            server,
            observability,
        })
    }
}
