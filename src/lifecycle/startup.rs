//! Startup orchestration.
//!
//! # Responsibilities
//! - Resolve and validate configuration
//! - Compose the authentication gate
//! - Register with the discovery agent (optional, non-fatal)
//! - Synchronize the search index schema (optional, fatal on failure)
//!
//! # Design Decisions
//! - Steps run strictly in order; every transition is logged
//! - Traffic is served only after `Ready`
//! - Index sync runs on its own task and is awaited as a barrier

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::auth::{AuthGate, AuthSchemeConfigError, KeyResolver};
use crate::config::validation::validate_settings;
use crate::config::{ConfigError, ConfigLoader, ResolvedConfig, ServiceSettings};
use crate::discovery::{
    ConsulAgent, DiscoveryAgent, DiscoveryRegistrar, RegistrationDescriptor, RegistrationStatus,
};
use crate::observability::metrics;
use crate::resilience::RetryPolicy;
use crate::search::{AzureSearchClient, IndexBackend, IndexSyncError, IndexSynchronizer, SyncOutcome};

/// Timeout for a single discovery agent call.
const DISCOVERY_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Bootstrap progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BootstrapState {
    Start,
    ConfigResolved,
    AuthComposed,
    Registered,
    RegistrationSkippedOrFailed,
    IndexSynced,
    Fatal,
    Ready,
}

impl fmt::Display for BootstrapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Failures that stop the service from starting.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("authentication setup error: {0}")]
    Auth(#[from] AuthSchemeConfigError),

    #[error("index synchronization failed: {0}")]
    IndexSync(#[from] IndexSyncError),

    #[error("bootstrap already ran (state {0})")]
    AlreadyRan(BootstrapState),
}

/// Everything the request pipeline needs once bootstrap succeeded.
#[derive(Debug, Clone)]
pub struct ReadyService {
    pub config: Arc<ResolvedConfig>,
    pub settings: Arc<ServiceSettings>,
    pub auth: Arc<AuthGate>,
    pub registration: RegistrationStatus,
    pub index: SyncOutcome,
}

/// Drives the service from `Start` to `Ready` or `Fatal`.
pub struct BootstrapOrchestrator {
    loader: ConfigLoader,
    resolved: Option<ResolvedConfig>,
    index_backend: Option<Arc<dyn IndexBackend>>,
    discovery_agent: Option<Arc<dyn DiscoveryAgent>>,
    key_resolver: Option<Arc<dyn KeyResolver>>,
    state: BootstrapState,
    history: Vec<BootstrapState>,
}

impl BootstrapOrchestrator {
    pub fn new(loader: ConfigLoader) -> Self {
        Self {
            loader,
            resolved: None,
            index_backend: None,
            discovery_agent: None,
            key_resolver: None,
            state: BootstrapState::Start,
            history: vec![BootstrapState::Start],
        }
    }

    /// Start from configuration the caller already loaded; the loader is
    /// then only used for its environment name.
    pub fn with_resolved_config(mut self, config: ResolvedConfig) -> Self {
        self.resolved = Some(config);
        self
    }

    /// Use this backend instead of the Azure Search REST client.
    pub fn with_index_backend(mut self, backend: Arc<dyn IndexBackend>) -> Self {
        self.index_backend = Some(backend);
        self
    }

    /// Use this agent instead of the Consul HTTP agent.
    pub fn with_discovery_agent(mut self, agent: Arc<dyn DiscoveryAgent>) -> Self {
        self.discovery_agent = Some(agent);
        self
    }

    /// Verify bearer tokens with these keys instead of the authority's JWKS.
    pub fn with_key_resolver(mut self, keys: Arc<dyn KeyResolver>) -> Self {
        self.key_resolver = Some(keys);
        self
    }

    pub fn state(&self) -> BootstrapState {
        self.state
    }

    /// Every state visited so far, in order.
    pub fn history(&self) -> &[BootstrapState] {
        &self.history
    }

    /// Run every bootstrap step. Only the first call does any work.
    pub async fn run(&mut self) -> Result<ReadyService, BootstrapError> {
        if self.state != BootstrapState::Start {
            return Err(BootstrapError::AlreadyRan(self.state));
        }

        match self.run_steps().await {
            Ok(ready) => Ok(ready),
            Err(e) => {
                tracing::error!(error = %e, from = %self.state, "Bootstrap failed");
                self.transition(BootstrapState::Fatal);
                Err(e)
            }
        }
    }

    async fn run_steps(&mut self) -> Result<ReadyService, BootstrapError> {
        let config = match self.resolved.take() {
            Some(config) => config,
            None => self.loader.load()?,
        };
        let settings = ServiceSettings::from_config(&config)?;
        validate_settings(&settings).map_err(ConfigError::Validation)?;
        tracing::info!(
            environment = %self.loader.environment_name(),
            keys = config.len(),
            index = %settings.search.index_name,
            search_enabled = settings.search.api_key.is_some(),
            discovery_enabled = settings.discovery.enabled,
            "Configuration resolved"
        );
        self.transition(BootstrapState::ConfigResolved);

        let auth = Arc::new(AuthGate::from_settings(
            &settings.auth,
            self.key_resolver.clone(),
        )?);
        self.transition(BootstrapState::AuthComposed);

        let registration = self.register(&settings).await;
        metrics::record_registration(registration.as_str());
        if registration.is_registered() {
            self.transition(BootstrapState::Registered);
        } else {
            self.transition(BootstrapState::RegistrationSkippedOrFailed);
        }

        let index = match self.synchronize_index(&settings).await {
            Ok(outcome) => {
                metrics::record_index_sync(outcome.as_str());
                outcome
            }
            Err(e) => {
                metrics::record_index_sync("failed");
                return Err(e.into());
            }
        };
        self.transition(BootstrapState::IndexSynced);

        self.transition(BootstrapState::Ready);
        metrics::record_ready();

        Ok(ReadyService {
            config: Arc::new(config),
            settings: Arc::new(settings),
            auth,
            registration,
            index,
        })
    }

    async fn register(&self, settings: &ServiceSettings) -> RegistrationStatus {
        let agent = self
            .discovery_agent
            .clone()
            .unwrap_or_else(|| Arc::new(ConsulAgent::new(DISCOVERY_CALL_TIMEOUT)));
        let discovery = &settings.discovery;
        let registrar = DiscoveryRegistrar::new(agent).with_retry_policy(RetryPolicy::new(
            discovery.max_attempts,
            Duration::from_millis(discovery.base_delay_ms),
            Duration::from_millis(discovery.max_delay_ms),
        ));
        let descriptor = RegistrationDescriptor::from_settings(discovery, &settings.server);
        registrar
            .register_if_enabled(discovery.enabled, descriptor)
            .await
    }

    async fn synchronize_index(
        &self,
        settings: &ServiceSettings,
    ) -> Result<SyncOutcome, IndexSyncError> {
        let backend = self
            .index_backend
            .clone()
            .unwrap_or_else(|| Arc::new(AzureSearchClient::from_settings(&settings.search)));
        let synchronizer = IndexSynchronizer::from_settings(backend, &settings.search);
        let api_key = settings.search.api_key.clone();

        let task = tokio::spawn(async move { synchronizer.synchronize(api_key.as_deref()).await });
        match task.await {
            Ok(result) => result,
            Err(e) => Err(IndexSyncError::Aborted(e.to_string())),
        }
    }

    fn transition(&mut self, next: BootstrapState) {
        tracing::info!(from = %self.state, to = %next, "Bootstrap transition");
        self.state = next;
        self.history.push(next);
    }
}
