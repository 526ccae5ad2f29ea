//! One-shot, non-fatal registration with the discovery agent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::discovery::agent::DiscoveryAgent;
use crate::discovery::descriptor::RegistrationDescriptor;
use crate::resilience::{retry, RetryPolicy};

/// Result of a registration request. Failures are reported, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RegistrationStatus {
    /// Discovery disabled for this process.
    Skipped,
    Registered { attempts: u32 },
    /// A previous call already registered this instance.
    AlreadyRegistered,
    Failed { error: String },
}

impl RegistrationStatus {
    pub fn is_registered(&self) -> bool {
        matches!(self, Self::Registered { .. } | Self::AlreadyRegistered)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::Registered { .. } => "registered",
            Self::AlreadyRegistered => "already_registered",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Registers this instance at most once per registrar.
pub struct DiscoveryRegistrar {
    agent: Arc<dyn DiscoveryAgent>,
    policy: RetryPolicy,
    registered: AtomicBool,
}

impl DiscoveryRegistrar {
    pub fn new(agent: Arc<dyn DiscoveryAgent>) -> Self {
        Self {
            agent,
            policy: RetryPolicy::default(),
            registered: AtomicBool::new(false),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Register with the agent when `enabled`. Never fails bootstrap.
    pub async fn register_if_enabled(
        &self,
        enabled: bool,
        descriptor: RegistrationDescriptor,
    ) -> RegistrationStatus {
        if !enabled {
            tracing::info!("Service discovery disabled, registration skipped");
            return RegistrationStatus::Skipped;
        }

        if self
            .registered
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!(service_id = %descriptor.service_id, "Instance already registered");
            return RegistrationStatus::AlreadyRegistered;
        }

        let agent = &self.agent;
        let descriptor = &descriptor;
        let attempted = retry(self.policy, "discovery_registration", move |_| {
            agent.register(descriptor)
        })
        .await;

        match attempted.result {
            Ok(()) => {
                tracing::info!(
                    service_id = %descriptor.service_id,
                    service_name = %descriptor.service_name,
                    port = descriptor.port,
                    datacenter = ?descriptor.datacenter,
                    attempts = attempted.attempts,
                    "Registered with discovery agent"
                );
                RegistrationStatus::Registered {
                    attempts: attempted.attempts,
                }
            }
            Err(e) => {
                // Allow a later call to try again.
                self.registered.store(false, Ordering::Release);
                tracing::warn!(
                    service_id = %descriptor.service_id,
                    agent = ?descriptor.agent_address,
                    attempts = attempted.attempts,
                    error = %e,
                    "Discovery registration failed, continuing without it"
                );
                RegistrationStatus::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}
