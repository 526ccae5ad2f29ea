//! Service discovery registration.
//!
//! # Data Flow
//! ```text
//! DiscoverySettings + server.urls
//!     → descriptor.rs (RegistrationDescriptor, port derivation)
//!     → registrar.rs (enabled? once? bounded retry)
//!     → agent.rs (Consul PUT /v1/agent/service/register)
//! ```
//!
//! # Design Decisions
//! - Registration failure is reported and bootstrap continues
//! - One registration per process; no periodic re-registration
//! - Port derivation never fails; bad input falls back to 5000

pub mod agent;
pub mod descriptor;
pub mod registrar;

use thiserror::Error;

use crate::resilience::Retryable;

pub use agent::{ConsulAgent, DiscoveryAgent};
pub use descriptor::{resolve_port, RegistrationDescriptor, DEFAULT_PORT};
pub use registrar::{DiscoveryRegistrar, RegistrationStatus};

/// Registration failures. Never fatal.
#[derive(Debug, Clone, Error)]
pub enum RegistrationError {
    #[error("discovery agent unreachable: {0}")]
    Unreachable(String),

    #[error("discovery agent rejected registration (status {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid discovery agent address: {0}")]
    InvalidAgentAddress(String),
}

impl Retryable for RegistrationError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Unreachable(_) => true,
            Self::Rejected { status, .. } => *status >= 500,
            Self::InvalidAgentAddress(_) => false,
        }
    }
}
