//! Search indexer API service.
//!
//! Bootstraps configuration, authentication, service discovery registration
//! and search index schema synchronization, then serves the HTTP API.

pub mod auth;
pub mod config;
pub mod discovery;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod search;

pub use config::{ConfigLoader, ServiceSettings};
pub use http::ApiServer;
pub use lifecycle::{BootstrapError, BootstrapOrchestrator, ReadyService, Shutdown};
