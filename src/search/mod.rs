//! Search index schema synchronization.
//!
//! # Data Flow
//! ```text
//! AzureSearchApiKey present?
//!     no  → Skipped (no backend calls)
//!     yes → client.rs GET index
//!             → missing   → PUT expected schema → Created
//!             → divergent → PUT expected schema → Updated
//!             → equal     → AlreadyInSync
//! ```
//!
//! # Design Decisions
//! - The backend sits behind the [`IndexBackend`] trait so bootstrap can be
//!   exercised without a live search service
//! - Every call has a deadline and the attempt budget is finite
//! - Any failure that survives the budget is fatal to bootstrap

pub mod client;
pub mod schema;
pub mod synchronizer;

use thiserror::Error;

use crate::resilience::{Elapsed, Retryable};

pub use client::{AzureSearchClient, IndexBackend};
pub use schema::{expected_index, IndexDefinition, IndexField};
pub use synchronizer::{IndexSynchronizer, SyncOutcome};

/// Errors from index schema synchronization.
#[derive(Debug, Clone, Error)]
pub enum IndexSyncError {
    /// The backend refused the API key.
    #[error("search backend rejected the API key (status {0})")]
    Unauthorized(u16),

    /// The backend refused the schema itself.
    #[error("search backend rejected the index schema (status {status}): {body}")]
    SchemaRejected { status: u16, body: String },

    /// Server-side or throttling failure.
    #[error("search backend error (status {status}): {body}")]
    Backend { status: u16, body: String },

    #[error("search backend unreachable: {0}")]
    Network(String),

    #[error("search backend call timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("invalid search endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("failed to decode search backend response: {0}")]
    Decode(String),

    /// The startup task running the sync did not complete.
    #[error("index synchronization aborted: {0}")]
    Aborted(String),
}

impl IndexSyncError {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::Unauthorized(status),
            429 | 500..=599 => Self::Backend { status, body },
            _ => Self::SchemaRejected { status, body },
        }
    }
}

impl From<Elapsed> for IndexSyncError {
    fn from(elapsed: Elapsed) -> Self {
        Self::Timeout(elapsed.0)
    }
}

impl Retryable for IndexSyncError {
    fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Timeout(_) | Self::Backend { .. }
        )
    }
}
