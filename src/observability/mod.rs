//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Bootstrap steps and the auth gate produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape), when enabled
//! ```
//!
//! # Design Decisions
//! - Structured fields on every event, never interpolated secrets
//! - Request ID flows through the HTTP pipeline via tower-http

pub mod logging;
pub mod metrics;
