//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Start → ConfigResolved → AuthComposed
//!           → Registered | RegistrationSkippedOrFailed
//!           → IndexSynced | Fatal → Ready
//!
//! Shutdown (shutdown.rs):
//!     Signal received → stop accepting → drain in-flight requests → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: config, auth and index errors are fatal
//! - Registration errors are logged and bootstrap continues
//! - Listener binds only after Ready

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::{shutdown_signal, spawn_signal_listener};
pub use startup::{BootstrapError, BootstrapOrchestrator, BootstrapState, ReadyService};
