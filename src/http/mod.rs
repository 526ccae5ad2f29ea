//! HTTP surface.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (request ID, CORS, trace, timeout)
//!     → /health                     → handlers.rs (public)
//!     → /api/*  → auth gate (401 + challenges)
//!               → version.rs (api-version, 400 when unsupported)
//!               → handlers.rs
//! ```

pub mod handlers;
pub mod server;
pub mod version;

pub use server::{bind_address, ApiServer};
pub use version::{resolve_version, ApiVersion, VersionError};
