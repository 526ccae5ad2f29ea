//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! appsettings.toml
//!     + appsettings.{environment}.toml
//!     + process environment (KEY__SUB → key.sub)
//!     → loader.rs (layer & flatten)
//!     → ResolvedConfig (immutable dotted-key map)
//!     → schema.rs (typed ServiceSettings)
//!     → validation.rs (semantic checks)
//!     → shared via Arc with every bootstrap component
//! ```
//!
//! # Design Decisions
//! - Resolved once per process; no reload
//! - Keys are case-insensitive
//! - Blank values count as unset

pub mod loader;
pub mod schema;
pub mod source;
pub mod validation;

pub use loader::{ConfigError, ConfigLoader};
pub use schema::{AuthSettings, DiscoverySettings, SearchSettings, ServerSettings, ServiceSettings};
pub use source::ResolvedConfig;
