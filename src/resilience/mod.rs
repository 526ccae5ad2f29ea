//! Resilience for the outbound calls made during bootstrap.
//!
//! # Data Flow
//! ```text
//! Startup call (index sync, discovery registration):
//!     → timeouts.rs (every attempt has a deadline)
//!     → On transient failure: retries.rs (bounded attempts)
//!     → backoff.rs (exponential delay with jitter)
//! ```
//!
//! # Design Decisions
//! - Every external call has a deadline
//! - Retry budgets are always finite; exhaustion returns the last error
//! - Callers decide which errors are transient

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use retries::{retry, Attempted, RetryPolicy, Retryable};
pub use timeouts::{with_deadline, Elapsed};
