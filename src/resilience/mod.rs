//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound call:
//!     → timeouts.rs (request deadline)
//!     → classify.rs (success / transient / unauthorized / other)
//!     → transient: retries.rs (bump the call's RetryContext, linear backoff)
//!     → unauthorized: handed to the refresh coordinator (crate::auth)
//! ```
//!
//! # Design Decisions
//! - Retry state lives on the call's own RetryContext, never in shared state
//! - Backoff is linear (attempt × unit), not exponential
//! - Transient faults are checked before 401 handling

pub mod backoff;
pub mod classify;
pub mod retries;
pub mod timeouts;

pub use backoff::linear_backoff;
pub use classify::{classify, FaultClass};
pub use retries::{ColdStartPolicy, RetryContext};
pub use timeouts::with_deadline;
