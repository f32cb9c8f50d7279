//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Gateway calls produce:
//!     → logging.rs (structured tracing events, one span per call)
//!     → metrics.rs (request, retry and refresh counters)
//! ```
//!
//! # Design Decisions
//! - Every call carries its x-request-id as a span field
//! - Metrics are recorded through the `metrics` facade; installing an
//!   exporter is left to the embedding application

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LoggingError};
