//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → environment overrides (BIZFLOW_API_URL, BIZFLOW_LOG_LEVEL)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → handed to the Gateway builder
//! ```
//!
//! # Design Decisions
//! - Config is immutable once the gateway is built
//! - All fields have defaults so an empty file (or no file) is a valid config
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{config_from_env, load_config, ConfigError};
pub use schema::{
    ApiConfig, GatewayConfig, ObservabilityConfig, RetryConfig, SessionConfig, StorageConfig,
    TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
