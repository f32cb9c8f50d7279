//! Configuration validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before a config is handed to the gateway

use std::fmt;
use url::Url;

use crate::config::schema::GatewayConfig;

/// Upper bound on cold-start retries per call.
pub const MAX_RETRY_ATTEMPTS: u32 = 10;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field (e.g., "retries.max_attempts").
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a configuration for semantic errors.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match Url::parse(&config.api.base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::new(
            "api.base_url",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(
            "api.base_url",
            format!("'{}' is not a valid URL: {}", config.api.base_url, e),
        )),
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new(
            "timeouts.request_secs",
            "must be greater than zero",
        ));
    }

    let retries = &config.retries;
    if retries.max_attempts > MAX_RETRY_ATTEMPTS {
        errors.push(ValidationError::new(
            "retries.max_attempts",
            format!("must be at most {MAX_RETRY_ATTEMPTS}"),
        ));
    }
    if retries.enabled && retries.max_attempts > 0 && retries.backoff_unit_ms == 0 {
        errors.push(ValidationError::new(
            "retries.backoff_unit_ms",
            "must be greater than zero when retries are enabled",
        ));
    }
    for status in &retries.transient_statuses {
        if !(400..=599).contains(status) {
            errors.push(ValidationError::new(
                "retries.transient_statuses",
                format!("{status} is not an HTTP error status"),
            ));
        } else if *status == 401 {
            // 401 belongs to the refresh coordinator.
            errors.push(ValidationError::new(
                "retries.transient_statuses",
                "401 cannot be retried as transient",
            ));
        }
    }

    if !config.session.login_path.starts_with('/') {
        errors.push(ValidationError::new(
            "session.login_path",
            "must be an absolute path",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
