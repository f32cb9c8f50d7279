//! Response fault classification.
//!
//! # Classes
//! - TransientUnavailable: timeout, connection/network failure, no response,
//!   or one of the configured "not warmed up" statuses (404/502/503 by default)
//! - Unauthorized: 401
//! - Other: everything else, propagated unchanged

use reqwest::StatusCode;

use crate::http::{ApiResponse, TransportError};

/// Class of a failed exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultClass {
    TransientUnavailable,
    Unauthorized,
    Other,
}

/// Classify the outcome of one attempt. `None` means success (2xx).
///
/// Transient statuses are checked before 401.
pub fn classify(
    outcome: &Result<ApiResponse, TransportError>,
    transient_statuses: &[u16],
) -> Option<FaultClass> {
    match outcome {
        Ok(response) if response.is_success() => None,
        Ok(response) => Some(classify_status(response.status(), transient_statuses)),
        Err(e) if e.is_transient() => Some(FaultClass::TransientUnavailable),
        Err(_) => Some(FaultClass::Other),
    }
}

/// Classify a non-success status.
pub fn classify_status(status: StatusCode, transient_statuses: &[u16]) -> FaultClass {
    if transient_statuses.contains(&status.as_u16()) {
        FaultClass::TransientUnavailable
    } else if status == StatusCode::UNAUTHORIZED {
        FaultClass::Unauthorized
    } else {
        FaultClass::Other
    }
}
