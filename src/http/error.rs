//! Gateway error taxonomy.
//!
//! Recoverable faults (cold start, expired access credential) never reach
//! callers on success. What does reach them:
//! - `Transport`: the service stayed unreachable through every retry
//! - `Status`: a non-2xx answer, including a 401 that could not be recovered
//! - `Refresh`: the refresh this call waited on (or ran) failed
//! - `InvalidRequest` / `Decode`: local problems building or reading a call

use reqwest::{Method, StatusCode};
use thiserror::Error;

use crate::auth::RefreshError;
use crate::http::response::ApiResponse;
use crate::http::transport::TransportError;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{method} {path} failed: {source}")]
    Transport {
        method: Method,
        path: String,
        #[source]
        source: TransportError,
    },

    #[error("{method} {path} responded with {}", .response.status())]
    Status {
        method: Method,
        path: String,
        response: ApiResponse,
    },

    #[error("session could not be renewed: {0}")]
    Refresh(#[from] RefreshError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("gateway setup failed: {0}")]
    Setup(String),
}

impl GatewayError {
    /// HTTP status of the final response, when there was one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { response, .. } => Some(response.status()),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED) || matches!(self, Self::Refresh(_))
    }

    /// Error text supplied by the backend envelope, if any.
    pub fn backend_message(&self) -> Option<String> {
        match self {
            Self::Status { response, .. } => response.backend_message(),
            _ => None,
        }
    }

    /// Backend message when present, otherwise `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        self.backend_message()
            .unwrap_or_else(|| fallback.to_string())
    }
}
