//! Buffered responses.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Status and fully-read body of one exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    status: StatusCode,
    body: Vec<u8>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<String>,
    message: Option<String>,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.body
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// The backend's `error` (or `message`) string, when the body is a JSON envelope.
    pub fn backend_message(&self) -> Option<String> {
        let envelope: ErrorEnvelope = serde_json::from_slice(&self.body).ok()?;
        envelope.error.or(envelope.message)
    }
}
