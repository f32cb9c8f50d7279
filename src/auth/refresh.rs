//! Refresh-endpoint client.
//!
//! The refresh call goes straight to the transport: no bearer header, no
//! cold-start retry, no nested refresh.

use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

use crate::http::request::endpoint_url;
use crate::http::{OutboundRequest, Transport, TransportError};
use crate::resilience::with_deadline;

/// Path of the refresh endpoint, relative to the API base URL.
pub const REFRESH_PATH: &str = "/auth/refresh";

/// Why a new access credential could not be obtained.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    #[error("no refresh credential is stored")]
    MissingRefreshToken,

    #[error("refresh endpoint responded with {status}")]
    Rejected { status: u16, message: Option<String> },

    #[error("refresh request failed: {0}")]
    Transport(#[from] TransportError),

    #[error("refresh response was malformed: {0}")]
    MalformedResponse(String),

    #[error("refresh was abandoned before completing")]
    Abandoned,
}

#[derive(Deserialize)]
struct RefreshEnvelope {
    data: RefreshData,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshData {
    access_token: String,
}

/// Exchange `refresh_token` for a new access credential.
pub async fn request_access_token(
    transport: &dyn Transport,
    base_url: &str,
    refresh_token: &str,
    deadline: Duration,
) -> Result<String, RefreshError> {
    let url = endpoint_url(base_url, REFRESH_PATH, &[])
        .map_err(|e| RefreshError::Transport(TransportError::InvalidRequest(e.to_string())))?;
    let request = OutboundRequest::new(Method::POST, url)
        .body(Some(json!({ "refreshToken": refresh_token })));

    let response = with_deadline(deadline, transport.send(request)).await?;
    if !response.is_success() {
        return Err(RefreshError::Rejected {
            status: response.status().as_u16(),
            message: response.backend_message(),
        });
    }

    let envelope: RefreshEnvelope = response
        .json()
        .map_err(|e| RefreshError::MalformedResponse(e.to_string()))?;
    if envelope.data.access_token.is_empty() {
        return Err(RefreshError::MalformedResponse("empty accessToken".into()));
    }
    Ok(envelope.data.access_token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ApiResponse;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::sync::Mutex;

    struct Canned {
        status: StatusCode,
        body: &'static str,
        seen: Mutex<Vec<OutboundRequest>>,
    }

    impl Canned {
        fn new(status: u16, body: &'static str) -> Self {
            Self {
                status: StatusCode::from_u16(status).unwrap(),
                body,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Transport for Canned {
        async fn send(&self, request: OutboundRequest) -> Result<ApiResponse, TransportError> {
            self.seen.lock().unwrap().push(request);
            Ok(ApiResponse::new(self.status, self.body))
        }
    }

    const DEADLINE: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_successful_refresh() {
        let transport = Canned::new(200, r#"{"success":true,"data":{"accessToken":"X"}}"#);
        let token = request_access_token(&transport, "http://h/api", "R", DEADLINE)
            .await
            .unwrap();
        assert_eq!(token, "X");

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, Method::POST);
        assert_eq!(seen[0].url.as_str(), "http://h/api/auth/refresh");
        assert_eq!(seen[0].body, Some(json!({ "refreshToken": "R" })));
        assert!(seen[0].bearer_token().is_none());
    }

    #[tokio::test]
    async fn test_rejected_refresh() {
        let transport = Canned::new(401, r#"{"error":"Refresh token inválido"}"#);
        let err = request_access_token(&transport, "http://h/api", "R", DEADLINE)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RefreshError::Rejected {
                status: 401,
                message: Some("Refresh token inválido".into())
            }
        );
    }

    #[tokio::test]
    async fn test_malformed_refresh() {
        for body in [r#"{"data":{}}"#, r#"{"data":{"accessToken":""}}"#, "ok"] {
            let transport = Canned::new(200, body);
            let err = request_access_token(&transport, "http://h/api", "R", DEADLINE)
                .await
                .unwrap_err();
            assert!(matches!(err, RefreshError::MalformedResponse(_)), "{body}");
        }
    }
}
