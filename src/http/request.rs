//! Request descriptions.
//!
//! [`ApiRequest`] is what callers build; it is cloned into an
//! [`OutboundRequest`] for every attempt, so retries and post-refresh
//! replays always start from the caller's original description.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::http::error::GatewayError;

/// Header carrying the per-call correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// A replayable call to the remote API.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the configured base URL (e.g., "/clients").
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Append every scalar field of a JSON object as a query parameter.
    ///
    /// Nulls are skipped; nested values are sent in their JSON form.
    pub fn params(mut self, params: &Value) -> Self {
        if let Value::Object(map) = params {
            for (key, value) in map {
                let value = match value {
                    Value::Null => continue,
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                self.query.push((key.clone(), value));
            }
        }
        self
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, GatewayError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }
}

/// One concrete attempt, ready for the transport.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl OutboundRequest {
    pub fn new(method: Method, url: Url) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        Self {
            method,
            url,
            headers,
            body: None,
        }
    }

    /// Attach `Authorization: Bearer <token>`.
    pub fn bearer(mut self, token: &str) -> Result<Self, GatewayError> {
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| GatewayError::InvalidRequest("access credential is not a valid header value".into()))?;
        self.headers.insert(AUTHORIZATION, value);
        Ok(self)
    }

    pub fn request_id(mut self, id: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(id) {
            self.headers.insert(X_REQUEST_ID, value);
        }
        self
    }

    pub fn body(mut self, body: Option<Value>) -> Self {
        self.body = body;
        self
    }

    /// Bearer token carried by this attempt, if any.
    pub fn bearer_token(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
    }
}

/// Resolve `path` against `base_url` and append `query`.
///
/// Absolute `http(s)://` paths are used as-is.
pub fn endpoint_url(
    base_url: &str,
    path: &str,
    query: &[(String, String)],
) -> Result<Url, GatewayError> {
    let joined = if path.starts_with("http://") || path.starts_with("https://") {
        path.to_string()
    } else {
        format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    };

    let mut url = Url::parse(&joined)
        .map_err(|e| GatewayError::InvalidRequest(format!("'{joined}' is not a valid URL: {e}")))?;
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query.iter());
    }
    Ok(url)
}
