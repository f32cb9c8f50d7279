//! Typed wrappers for the BizFlow endpoints.
//!
//! Every call goes through the [`Gateway`](crate::http::Gateway), so each
//! one inherits bearer authentication, cold-start retries and refresh.
//! Responses are the backend's JSON envelope (`{ success, data, ... }`).

pub mod auth;
pub mod clients;
pub mod reports;
pub mod sales;

use serde::Deserialize;

pub use auth::AuthApi;
pub use clients::ClientsApi;
pub use reports::ReportsApi;
pub use sales::SalesApi;

/// Standard response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: Option<bool>,
    pub data: T,
    #[serde(default)]
    pub message: Option<String>,
}
