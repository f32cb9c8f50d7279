//! BizFlow API gateway library
//!
//! Authenticated, cold-start tolerant access to the BizFlow backend.

pub mod api;
pub mod auth;
pub mod config;
pub mod credentials;
pub mod events;
pub mod http;
pub mod observability;
pub mod resilience;

pub use auth::AuthSession;
pub use config::schema::GatewayConfig;
pub use events::{EventBus, GatewayEvent};
pub use http::{Gateway, GatewayError};
