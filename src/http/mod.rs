//! Outbound HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! caller (api services, AuthSession)
//!     → request.rs (ApiRequest: method, path, query, JSON body)
//!     → gateway.rs (bearer header, request ID, deadline)
//!     → transport.rs (Transport trait; reqwest in production)
//!     → response.rs (ApiResponse: status + buffered body)
//!     → gateway.rs (classify → retry / refresh / propagate)
//!     → caller, or error.rs (GatewayError)
//! ```
//!
//! # Design Decisions
//! - Bodies are buffered so a request can be replayed after a refresh or a retry
//! - The transport is a trait so tests can script the remote service
//! - Non-2xx responses are failures, as far as callers are concerned

pub mod error;
pub mod gateway;
pub mod request;
pub mod response;
pub mod transport;

pub use error::GatewayError;
pub use gateway::{Gateway, GatewayBuilder};
pub use request::{ApiRequest, OutboundRequest, X_REQUEST_ID};
pub use response::ApiResponse;
pub use transport::{ReqwestTransport, Transport, TransportError};
