//! Cross-component notification and navigation.
//!
//! The gateway never talks to a UI directly. It emits [`GatewayEvent`]s
//! through a [`Notifier`] and asks a [`Navigator`] to send the user to the
//! login surface when authorization cannot be recovered.

pub mod navigator;
pub mod notifier;

pub use navigator::{Navigator, RouteTracker};
pub use notifier::{EventBus, GatewayEvent, Notifier};

/// Detail of the `server:waking` notification.
pub const SERVER_WAKING_MESSAGE: &str =
    "The server is waking up. This can take up to a minute, please wait...";

/// Detail of the `auth:expired` notification.
pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please sign in again.";
