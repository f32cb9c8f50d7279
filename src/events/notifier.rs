//! Process-wide event bus.

use tokio::sync::broadcast;

use super::{SERVER_WAKING_MESSAGE, SESSION_EXPIRED_MESSAGE};

/// Notifications the gateway emits for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    /// First cold-start retry of a call is about to wait.
    ServerWaking { message: String },
    /// Credential refresh failed; the session is gone.
    AuthExpired { message: String },
}

impl GatewayEvent {
    pub fn server_waking() -> Self {
        Self::ServerWaking {
            message: SERVER_WAKING_MESSAGE.to_string(),
        }
    }

    pub fn auth_expired() -> Self {
        Self::AuthExpired {
            message: SESSION_EXPIRED_MESSAGE.to_string(),
        }
    }

    /// Event name as seen by listeners.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ServerWaking { .. } => "server:waking",
            Self::AuthExpired { .. } => "auth:expired",
        }
    }

    /// User-facing detail message.
    pub fn detail(&self) -> &str {
        match self {
            Self::ServerWaking { message } | Self::AuthExpired { message } => message,
        }
    }
}

/// Sink for gateway notifications.
pub trait Notifier: Send + Sync {
    fn emit(&self, event: GatewayEvent);
}

/// Broadcast-backed notifier.
///
/// Every subscriber sees every event emitted after it subscribed.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<GatewayEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for EventBus {
    fn emit(&self, event: GatewayEvent) {
        tracing::debug!(event = event.name(), detail = event.detail(), "Emitting gateway event");
        // No subscribers is fine; nobody is listening yet.
        let _ = self.tx.send(event);
    }
}
