//! Signed-in session state on top of the gateway.
//!
//! The gateway renews credentials on its own; this layer owns what the
//! gateway does not: issuing the first pair, the current user, and
//! reacting to `auth:expired`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::api::AuthApi;
use crate::credentials::{CredentialPair, ACCESS_TOKEN_KEY};
use crate::events::{GatewayEvent, SESSION_EXPIRED_MESSAGE};
use crate::http::{Gateway, GatewayError};

/// Fallback shown when a failed login carries no backend message.
pub const LOGIN_FAILED_MESSAGE: &str = "Could not sign in";

/// Fallback shown when a failed registration carries no backend message.
pub const REGISTER_FAILED_MESSAGE: &str = "Could not create the account";

/// Account as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    /// Backend identifier (`id` or `_id`).
    pub fn id(&self) -> Option<&Value> {
        self.extra.get("id").or_else(|| self.extra.get("_id"))
    }
}

/// `data` of a login or register response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthPayload {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub user: Option<User>,
}

impl AuthPayload {
    pub fn credentials(&self) -> CredentialPair {
        CredentialPair::new(&self.access_token, &self.refresh_token)
    }
}

/// `data` of `/auth/me`.
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentUser {
    pub user: User,
}

#[derive(Debug, Default)]
struct SessionState {
    user: Option<User>,
    last_error: Option<String>,
}

/// Current user plus the login/logout lifecycle.
///
/// Clones share state.
#[derive(Debug, Clone)]
pub struct AuthSession {
    gateway: Gateway,
    api: AuthApi,
    state: Arc<RwLock<SessionState>>,
}

impl AuthSession {
    pub fn new(gateway: Gateway) -> Self {
        Self {
            api: AuthApi::new(gateway.clone()),
            gateway,
            state: Arc::new(RwLock::new(SessionState::default())),
        }
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn current_user(&self) -> Option<User> {
        self.read(|state| state.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.read(|state| state.user.is_some())
    }

    /// Message of the last failed login/register, or of an expired session.
    pub fn last_error(&self) -> Option<String> {
        self.read(|state| state.last_error.clone())
    }

    /// Sign in and persist the issued credential pair.
    ///
    /// Also resets the onboarding flag so the welcome tour runs again.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthPayload, GatewayError> {
        self.write(|state| state.last_error = None);
        match self.api.login(email, password).await {
            Ok(envelope) => {
                let payload = envelope.data;
                self.establish(&payload);
                self.gateway.credentials().clear_tour_flag();
                tracing::info!(email = %email, "Signed in");
                Ok(payload)
            }
            Err(e) => {
                tracing::warn!(email = %email, error = %e, "Sign-in failed");
                self.write(|state| state.last_error = Some(e.user_message(LOGIN_FAILED_MESSAGE)));
                Err(e)
            }
        }
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthPayload, GatewayError> {
        self.write(|state| state.last_error = None);
        match self.api.register(name, email, password).await {
            Ok(envelope) => {
                let payload = envelope.data;
                self.establish(&payload);
                tracing::info!(email = %email, "Account registered");
                Ok(payload)
            }
            Err(e) => {
                tracing::warn!(email = %email, error = %e, "Registration failed");
                self.write(|state| state.last_error = Some(e.user_message(REGISTER_FAILED_MESSAGE)));
                Err(e)
            }
        }
    }

    /// Invalidate the refresh credential server-side, then forget everything locally.
    ///
    /// A failed server call does not stop the local sign-out.
    pub async fn logout(&self) {
        if let Err(e) = self.api.logout().await {
            tracing::warn!(error = %e, "Logout request failed");
        }
        self.gateway.credentials().clear();
        self.write(|state| *state = SessionState::default());
        tracing::info!("Signed out");
    }

    /// Resume a persisted session.
    ///
    /// Without a stored access credential nothing is requested. If the
    /// backend does not accept it, only the access credential is dropped.
    pub async fn restore(&self) -> Option<User> {
        self.gateway.credentials().access_token()?;

        match self.api.me().await {
            Ok(envelope) => {
                let user = envelope.data.user;
                tracing::debug!(email = %user.email, "Session restored");
                self.write(|state| state.user = Some(user.clone()));
                Some(user)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Stored session rejected");
                self.gateway.credentials().remove(ACCESS_TOKEN_KEY);
                None
            }
        }
    }

    /// Forget the user after the gateway gave up on the session.
    pub fn expire(&self) {
        self.write(|state| {
            state.user = None;
            state.last_error = Some(SESSION_EXPIRED_MESSAGE.to_string());
        });
    }

    /// Spawn a task calling [`expire`](Self::expire) on every `auth:expired`.
    ///
    /// The task ends when the event bus is dropped.
    pub fn listen_for_expiry(&self, mut events: broadcast::Receiver<GatewayEvent>) -> JoinHandle<()> {
        let session = self.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(GatewayEvent::AuthExpired { .. }) => session.expire(),
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Session listener lagged behind gateway events");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    fn establish(&self, payload: &AuthPayload) {
        self.gateway.credentials().save_pair(&payload.credentials());
        self.write(|state| state.user = payload.user.clone());
    }

    fn read<T>(&self, f: impl FnOnce(&SessionState) -> T) -> T {
        f(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn write(&self, f: impl FnOnce(&mut SessionState)) {
        f(&mut self.state.write().unwrap_or_else(PoisonError::into_inner))
    }
}
