//! The resilient authenticated request gateway.
//!
//! # Responsibilities
//! - Attach the stored access credential to every attempt
//! - Retry calls that hit a cold (unreachable or warming) service
//! - Renew the access credential once, single-flight, on 401
//! - Clear the session, notify and redirect when renewal is impossible
//!
//! # Pipeline (per call)
//! ```text
//! attempt ──2xx──────────────────────────────▶ Ok(response)
//!    │
//!    ├─ transient ─ attempts left? ─ yes ─ sleep(n × unit) ─▶ attempt
//!    │                            └ no ──────────────────────▶ Err
//!    ├─ 401, not yet refreshed ─ refresh ─ Ok(token) ─▶ attempt with token
//!    │                                   └ Err ──────────────▶ Err
//!    └─ anything else ──────────────────────────────────────▶ Err
//! ```

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;
use uuid::Uuid;

use crate::auth::{request_access_token, RefreshCoordinator, RefreshError, RefreshTicket, ReplayTurn};
use crate::config::{validate_config, GatewayConfig};
use crate::credentials::{CredentialStore, FileStore, MemoryStore};
use crate::events::{EventBus, GatewayEvent, Navigator, Notifier, RouteTracker};
use crate::http::error::GatewayError;
use crate::http::request::{endpoint_url, ApiRequest, OutboundRequest};
use crate::http::response::ApiResponse;
use crate::http::transport::{ReqwestTransport, Transport, TransportError};
use crate::observability::metrics;
use crate::resilience::{classify, with_deadline, ColdStartPolicy, FaultClass, RetryContext};

struct GatewayInner {
    base_url: String,
    request_timeout: Duration,
    policy: ColdStartPolicy,
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialStore>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    refresh: RefreshCoordinator,
}

/// Authenticated client for the BizFlow API.
///
/// Cheap to clone; clones share credentials and the refresh coordinator.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<GatewayInner>,
}

/// Builder wiring a [`Gateway`] to its collaborators.
///
/// Anything not supplied is derived from the config: a reqwest transport,
/// a file or memory credential store, an event bus and a route tracker.
pub struct GatewayBuilder {
    config: GatewayConfig,
    transport: Option<Arc<dyn Transport>>,
    credentials: Option<Arc<dyn CredentialStore>>,
    notifier: Option<Arc<dyn Notifier>>,
    navigator: Option<Arc<dyn Navigator>>,
}

impl GatewayBuilder {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            transport: None,
            credentials: None,
            notifier: None,
            navigator: None,
        }
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn credentials(mut self, credentials: Arc<dyn CredentialStore>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn build(self) -> Result<Gateway, GatewayError> {
        let config = self.config;
        validate_config(&config).map_err(|errors| {
            GatewayError::Setup(
                errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            )
        })?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(
                ReqwestTransport::new(&config).map_err(|e| GatewayError::Setup(e.to_string()))?,
            ),
        };

        let credentials: Arc<dyn CredentialStore> = match (self.credentials, &config.storage.credentials_path) {
            (Some(credentials), _) => credentials,
            (None, Some(path)) => Arc::new(FileStore::open(path).map_err(|e| {
                GatewayError::Setup(format!("cannot open credential store '{path}': {e}"))
            })?),
            (None, None) => Arc::new(MemoryStore::new()),
        };

        let notifier = self
            .notifier
            .unwrap_or_else(|| Arc::new(EventBus::new()));
        let navigator = self
            .navigator
            .unwrap_or_else(|| Arc::new(RouteTracker::new(config.session.login_path.clone())));

        tracing::debug!(
            base_url = %config.api.base_url,
            request_timeout_secs = config.timeouts.request_secs,
            max_retries = config.retries.max_attempts,
            "Gateway configured"
        );

        Ok(Gateway {
            inner: Arc::new(GatewayInner {
                base_url: config.api.base_url.clone(),
                request_timeout: config.timeouts.request(),
                policy: ColdStartPolicy::from_config(&config.retries),
                transport,
                credentials,
                notifier,
                navigator,
                refresh: RefreshCoordinator::new(),
            }),
        })
    }
}

impl Gateway {
    pub fn builder(config: GatewayConfig) -> GatewayBuilder {
        GatewayBuilder::new(config)
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.inner.credentials
    }

    pub fn is_refreshing(&self) -> bool {
        self.inner.refresh.is_refreshing()
    }

    /// Calls parked behind the in-flight refresh.
    pub fn queued_for_refresh(&self) -> usize {
        self.inner.refresh.waiting()
    }

    /// Send `request`, recovering from cold starts and expired credentials.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, GatewayError> {
        let request_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!(
            "gateway",
            request_id = %request_id,
            method = %request.method,
            path = %request.path
        );
        self.execute(&request, &request_id).instrument(span).await
    }

    /// Send `request` and decode the JSON body.
    pub async fn json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, GatewayError> {
        let response = self.send(request).await?;
        Ok(response.json()?)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, GatewayError> {
        self.json(ApiRequest::get(path)).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.json(ApiRequest::post(path).json(body)?).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.json(ApiRequest::put(path).json(body)?).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, GatewayError> {
        self.json(ApiRequest::delete(path)).await
    }

    async fn execute(&self, request: &ApiRequest, request_id: &str) -> Result<ApiResponse, GatewayError> {
        let inner = &self.inner;
        let mut ctx = RetryContext::default();
        // Set only for the attempt right after a refresh.
        let mut refreshed_token: Option<String> = None;
        let mut replay_turn: Option<ReplayTurn> = None;

        loop {
            let token = refreshed_token
                .take()
                .or_else(|| inner.credentials.access_token());
            let outbound = self.authenticate(request, request_id, token.as_deref())?;
            let outcome = match replay_turn.take() {
                Some(turn) => self.dispatch_in_turn(&request.method, outbound, turn).await,
                None => self.dispatch(&request.method, outbound).await,
            };

            match classify(&outcome, inner.policy.transient_statuses()) {
                None => {
                    return outcome.map_err(|source| Self::transport_error(request, source));
                }
                Some(FaultClass::TransientUnavailable) => {
                    let Some(delay) = inner.policy.next_delay(&mut ctx) else {
                        tracing::error!(
                            attempts = ctx.attempt,
                            "Service still unavailable after retries"
                        );
                        return Err(Self::failure(request, outcome));
                    };
                    if ColdStartPolicy::should_notify(&ctx) {
                        inner.notifier.emit(GatewayEvent::server_waking());
                    }
                    tracing::warn!(
                        attempt = ctx.attempt,
                        max_attempts = inner.policy.max_attempts(),
                        delay = ?delay,
                        "Service unavailable, retrying"
                    );
                    metrics::record_cold_start_retry(ctx.attempt);
                    tokio::time::sleep(delay).await;
                }
                Some(FaultClass::Unauthorized) if !ctx.retried => {
                    let original = Self::failure(request, outcome);
                    let (token, turn) = self.recover_authorization(&mut ctx, original).await?;
                    refreshed_token = Some(token);
                    replay_turn = turn;
                }
                Some(_) => return Err(Self::failure(request, outcome)),
            }
        }
    }

    /// Build the attempt, with a bearer header when a credential is available.
    fn authenticate(
        &self,
        request: &ApiRequest,
        request_id: &str,
        token: Option<&str>,
    ) -> Result<OutboundRequest, GatewayError> {
        let url = endpoint_url(&self.inner.base_url, &request.path, &request.query)?;
        let outbound = OutboundRequest::new(request.method.clone(), url)
            .request_id(request_id)
            .body(request.body.clone());
        match token {
            Some(token) => outbound.bearer(token),
            None => Ok(outbound),
        }
    }

    async fn dispatch(
        &self,
        method: &Method,
        outbound: OutboundRequest,
    ) -> Result<ApiResponse, TransportError> {
        let start = Instant::now();
        let outcome = with_deadline(self.inner.request_timeout, self.inner.transport.send(outbound)).await;

        match &outcome {
            Ok(response) => {
                tracing::debug!(status = %response.status(), elapsed = ?start.elapsed(), "Response received");
                metrics::record_attempt(method.as_str(), Some(response.status().as_u16()), start);
            }
            Err(e) => {
                tracing::debug!(error = %e, elapsed = ?start.elapsed(), "No response");
                metrics::record_attempt(method.as_str(), None, start);
            }
        }
        outcome
    }

    /// Replay a queued call once the call queued before it is on the wire.
    ///
    /// The turn is released after the first poll, when the transport has
    /// taken the request; the response is awaited without holding it.
    async fn dispatch_in_turn(
        &self,
        method: &Method,
        outbound: OutboundRequest,
        mut turn: ReplayTurn,
    ) -> Result<ApiResponse, TransportError> {
        turn.ready().await;
        let mut attempt = std::pin::pin!(self.dispatch(method, outbound));
        let mut turn = Some(turn);
        std::future::poll_fn(move |cx| {
            let poll = attempt.as_mut().poll(cx);
            drop(turn.take());
            poll
        })
        .await
    }

    /// Obtain a fresh access credential for a call that got 401.
    ///
    /// Either leads the refresh or waits for the one in flight. Waiters
    /// also get their place in the replay order.
    async fn recover_authorization(
        &self,
        ctx: &mut RetryContext,
        original: GatewayError,
    ) -> Result<(String, Option<ReplayTurn>), GatewayError> {
        let inner = &self.inner;

        let lease = match inner.refresh.acquire_or_enqueue() {
            RefreshTicket::Waiter(waiter) => {
                let (token, turn) = waiter.wait_in_line().await?;
                tracing::debug!("Resuming after refresh");
                return Ok((token, Some(turn)));
            }
            RefreshTicket::Leader(lease) => lease,
        };

        ctx.retried = true;

        let Some(refresh_token) = inner.credentials.refresh_token() else {
            tracing::warn!("Access credential rejected and no refresh credential stored");
            inner.credentials.clear();
            lease.drain(Err(RefreshError::MissingRefreshToken));
            metrics::record_refresh("missing");
            inner.navigator.go_to_login();
            return Err(original);
        };

        tracing::info!("Access credential rejected, refreshing");
        let refreshed = request_access_token(
            inner.transport.as_ref(),
            &inner.base_url,
            &refresh_token,
            inner.request_timeout,
        )
        .await;

        match refreshed {
            Ok(token) => {
                inner.credentials.set_access_token(&token);
                let resumed = lease.drain(Ok(token.clone()));
                metrics::record_refresh("success");
                tracing::info!(resumed, "Access credential refreshed");
                Ok((token, None))
            }
            Err(e) => {
                inner.credentials.clear();
                let rejected = lease.drain(Err(e.clone()));
                metrics::record_refresh("failure");
                tracing::warn!(error = %e, rejected, "Refresh failed, session expired");
                inner.notifier.emit(GatewayEvent::auth_expired());
                if !inner.navigator.is_at_login() {
                    inner.navigator.go_to_login();
                }
                Err(e.into())
            }
        }
    }

    fn transport_error(request: &ApiRequest, source: TransportError) -> GatewayError {
        GatewayError::Transport {
            method: request.method.clone(),
            path: request.path.clone(),
            source,
        }
    }

    fn failure(request: &ApiRequest, outcome: Result<ApiResponse, TransportError>) -> GatewayError {
        match outcome {
            Ok(response) => GatewayError::Status {
                method: request.method.clone(),
                path: request.path.clone(),
                response,
            },
            Err(source) => Self::transport_error(request, source),
        }
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("base_url", &self.inner.base_url)
            .field("request_timeout", &self.inner.request_timeout)
            .field("policy", &self.inner.policy)
            .field("refreshing", &self.is_refreshing())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{CredentialPair, ACCESS_TOKEN_KEY};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Answers 200 and remembers the bearer of every attempt.
    #[derive(Default)]
    struct Echo {
        bearers: Mutex<Vec<Option<String>>>,
    }

    #[async_trait]
    impl Transport for Echo {
        async fn send(&self, request: OutboundRequest) -> Result<ApiResponse, TransportError> {
            assert!(request.headers.contains_key(crate::http::X_REQUEST_ID));
            self.bearers
                .lock()
                .unwrap()
                .push(request.bearer_token().map(str::to_string));
            Ok(ApiResponse::new(reqwest::StatusCode::OK, r#"{"success":true}"#))
        }
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let mut config = GatewayConfig::default();
        config.api.base_url = "ftp://bizflow".into();
        config.retries.transient_statuses = vec![401];

        match Gateway::builder(config).build() {
            Err(GatewayError::Setup(message)) => {
                assert!(message.contains("api.base_url"), "{message}");
                assert!(message.contains("retries.transient_statuses"), "{message}");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_build_opens_configured_file_store() {
        let path = std::env::temp_dir().join(format!("{}.json", Uuid::new_v4()));
        let store = FileStore::open(&path).unwrap();
        store.save_pair(&CredentialPair::new("persisted", "r"));

        let mut config = GatewayConfig::default();
        config.storage.credentials_path = Some(path.display().to_string());
        let gateway = Gateway::builder(config).build().unwrap();

        assert_eq!(gateway.credentials().access_token().as_deref(), Some("persisted"));
        std::fs::remove_file(path).unwrap_or_default();
    }

    #[tokio::test]
    async fn test_bearer_follows_stored_credential() {
        let echo = Arc::new(Echo::default());
        let store = Arc::new(MemoryStore::new());
        let gateway = Gateway::builder(GatewayConfig::default())
            .transport(echo.clone())
            .credentials(store.clone())
            .build()
            .unwrap();

        gateway.send(ApiRequest::get("/clients")).await.unwrap();
        store.set(ACCESS_TOKEN_KEY, "abc");
        gateway.send(ApiRequest::get("/clients")).await.unwrap();
        store.set(ACCESS_TOKEN_KEY, "");
        gateway.send(ApiRequest::get("/clients")).await.unwrap();

        let bearers = echo.bearers.lock().unwrap().clone();
        assert_eq!(bearers, vec![None, Some("abc".to_string()), None]);
    }
}
