//! Shared utilities for integration testing.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{header::AUTHORIZATION, HeaderMap, Method, StatusCode, Uri};
use axum::Json;
use futures_util::future::BoxFuture;
use serde_json::Value;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::time::Instant;

use bizflow_gateway::config::GatewayConfig;
use bizflow_gateway::credentials::MemoryStore;
use bizflow_gateway::events::{EventBus, GatewayEvent, RouteTracker};
use bizflow_gateway::http::{ApiResponse, OutboundRequest, ReqwestTransport, Transport, TransportError};
use bizflow_gateway::Gateway;

pub const TEST_BASE_URL: &str = "http://bizflow.test/api";

/// One attempt seen by a [`ScriptedTransport`].
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    /// Path relative to the API base (`/clients`, `/auth/refresh`, ...).
    pub path: String,
    pub bearer: Option<String>,
    pub body: Option<Value>,
    pub at: Instant,
}

type Handler =
    dyn Fn(OutboundRequest) -> BoxFuture<'static, Result<ApiResponse, TransportError>> + Send + Sync;

/// In-process transport answering from a test closure and recording every attempt.
pub struct ScriptedTransport {
    handler: Box<Handler>,
    calls: Mutex<Vec<Recorded>>,
}

impl ScriptedTransport {
    pub fn new<F, Fut>(f: F) -> Arc<Self>
    where
        F: Fn(OutboundRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ApiResponse, TransportError>> + Send + 'static,
    {
        Arc::new(Self {
            handler: Box::new(move |request| Box::pin(f(request))),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<Recorded> {
        self.calls().into_iter().filter(|c| c.path == path).collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: OutboundRequest) -> Result<ApiResponse, TransportError> {
        self.calls.lock().unwrap().push(Recorded {
            method: request.method.to_string(),
            path: relative_path(&request),
            bearer: request.bearer_token().map(str::to_string),
            body: request.body.clone(),
            at: Instant::now(),
        });
        (self.handler)(request).await
    }
}

pub fn relative_path(request: &OutboundRequest) -> String {
    let path = request.url.path();
    path.strip_prefix("/api").unwrap_or(path).to_string()
}

/// Canned response with a JSON body.
pub fn reply(status: u16, body: Value) -> Result<ApiResponse, TransportError> {
    Ok(ApiResponse::new(
        reqwest::StatusCode::from_u16(status).unwrap(),
        body.to_string(),
    ))
}

pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.api.base_url = TEST_BASE_URL.to_string();
    config
}

/// Gateway wired to a scripted transport with observable collaborators.
pub struct Harness {
    pub gateway: Gateway,
    pub transport: Arc<ScriptedTransport>,
    pub store: MemoryStore,
    pub events: EventBus,
    pub navigator: Arc<RouteTracker>,
}

impl Harness {
    pub fn new(transport: Arc<ScriptedTransport>, store: MemoryStore) -> Self {
        Self::with_config(test_config(), transport, store)
    }

    pub fn with_config(config: GatewayConfig, transport: Arc<ScriptedTransport>, store: MemoryStore) -> Self {
        let events = EventBus::new();
        let navigator = Arc::new(RouteTracker::default());
        navigator.navigate("/dashboard");
        let gateway = Gateway::builder(config)
            .transport(transport.clone())
            .credentials(Arc::new(store.clone()))
            .notifier(Arc::new(events.clone()))
            .navigator(navigator.clone())
            .build()
            .unwrap();
        Self {
            gateway,
            transport,
            store,
            events,
            navigator,
        }
    }
}

/// Every event already delivered to `rx`.
pub fn drain_events(rx: &mut broadcast::Receiver<GatewayEvent>) -> Vec<GatewayEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Poll `condition` until it holds, panicking after a few seconds.
pub async fn wait_until<F: Fn() -> bool>(condition: F) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Request as seen by the mock backend.
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub method: Method,
    pub path: String,
    pub bearer: Option<String>,
    pub body: Value,
}

/// Start a programmable HTTP backend on an ephemeral port.
pub async fn start_programmable_backend<F>(f: F) -> SocketAddr
where
    F: Fn(MockRequest) -> (u16, Value) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    let app = axum::Router::new().fallback(
        move |method: Method, uri: Uri, headers: HeaderMap, body: Bytes| {
            let f = f.clone();
            async move {
                let request = MockRequest {
                    method,
                    path: uri.path().to_string(),
                    bearer: headers
                        .get(AUTHORIZATION)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.strip_prefix("Bearer "))
                        .map(str::to_string),
                    body: serde_json::from_slice(&body).unwrap_or(Value::Null),
                };
                let (status, body) = f(request);
                (StatusCode::from_u16(status).unwrap(), Json(body))
            }
        },
    );

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Gateway over real HTTP to a backend started with [`start_programmable_backend`].
pub fn http_gateway(addr: SocketAddr, store: MemoryStore, events: &EventBus) -> Gateway {
    let mut config = GatewayConfig::default();
    config.api.base_url = format!("http://{addr}/api");
    config.retries.backoff_unit_ms = 10;

    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    Gateway::builder(config)
        .transport(Arc::new(ReqwestTransport::with_client(client)))
        .credentials(Arc::new(store))
        .notifier(Arc::new(events.clone()))
        .build()
        .unwrap()
}
