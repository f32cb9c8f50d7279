//! Cold-start retry behavior of the gateway.
//!
//! Time is paused, so the 8s/16s/24s waits are observed exactly without
//! slowing the suite down.

use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bizflow_gateway::credentials::{CredentialPair, MemoryStore};
use bizflow_gateway::events::GatewayEvent;
use bizflow_gateway::http::{ApiRequest, TransportError};
use bizflow_gateway::GatewayError;

mod common;

use common::{drain_events, reply, test_config, Harness, ScriptedTransport};

fn gaps(harness: &Harness) -> Vec<Duration> {
    harness
        .transport
        .calls()
        .windows(2)
        .map(|pair| pair[1].at - pair[0].at)
        .collect()
}

fn waking_count(events: &[GatewayEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, GatewayEvent::ServerWaking { .. }))
        .count()
}

#[tokio::test(start_paused = true)]
async fn test_waits_out_cold_start_with_linear_backoff() {
    let count = Arc::new(AtomicU32::new(0));
    let cc = count.clone();
    let transport = ScriptedTransport::new(move |_| {
        let n = cc.fetch_add(1, Ordering::SeqCst);
        async move {
            if n < 3 {
                reply(503, json!({ "error": "Service Unavailable" }))
            } else {
                reply(200, json!({ "success": true, "data": [] }))
            }
        }
    });
    let harness = Harness::new(transport, MemoryStore::new());
    let mut rx = harness.events.subscribe();

    let body: Value = harness.gateway.get("/clients").await.unwrap();
    assert_eq!(body["success"], json!(true));

    assert_eq!(harness.transport.calls().len(), 4);
    assert_eq!(
        gaps(&harness),
        vec![Duration::from_secs(8), Duration::from_secs(16), Duration::from_secs(24)]
    );

    let events = drain_events(&mut rx);
    assert_eq!(events, vec![GatewayEvent::server_waking()]);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_surface_last_failure() {
    let transport = ScriptedTransport::new(|_| async {
        Err(TransportError::Connect("connection refused".into()))
    });
    let harness = Harness::new(transport, MemoryStore::new());
    let mut rx = harness.events.subscribe();

    let start = tokio::time::Instant::now();
    let err = harness.gateway.send(ApiRequest::get("/sales")).await.unwrap_err();

    assert!(
        matches!(err, GatewayError::Transport { source: TransportError::Connect(_), .. }),
        "unexpected error: {err:?}"
    );
    assert_eq!(harness.transport.calls().len(), 4);
    assert_eq!(start.elapsed(), Duration::from_secs(8 + 16 + 24));
    assert_eq!(waking_count(&drain_events(&mut rx)), 1);
}

#[tokio::test(start_paused = true)]
async fn test_not_found_counts_as_warming_up() {
    let count = Arc::new(AtomicU32::new(0));
    let cc = count.clone();
    let transport = ScriptedTransport::new(move |_| {
        let n = cc.fetch_add(1, Ordering::SeqCst);
        async move {
            if n == 0 {
                reply(404, json!({ "error": "Not Found" }))
            } else {
                reply(200, json!({ "success": true }))
            }
        }
    });
    let harness = Harness::new(transport, MemoryStore::new());

    harness.gateway.send(ApiRequest::get("/reports/trends")).await.unwrap();
    assert_eq!(harness.transport.calls().len(), 2);
    assert_eq!(gaps(&harness), vec![Duration::from_secs(8)]);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_counts_as_no_response() {
    let count = Arc::new(AtomicU32::new(0));
    let cc = count.clone();
    let transport = ScriptedTransport::new(move |_| {
        let n = cc.fetch_add(1, Ordering::SeqCst);
        async move {
            if n == 0 {
                tokio::time::sleep(Duration::from_secs(120)).await;
            }
            reply(200, json!({ "success": true }))
        }
    });
    let harness = Harness::new(transport, MemoryStore::new());

    harness.gateway.send(ApiRequest::get("/clients")).await.unwrap();
    // 60s request deadline, then the first 8s backoff.
    assert_eq!(gaps(&harness), vec![Duration::from_secs(68)]);
}

#[tokio::test(start_paused = true)]
async fn test_other_failures_are_not_retried() {
    let transport = ScriptedTransport::new(|_| async {
        reply(500, json!({ "success": false, "error": "Database error" }))
    });
    let harness = Harness::new(transport, MemoryStore::new());
    let mut rx = harness.events.subscribe();

    let err = harness.gateway.send(ApiRequest::get("/clients")).await.unwrap_err();
    assert_eq!(err.status().map(|s| s.as_u16()), Some(500));
    assert_eq!(err.user_message("Could not load clients"), "Database error");
    assert_eq!(harness.transport.calls().len(), 1);
    assert!(drain_events(&mut rx).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_each_call_notifies_once() {
    let count = Arc::new(AtomicU32::new(0));
    let cc = count.clone();
    // Two failures, then success, per call.
    let transport = ScriptedTransport::new(move |_| {
        let n = cc.fetch_add(1, Ordering::SeqCst);
        async move {
            if n % 3 < 2 {
                reply(502, json!({}))
            } else {
                reply(200, json!({ "success": true }))
            }
        }
    });
    let harness = Harness::new(transport, MemoryStore::new());
    let mut rx = harness.events.subscribe();

    harness.gateway.send(ApiRequest::get("/clients")).await.unwrap();
    harness.gateway.send(ApiRequest::get("/sales")).await.unwrap();

    assert_eq!(harness.transport.calls().len(), 6);
    assert_eq!(waking_count(&drain_events(&mut rx)), 2);
}

#[tokio::test(start_paused = true)]
async fn test_disabled_retries_fail_fast() {
    let transport = ScriptedTransport::new(|_| async { reply(503, json!({})) });
    let mut config = test_config();
    config.retries.enabled = false;
    let harness = Harness::with_config(config, transport, MemoryStore::new());
    let mut rx = harness.events.subscribe();

    let err = harness.gateway.send(ApiRequest::get("/clients")).await.unwrap_err();
    assert_eq!(err.status().map(|s| s.as_u16()), Some(503));
    assert_eq!(harness.transport.calls().len(), 1);
    assert!(drain_events(&mut rx).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_waking_then_unauthorized_then_refresh() {
    let count = Arc::new(AtomicU32::new(0));
    let cc = count.clone();
    let transport = ScriptedTransport::new(move |request| {
        let path = common::relative_path(&request);
        let bearer = request.bearer_token().map(str::to_string);
        let n = if path == "/clients" {
            cc.fetch_add(1, Ordering::SeqCst)
        } else {
            0
        };
        async move {
            match (path.as_str(), bearer.as_deref()) {
                ("/auth/refresh", _) => reply(200, json!({ "success": true, "data": { "accessToken": "new" } })),
                ("/clients", _) if n == 0 => reply(503, json!({})),
                ("/clients", Some("new")) => reply(200, json!({ "success": true, "data": [] })),
                _ => reply(401, json!({ "error": "Token expired" })),
            }
        }
    });
    let harness = Harness::new(transport, MemoryStore::with_pair(&CredentialPair::new("old", "r1")));
    let mut rx = harness.events.subscribe();

    harness.gateway.send(ApiRequest::get("/clients")).await.unwrap();

    let clients = harness.transport.calls_to("/clients");
    assert_eq!(clients.len(), 3);
    assert_eq!(clients[2].bearer.as_deref(), Some("new"));
    assert_eq!(harness.transport.calls_to("/auth/refresh").len(), 1);
    assert_eq!(waking_count(&drain_events(&mut rx)), 1);
}

#[tokio::test(start_paused = true)]
async fn test_retry_budget_spans_refresh() {
    // 503, 401 (refresh), then 503 until exhausted: 3 retries in total.
    let count = Arc::new(AtomicU32::new(0));
    let cc = count.clone();
    let transport = ScriptedTransport::new(move |request| {
        let path = common::relative_path(&request);
        let n = if path == "/clients" {
            cc.fetch_add(1, Ordering::SeqCst)
        } else {
            0
        };
        async move {
            match path.as_str() {
                "/auth/refresh" => reply(200, json!({ "data": { "accessToken": "new" } })),
                _ if n == 1 => reply(401, json!({})),
                _ => reply(503, json!({})),
            }
        }
    });
    let harness = Harness::new(transport, MemoryStore::with_pair(&CredentialPair::new("old", "r1")));

    let err = harness.gateway.send(ApiRequest::get("/clients")).await.unwrap_err();
    assert_eq!(err.status().map(|s| s.as_u16()), Some(503));
    // 503, 401, 503, 503, 503 (exhausted)
    assert_eq!(harness.transport.calls_to("/clients").len(), 5);
}
