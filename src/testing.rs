//! Test doubles and event fixtures.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use serde_json::{Value, json};

use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;
use crate::protocol::Payload;
use crate::registry::{Connection, ConnectionRegistry, ConnectionUpdate, MemoryRegistry};
use crate::transport::{PushOutcome, Pusher};

// ============================================================================
// RecordingPusher
// ============================================================================

/// Records every push attempt.
///
/// Connections listed as gone answer [`PushOutcome::Gone`]; connections
/// listed as failing answer [`Error::Push`]. Both are still recorded.
#[derive(Debug, Default)]
pub(crate) struct RecordingPusher {
    gone: FxHashSet<String>,
    failing: FxHashSet<String>,
    attempts: Mutex<Vec<(Connection, Payload)>>,
}

impl RecordingPusher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_gone<'a>(mut self, ids: impl IntoIterator<Item = &'a str>) -> Self {
        self.gone.extend(ids.into_iter().map(str::to_string));
        self
    }

    pub(crate) fn with_failing<'a>(mut self, ids: impl IntoIterator<Item = &'a str>) -> Self {
        self.failing.extend(ids.into_iter().map(str::to_string));
        self
    }

    /// Returns `(target, payload)` for every attempt, in order.
    pub(crate) fn pushes(&self) -> Vec<(ConnectionId, Payload)> {
        self.attempts
            .lock()
            .iter()
            .map(|(target, payload)| (target.connection_id.clone(), payload.clone()))
            .collect()
    }

    /// Returns the full target row of every attempt, in order.
    pub(crate) fn targets(&self) -> Vec<Connection> {
        self.attempts
            .lock()
            .iter()
            .map(|(target, _)| target.clone())
            .collect()
    }
}

#[async_trait]
impl Pusher for RecordingPusher {
    async fn push(&self, target: &Connection, payload: &Payload) -> Result<PushOutcome> {
        self.attempts.lock().push((target.clone(), payload.clone()));

        let id = target.connection_id.as_str();
        if self.failing.contains(id) {
            return Err(Error::push(target.connection_id.clone(), "503 Service Unavailable"));
        }
        if self.gone.contains(id) {
            return Ok(PushOutcome::Gone);
        }
        Ok(PushOutcome::Delivered)
    }
}

// ============================================================================
// UnavailableRegistry
// ============================================================================

/// Registry whose store is always down.
#[derive(Debug, Default)]
pub(crate) struct UnavailableRegistry;

impl UnavailableRegistry {
    fn down() -> Error {
        Error::registry_unavailable("store unreachable")
    }
}

#[async_trait]
impl ConnectionRegistry for UnavailableRegistry {
    async fn get(&self, _connection_id: &ConnectionId) -> Result<Option<Connection>> {
        Err(Self::down())
    }

    async fn upsert(&self, _connection_id: &ConnectionId, _update: ConnectionUpdate) -> Result<()> {
        Err(Self::down())
    }

    async fn update(&self, _connection_id: &ConnectionId, _update: ConnectionUpdate) -> Result<bool> {
        Err(Self::down())
    }

    async fn delete(&self, _connection_id: &ConnectionId) -> Result<()> {
        Err(Self::down())
    }

    async fn scan_by_group(&self, _group: &str) -> Result<Vec<Connection>> {
        Err(Self::down())
    }
}

// ============================================================================
// DeleteFailingRegistry
// ============================================================================

/// In-memory registry whose deletes always fail.
#[derive(Debug, Default)]
pub(crate) struct DeleteFailingRegistry {
    pub(crate) inner: MemoryRegistry,
}

#[async_trait]
impl ConnectionRegistry for DeleteFailingRegistry {
    async fn get(&self, connection_id: &ConnectionId) -> Result<Option<Connection>> {
        self.inner.get(connection_id).await
    }

    async fn upsert(&self, connection_id: &ConnectionId, update: ConnectionUpdate) -> Result<()> {
        self.inner.upsert(connection_id, update).await
    }

    async fn update(&self, connection_id: &ConnectionId, update: ConnectionUpdate) -> Result<bool> {
        self.inner.update(connection_id, update).await
    }

    async fn delete(&self, _connection_id: &ConnectionId) -> Result<()> {
        Err(Error::registry_unavailable("delete rejected"))
    }

    async fn scan_by_group(&self, group: &str) -> Result<Vec<Connection>> {
        self.inner.scan_by_group(group).await
    }

    async fn add_group(&self, connection_id: &ConnectionId, group: &str) -> Result<()> {
        self.inner.add_group(connection_id, group).await
    }
}

// ============================================================================
// Event Fixtures
// ============================================================================

/// Gateway domain used by the WebSocket fixtures.
pub(crate) const DOMAIN: &str = "test.execute-api.ap-southeast-1.amazonaws.com";

/// Connection ID used by the WebSocket fixtures.
pub(crate) const CONNECTION_ID: &str = "d1BzTcMOSQ0CEsg=";

fn ws_context(event_type: &str, route_key: &str) -> Value {
    json!({
        "routeKey": route_key,
        "messageId": null,
        "eventType": event_type,
        "extendedRequestId": "d1BzTEi7SQ0Fz5A=",
        "requestTime": "04/Aug/2019:04:22:14 +0000",
        "messageDirection": "IN",
        "stage": "Prod",
        "connectedAt": 1_564_892_534_000_i64,
        "requestTimeEpoch": 1_564_892_534_000_i64,
        "identity": {
            "cognitoIdentityPoolId": null,
            "cognitoIdentityId": null,
            "principalOrgId": null,
            "cognitoAuthenticationType": null,
            "userArn": null,
            "userAgent": "Mozilla/5.0",
            "accountId": null,
            "caller": null,
            "sourceIp": "192.168.100.1",
            "accessKey": null,
            "cognitoAuthenticationProvider": null,
            "user": null
        },
        "requestId": "d1BzTEi7SQ0Fz5A=",
        "domainName": DOMAIN,
        "connectionId": CONNECTION_ID,
        "apiId": "test"
    })
}

/// WebSocket `$connect` event with the full browser handshake headers.
pub(crate) fn ws_connect_event() -> Value {
    json!({
        "headers": {
            "Accept-Encoding": "gzip, deflate, br",
            "Accept-Language": "en-US,en;q=0.9",
            "Cache-Control": "no-cache",
            "Host": DOMAIN,
            "Origin": format!("https://{DOMAIN}"),
            "Pragma": "no-cache",
            "Sec-WebSocket-Extensions": "permessage-deflate; client_max_window_bits",
            "Sec-WebSocket-Key": "bnfeqmh9SSPr5Sg9DvFIBw==",
            "Sec-WebSocket-Version": "13",
            "User-Agent": "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_14_5) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/75.0.3770.100 Safari/537.36",
            "X-Amzn-Trace-Id": "Root=1-5d465cb6-78ddcac1e21f89203d004a89",
            "X-Forwarded-For": "192.168.100.1",
            "X-Forwarded-Port": "443",
            "X-Forwarded-Proto": "https"
        },
        "requestContext": ws_context("CONNECT", "$connect"),
        "isBase64Encoded": false
    })
}

/// WebSocket `$default` message event carrying `body`.
pub(crate) fn ws_message_event(body: &str) -> Value {
    json!({
        "requestContext": ws_context("MESSAGE", "$default"),
        "body": body,
        "isBase64Encoded": false
    })
}

/// WebSocket `$disconnect` event.
pub(crate) fn ws_disconnect_event() -> Value {
    json!({
        "headers": {
            "Host": DOMAIN,
            "x-api-key": "",
            "x-restapi": ""
        },
        "requestContext": ws_context("DISCONNECT", "$disconnect"),
        "isBase64Encoded": false
    })
}

/// REST (payload 1.0) HTTP event.
pub(crate) fn http_event(method: &str, path: &str, body: Option<&str>) -> Value {
    json!({
        "resource": "/{proxy+}",
        "path": path,
        "httpMethod": method,
        "headers": {
            "Accept": "application/json",
            "Host": "api.example.com",
            "X-Forwarded-Port": "443",
            "X-Forwarded-Proto": "https"
        },
        "multiValueHeaders": null,
        "queryStringParameters": { "name": "me" },
        "multiValueQueryStringParameters": null,
        "pathParameters": null,
        "stageVariables": null,
        "requestContext": {
            "resourcePath": "/{proxy+}",
            "httpMethod": method,
            "path": format!("/Prod{path}"),
            "stage": "Prod",
            "identity": { "sourceIp": "192.168.100.1" }
        },
        "body": body,
        "isBase64Encoded": false
    })
}

// ============================================================================
// Logging
// ============================================================================

/// Routes crate logs to the test harness.
///
/// Honors `RUST_LOG`; safe to call from every test.
pub(crate) fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("lambda_bridge=debug"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_test_writer()
        .try_init();
}
