//! Event translation.
//!
//! Turns one [`ProxyEvent`] into the [`Scope`] the application sees, the
//! seed [`Message`] its receiver yields first, and the [`EventKind`] that
//! selects the cycle.
//!
//! # Mapping
//!
//! | Event | Seed |
//! |-------|------|
//! | HTTP | `http.request` |
//! | WebSocket `CONNECT` | `websocket.connect` |
//! | WebSocket `MESSAGE` | `websocket.receive` |
//! | WebSocket `DISCONNECT` | `websocket.disconnect` |
//!
//! Each cycle supplies the message its receiver yields once the seed is
//! consumed.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Map, Value};
use tracing::trace;

use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;
use crate::protocol::{CLOSE_NO_STATUS, Header, Message, Scope, ScopeKind};
use crate::transport::Endpoint;

use super::request::{HttpEvent, ProxyEvent, WebSocketEvent};

// ============================================================================
// Constants
// ============================================================================

/// Server host used when the event carries no `Host` header.
const DEFAULT_SERVER_HOST: &str = "lambda-bridge";

/// Server port used when the event carries no `X-Forwarded-Port` header.
const DEFAULT_SERVER_PORT: u16 = 80;

/// Stage name that mounts the API at the root.
const ROOT_STAGE: &str = "$default";

// ============================================================================
// WebSocketEventKind
// ============================================================================

/// Lifecycle sub-kind of a WebSocket event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WebSocketEventKind {
    /// Client is opening a connection.
    Connect,
    /// Client sent a frame.
    Message,
    /// Client went away.
    Disconnect,
}

impl WebSocketEventKind {
    /// Reads the sub-kind from `eventType`, falling back to `routeKey`.
    fn detect(event_type: Option<&str>, route_key: Option<&str>) -> Option<Self> {
        match event_type {
            Some("CONNECT") => return Some(Self::Connect),
            Some("MESSAGE") => return Some(Self::Message),
            Some("DISCONNECT") => return Some(Self::Disconnect),
            _ => {}
        }

        route_key.map(|route| match route {
            "$connect" => Self::Connect,
            "$disconnect" => Self::Disconnect,
            _ => Self::Message,
        })
    }

    /// Returns the lowercase name of the sub-kind.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Message => "message",
            Self::Disconnect => "disconnect",
        }
    }
}

impl fmt::Display for WebSocketEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// EventKind
// ============================================================================

/// Which cycle drives the invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// HTTP request/response exchange.
    Http,
    /// WebSocket lifecycle event.
    WebSocket {
        /// Originating connection.
        connection_id: ConnectionId,
        /// Lifecycle sub-kind.
        kind: WebSocketEventKind,
        /// Endpoint for pushes back to the connection.
        endpoint: Option<Endpoint>,
    },
}

impl EventKind {
    /// Returns a short label for logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::WebSocket { kind, .. } => match kind {
                WebSocketEventKind::Connect => "websocket.connect",
                WebSocketEventKind::Message => "websocket.message",
                WebSocketEventKind::Disconnect => "websocket.disconnect",
            },
        }
    }
}

// ============================================================================
// Translated
// ============================================================================

/// Everything a cycle needs from the inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translated {
    /// Scope handed to the application.
    pub scope: Scope,
    /// First message the application receives.
    pub seed: Message,
    /// Cycle selector.
    pub kind: EventKind,
}

// ============================================================================
// translate
// ============================================================================

/// Translates one inbound event.
///
/// `base_path` is stripped from HTTP request paths.
///
/// # Errors
///
/// Returns [`Error::MalformedEvent`] if a required field is missing or a
/// body cannot be decoded.
pub fn translate(event: &ProxyEvent, base_path: Option<&str>) -> Result<Translated> {
    let translated = match event {
        ProxyEvent::Http(http) => translate_http(http, base_path)?,
        ProxyEvent::WebSocket(ws) => translate_websocket(ws)?,
    };

    trace!(
        kind = translated.kind.label(),
        path = %translated.scope.path,
        headers = translated.scope.headers.len(),
        "Event translated"
    );

    Ok(translated)
}

// ============================================================================
// HTTP
// ============================================================================

fn translate_http(event: &HttpEvent, base_path: Option<&str>) -> Result<Translated> {
    let context = &event.request_context;
    let description = context.http.as_ref();

    let method = event
        .http_method
        .as_deref()
        .or_else(|| description.and_then(|http| http.method.as_deref()))
        .ok_or_else(|| Error::malformed_event("HTTP event has no method"))?;

    let raw_path = if event.is_v2() {
        event
            .raw_path
            .as_deref()
            .or_else(|| description.and_then(|http| http.path.as_deref()))
    } else {
        event.path.as_deref()
    };
    let raw_path = raw_path.unwrap_or("/");

    let mut headers = collect_headers(
        event.headers.as_ref(),
        event.multi_value_headers.as_ref(),
    )?;
    if let Some(cookies) = event.cookies.as_ref().filter(|c| !c.is_empty()) {
        headers.push(Header::new("cookie", cookies.join("; ")));
    }

    let query_string = match event.raw_query_string.as_deref() {
        Some(raw) => raw.to_string(),
        None => build_query_string(
            event.query_string_parameters.as_ref(),
            event.multi_value_query_string_parameters.as_ref(),
        )?,
    };

    let source_ip = description
        .and_then(|http| http.source_ip.as_deref())
        .or_else(|| {
            context
                .identity
                .as_ref()
                .and_then(|identity| identity.source_ip.as_deref())
        });

    let mut scope = Scope::new(ScopeKind::Http);
    scope.method = Some(method.to_ascii_uppercase());
    scope.scheme = header_value(&headers, "x-forwarded-proto")
        .unwrap_or("https")
        .to_string();
    scope.path = strip_base_path(raw_path, base_path);
    scope.query_string = query_string;
    scope.root_path = root_path(context.stage.as_deref());
    scope.client = source_ip.map(|ip| (ip.to_string(), 0));
    scope.server = Some(server_address(&headers));
    scope.headers = headers;

    let body = decode_body(event.body.as_deref(), event.is_base64_encoded)?;

    Ok(Translated {
        scope,
        seed: Message::HttpRequest {
            body,
            more_body: false,
        },
        kind: EventKind::Http,
    })
}

// ============================================================================
// WebSocket
// ============================================================================

fn translate_websocket(event: &WebSocketEvent) -> Result<Translated> {
    let context = &event.request_context;

    let kind = WebSocketEventKind::detect(
        context.event_type.as_deref(),
        context.route_key.as_deref(),
    )
    .ok_or_else(|| Error::malformed_event("WebSocket event has no eventType or routeKey"))?;

    let connection_id = context
        .connection_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .map(ConnectionId::new)
        .ok_or_else(|| Error::malformed_event("WebSocket event has no connectionId"))?;

    let endpoint = match (context.domain_name.as_deref(), context.stage.as_deref()) {
        (Some(domain), Some(stage)) => Some(Endpoint::new(domain, stage)),
        _ => None,
    };

    let headers = collect_headers(
        event.headers.as_ref(),
        event.multi_value_headers.as_ref(),
    )?;

    let mut scope = Scope::new(ScopeKind::WebSocket);
    scope.scheme = header_value(&headers, "x-forwarded-proto")
        .unwrap_or("https")
        .to_string();
    scope.query_string = build_query_string(
        event.query_string_parameters.as_ref(),
        event.multi_value_query_string_parameters.as_ref(),
    )?;
    scope.root_path = context.stage.clone().unwrap_or_default();
    scope.client = context
        .identity
        .as_ref()
        .and_then(|identity| identity.source_ip.as_deref())
        .map(|ip| (ip.to_string(), 0));
    // The gateway terminates the socket; the forwarded port is not the app's.
    let host = header_value(&headers, "host")
        .or(context.domain_name.as_deref())
        .unwrap_or(DEFAULT_SERVER_HOST);
    scope.server = Some((host.to_string(), DEFAULT_SERVER_PORT));
    scope.subprotocols = header_value(&headers, "sec-websocket-protocol")
        .map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|protocol| !protocol.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    scope.headers = headers;

    let seed = match kind {
        WebSocketEventKind::Connect => Message::WebSocketConnect,
        WebSocketEventKind::Message => {
            let body = event.body.as_deref().unwrap_or_default();
            if event.is_base64_encoded {
                Message::WebSocketReceive {
                    text: None,
                    bytes: Some(decode_body(Some(body), true)?),
                }
            } else {
                Message::WebSocketReceive {
                    text: Some(body.to_string()),
                    bytes: None,
                }
            }
        }
        WebSocketEventKind::Disconnect => Message::WebSocketDisconnect {
            code: context.disconnect_status_code.unwrap_or(CLOSE_NO_STATUS),
        },
    };

    Ok(Translated {
        scope,
        seed,
        kind: EventKind::WebSocket {
            connection_id,
            kind,
            endpoint,
        },
    })
}

// ============================================================================
// Helpers
// ============================================================================

/// Builds the ordered header list; multi-valued headers win.
fn collect_headers(
    single: Option<&Map<String, Value>>,
    multi: Option<&Map<String, Value>>,
) -> Result<Vec<Header>> {
    let mut headers = Vec::new();

    if let Some(multi) = multi.filter(|m| !m.is_empty()) {
        for (name, values) in multi {
            for value in values_of(name, values)? {
                headers.push(Header::new(name.as_str(), value));
            }
        }
    } else if let Some(single) = single {
        for (name, value) in single {
            if let Some(value) = scalar(name, value)? {
                headers.push(Header::new(name.as_str(), value));
            }
        }
    }

    Ok(headers)
}

/// Builds a percent-encoded query string; multi-valued parameters win.
fn build_query_string(
    single: Option<&Map<String, Value>>,
    multi: Option<&Map<String, Value>>,
) -> Result<String> {
    let mut pairs = Vec::new();

    if let Some(multi) = multi.filter(|m| !m.is_empty()) {
        for (key, values) in multi {
            for value in values_of(key, values)? {
                pairs.push(encode_pair(key, &value));
            }
        }
    } else if let Some(single) = single {
        for (key, value) in single {
            if let Some(value) = scalar(key, value)? {
                pairs.push(encode_pair(key, &value));
            }
        }
    }

    Ok(pairs.join("&"))
}

fn encode_pair(key: &str, value: &str) -> String {
    format!(
        "{}={}",
        urlencoding::encode(key),
        urlencoding::encode(value)
    )
}

/// Reads a JSON scalar as a string; `null` is skipped.
fn scalar(field: &str, value: &Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        _ => Err(Error::malformed_event(format!(
            "Field '{field}' must be a string"
        ))),
    }
}

/// Reads a JSON array of scalars; a bare scalar counts as one value.
fn values_of(field: &str, value: &Value) -> Result<Vec<String>> {
    match value {
        Value::Array(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                if let Some(value) = scalar(field, item)? {
                    values.push(value);
                }
            }
            Ok(values)
        }
        other => Ok(scalar(field, other)?.into_iter().collect()),
    }
}

fn header_value<'a>(headers: &'a [Header], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|header| header.is(name))
        .map(Header::value)
}

fn server_address(headers: &[Header]) -> (String, u16) {
    let host = header_value(headers, "host").unwrap_or(DEFAULT_SERVER_HOST);
    let port = header_value(headers, "x-forwarded-port")
        .and_then(|port| port.trim().parse().ok())
        .unwrap_or(DEFAULT_SERVER_PORT);
    (host.to_string(), port)
}

fn root_path(stage: Option<&str>) -> String {
    match stage {
        Some(stage) if !stage.is_empty() && stage != ROOT_STAGE => format!("/{stage}"),
        _ => String::new(),
    }
}

/// Removes the configured base path prefix at a segment boundary.
fn strip_base_path(path: &str, base_path: Option<&str>) -> String {
    let Some(base) = base_path.map(|b| b.trim_matches('/')).filter(|b| !b.is_empty()) else {
        return path.to_string();
    };

    let prefix = format!("/{base}");
    match path.strip_prefix(&prefix) {
        Some("") => "/".to_string(),
        Some(rest) if rest.starts_with('/') => rest.to_string(),
        _ => path.to_string(),
    }
}

fn decode_body(body: Option<&str>, is_base64_encoded: bool) -> Result<Vec<u8>> {
    let Some(body) = body else {
        return Ok(Vec::new());
    };

    if is_base64_encoded {
        STANDARD
            .decode(body)
            .map_err(|e| Error::malformed_event(format!("Body is not valid base64: {e}")))
    } else {
        Ok(body.as_bytes().to_vec())
    }
}

// ============================================================================
// Tests
// ============================================================================
