//! Inbound proxy event shapes.
//!
//! One invocation carries exactly one of these. Field names follow the
//! gateway's camelCase JSON; everything optional is modelled as `Option` so
//! that missing fields surface as [`Error::MalformedEvent`] during
//! translation instead of as opaque deserialization failures.
//!
//! # Detection
//!
//! | Shape | Discriminator |
//! |-------|---------------|
//! | WebSocket | `requestContext.eventType` or `requestContext.connectionId` |
//! | HTTP (REST, v1) | `httpMethod` |
//! | HTTP (HTTP API, v2) | `requestContext.http` |

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

// ============================================================================
// ProxyEvent
// ============================================================================

/// A single inbound event.
#[derive(Debug, Clone)]
pub enum ProxyEvent {
    /// HTTP request description.
    Http(Box<HttpEvent>),
    /// WebSocket lifecycle event.
    WebSocket(Box<WebSocketEvent>),
}

impl ProxyEvent {
    /// Classifies and parses a raw event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedEvent`] if the shape is not recognized or
    /// a field has the wrong type.
    pub fn from_value(value: Value) -> Result<Self> {
        let context = value.get("requestContext");
        let is_websocket = context
            .map(|ctx| ctx.get("eventType").is_some() || ctx.get("connectionId").is_some())
            .unwrap_or(false);
        let is_http = value.get("httpMethod").is_some()
            || context.and_then(|ctx| ctx.get("http")).is_some();

        if is_websocket {
            let event = serde_json::from_value(value)
                .map_err(|e| Error::malformed_event(format!("Invalid WebSocket event: {e}")))?;
            Ok(Self::WebSocket(Box::new(event)))
        } else if is_http {
            let event = serde_json::from_value(value)
                .map_err(|e| Error::malformed_event(format!("Invalid HTTP event: {e}")))?;
            Ok(Self::Http(Box::new(event)))
        } else {
            Err(Error::malformed_event(
                "Unrecognized event shape: expected an HTTP or WebSocket proxy event",
            ))
        }
    }

    /// Parses an event from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] for invalid JSON and
    /// [`Error::MalformedEvent`] for unrecognized shapes.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(json)?)
    }
}

// ============================================================================
// Identity
// ============================================================================

/// Caller identity block of a request context.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Client IP address.
    #[serde(default)]
    pub source_ip: Option<String>,
}

// ============================================================================
// HttpEvent
// ============================================================================

/// HTTP proxy event, payload version 1.0 or 2.0.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpEvent {
    /// Payload format version (`"2.0"` for HTTP APIs).
    #[serde(default)]
    pub version: Option<String>,

    /// Request method (v1).
    #[serde(default)]
    pub http_method: Option<String>,

    /// Request path (v1).
    #[serde(default)]
    pub path: Option<String>,

    /// Request path (v2).
    #[serde(default)]
    pub raw_path: Option<String>,

    /// Query string (v2).
    #[serde(default)]
    pub raw_query_string: Option<String>,

    /// Single-valued headers.
    #[serde(default)]
    pub headers: Option<Map<String, Value>>,

    /// Multi-valued headers (v1).
    #[serde(default)]
    pub multi_value_headers: Option<Map<String, Value>>,

    /// Single-valued query parameters (v1).
    #[serde(default)]
    pub query_string_parameters: Option<Map<String, Value>>,

    /// Multi-valued query parameters (v1).
    #[serde(default)]
    pub multi_value_query_string_parameters: Option<Map<String, Value>>,

    /// Cookies, split out of the headers (v2).
    #[serde(default)]
    pub cookies: Option<Vec<String>>,

    /// Request body.
    #[serde(default)]
    pub body: Option<String>,

    /// Whether `body` is base64-encoded.
    #[serde(default)]
    pub is_base64_encoded: bool,

    /// Request context.
    #[serde(default)]
    pub request_context: HttpRequestContext,
}

impl HttpEvent {
    /// Returns `true` for payload version 2.0.
    #[inline]
    #[must_use]
    pub fn is_v2(&self) -> bool {
        self.version.as_deref() == Some("2.0") || self.request_context.http.is_some()
    }
}

/// Request context of an HTTP event.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRequestContext {
    /// Deployment stage.
    #[serde(default)]
    pub stage: Option<String>,

    /// Gateway domain name.
    #[serde(default)]
    pub domain_name: Option<String>,

    /// Caller identity (v1).
    #[serde(default)]
    pub identity: Option<Identity>,

    /// Request line description (v2).
    #[serde(default)]
    pub http: Option<HttpDescription>,
}

/// Request line of a v2 HTTP event.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpDescription {
    /// Request method.
    #[serde(default)]
    pub method: Option<String>,

    /// Request path.
    #[serde(default)]
    pub path: Option<String>,

    /// Client IP address.
    #[serde(default)]
    pub source_ip: Option<String>,
}

// ============================================================================
// WebSocketEvent
// ============================================================================

/// WebSocket proxy event.
///
/// Headers only exist on connect events.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSocketEvent {
    /// Single-valued headers.
    #[serde(default)]
    pub headers: Option<Map<String, Value>>,

    /// Multi-valued headers.
    #[serde(default)]
    pub multi_value_headers: Option<Map<String, Value>>,

    /// Single-valued query parameters.
    #[serde(default)]
    pub query_string_parameters: Option<Map<String, Value>>,

    /// Multi-valued query parameters.
    #[serde(default)]
    pub multi_value_query_string_parameters: Option<Map<String, Value>>,

    /// Frame payload (message events).
    #[serde(default)]
    pub body: Option<String>,

    /// Whether `body` is base64-encoded.
    #[serde(default)]
    pub is_base64_encoded: bool,

    /// Request context.
    #[serde(default)]
    pub request_context: WebSocketRequestContext,
}

/// Request context of a WebSocket event.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSocketRequestContext {
    /// Route selected by the gateway (`$connect`, `$default`, ...).
    #[serde(default)]
    pub route_key: Option<String>,

    /// Lifecycle event type (`CONNECT`, `MESSAGE`, `DISCONNECT`).
    #[serde(default)]
    pub event_type: Option<String>,

    /// Connection identifier.
    #[serde(default)]
    pub connection_id: Option<String>,

    /// Gateway domain name.
    #[serde(default)]
    pub domain_name: Option<String>,

    /// Deployment stage.
    #[serde(default)]
    pub stage: Option<String>,

    /// Caller identity.
    #[serde(default)]
    pub identity: Option<Identity>,

    /// Close code reported on disconnect events.
    #[serde(default)]
    pub disconnect_status_code: Option<u16>,
}

// ============================================================================
// Tests
// ============================================================================
