//! Connection scope metadata.
//!
//! A [`Scope`] describes the connection a cycle drives: it is built once per
//! invocation from the inbound event and handed to the application together
//! with the receive/send channels.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use super::message::Header;

// ============================================================================
// ScopeKind
// ============================================================================

/// Protocol class of a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    /// One HTTP request/response exchange.
    Http,
    /// One WebSocket lifecycle event.
    WebSocket,
    /// Process startup/shutdown.
    Lifespan,
}

impl ScopeKind {
    /// Returns the wire name of the scope kind.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::WebSocket => "websocket",
            Self::Lifespan => "lifespan",
        }
    }
}

// ============================================================================
// Scope
// ============================================================================

/// Constant metadata for one driven connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    /// Scope kind.
    #[serde(rename = "type")]
    pub kind: ScopeKind,

    /// HTTP version, always `1.1` for proxied requests.
    pub http_version: String,

    /// Request method (HTTP scopes only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// URL scheme as forwarded by the gateway (`https`, `http`).
    pub scheme: String,

    /// Request path, with the base path already stripped.
    pub path: String,

    /// Raw, percent-encoded query string without the leading `?`.
    pub query_string: String,

    /// Mount prefix derived from the deployment stage (`/Prod` for HTTP,
    /// the bare stage name for WebSocket).
    pub root_path: String,

    /// Request headers, original casing and order preserved.
    pub headers: Vec<Header>,

    /// Client address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<(String, u16)>,

    /// Server address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<(String, u16)>,

    /// Subprotocols requested by the client (WebSocket scopes only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subprotocols: Vec<String>,
}

impl Scope {
    /// Creates an empty scope of the given kind.
    #[must_use]
    pub fn new(kind: ScopeKind) -> Self {
        Self {
            kind,
            http_version: "1.1".to_string(),
            method: None,
            scheme: String::new(),
            path: "/".to_string(),
            query_string: String::new(),
            root_path: String::new(),
            headers: Vec::new(),
            client: None,
            server: None,
            subprotocols: Vec::new(),
        }
    }

    /// Creates the scope used by the lifespan driver.
    #[inline]
    #[must_use]
    pub fn lifespan() -> Self {
        Self::new(ScopeKind::Lifespan)
    }

    /// Returns the first value of a header, ignoring name case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|header| header.is(name))
            .map(Header::value)
    }
}

// ============================================================================
// Tests
// ============================================================================
