//! Protocol message types.
//!
//! A [`Message`] is one unit exchanged between a cycle and the application.
//! Inbound messages (`http.request`, `websocket.receive`, `lifespan.startup`,
//! ...) are produced by the bridge; outbound messages
//! (`http.response.start`, `websocket.send`, `lifespan.startup.complete`,
//! ...) are produced by the application.
//!
//! # Format
//!
//! Messages serialize with a `type` tag:
//!
//! ```json
//! { "type": "websocket.send", "text": "Hello world!", "group": "lobby" }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Close code used when the peer went away without a close frame.
pub const CLOSE_NO_STATUS: u16 = 1005;

/// Normal closure.
pub const CLOSE_NORMAL: u16 = 1000;

// ============================================================================
// Header
// ============================================================================

/// A single `(name, value)` header pair.
///
/// Names keep their original casing; ordering and duplicates are meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Header(pub String, pub String);

impl Header {
    /// Creates a header pair.
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self(name.into(), value.into())
    }

    /// Returns the header name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Returns the header value.
    #[inline]
    #[must_use]
    pub fn value(&self) -> &str {
        &self.1
    }

    /// Returns `true` if the name matches, ignoring ASCII case.
    #[inline]
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.0.eq_ignore_ascii_case(name)
    }
}

// ============================================================================
// Payload
// ============================================================================

/// WebSocket frame content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Payload {
    /// UTF-8 text frame.
    Text(String),
    /// Binary frame.
    Binary(Vec<u8>),
}

impl Payload {
    /// Returns the payload size in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(bytes) => bytes.len(),
        }
    }

    /// Returns `true` if the payload carries no data.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the raw bytes of either variant.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(bytes) => bytes,
        }
    }

    /// Builds a payload from the `text`/`bytes` pair of a WebSocket message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProtocolViolation`] unless exactly one side is set.
    pub fn from_parts(text: Option<String>, bytes: Option<Vec<u8>>) -> Result<Self> {
        match (text, bytes) {
            (Some(text), None) => Ok(Self::Text(text)),
            (None, Some(bytes)) => Ok(Self::Binary(bytes)),
            (Some(_), Some(_)) => Err(Error::protocol_violation(
                "websocket message carries both text and bytes",
            )),
            (None, None) => Err(Error::protocol_violation(
                "websocket message carries neither text nor bytes",
            )),
        }
    }
}

// ============================================================================
// Message
// ============================================================================

/// All protocol messages, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    // ========================================================================
    // HTTP
    // ========================================================================
    /// Request body delivered to the application.
    #[serde(rename = "http.request")]
    HttpRequest {
        /// Body bytes.
        #[serde(default)]
        body: Vec<u8>,
        /// More request chunks follow.
        #[serde(default)]
        more_body: bool,
    },

    /// Response status and headers.
    #[serde(rename = "http.response.start")]
    HttpResponseStart {
        /// HTTP status code.
        status: u16,
        /// Response headers.
        #[serde(default)]
        headers: Vec<Header>,
    },

    /// Response body chunk.
    #[serde(rename = "http.response.body")]
    HttpResponseBody {
        /// Chunk bytes.
        #[serde(default)]
        body: Vec<u8>,
        /// More response chunks follow.
        #[serde(default)]
        more_body: bool,
    },

    /// The request has no further input.
    #[serde(rename = "http.disconnect")]
    HttpDisconnect,

    // ========================================================================
    // WebSocket
    // ========================================================================
    /// Client is opening a connection.
    #[serde(rename = "websocket.connect")]
    WebSocketConnect,

    /// Application accepts the connection.
    #[serde(rename = "websocket.accept")]
    WebSocketAccept {
        /// Negotiated subprotocol.
        #[serde(default)]
        subprotocol: Option<String>,
        /// Extra handshake headers.
        #[serde(default)]
        headers: Vec<Header>,
        /// Groups the connection joins on accept.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        groups: Option<Vec<String>>,
    },

    /// Data frame from the client.
    #[serde(rename = "websocket.receive")]
    WebSocketReceive {
        /// Text content.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        /// Binary content.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bytes: Option<Vec<u8>>,
    },

    /// Data frame to the client, or to a whole group.
    #[serde(rename = "websocket.send")]
    WebSocketSend {
        /// Text content.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        /// Binary content.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bytes: Option<Vec<u8>>,
        /// Broadcast to every member of this group instead.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        group: Option<String>,
    },

    /// Client went away.
    #[serde(rename = "websocket.disconnect")]
    WebSocketDisconnect {
        /// Close code.
        #[serde(default = "default_disconnect_code")]
        code: u16,
    },

    /// Application closes the connection.
    #[serde(rename = "websocket.close")]
    WebSocketClose {
        /// Close code.
        #[serde(default = "default_close_code")]
        code: u16,
        /// Close reason.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    // ========================================================================
    // Lifespan
    // ========================================================================
    /// Process is starting.
    #[serde(rename = "lifespan.startup")]
    LifespanStartup,

    /// Application finished startup.
    #[serde(rename = "lifespan.startup.complete")]
    LifespanStartupComplete,

    /// Application could not start.
    #[serde(rename = "lifespan.startup.failed")]
    LifespanStartupFailed {
        /// Failure description.
        #[serde(default)]
        message: String,
    },

    /// Process is shutting down.
    #[serde(rename = "lifespan.shutdown")]
    LifespanShutdown,

    /// Application finished shutdown.
    #[serde(rename = "lifespan.shutdown.complete")]
    LifespanShutdownComplete,

    /// Application shutdown failed.
    #[serde(rename = "lifespan.shutdown.failed")]
    LifespanShutdownFailed {
        /// Failure description.
        #[serde(default)]
        message: String,
    },
}

fn default_disconnect_code() -> u16 {
    CLOSE_NO_STATUS
}

fn default_close_code() -> u16 {
    CLOSE_NORMAL
}

// ============================================================================
// Message - Constructors
// ============================================================================

impl Message {
    /// Creates a `http.response.start` message.
    #[inline]
    #[must_use]
    pub fn response_start(status: u16, headers: Vec<Header>) -> Self {
        Self::HttpResponseStart { status, headers }
    }

    /// Creates a final `http.response.body` message.
    #[inline]
    #[must_use]
    pub fn response_body(body: impl Into<Vec<u8>>) -> Self {
        Self::HttpResponseBody {
            body: body.into(),
            more_body: false,
        }
    }

    /// Creates a `http.response.body` message that announces more chunks.
    #[inline]
    #[must_use]
    pub fn response_chunk(body: impl Into<Vec<u8>>) -> Self {
        Self::HttpResponseBody {
            body: body.into(),
            more_body: true,
        }
    }

    /// Creates a plain `websocket.accept` message.
    #[inline]
    #[must_use]
    pub fn accept() -> Self {
        Self::WebSocketAccept {
            subprotocol: None,
            headers: Vec::new(),
            groups: None,
        }
    }

    /// Creates a `websocket.accept` message that joins `groups`.
    #[must_use]
    pub fn accept_into<I, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::WebSocketAccept {
            subprotocol: None,
            headers: Vec::new(),
            groups: Some(groups.into_iter().map(Into::into).collect()),
        }
    }

    /// Creates a text `websocket.send` to the originating connection.
    #[inline]
    #[must_use]
    pub fn send_text(text: impl Into<String>) -> Self {
        Self::WebSocketSend {
            text: Some(text.into()),
            bytes: None,
            group: None,
        }
    }

    /// Creates a binary `websocket.send` to the originating connection.
    #[inline]
    #[must_use]
    pub fn send_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::WebSocketSend {
            text: None,
            bytes: Some(bytes.into()),
            group: None,
        }
    }

    /// Creates a text `websocket.send` broadcast to `group`.
    #[inline]
    #[must_use]
    pub fn send_group(group: impl Into<String>, text: impl Into<String>) -> Self {
        Self::WebSocketSend {
            text: Some(text.into()),
            bytes: None,
            group: Some(group.into()),
        }
    }

    /// Creates a `websocket.close` message.
    #[inline]
    #[must_use]
    pub fn close(code: u16) -> Self {
        Self::WebSocketClose { code, reason: None }
    }
}

// ============================================================================
// Message - Accessors
// ============================================================================

impl Message {
    /// Returns the `type` tag of this message.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::HttpRequest { .. } => "http.request",
            Self::HttpResponseStart { .. } => "http.response.start",
            Self::HttpResponseBody { .. } => "http.response.body",
            Self::HttpDisconnect => "http.disconnect",
            Self::WebSocketConnect => "websocket.connect",
            Self::WebSocketAccept { .. } => "websocket.accept",
            Self::WebSocketReceive { .. } => "websocket.receive",
            Self::WebSocketSend { .. } => "websocket.send",
            Self::WebSocketDisconnect { .. } => "websocket.disconnect",
            Self::WebSocketClose { .. } => "websocket.close",
            Self::LifespanStartup => "lifespan.startup",
            Self::LifespanStartupComplete => "lifespan.startup.complete",
            Self::LifespanStartupFailed { .. } => "lifespan.startup.failed",
            Self::LifespanShutdown => "lifespan.shutdown",
            Self::LifespanShutdownComplete => "lifespan.shutdown.complete",
            Self::LifespanShutdownFailed { .. } => "lifespan.shutdown.failed",
        }
    }

    /// Returns `true` for messages that belong to the lifespan scope.
    #[inline]
    #[must_use]
    pub fn is_lifespan(&self) -> bool {
        self.kind().starts_with("lifespan.")
    }
}

// ============================================================================
// Tests
// ============================================================================
