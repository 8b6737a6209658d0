//! Outbound push boundary.
//!
//! Delivering bytes to an already-open WebSocket client happens out of
//! process, through whatever management API the gateway offers. The bridge
//! only needs to know whether a push landed or the target is gone.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;

use crate::error::Result;
use crate::protocol::Payload;
use crate::registry::Connection;

// ============================================================================
// PushOutcome
// ============================================================================

/// Result of a single push attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The gateway accepted the payload for delivery.
    Delivered,
    /// The connection no longer exists.
    Gone,
}

impl PushOutcome {
    /// Returns `true` if the target connection is gone.
    #[inline]
    #[must_use]
    pub fn is_gone(&self) -> bool {
        matches!(self, Self::Gone)
    }
}

// ============================================================================
// Pusher
// ============================================================================

/// Delivers payloads to open WebSocket connections.
///
/// Implementations report a vanished connection as `Ok(PushOutcome::Gone)`
/// and reserve `Err` (typically [`Error::Push`](crate::Error::Push)) for
/// transient failures where the connection may still exist.
///
/// # Example
///
/// A pusher posting to the gateway's management API, with the HTTP client
/// left abstract:
///
/// ```no_run
/// use async_trait::async_trait;
/// use lambda_bridge::{Connection, Error, Payload, PushOutcome, Pusher, Result};
///
/// # async fn post(_url: &str, _body: &[u8]) -> std::result::Result<u16, String> { Ok(200) }
/// struct ManagementApiPusher;
///
/// #[async_trait]
/// impl Pusher for ManagementApiPusher {
///     async fn push(&self, target: &Connection, payload: &Payload) -> Result<PushOutcome> {
///         let endpoint = target.endpoint.as_ref().ok_or_else(|| {
///             Error::push(target.connection_id.clone(), "connection has no endpoint")
///         })?;
///         let url = endpoint.connection_url(&target.connection_id)?;
///
///         match post(url.as_str(), payload.as_bytes()).await {
///             Ok(410) => Ok(PushOutcome::Gone),
///             Ok(status) if status < 300 => Ok(PushOutcome::Delivered),
///             Ok(status) => Err(Error::push(target.connection_id.clone(), format!("status {status}"))),
///             Err(e) => Err(Error::push(target.connection_id.clone(), e)),
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Pusher: Send + Sync {
    /// Pushes `payload` to `target`.
    async fn push(&self, target: &Connection, payload: &Payload) -> Result<PushOutcome>;
}

// ============================================================================
// Tests
// ============================================================================
