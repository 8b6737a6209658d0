//! WebSocket lifecycle cycle.
//!
//! One invocation covers one lifecycle event of a connection. Whether a
//! connection was accepted in an earlier invocation is read back from the
//! registry, since nothing else survives between invocations.
//!
//! # States
//!
//! ```text
//! connect:            AwaitAccept ──accept──► Accepted ──close──► Closed
//!                          └────────close─────────────────────────►┘
//! message/disconnect: Accepted (row present) | NotAccepted (row absent)
//! ```
//!
//! # Ordering
//!
//! | Message | AwaitAccept | Accepted | NotAccepted | Closed |
//! |---------|-------------|----------|-------------|--------|
//! | `websocket.accept` | register | violation | violation | violation |
//! | `websocket.send` | violation | push | violation | violation |
//! | `websocket.close` | close | close | close | violation |

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::event::{ProxyResponse, WebSocketEventKind};
use crate::identifiers::ConnectionId;
use crate::protocol::{AppReceiver, BoxedApp, CLOSE_NO_STATUS, Message, Payload, Scope};
use crate::registry::{Connection, ConnectionRegistry, ConnectionUpdate};
use crate::transport::{Endpoint, PushOutcome, Pusher};

use super::runner::{CycleHandler, run_cycle};

// ============================================================================
// WebSocketState
// ============================================================================

/// Acceptance state of the connection within this invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WebSocketState {
    /// Connect event, waiting for accept or close.
    AwaitAccept,
    /// Connection is registered.
    Accepted,
    /// Connection is not registered and cannot be accepted here.
    NotAccepted,
    /// The application closed the connection.
    Closed,
}

// ============================================================================
// WebSocketCycle
// ============================================================================

/// Drives one WebSocket lifecycle event.
pub struct WebSocketCycle {
    connection_id: ConnectionId,
    kind: WebSocketEventKind,
    endpoint: Option<Endpoint>,
    registry: Arc<dyn ConnectionRegistry>,
    pusher: Arc<dyn Pusher>,

    state: WebSocketState,
    /// Registry row as last read or written by this cycle.
    connection: Option<Connection>,
    /// First best-effort failure during a broadcast.
    fault: Option<Error>,
}

impl WebSocketCycle {
    /// Creates a cycle for one event of `connection_id`.
    #[must_use]
    pub fn new(
        connection_id: ConnectionId,
        kind: WebSocketEventKind,
        endpoint: Option<Endpoint>,
        registry: Arc<dyn ConnectionRegistry>,
        pusher: Arc<dyn Pusher>,
    ) -> Self {
        Self {
            connection_id,
            kind,
            endpoint,
            registry,
            pusher,
            state: WebSocketState::AwaitAccept,
            connection: None,
            fault: None,
        }
    }

    /// Runs `app` against `scope`, delivering `seed` first.
    ///
    /// # Errors
    ///
    /// - [`Error::ProtocolViolation`] if the application breaks the ordering
    ///   rules
    /// - [`Error::Application`] if the application fails
    /// - [`Error::RegistryUnavailable`] if the registry fails, including
    ///   during a broadcast that otherwise completed
    /// - [`Error::Push`] if a direct push fails transiently
    pub async fn run(mut self, app: &BoxedApp, scope: Scope, seed: Message) -> Result<ProxyResponse> {
        self.restore().await?;

        debug!(
            connection_id = %self.connection_id,
            kind = %self.kind,
            state = ?self.state,
            "WebSocket cycle started"
        );

        let receive = AppReceiver::preloaded(
            vec![seed],
            Message::WebSocketDisconnect {
                code: CLOSE_NO_STATUS,
            },
        );
        let outcome = run_cycle(app, scope, receive, &mut self).await;

        if self.kind == WebSocketEventKind::Disconnect {
            let removed = self.registry.delete(&self.connection_id).await;
            outcome?;
            removed?;
            debug!(connection_id = %self.connection_id, "Connection deregistered");
        } else {
            outcome?;
        }

        if self.state == WebSocketState::AwaitAccept {
            return Err(Error::protocol_violation(
                "application returned without websocket.accept or websocket.close",
            ));
        }

        if let Some(fault) = self.fault.take() {
            return Err(fault);
        }

        Ok(ProxyResponse::websocket_ack())
    }

    /// Reconstructs the acceptance state from the registry.
    async fn restore(&mut self) -> Result<()> {
        if self.kind == WebSocketEventKind::Connect {
            self.state = WebSocketState::AwaitAccept;
            return Ok(());
        }

        self.connection = self.registry.get(&self.connection_id).await?;
        self.state = if self.connection.is_some() {
            WebSocketState::Accepted
        } else {
            WebSocketState::NotAccepted
        };

        Ok(())
    }
}

// ============================================================================
// WebSocketCycle - Message Handling
// ============================================================================

#[async_trait]
impl CycleHandler for WebSocketCycle {
    async fn on_message(&mut self, message: Message) -> Result<()> {
        match message {
            Message::WebSocketAccept {
                subprotocol,
                groups,
                ..
            } => self.accept(subprotocol, groups).await,
            Message::WebSocketSend { text, bytes, group } => {
                self.check_can_send()?;
                let payload = Payload::from_parts(text, bytes)?;
                match group {
                    Some(group) => self.broadcast(&group, &payload).await,
                    None => self.push_own(&payload).await,
                }
            }
            Message::WebSocketClose { code, .. } => self.close(code),
            other => Err(Error::protocol_violation(format!(
                "unexpected {} in websocket scope",
                other.kind()
            ))),
        }
    }
}

impl WebSocketCycle {
    /// Registers the connection on connect.
    async fn accept(&mut self, subprotocol: Option<String>, groups: Option<Vec<String>>) -> Result<()> {
        match self.state {
            WebSocketState::AwaitAccept => {}
            WebSocketState::Closed => {
                return Err(Error::protocol_violation(
                    "websocket.accept sent after websocket.close",
                ));
            }
            WebSocketState::Accepted | WebSocketState::NotAccepted => {
                return Err(Error::protocol_violation(format!(
                    "websocket.accept is only valid on connect, not on {}",
                    self.kind
                )));
            }
        }

        let update = ConnectionUpdate::new()
            .groups(groups.unwrap_or_default())
            .endpoint(self.endpoint.clone());
        let connection = update.clone().into_connection(self.connection_id.clone());

        self.registry.upsert(&self.connection_id, update).await?;

        debug!(
            connection_id = %self.connection_id,
            groups = connection.groups.len(),
            subprotocol = subprotocol.as_deref().unwrap_or(""),
            "Connection accepted"
        );

        self.connection = Some(connection);
        self.state = WebSocketState::Accepted;
        Ok(())
    }

    fn close(&mut self, code: u16) -> Result<()> {
        if self.state == WebSocketState::Closed {
            return Err(Error::protocol_violation("websocket.close sent twice"));
        }

        debug!(connection_id = %self.connection_id, code, "Connection closed by application");
        self.state = WebSocketState::Closed;
        Ok(())
    }

    fn check_can_send(&self) -> Result<()> {
        match self.state {
            WebSocketState::Accepted => Ok(()),
            WebSocketState::AwaitAccept => Err(Error::protocol_violation(
                "websocket.send before websocket.accept",
            )),
            WebSocketState::NotAccepted => Err(Error::protocol_violation(format!(
                "websocket.send on connection {} that was never accepted",
                self.connection_id
            ))),
            WebSocketState::Closed => Err(Error::protocol_violation(
                "websocket.send after websocket.close",
            )),
        }
    }

    /// Returns the push target for the originating connection.
    fn own_target(&self) -> Connection {
        let mut target = self
            .connection
            .clone()
            .unwrap_or_else(|| Connection::new(self.connection_id.clone()));

        if self.endpoint.is_some() {
            target.endpoint = self.endpoint.clone();
        }
        target
    }

    /// Pushes to the originating connection.
    async fn push_own(&mut self, payload: &Payload) -> Result<()> {
        let target = self.own_target();

        match self.pusher.push(&target, payload).await? {
            PushOutcome::Delivered => {
                trace!(connection_id = %self.connection_id, bytes = payload.len(), "Pushed");
            }
            PushOutcome::Gone => {
                warn!(connection_id = %self.connection_id, "Connection gone, pruning");
                self.registry.delete(&self.connection_id).await?;
                self.connection = None;
            }
        }

        Ok(())
    }

    /// Pushes to every current member of `group`.
    ///
    /// The sender joins `group` first. Gone members are pruned; other
    /// failures are recorded and reported when the cycle ends.
    async fn broadcast(&mut self, group: &str, payload: &Payload) -> Result<()> {
        self.registry.add_group(&self.connection_id, group).await?;
        if let Some(connection) = self.connection.as_mut() {
            connection.groups.insert(group.to_string());
        }

        let members = self.registry.scan_by_group(group).await?;
        let mut delivered = 0usize;
        let mut pruned = 0usize;

        for member in &members {
            match self.pusher.push(member, payload).await {
                Ok(PushOutcome::Delivered) => delivered += 1,
                Ok(PushOutcome::Gone) => {
                    warn!(connection_id = %member.connection_id, group, "Group member gone, pruning");
                    if let Err(e) = self.registry.delete(&member.connection_id).await {
                        self.record_fault(e);
                    } else {
                        pruned += 1;
                    }
                }
                Err(e) => {
                    warn!(connection_id = %member.connection_id, group, error = %e, "Group push failed");
                    self.record_fault(e);
                }
            }
        }

        debug!(group, members = members.len(), delivered, pruned, "Group broadcast complete");
        Ok(())
    }

    fn record_fault(&mut self, err: Error) {
        if self.fault.is_none() {
            self.fault = Some(err);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
