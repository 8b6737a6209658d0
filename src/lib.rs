//! lambda-bridge - Continuous-protocol applications on one-shot invocations.
//!
//! This library runs applications written against a long-lived
//! request/response and send/receive protocol inside a function-invocation
//! host that delivers one proxy event per execution and keeps no process
//! alive in between.
//!
//! # Architecture
//!
//! ```text
//! inbound event ──► translate ──► seed message ──► cycle ──► outbound event
//!                                                   │
//!                                   ┌───────────────┼────────────────┐
//!                                   ▼               ▼                ▼
//!                              Application   ConnectionRegistry    Pusher
//! ```
//!
//! Key design principles:
//!
//! - One application task per invocation, strictly alternating with the cycle
//! - The connection registry is the only state shared between invocations
//! - Registry presence is what marks a WebSocket connection as accepted
//! - A push reporting "gone" prunes the connection; nothing else does
//!
//! # Quick Start
//!
//! ```no_run
//! use lambda_bridge::protocol::{BoxError, Message, app_fn};
//! use lambda_bridge::{Adapter, Result};
//!
//! # async fn example(event: serde_json::Value) -> Result<()> {
//! let adapter = Adapter::builder()
//!     .app(app_fn(|scope, mut receive, send| async move {
//!         let _request = receive.recv().await;
//!         send.send(Message::response_start(200, Vec::new())).await?;
//!         send.send(Message::response_body(scope.path.into_bytes())).await?;
//!         Ok::<(), BoxError>(())
//!     }))
//!     .build()?;
//!
//! let response = adapter.handle(event).await?;
//! println!("{}", serde_json::to_string(&response)?);
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapter`] | Entry point, builder and options |
//! | [`cycle`] | HTTP, WebSocket and lifespan state machines |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`event`] | Inbound events, translation, outbound response |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Messages, scopes and the application boundary |
//! | [`registry`] | Connection registry trait and stores |
//! | [`transport`] | Push boundary and endpoints |

// ============================================================================
// Modules
// ============================================================================

/// Adapter entry point and configuration.
///
/// Use [`Adapter::builder()`] to create a configured adapter.
pub mod adapter;

/// Per-invocation protocol cycles.
pub mod cycle;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Inbound and outbound invocation events.
pub mod event;

/// Type-safe identifiers.
pub mod identifiers;

/// Continuous-protocol messages and the application boundary.
pub mod protocol;

/// Connection registry.
///
/// The external store that remembers open WebSocket connections and their
/// groups across invocations.
pub mod registry;

/// Outbound push boundary.
pub mod transport;

/// Test doubles and fixtures.
#[cfg(test)]
pub(crate) mod testing;

#[cfg(test)]
mod properties;

// ============================================================================
// Re-exports
// ============================================================================

// Adapter types
pub use adapter::{Adapter, AdapterBuilder, AdapterOptions};

// Cycle types
pub use cycle::{HttpCycle, HttpResponse, Lifespan, LifespanState, WebSocketCycle};

// Error types
pub use error::{Error, Result};

// Event types
pub use event::{
    EventKind, HttpEvent, ProxyEvent, ProxyResponse, Translated, WebSocketEvent,
    WebSocketEventKind, translate,
};

// Identifier types
pub use identifiers::{ConnectionId, InvocationId};

// Protocol types
pub use protocol::{
    AppReceiver, AppSender, Application, BoxError, BoxedApp, Header, Message, Payload, Scope,
    ScopeKind, app_fn,
};

// Registry types
pub use registry::{Connection, ConnectionRegistry, ConnectionUpdate, FileRegistry, MemoryRegistry};

// Transport types
pub use transport::{Endpoint, PushOutcome, Pusher};
