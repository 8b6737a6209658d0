//! Continuous-protocol message types.
//!
//! This module defines what flows between a cycle and the application it
//! drives.
//!
//! # Message Classes
//!
//! | Class | Inbound (bridge → app) | Outbound (app → bridge) |
//! |-------|------------------------|-------------------------|
//! | HTTP | `http.request`, `http.disconnect` | `http.response.start`, `http.response.body` |
//! | WebSocket | `websocket.connect`, `websocket.receive`, `websocket.disconnect` | `websocket.accept`, `websocket.send`, `websocket.close` |
//! | Lifespan | `lifespan.startup`, `lifespan.shutdown` | `lifespan.*.complete`, `lifespan.*.failed` |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `app` | Application trait and its receive/send handles |
//! | `message` | Tagged message enum and payload types |
//! | `scope` | Per-connection scope metadata |

// ============================================================================
// Submodules
// ============================================================================

/// Application trait and channel handles.
pub mod app;

/// Protocol message definitions.
pub mod message;

/// Connection scope metadata.
pub mod scope;

// ============================================================================
// Re-exports
// ============================================================================

pub use app::{AppFn, AppReceiver, AppSender, Application, BoxError, BoxedApp, app_fn};
pub use message::{CLOSE_NO_STATUS, CLOSE_NORMAL, Header, Message, Payload};
pub use scope::{Scope, ScopeKind};
