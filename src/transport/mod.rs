//! Outbound transport boundary.
//!
//! The bridge never holds a socket. Frames for WebSocket clients leave the
//! process through a [`Pusher`], addressed by the [`Endpoint`] the connection
//! was established on.
//!
//! ```text
//! ┌──────────────────┐   push(connection, payload)   ┌──────────────────┐
//! │  WebSocketCycle  │ ─────────────────────────────►│  Pusher impl     │
//! │                  │ ◄───────────────────────────── │  (gateway API)   │
//! └──────────────────┘      Delivered | Gone | Err   └──────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `endpoint` | Push endpoint addressing |
//! | `push` | Pusher trait and outcomes |

// ============================================================================
// Submodules
// ============================================================================

/// Push endpoint addressing.
pub mod endpoint;

/// Pusher trait and outcomes.
pub mod push;

// ============================================================================
// Re-exports
// ============================================================================

pub use endpoint::Endpoint;
pub use push::{PushOutcome, Pusher};
