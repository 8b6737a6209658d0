//! Protocol execution cycles.
//!
//! A cycle drives one application call for one invocation: it feeds the
//! seed message through the receive side, validates every message the
//! application sends against the scope's ordering rules, and turns the
//! result into the invocation's single outbound event.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `http` | Request/response accumulation |
//! | `lifespan` | Once-per-process startup/shutdown |
//! | `runner` | Application task and strict-alternation loop |
//! | `websocket` | Connect/message/disconnect with registry and pushes |

// ============================================================================
// Submodules
// ============================================================================

/// HTTP cycle.
pub mod http;

/// Lifespan driver.
pub mod lifespan;

/// Shared application runner.
pub(crate) mod runner;

/// WebSocket cycle.
pub mod websocket;

// ============================================================================
// Re-exports
// ============================================================================

pub use http::{HttpCycle, HttpResponse};
pub use lifespan::{Lifespan, LifespanState};
pub use websocket::WebSocketCycle;
