//! Inbound and outbound invocation events.
//!
//! An invocation receives one proxy event and returns one proxy response.
//! This module parses the former, translates it into protocol terms, and
//! shapes the latter.
//!
//! ```text
//! JSON ──► ProxyEvent ──translate──► Translated { scope, seed, kind }
//!                                          │
//!                                        cycle
//!                                          │
//! JSON ◄── ProxyResponse ◄─────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `request` | Inbound HTTP and WebSocket event shapes |
//! | `response` | Outbound response shape and body encoding |
//! | `translate` | Event to scope/seed translation |

// ============================================================================
// Submodules
// ============================================================================

/// Inbound event shapes.
pub mod request;

/// Outbound response.
pub mod response;

/// Event translation.
pub mod translate;

// ============================================================================
// Re-exports
// ============================================================================

pub use request::{HttpEvent, ProxyEvent, WebSocketEvent};
pub use response::ProxyResponse;
pub use translate::{EventKind, Translated, WebSocketEventKind, translate};
