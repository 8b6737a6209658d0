//! Adapter entry point.
//!
//! This module provides the object a host calls once per invocation.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Adapter`] | Handles inbound events, owns lifespan state |
//! | [`AdapterBuilder`] | Fluent configuration builder |
//! | [`AdapterOptions`] | Behavior switches, optionally from the environment |
//!
//! # Example
//!
//! ```no_run
//! use lambda_bridge::protocol::{BoxError, Message, app_fn};
//! use lambda_bridge::{Adapter, Result};
//!
//! # async fn example(event: serde_json::Value) -> Result<()> {
//! let adapter = Adapter::builder()
//!     .app(app_fn(|_scope, _receive, send| async move {
//!         send.send(Message::response_start(204, Vec::new())).await?;
//!         send.send(Message::response_body(Vec::new())).await?;
//!         Ok::<(), BoxError>(())
//!     }))
//!     .lifespan(true)
//!     .build()?;
//!
//! let response = adapter.handle(event).await?;
//! adapter.shutdown().await;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for adapter configuration.
pub mod builder;

/// Core adapter implementation.
pub mod core;

/// Adapter options.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::AdapterBuilder;
pub use self::core::Adapter;
pub use options::AdapterOptions;
