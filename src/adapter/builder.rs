//! Builder pattern for adapter configuration.
//!
//! Provides a fluent API for configuring and creating [`Adapter`] instances.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use lambda_bridge::registry::MemoryRegistry;
//! use lambda_bridge::{Adapter, AdapterOptions, BoxedApp, Pusher};
//!
//! # fn example(app: BoxedApp, pusher: Arc<dyn Pusher>) -> lambda_bridge::Result<()> {
//! let adapter = Adapter::builder()
//!     .app_arc(app)
//!     .options(AdapterOptions::from_env()?)
//!     .registry(Arc::new(MemoryRegistry::new()))
//!     .pusher(pusher)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::protocol::{Application, BoxedApp};
use crate::registry::ConnectionRegistry;
use crate::transport::Pusher;

use super::core::{Adapter, WebSocketBackend};
use super::options::AdapterOptions;

// ============================================================================
// AdapterBuilder
// ============================================================================

/// Builder for configuring an [`Adapter`] instance.
///
/// Use [`Adapter::builder()`] to create a new builder.
#[derive(Default, Clone)]
pub struct AdapterBuilder {
    /// Application under adaptation.
    app: Option<BoxedApp>,
    /// Behavior switches.
    options: AdapterOptions,
    /// Connection store for WebSocket events.
    registry: Option<Arc<dyn ConnectionRegistry>>,
    /// Push mechanism for WebSocket events.
    pusher: Option<Arc<dyn Pusher>>,
}

impl fmt::Debug for AdapterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterBuilder")
            .field("app", &self.app.is_some())
            .field("options", &self.options)
            .field("registry", &self.registry.is_some())
            .field("pusher", &self.pusher.is_some())
            .finish()
    }
}

// ============================================================================
// AdapterBuilder Implementation
// ============================================================================

impl AdapterBuilder {
    /// Creates a new builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the application.
    #[inline]
    #[must_use]
    pub fn app(self, app: impl Application) -> Self {
        self.app_arc(Arc::new(app))
    }

    /// Sets an already shared application.
    #[inline]
    #[must_use]
    pub fn app_arc(mut self, app: BoxedApp) -> Self {
        self.app = Some(app);
        self
    }

    /// Replaces all options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: AdapterOptions) -> Self {
        self.options = options;
        self
    }

    /// Enables or disables lifespan.
    #[inline]
    #[must_use]
    pub fn lifespan(mut self, enabled: bool) -> Self {
        self.options.enable_lifespan = enabled;
        self
    }

    /// Sets the connection registry used by WebSocket events.
    #[inline]
    #[must_use]
    pub fn registry(mut self, registry: Arc<dyn ConnectionRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Sets the push mechanism used by WebSocket events.
    #[inline]
    #[must_use]
    pub fn pusher(mut self, pusher: Arc<dyn Pusher>) -> Self {
        self.pusher = Some(pusher);
        self
    }

    /// Builds the adapter with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no application is set
    /// - [`Error::Config`] if only one of registry and pusher is set
    pub fn build(self) -> Result<Adapter> {
        let app = self.app.ok_or_else(|| {
            Error::config(
                "Application is required. Use .app() to set it.\n\
                 Example: Adapter::builder().app(app_fn(handler))",
            )
        })?;

        let websocket = match (self.registry, self.pusher) {
            (Some(registry), Some(pusher)) => Some(WebSocketBackend { registry, pusher }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(Error::config(
                    "A registry was set without a pusher. WebSocket events need both.",
                ));
            }
            (None, Some(_)) => {
                return Err(Error::config(
                    "A pusher was set without a registry. WebSocket events need both.",
                ));
            }
        };

        Ok(Adapter::from_parts(app, self.options, websocket))
    }
}

// ============================================================================
// Tests
// ============================================================================
