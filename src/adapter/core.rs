//! Invocation entry point.
//!
//! The [`Adapter`] owns the application and the per-process collaborators
//! and turns each inbound event into one outbound response.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use lambda_bridge::protocol::{BoxError, Message, app_fn};
//! use lambda_bridge::Adapter;
//!
//! # async fn example(event: serde_json::Value) -> lambda_bridge::Result<()> {
//! let adapter = Adapter::builder()
//!     .app(app_fn(|_scope, _receive, send| async move {
//!         send.send(Message::response_start(200, Vec::new())).await?;
//!         send.send(Message::response_body(b"hello".to_vec())).await?;
//!         Ok::<(), BoxError>(())
//!     }))
//!     .build()?;
//!
//! let response = adapter.handle(event).await?;
//! assert_eq!(response.status_code, 200);
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{Instrument, debug, info_span, warn};

use crate::cycle::{HttpCycle, Lifespan, LifespanState, WebSocketCycle};
use crate::error::{Error, Result};
use crate::event::{EventKind, ProxyEvent, ProxyResponse, Translated, translate};
use crate::identifiers::InvocationId;
use crate::protocol::BoxedApp;
use crate::registry::ConnectionRegistry;
use crate::transport::Pusher;

use super::builder::AdapterBuilder;
use super::options::AdapterOptions;

// ============================================================================
// Types
// ============================================================================

/// Collaborators needed by WebSocket cycles.
#[derive(Clone)]
pub(crate) struct WebSocketBackend {
    /// Connection store.
    pub registry: Arc<dyn ConnectionRegistry>,
    /// Outbound push mechanism.
    pub pusher: Arc<dyn Pusher>,
}

/// Internal shared state for the adapter.
pub(crate) struct AdapterInner {
    /// Application under adaptation.
    pub app: BoxedApp,

    /// Behavior switches.
    pub options: AdapterOptions,

    /// Once-per-process lifespan driver.
    pub lifespan: Lifespan,

    /// Registry and pusher, if WebSocket events are served.
    pub websocket: Option<WebSocketBackend>,
}

// ============================================================================
// Adapter
// ============================================================================

/// Bridges one-shot proxy invocations to a continuous-protocol application.
///
/// Cheap to clone; clones share the lifespan state.
#[derive(Clone)]
pub struct Adapter {
    /// Shared inner state.
    pub(crate) inner: Arc<AdapterInner>,
}

// ============================================================================
// Adapter - Display
// ============================================================================

impl fmt::Debug for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapter")
            .field("options", &self.inner.options)
            .field("lifespan", &self.inner.lifespan)
            .field("websocket", &self.inner.websocket.is_some())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Adapter - Constructors
// ============================================================================

impl Adapter {
    /// Creates a configuration builder for the adapter.
    #[inline]
    #[must_use]
    pub fn builder() -> AdapterBuilder {
        AdapterBuilder::new()
    }

    /// Creates an adapter from validated parts.
    pub(crate) fn from_parts(
        app: BoxedApp,
        options: AdapterOptions,
        websocket: Option<WebSocketBackend>,
    ) -> Self {
        let lifespan = Lifespan::new(BoxedApp::clone(&app), options.enable_lifespan);

        Self {
            inner: Arc::new(AdapterInner {
                app,
                options,
                lifespan,
                websocket,
            }),
        }
    }
}

// ============================================================================
// Adapter - Public API
// ============================================================================

impl Adapter {
    /// Returns the adapter options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &AdapterOptions {
        &self.inner.options
    }

    /// Returns the lifespan outcome, if startup has run.
    #[inline]
    #[must_use]
    pub fn lifespan_state(&self) -> Option<LifespanState> {
        self.inner.lifespan.state()
    }

    /// Handles one raw inbound event.
    ///
    /// # Errors
    ///
    /// - [`Error::MalformedEvent`] if the event is not a recognized proxy
    ///   event
    /// - any error of [`handle_event`](Self::handle_event)
    pub async fn handle(&self, event: Value) -> Result<ProxyResponse> {
        let event = ProxyEvent::from_value(event)?;
        self.handle_event(event).await
    }

    /// Handles one parsed inbound event.
    ///
    /// The event is translated before the application is contacted, so a
    /// malformed event never starts lifespan or a cycle.
    ///
    /// # Errors
    ///
    /// - [`Error::MalformedEvent`] if required fields are missing
    /// - [`Error::LifespanFailed`] if lifespan startup failed, now or on an
    ///   earlier invocation
    /// - [`Error::Config`] for a WebSocket event without a registry
    /// - any error of the selected cycle
    pub async fn handle_event(&self, event: ProxyEvent) -> Result<ProxyResponse> {
        let translated = translate(
            &event,
            self.inner.options.api_gateway_base_path.as_deref(),
        )?;

        let invocation = InvocationId::generate();
        let span = info_span!("invocation", id = %invocation, kind = translated.kind.label());

        async move {
            let result = self.dispatch(translated).await;
            if let Err(e) = &result {
                warn!(error = %e, "Invocation failed");
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Runs the lifespan shutdown handshake.
    ///
    /// Intended for the host's teardown hook. Failures are logged, never
    /// returned.
    pub async fn shutdown(&self) {
        if let Err(e) = self.inner.lifespan.shutdown().await {
            warn!(error = %e, "Lifespan shutdown failed");
        }
    }
}

// ============================================================================
// Adapter - Dispatch
// ============================================================================

impl Adapter {
    async fn dispatch(&self, translated: Translated) -> Result<ProxyResponse> {
        self.inner.lifespan.startup().await?;

        let Translated { scope, seed, kind } = translated;
        let app = &self.inner.app;

        match kind {
            EventKind::Http => {
                let response = HttpCycle::new().run(app, scope, seed).await?;
                debug!(status = response.status, "HTTP response ready");
                Ok(ProxyResponse::from_http(
                    response,
                    &self.inner.options.text_mime_types,
                ))
            }
            EventKind::WebSocket {
                connection_id,
                kind,
                endpoint,
            } => {
                let backend = self.inner.websocket.as_ref().ok_or_else(|| {
                    Error::config(
                        "WebSocket event received but no connection registry is configured. \
                         Use .registry() and .pusher() on the builder.",
                    )
                })?;

                WebSocketCycle::new(
                    connection_id,
                    kind,
                    endpoint,
                    Arc::clone(&backend.registry),
                    Arc::clone(&backend.pusher),
                )
                .run(app, scope, seed)
                .await
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
