//! Application boundary.
//!
//! An [`Application`] is called once per scope with an [`AppReceiver`] and an
//! [`AppSender`]. The receiver yields the seed message(s) of the invocation
//! and then a fixed "no more input" message forever; every
//! [`AppSender::send`] suspends until the driving cycle has processed the
//! message, so the application and the cycle strictly alternate.
//!
//! # Example
//!
//! ```ignore
//! use lambda_bridge::protocol::{app_fn, Message};
//!
//! let app = app_fn(|_scope, mut receive, send| async move {
//!     let _request = receive.recv().await;
//!     send.send(Message::response_start(200, Vec::new())).await?;
//!     send.send(Message::response_body(b"ok".to_vec())).await?;
//!     Ok(())
//! });
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::trace;

use crate::error::{Error, Result};

use super::message::Message;
use super::scope::Scope;

// ============================================================================
// Constants
// ============================================================================

/// Capacity of the application-to-cycle channel.
///
/// One slot: the application cannot run ahead of the cycle.
const OUTGOING_CAPACITY: usize = 1;

// ============================================================================
// Types
// ============================================================================

/// Error type returned by applications.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Shared handle to an application.
pub type BoxedApp = Arc<dyn Application>;

// ============================================================================
// Application
// ============================================================================

/// A component written against the continuous protocol abstraction.
#[async_trait]
pub trait Application: Send + Sync + 'static {
    /// Handles one scope until the application has nothing more to send.
    async fn call(
        &self,
        scope: Scope,
        receive: AppReceiver,
        send: AppSender,
    ) -> std::result::Result<(), BoxError>;
}

// ============================================================================
// AppFn
// ============================================================================

/// Adapts an async closure into an [`Application`].
pub struct AppFn<F>(F);

/// Wraps an async closure as an [`Application`].
#[inline]
#[must_use]
pub fn app_fn<F, Fut>(f: F) -> AppFn<F>
where
    F: Fn(Scope, AppReceiver, AppSender) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<(), BoxError>> + Send + 'static,
{
    AppFn(f)
}

#[async_trait]
impl<F, Fut> Application for AppFn<F>
where
    F: Fn(Scope, AppReceiver, AppSender) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<(), BoxError>> + Send + 'static,
{
    async fn call(
        &self,
        scope: Scope,
        receive: AppReceiver,
        send: AppSender,
    ) -> std::result::Result<(), BoxError> {
        (self.0)(scope, receive, send).await
    }
}

impl<F> fmt::Debug for AppFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppFn").finish_non_exhaustive()
    }
}

// ============================================================================
// AppReceiver
// ============================================================================

/// Receive side handed to the application.
pub struct AppReceiver {
    /// Queued input messages.
    rx: mpsc::Receiver<Message>,
    /// Returned once the queue is closed and drained.
    exhausted: Message,
}

impl AppReceiver {
    /// Creates a receiver over `rx` that yields `exhausted` after the input.
    pub(crate) fn new(rx: mpsc::Receiver<Message>, exhausted: Message) -> Self {
        Self { rx, exhausted }
    }

    /// Creates a receiver pre-loaded with `inputs` and no further input.
    pub(crate) fn preloaded(inputs: Vec<Message>, exhausted: Message) -> Self {
        let (tx, rx) = mpsc::channel(inputs.len().max(1));
        for message in inputs {
            // Capacity covers every input, so this never fails.
            let _ = tx.try_send(message);
        }
        Self::new(rx, exhausted)
    }

    /// Waits for the next input message.
    ///
    /// Once the input is exhausted this returns the terminal message
    /// (`http.disconnect`, `websocket.disconnect`, `lifespan.shutdown`)
    /// on every call.
    pub async fn recv(&mut self) -> Message {
        match self.rx.recv().await {
            Some(message) => {
                trace!(kind = message.kind(), "Application received message");
                message
            }
            None => self.exhausted.clone(),
        }
    }
}

impl fmt::Debug for AppReceiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppReceiver")
            .field("exhausted", &self.exhausted.kind())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// AppSender
// ============================================================================

/// A message from the application awaiting the cycle's verdict.
pub(crate) struct Outgoing {
    /// The message itself.
    pub message: Message,
    /// Completed once the cycle has handled the message.
    pub ack: oneshot::Sender<Result<()>>,
}

/// Send side handed to the application.
#[derive(Clone)]
pub struct AppSender {
    tx: mpsc::Sender<Outgoing>,
}

impl AppSender {
    /// Creates a connected sender and the cycle's end of the channel.
    pub(crate) fn channel() -> (Self, mpsc::Receiver<Outgoing>) {
        let (tx, rx) = mpsc::channel(OUTGOING_CAPACITY);
        (Self { tx }, rx)
    }

    /// Sends a message and waits until the cycle has processed it.
    ///
    /// # Errors
    ///
    /// - [`Error::Rejected`] if the cycle refused the message
    /// - [`Error::ChannelClosed`] if the cycle has already finished
    pub async fn send(&self, message: Message) -> Result<()> {
        let (ack, ack_rx) = oneshot::channel();

        self.tx
            .send(Outgoing { message, ack })
            .await
            .map_err(|_| Error::ChannelClosed)?;

        ack_rx.await.map_err(|_| Error::ChannelClosed)?
    }
}

impl fmt::Debug for AppSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppSender")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
