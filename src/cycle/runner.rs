//! Application task and message loop shared by all cycles.
//!
//! The application runs on its own tokio task. The cycle owns the other end
//! of the send channel and handles one message at a time, acknowledging
//! each before the application may emit the next.
//!
//! ```text
//! ┌─────────────┐  Outgoing { message, ack }  ┌──────────────────┐
//! │ Application │ ───────────────────────────►│ run_cycle loop   │
//! │   (task)    │ ◄─────────────────────────── │  handler.on_*()  │
//! └─────────────┘        Ok | Rejected        └──────────────────┘
//! ```
//!
//! The task is aborted when its [`AppTask`] is dropped, so an early cycle
//! failure never leaves the application running.

// ============================================================================
// Imports
// ============================================================================

use std::any::Any;

use async_trait::async_trait;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::protocol::app::Outgoing;
use crate::protocol::{AppReceiver, AppSender, BoxError, BoxedApp, Message, Scope};

// ============================================================================
// CycleHandler
// ============================================================================

/// Per-cycle reaction to application messages.
#[async_trait]
pub(crate) trait CycleHandler: Send {
    /// Handles one message; an error rejects it and ends the cycle.
    async fn on_message(&mut self, message: Message) -> Result<()>;
}

// ============================================================================
// AppTask
// ============================================================================

/// A spawned application call, aborted on drop.
pub(crate) struct AppTask {
    /// `None` once the task has been joined.
    handle: Option<JoinHandle<std::result::Result<(), BoxError>>>,
}

impl AppTask {
    /// Spawns `app` for `scope`.
    pub(crate) fn spawn(app: &BoxedApp, scope: Scope, receive: AppReceiver, send: AppSender) -> Self {
        let app = BoxedApp::clone(app);
        let handle = tokio::spawn(async move { app.call(scope, receive, send).await });
        Self {
            handle: Some(handle),
        }
    }

    /// Waits for the application to return.
    ///
    /// Cancel safe. Returns `Ok(())` if the task was already joined.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Application`] if the application failed or panicked.
    pub(crate) async fn join(&mut self) -> Result<()> {
        let Some(handle) = self.handle.as_mut() else {
            return Ok(());
        };

        let joined = handle.await;
        self.handle = None;

        match joined {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(Error::application(e.to_string())),
            Err(e) => Err(join_error(e)),
        }
    }
}

impl Drop for AppTask {
    fn drop(&mut self) {
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }
}

// ============================================================================
// run_cycle
// ============================================================================

/// Runs `app` to completion, feeding every message it sends to `handler`.
///
/// # Errors
///
/// Returns the handler's error for the first rejected message, or
/// [`Error::Application`] if the application failed.
pub(crate) async fn run_cycle<H>(
    app: &BoxedApp,
    scope: Scope,
    receive: AppReceiver,
    handler: &mut H,
) -> Result<()>
where
    H: CycleHandler,
{
    let (send, mut outgoing) = AppSender::channel();
    let mut task = AppTask::spawn(app, scope, receive, send);

    loop {
        tokio::select! {
            biased;

            next = outgoing.recv() => {
                match next {
                    Some(Outgoing { message, ack }) => {
                        let kind = message.kind();
                        trace!(kind, "Cycle handling message");

                        if let Err(e) = handler.on_message(message).await {
                            debug!(kind, error = %e, "Cycle rejected message");
                            let _ = ack.send(Err(Error::rejected(&e)));
                            return Err(e);
                        }

                        let _ = ack.send(Ok(()));
                    }

                    // Every sender is gone; the application is returning.
                    None => return task.join().await,
                }
            }

            joined = task.join() => return joined,
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Maps a task failure to an application error.
fn join_error(err: JoinError) -> Error {
    if err.is_panic() {
        let message = panic_message(err.into_panic());
        Error::application(format!("application panicked: {message}"))
    } else {
        Error::application("application task was cancelled")
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================
