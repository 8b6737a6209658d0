//! Lifespan driver.
//!
//! Runs the application's lifespan scope once per process. Unlike the other
//! cycles, the lifespan application call stays alive between startup and
//! shutdown: it is spawned on the first invocation, parked after
//! `lifespan.startup.complete`, and woken with `lifespan.shutdown` when the
//! host tears the process down.
//!
//! ```text
//! first invocation ──► lifespan.startup ──► startup.complete ─► Started
//!                                       └─► startup.failed ───► every invocation fails
//!                                       └─► (no message) ─────► Unsupported
//! teardown ──────────► lifespan.shutdown ─► shutdown.complete
//! ```

// ============================================================================
// Imports
// ============================================================================

use parking_lot::Mutex;
use tokio::sync::{OnceCell, mpsc};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::protocol::app::Outgoing;
use crate::protocol::{AppReceiver, AppSender, BoxedApp, Message, Scope};

use super::runner::AppTask;

// ============================================================================
// LifespanState
// ============================================================================

/// Outcome of the startup handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifespanState {
    /// Lifespan is turned off; the application is never contacted.
    Disabled,
    /// The application returned without speaking the lifespan protocol.
    Unsupported,
    /// The application reported `lifespan.startup.complete`.
    Started,
}

// ============================================================================
// Session
// ============================================================================

/// The parked lifespan application call.
struct Session {
    input: mpsc::Sender<Message>,
    outgoing: mpsc::Receiver<Outgoing>,
    task: AppTask,
}

/// What the application answered while the driver waited.
enum Reply {
    /// A lifespan message, already acknowledged.
    Message(Message),
    /// The application returned.
    Finished(Result<()>),
}

impl Session {
    /// Waits for the application's next message or for it to return.
    ///
    /// Non-lifespan messages are rejected and reported as violations.
    async fn reply(&mut self) -> Result<Reply> {
        tokio::select! {
            biased;

            next = self.outgoing.recv() => match next {
                Some(Outgoing { message, ack }) if message.is_lifespan() => {
                    let _ = ack.send(Ok(()));
                    Ok(Reply::Message(message))
                }
                Some(Outgoing { message, ack }) => {
                    let err = Error::protocol_violation(format!(
                        "unexpected {} in lifespan scope",
                        message.kind()
                    ));
                    let _ = ack.send(Err(Error::rejected(&err)));
                    Err(err)
                }
                None => Ok(Reply::Finished(self.task.join().await)),
            },

            joined = self.task.join() => Ok(Reply::Finished(joined)),
        }
    }
}

// ============================================================================
// Lifespan
// ============================================================================

/// Once-per-process startup/shutdown handshake.
pub struct Lifespan {
    app: BoxedApp,
    enabled: bool,
    /// Startup outcome; the error is the failure message.
    startup: OnceCell<std::result::Result<LifespanState, String>>,
    /// Present while the application is parked after startup.
    session: Mutex<Option<Session>>,
}

impl Lifespan {
    /// Creates a driver for `app`.
    #[must_use]
    pub fn new(app: BoxedApp, enabled: bool) -> Self {
        Self {
            app,
            enabled,
            startup: OnceCell::new(),
            session: Mutex::new(None),
        }
    }

    /// Returns `true` if lifespan is enabled.
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the startup outcome, if startup has run.
    #[must_use]
    pub fn state(&self) -> Option<LifespanState> {
        self.startup.get().and_then(|outcome| outcome.as_ref().ok().copied())
    }

    /// Runs startup on the first call; later calls return the same outcome.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LifespanFailed`] if the application failed to start,
    /// on this and every later call.
    pub async fn startup(&self) -> Result<LifespanState> {
        let outcome = self
            .startup
            .get_or_init(|| async { self.run_startup().await })
            .await;

        match outcome {
            Ok(state) => Ok(*state),
            Err(message) => Err(Error::lifespan_failed(message.clone())),
        }
    }

    async fn run_startup(&self) -> std::result::Result<LifespanState, String> {
        if !self.enabled {
            debug!("Lifespan disabled");
            return Ok(LifespanState::Disabled);
        }

        let (input, input_rx) = mpsc::channel(1);
        let receive = AppReceiver::new(input_rx, Message::LifespanShutdown);
        let (send, outgoing) = AppSender::channel();
        let task = AppTask::spawn(&self.app, Scope::lifespan(), receive, send);

        let mut session = Session {
            input,
            outgoing,
            task,
        };

        if session.input.send(Message::LifespanStartup).await.is_err() {
            // The application dropped its receiver without reading.
            return Ok(unsupported(session.task.join().await));
        }

        match session.reply().await.map_err(|e| e.to_string())? {
            Reply::Message(Message::LifespanStartupComplete) => {
                info!("Lifespan startup complete");
                *self.session.lock() = Some(session);
                Ok(LifespanState::Started)
            }
            Reply::Message(Message::LifespanStartupFailed { message }) => {
                warn!(message = %message, "Lifespan startup failed");
                Err(message)
            }
            Reply::Message(other) => Err(format!(
                "unexpected {} during lifespan startup",
                other.kind()
            )),
            Reply::Finished(outcome) => Ok(unsupported(outcome)),
        }
    }

    /// Runs the shutdown handshake if startup completed.
    ///
    /// Does nothing when lifespan is disabled, unsupported, failed, or
    /// already shut down.
    ///
    /// # Errors
    ///
    /// - [`Error::Application`] if the application reports
    ///   `lifespan.shutdown.failed` or fails while shutting down
    /// - [`Error::ProtocolViolation`] if it answers with anything else
    pub async fn shutdown(&self) -> Result<()> {
        let Some(mut session) = self.session.lock().take() else {
            return Ok(());
        };

        if session.input.send(Message::LifespanShutdown).await.is_err() {
            return session.task.join().await;
        }

        match session.reply().await? {
            Reply::Message(Message::LifespanShutdownComplete) => {
                info!("Lifespan shutdown complete");
                Ok(())
            }
            Reply::Message(Message::LifespanShutdownFailed { message }) => Err(
                Error::application(format!("lifespan shutdown failed: {message}")),
            ),
            Reply::Message(other) => Err(Error::protocol_violation(format!(
                "unexpected {} during lifespan shutdown",
                other.kind()
            ))),
            Reply::Finished(outcome) => outcome,
        }
    }
}

impl std::fmt::Debug for Lifespan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lifespan")
            .field("enabled", &self.enabled)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Logs an application that returned without a lifespan message.
fn unsupported(outcome: Result<()>) -> LifespanState {
    match outcome {
        Ok(()) => info!("Application does not support lifespan"),
        Err(e) => info!(error = %e, "Application does not support lifespan"),
    }
    LifespanState::Unsupported
}

// ============================================================================
// Tests
// ============================================================================
