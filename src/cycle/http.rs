//! HTTP request/response cycle.
//!
//! ```text
//! AwaitStart ──http.response.start──► AwaitBody ──body(more_body=false)──► Complete
//!                                      │    ▲
//!                                      └────┘ body(more_body=true)
//! ```

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::protocol::{AppReceiver, BoxedApp, Header, Message, Scope};

use super::runner::{CycleHandler, run_cycle};

// ============================================================================
// HttpResponse
// ============================================================================

/// Response accumulated from the application's messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status from `http.response.start`.
    pub status: u16,
    /// Headers from `http.response.start`.
    pub headers: Vec<Header>,
    /// Concatenated body chunks.
    pub body: Vec<u8>,
}

// ============================================================================
// HttpCycle
// ============================================================================

/// Progress of the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HttpState {
    AwaitStart,
    AwaitBody,
    Complete,
}

/// Drives one HTTP exchange.
#[derive(Debug)]
pub struct HttpCycle {
    state: HttpState,
    response: HttpResponse,
}

impl Default for HttpCycle {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpCycle {
    /// Creates a cycle awaiting `http.response.start`.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: HttpState::AwaitStart,
            response: HttpResponse::default(),
        }
    }

    /// Runs `app` against `scope`, delivering `seed` as the request.
    ///
    /// # Errors
    ///
    /// - [`Error::ProtocolViolation`] if the application sends out of order
    ///   or returns before starting a response
    /// - [`Error::Application`] if the application fails
    pub async fn run(mut self, app: &BoxedApp, scope: Scope, seed: Message) -> Result<HttpResponse> {
        let receive = AppReceiver::preloaded(vec![seed], Message::HttpDisconnect);
        run_cycle(app, scope, receive, &mut self).await?;

        match self.state {
            HttpState::AwaitStart => Err(Error::protocol_violation(
                "application returned before http.response.start (no response started)",
            )),
            HttpState::AwaitBody => {
                warn!(
                    status = self.response.status,
                    "Application returned with more_body pending; sending partial body"
                );
                Ok(self.response)
            }
            HttpState::Complete => {
                debug!(
                    status = self.response.status,
                    bytes = self.response.body.len(),
                    "HTTP cycle complete"
                );
                Ok(self.response)
            }
        }
    }
}

#[async_trait]
impl CycleHandler for HttpCycle {
    async fn on_message(&mut self, message: Message) -> Result<()> {
        match (self.state, message) {
            (HttpState::AwaitStart, Message::HttpResponseStart { status, headers }) => {
                trace!(status, headers = headers.len(), "Response started");
                self.response.status = status;
                self.response.headers = headers;
                self.state = HttpState::AwaitBody;
                Ok(())
            }
            (_, Message::HttpResponseStart { .. }) => Err(Error::protocol_violation(
                "http.response.start sent after the response already started",
            )),
            (HttpState::AwaitBody, Message::HttpResponseBody { body, more_body }) => {
                self.response.body.extend_from_slice(&body);
                if !more_body {
                    self.state = HttpState::Complete;
                }
                Ok(())
            }
            (HttpState::AwaitStart, Message::HttpResponseBody { .. }) => Err(
                Error::protocol_violation("http.response.body sent before http.response.start"),
            ),
            (HttpState::Complete, Message::HttpResponseBody { .. }) => Err(
                Error::protocol_violation("http.response.body sent after the response completed"),
            ),
            (_, other) => Err(Error::protocol_violation(format!(
                "unexpected {} in http scope",
                other.kind()
            ))),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use crate::protocol::{BoxError, ScopeKind, app_fn};

    fn seed() -> Message {
        Message::HttpRequest {
            body: b"ping".to_vec(),
            more_body: false,
        }
    }

    async fn run(app: BoxedApp) -> Result<HttpResponse> {
        HttpCycle::new()
            .run(&app, Scope::new(ScopeKind::Http), seed())
            .await
    }

    #[tokio::test]
    async fn test_echo_response() {
        let app: BoxedApp = Arc::new(app_fn(|_scope, mut receive, send| async move {
            let Message::HttpRequest { body, .. } = receive.recv().await else {
                return Err("expected http.request".into());
            };
            send.send(Message::response_start(
                201,
                vec![Header::new("content-type", "text/plain")],
            ))
            .await?;
            send.send(Message::response_body(body)).await?;
            Ok::<(), BoxError>(())
        }));

        let response = run(app).await.expect("cycle");
        assert_eq!(response.status, 201);
        assert_eq!(response.body, b"ping");
        assert_eq!(response.headers, vec![Header::new("content-type", "text/plain")]);
    }

    #[tokio::test]
    async fn test_chunks_are_concatenated() {
        let app: BoxedApp = Arc::new(app_fn(|_scope, _receive, send| async move {
            send.send(Message::response_start(200, Vec::new())).await?;
            send.send(Message::response_chunk(b"Hello, ".to_vec())).await?;
            send.send(Message::response_chunk(b"world".to_vec())).await?;
            send.send(Message::response_body(b"!".to_vec())).await?;
            Ok::<(), BoxError>(())
        }));

        let response = run(app).await.expect("cycle");
        assert_eq!(response.body, b"Hello, world!");
    }

    #[tokio::test]
    async fn test_start_without_body_returns_empty_body() {
        let app: BoxedApp = Arc::new(app_fn(|_scope, _receive, send| async move {
            send.send(Message::response_start(204, Vec::new())).await?;
            Ok::<(), BoxError>(())
        }));

        let response = run(app).await.expect("cycle");
        assert_eq!(response.status, 204);
        assert!(response.body.is_empty());
    }

    #[tokio::test]
    async fn test_no_response_started() {
        let app: BoxedApp = Arc::new(app_fn(|_scope, _receive, _send| async move {
            Ok::<(), BoxError>(())
        }));

        let err = run(app).await.unwrap_err();
        assert!(err.is_protocol_violation());
        assert!(err.to_string().contains("no response started"));
    }

    #[tokio::test]
    async fn test_double_start_is_violation() {
        let app: BoxedApp = Arc::new(app_fn(|_scope, _receive, send| async move {
            send.send(Message::response_start(200, Vec::new())).await?;
            send.send(Message::response_start(500, Vec::new())).await?;
            Ok::<(), BoxError>(())
        }));

        let err = run(app).await.unwrap_err();
        assert!(err.is_protocol_violation());
    }

    #[tokio::test]
    async fn test_body_before_start_is_violation() {
        let app: BoxedApp = Arc::new(app_fn(|_scope, _receive, send| async move {
            send.send(Message::response_body(b"early".to_vec())).await?;
            Ok::<(), BoxError>(())
        }));

        let err = run(app).await.unwrap_err();
        assert!(err.is_protocol_violation());
    }

    #[tokio::test]
    async fn test_body_after_complete_is_violation() {
        let app: BoxedApp = Arc::new(app_fn(|_scope, _receive, send| async move {
            send.send(Message::response_start(200, Vec::new())).await?;
            send.send(Message::response_body(b"done".to_vec())).await?;
            send.send(Message::response_body(b"extra".to_vec())).await?;
            Ok::<(), BoxError>(())
        }));

        let err = run(app).await.unwrap_err();
        assert!(err.is_protocol_violation());
    }

    #[tokio::test]
    async fn test_websocket_message_in_http_scope() {
        let app: BoxedApp = Arc::new(app_fn(|_scope, _receive, send| async move {
            send.send(Message::accept()).await?;
            Ok::<(), BoxError>(())
        }));

        let err = run(app).await.unwrap_err();
        assert!(err.is_protocol_violation());
    }

    #[tokio::test]
    async fn test_application_error_after_response() {
        let app: BoxedApp = Arc::new(app_fn(|_scope, _receive, send| async move {
            send.send(Message::response_start(200, Vec::new())).await?;
            send.send(Message::response_body(b"ok".to_vec())).await?;
            Err::<(), BoxError>("late failure".into())
        }));

        let err = run(app).await.unwrap_err();
        assert!(err.is_application_error());
    }

    #[tokio::test]
    async fn test_app_sees_disconnect_after_request() {
        let app: BoxedApp = Arc::new(app_fn(|_scope, mut receive, send| async move {
            let _request = receive.recv().await;
            let status = if receive.recv().await == Message::HttpDisconnect {
                200
            } else {
                500
            };
            send.send(Message::response_start(status, Vec::new())).await?;
            send.send(Message::response_body(Vec::new())).await?;
            Ok::<(), BoxError>(())
        }));

        let response = run(app).await.expect("cycle");
        assert_eq!(response.status, 200);
    }
}
