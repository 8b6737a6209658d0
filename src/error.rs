//! Error types for the bridge.
//!
//! Every invocation either produces exactly one outbound event or fails with
//! one of the errors below. None of them are retried internally; the host's
//! own invocation-retry policy decides what happens next.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use lambda_bridge::{Adapter, Result};
//!
//! async fn example(adapter: &Adapter, event: serde_json::Value) -> Result<()> {
//!     let response = adapter.handle(event).await?;
//!     println!("status {}", response.status_code);
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Inbound | [`Error::MalformedEvent`] |
//! | Protocol | [`Error::ProtocolViolation`], [`Error::ChannelClosed`], [`Error::Rejected`] |
//! | Application | [`Error::Application`], [`Error::LifespanFailed`] |
//! | Registry | [`Error::RegistryUnavailable`] |
//! | Push | [`Error::Push`] |
//! | Configuration | [`Error::Config`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::Base64`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use base64::DecodeError;
use thiserror::Error;

use crate::identifiers::ConnectionId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Inbound Errors
    // ========================================================================
    /// Inbound event has an unrecognized shape or lacks required fields.
    ///
    /// Raised before the application is contacted.
    #[error("Malformed event: {message}")]
    MalformedEvent {
        /// Description of what is missing or invalid.
        message: String,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// The application violated the message ordering of its scope.
    ///
    /// No partial outbound event is produced.
    #[error("Protocol violation: {message}")]
    ProtocolViolation {
        /// Description of the violation.
        message: String,
    },

    /// The message channel between cycle and application was torn down.
    #[error("Channel closed")]
    ChannelClosed,

    /// The cycle refused a message sent by the application.
    ///
    /// This is what the application observes; the cycle itself fails with
    /// the underlying error.
    #[error("Message rejected: {message}")]
    Rejected {
        /// Description of the underlying failure.
        message: String,
    },

    // ========================================================================
    // Application Errors
    // ========================================================================
    /// The application failed while handling a scope.
    #[error("Application error: {message}")]
    Application {
        /// Failure reported by the application, or the panic message.
        message: String,
    },

    /// The application reported `lifespan.startup.failed`.
    ///
    /// Once raised, every later invocation on the same adapter fails fast.
    #[error("Lifespan startup failed: {message}")]
    LifespanFailed {
        /// Message supplied with the failure.
        message: String,
    },

    // ========================================================================
    // Registry Errors
    // ========================================================================
    /// The connection registry could not complete an operation.
    #[error("Connection registry unavailable: {message}")]
    RegistryUnavailable {
        /// Description of the store failure.
        message: String,
    },

    // ========================================================================
    // Push Errors
    // ========================================================================
    /// The push mechanism failed for a reason other than "gone".
    #[error("Push to {connection_id} failed: {message}")]
    Push {
        /// Target connection.
        connection_id: ConnectionId,
        /// Transport failure description.
        message: String,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Adapter configuration is invalid or incomplete.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Base64 decoding error.
    #[error("Base64 error: {0}")]
    Base64(#[from] DecodeError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a malformed event error.
    #[inline]
    pub fn malformed_event(message: impl Into<String>) -> Self {
        Self::MalformedEvent {
            message: message.into(),
        }
    }

    /// Creates a protocol violation error.
    #[inline]
    pub fn protocol_violation(message: impl Into<String>) -> Self {
        Self::ProtocolViolation {
            message: message.into(),
        }
    }

    /// Creates a rejection mirroring `cause`, for the application side.
    #[inline]
    pub fn rejected(cause: &Error) -> Self {
        Self::Rejected {
            message: cause.to_string(),
        }
    }

    /// Creates an application error.
    #[inline]
    pub fn application(message: impl Into<String>) -> Self {
        Self::Application {
            message: message.into(),
        }
    }

    /// Creates a lifespan failure error.
    #[inline]
    pub fn lifespan_failed(message: impl Into<String>) -> Self {
        Self::LifespanFailed {
            message: message.into(),
        }
    }

    /// Creates a registry unavailable error.
    #[inline]
    pub fn registry_unavailable(message: impl Into<String>) -> Self {
        Self::RegistryUnavailable {
            message: message.into(),
        }
    }

    /// Creates a push error.
    #[inline]
    pub fn push(connection_id: ConnectionId, message: impl Into<String>) -> Self {
        Self::Push {
            connection_id,
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if the application broke protocol ordering.
    #[inline]
    #[must_use]
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::ProtocolViolation { .. })
    }

    /// Returns `true` if this is a registry error.
    #[inline]
    #[must_use]
    pub fn is_registry_error(&self) -> bool {
        matches!(self, Self::RegistryUnavailable { .. })
    }

    /// Returns `true` if the failure originated inside the application.
    #[inline]
    #[must_use]
    pub fn is_application_error(&self) -> bool {
        matches!(self, Self::Application { .. } | Self::LifespanFailed { .. })
    }

    /// Returns `true` if re-running the same event could succeed.
    ///
    /// Only infrastructure faults qualify; malformed events and protocol
    /// violations fail identically every time.
    #[inline]
    #[must_use]
    pub fn is_retryable_by_host(&self) -> bool {
        matches!(
            self,
            Self::RegistryUnavailable { .. } | Self::Push { .. } | Self::Io(_)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::protocol_violation("send before accept");
        assert_eq!(err.to_string(), "Protocol violation: send before accept");
    }

    #[test]
    fn test_push_error_display() {
        let err = Error::push(ConnectionId::new("abc="), "503 from endpoint");
        assert_eq!(err.to_string(), "Push to abc= failed: 503 from endpoint");
    }

    #[test]
    fn test_rejected_mirrors_cause() {
        let cause = Error::registry_unavailable("timeout");
        let err = Error::rejected(&cause);
        assert_eq!(
            err.to_string(),
            "Message rejected: Connection registry unavailable: timeout"
        );
    }

    #[test]
    fn test_predicates() {
        assert!(Error::protocol_violation("x").is_protocol_violation());
        assert!(!Error::malformed_event("x").is_protocol_violation());

        assert!(Error::registry_unavailable("down").is_registry_error());
        assert!(Error::application("boom").is_application_error());
        assert!(Error::lifespan_failed("db").is_application_error());
        assert!(!Error::config("x").is_application_error());
    }

    #[test]
    fn test_is_retryable_by_host() {
        assert!(Error::registry_unavailable("down").is_retryable_by_host());
        assert!(Error::push(ConnectionId::new("a"), "timeout").is_retryable_by_host());
        assert!(!Error::malformed_event("no route").is_retryable_by_host());
        assert!(!Error::protocol_violation("x").is_retryable_by_host());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
