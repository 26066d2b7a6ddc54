//! Transport error types.

use grpcweb_core::error::{CallError, TransportSignal};
use thiserror::Error;

use crate::event::TransportEvent;

/// Errors that can occur during transport operations.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Connection error.
    #[error("Connection error: {message}")]
    Connection {
        /// Error message.
        message: String,
    },

    /// The event consumer went away.
    #[error("Connection closed")]
    ConnectionClosed,

    /// The event channel is full.
    #[error("Event channel full, {} event not delivered", event.name())]
    Backpressure {
        /// The event that could not be delivered.
        event: Box<TransportEvent>,
    },

    /// A header could not be applied to the request.
    #[error("Invalid header '{name}': {message}")]
    InvalidHeader {
        /// Header name.
        name: String,
        /// Description of the problem.
        message: String,
    },

    /// The endpoint could not be resolved to a URL.
    #[error("Invalid endpoint '{endpoint}': {message}")]
    InvalidEndpoint {
        /// The endpoint as given.
        endpoint: String,
        /// Description of the problem.
        message: String,
    },

    /// `send` was called twice on the same transport.
    #[error("Request already sent")]
    AlreadySent,

    /// A response frame was malformed.
    #[error("Invalid frame: {message}")]
    InvalidFrame {
        /// Description of the problem.
        message: String,
    },

    /// A response frame exceeded the configured limit.
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge {
        /// Declared frame size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },
}

impl TransportError {
    /// Create an invalid frame error.
    pub fn invalid_frame(message: impl Into<String>) -> Self {
        Self::InvalidFrame {
            message: message.into(),
        }
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }
}

impl From<TransportError> for CallError {
    fn from(err: TransportError) -> Self {
        Self::transport(TransportSignal::error(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grpcweb_core::StatusCode;

    #[test]
    fn test_call_error_conversion() {
        let err: CallError = TransportError::connection("refused").into();
        match &err {
            CallError::Transport {
                signal: TransportSignal::Error {
                    http_status,
                    message,
                },
            } => {
                assert_eq!(*http_status, None);
                assert_eq!(message.as_deref(), Some("Connection error: refused"));
            }
            other => panic!("Expected transport error, got {other:?}"),
        }
        assert_eq!(err.code(), StatusCode::Unavailable);
    }

    #[test]
    fn test_backpressure_display() {
        let err = TransportError::Backpressure {
            event: Box::new(TransportEvent::End),
        };
        assert_eq!(err.to_string(), "Event channel full, end event not delivered");
    }
}
