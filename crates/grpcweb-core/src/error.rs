//! Error types for gRPC-Web calls.
//!
//! All call failures flow through [`CallError`]. The variants follow the
//! lifecycle of a call:
//!
//! | Variant | When |
//! |---------|------|
//! | [`CallError::Serialization`] | Request could not be serialized; nothing was sent |
//! | [`CallError::Transport`] | The transport ended without an interpretable trailer |
//! | [`CallError::Decode`] | The trailer bytes were malformed |
//! | [`CallError::Status`] | The trailer decoded to a non-OK status |
//! | [`CallError::Deserialization`] | A response payload did not match the expected message |
//!
//! Clean completion of a streaming call is not an error; stream readers
//! report it as `Ok(None)`.
//!
//! `CallError` is `Clone` so that a finished stream can hand the same
//! terminal error to every subsequent pull.

use std::fmt;
use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;

use crate::status::{Status, StatusCode};

/// A trailer frame could not be decoded.
///
/// Distinct from a legitimate non-OK status: the server's status is unknown.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
#[error("malformed trailer: {message}")]
#[diagnostic(
    code(grpcweb::trailer::malformed),
    help("The gateway sent a status frame that is not a valid google.rpc.Status message")
)]
pub struct DecodeError {
    message: String,
}

impl DecodeError {
    /// Create a decode error with the given description.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The underlying description.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<prost::DecodeError> for DecodeError {
    fn from(err: prost::DecodeError) -> Self {
        Self::new(err.to_string())
    }
}

/// Terminal transport notification that arrived without a trailer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportSignal {
    /// A `readable` notification arrived while none was expected.
    Readable,
    /// The stream ended before a trailer was received.
    End,
    /// The stream was closed before a trailer was received.
    Close,
    /// The transport reported an error.
    Error {
        /// HTTP status of the response, when one was received.
        http_status: Option<u16>,
        /// Description supplied by the transport.
        message: Option<String>,
    },
    /// The transport dropped its event sink without a terminal event.
    Disconnected,
    /// The call was aborted by the caller.
    Aborted,
    /// The call deadline elapsed.
    TimedOut(Duration),
}

impl TransportSignal {
    /// Create an error signal with only a description.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            http_status: None,
            message: Some(message.into()),
        }
    }

    /// The canonical code this signal corresponds to.
    #[must_use]
    pub fn code(&self) -> StatusCode {
        match self {
            Self::Error {
                http_status: Some(http),
                ..
            } => StatusCode::from_http_status(*http),
            Self::Error {
                http_status: None, ..
            }
            | Self::Close
            | Self::Disconnected => StatusCode::Unavailable,
            Self::Readable | Self::End => StatusCode::Unknown,
            Self::Aborted => StatusCode::Cancelled,
            Self::TimedOut(_) => StatusCode::DeadlineExceeded,
        }
    }
}

impl fmt::Display for TransportSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Readable => write!(f, "unexpected readable event"),
            Self::End => write!(f, "stream ended before a status was received"),
            Self::Close => write!(f, "stream closed before a status was received"),
            Self::Error {
                http_status,
                message,
            } => {
                write!(f, "transport error")?;
                if let Some(http) = http_status {
                    write!(f, " (HTTP {http})")?;
                }
                if let Some(message) = message {
                    write!(f, ": {message}")?;
                }
                Ok(())
            }
            Self::Disconnected => write!(f, "transport went away without a terminal event"),
            Self::Aborted => write!(f, "call aborted"),
            Self::TimedOut(after) => write!(f, "call timed out after {after:?}"),
        }
    }
}

/// The error returned by a unary call or a stream pull.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum CallError {
    /// The request payload could not be serialized. The call never reached
    /// the transport.
    #[error("failed to serialize request: {message}")]
    #[diagnostic(code(grpcweb::call::serialization))]
    Serialization {
        /// Codec description.
        message: String,
    },

    /// A response payload could not be deserialized into the requested type.
    #[error("failed to deserialize response: {message}")]
    #[diagnostic(code(grpcweb::call::deserialization))]
    Deserialization {
        /// Codec description.
        message: String,
    },

    /// The transport failed without producing an interpretable trailer.
    #[error("{signal}")]
    #[diagnostic(code(grpcweb::call::transport))]
    Transport {
        /// What the transport reported.
        signal: TransportSignal,
    },

    /// The trailer bytes were malformed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Decode(#[from] DecodeError),

    /// The call completed with a non-OK status.
    #[error("call failed with {0}")]
    #[diagnostic(code(grpcweb::call::status))]
    Status(Status),
}

impl CallError {
    /// Create a transport error from a signal.
    #[must_use]
    pub const fn transport(signal: TransportSignal) -> Self {
        Self::Transport { signal }
    }

    /// Create a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a deserialization error.
    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::Deserialization {
            message: message.into(),
        }
    }

    /// The canonical code for this error.
    #[must_use]
    pub fn code(&self) -> StatusCode {
        match self {
            Self::Status(status) => status.code(),
            Self::Transport { signal } => signal.code(),
            Self::Serialization { .. } | Self::Deserialization { .. } | Self::Decode(_) => {
                StatusCode::Internal
            }
        }
    }

    /// The decoded status, if the server produced one.
    #[must_use]
    pub const fn status(&self) -> Option<&Status> {
        match self {
            Self::Status(status) => Some(status),
            _ => None,
        }
    }

    /// Whether the call was aborted by the caller.
    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        matches!(
            self,
            Self::Transport {
                signal: TransportSignal::Aborted
            }
        )
    }
}

impl From<Status> for CallError {
    fn from(status: Status) -> Self {
        Self::Status(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(
            CallError::Status(Status::new(StatusCode::NotFound, "missing")).code(),
            StatusCode::NotFound
        );
        assert_eq!(
            CallError::transport(TransportSignal::Aborted).code(),
            StatusCode::Cancelled
        );
        assert_eq!(
            CallError::transport(TransportSignal::TimedOut(Duration::from_secs(1))).code(),
            StatusCode::DeadlineExceeded
        );
        assert_eq!(
            CallError::transport(TransportSignal::Error {
                http_status: Some(401),
                message: None,
            })
            .code(),
            StatusCode::Unauthenticated
        );
        assert_eq!(
            CallError::from(DecodeError::new("bad")).code(),
            StatusCode::Internal
        );
    }

    #[test]
    fn test_display() {
        let err = CallError::transport(TransportSignal::Error {
            http_status: Some(503),
            message: Some("upstream down".to_string()),
        });
        assert_eq!(err.to_string(), "transport error (HTTP 503): upstream down");

        let err = CallError::Status(Status::new(StatusCode::NotFound, "missing"));
        assert_eq!(err.to_string(), "call failed with NOT_FOUND: missing");
    }

    #[test]
    fn test_status_accessor() {
        let err = CallError::from(Status::new(StatusCode::Aborted, "conflict"));
        assert_eq!(err.status().map(Status::code), Some(StatusCode::Aborted));
        assert!(CallError::transport(TransportSignal::End).status().is_none());
        assert!(CallError::transport(TransportSignal::Aborted).is_aborted());
    }
}
