//! Canonical status codes and trailer decoding.
//!
//! Every gRPC-Web call ends with exactly one status. On the happy path the
//! gateway delivers it as a trailer frame, which [`Status::decode`] turns
//! into a structured [`Status`]. When the HTTP exchange itself fails before a
//! trailer is produced, [`StatusCode::from_http_status`] gives the nearest
//! canonical code for the HTTP response status.
//!
//! # Trailer format
//!
//! A trailer frame is a serialized `google.rpc.Status` message:
//!
//! ```text
//! message Status {
//!   int32 code = 1;
//!   string message = 2;
//!   repeated google.protobuf.Any details = 3;
//! }
//! ```
//!
//! Each `details` entry is surfaced as one [`Metadata`] entry keyed by its
//! type URL.

use std::collections::HashMap;
use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use prost::Message as _;
use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// String-keyed call metadata. Sent as request headers and carried in
/// decoded statuses.
pub type Metadata = HashMap<String, String>;

/// Canonical status code of a call.
///
/// The discriminants are the numeric values exchanged with the gateway and
/// must not be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i32)]
pub enum StatusCode {
    /// Not an error; returned on success.
    Ok = 0,
    /// The operation was cancelled, typically by the caller.
    Cancelled = 1,
    /// Unknown error, or an error from an unknown error space.
    Unknown = 2,
    /// The client specified an invalid argument.
    InvalidArgument = 3,
    /// The deadline expired before the operation could complete.
    DeadlineExceeded = 4,
    /// Some requested entity was not found.
    NotFound = 5,
    /// The entity a client attempted to create already exists.
    AlreadyExists = 6,
    /// The caller does not have permission to execute the operation.
    PermissionDenied = 7,
    /// The request does not have valid authentication credentials.
    Unauthenticated = 8,
    /// Some resource has been exhausted.
    ResourceExhausted = 9,
    /// The system is not in a state required for the operation.
    FailedPrecondition = 10,
    /// The operation was aborted, typically due to a concurrency issue.
    Aborted = 11,
    /// The operation was attempted past the valid range.
    OutOfRange = 12,
    /// The operation is not implemented or not supported.
    Unimplemented = 13,
    /// Internal invariants were broken.
    Internal = 14,
    /// The service is currently unavailable.
    Unavailable = 15,
    /// Unrecoverable data loss or corruption.
    DataLoss = 16,
}

impl StatusCode {
    /// All codes in wire order.
    pub const ALL: [Self; 17] = [
        Self::Ok,
        Self::Cancelled,
        Self::Unknown,
        Self::InvalidArgument,
        Self::DeadlineExceeded,
        Self::NotFound,
        Self::AlreadyExists,
        Self::PermissionDenied,
        Self::Unauthenticated,
        Self::ResourceExhausted,
        Self::FailedPrecondition,
        Self::Aborted,
        Self::OutOfRange,
        Self::Unimplemented,
        Self::Internal,
        Self::Unavailable,
        Self::DataLoss,
    ];

    /// Look up a code by its wire value.
    ///
    /// Returns `None` for values outside `0..=16`.
    #[must_use]
    pub fn from_i32(value: i32) -> Option<Self> {
        usize::try_from(value)
            .ok()
            .and_then(|idx| Self::ALL.get(idx).copied())
    }

    /// The wire value of this code.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Whether this code denotes success.
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Map an HTTP status code to the nearest canonical code.
    ///
    /// Used when the transport fails before producing any trailer and the
    /// only information available is the HTTP response status.
    #[must_use]
    pub const fn from_http_status(http_status: u16) -> Self {
        match http_status {
            200 => Self::Ok,
            400 => Self::InvalidArgument,
            401 => Self::Unauthenticated,
            403 => Self::PermissionDenied,
            404 => Self::NotFound,
            409 => Self::Aborted,
            412 => Self::FailedPrecondition,
            429 => Self::ResourceExhausted,
            499 => Self::Cancelled,
            501 => Self::Unimplemented,
            503 => Self::Unavailable,
            504 => Self::DeadlineExceeded,
            _ => Self::Unknown,
        }
    }

    /// A short human-readable description.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Ok => "the operation completed successfully",
            Self::Cancelled => "the operation was cancelled",
            Self::Unknown => "unknown error",
            Self::InvalidArgument => "client specified an invalid argument",
            Self::DeadlineExceeded => "deadline expired before operation could complete",
            Self::NotFound => "some requested entity was not found",
            Self::AlreadyExists => "some entity that we attempted to create already exists",
            Self::PermissionDenied => "the caller does not have permission to execute the operation",
            Self::Unauthenticated => "the request does not have valid authentication credentials",
            Self::ResourceExhausted => "some resource has been exhausted",
            Self::FailedPrecondition => "the system is not in a state required for the operation",
            Self::Aborted => "the operation was aborted",
            Self::OutOfRange => "operation was attempted past the valid range",
            Self::Unimplemented => "operation is not implemented or not supported",
            Self::Internal => "internal error",
            Self::Unavailable => "the service is currently unavailable",
            Self::DataLoss => "unrecoverable data loss or corruption",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ok => "OK",
            Self::Cancelled => "CANCELLED",
            Self::Unknown => "UNKNOWN",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Self::NotFound => "NOT_FOUND",
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::ResourceExhausted => "RESOURCE_EXHAUSTED",
            Self::FailedPrecondition => "FAILED_PRECONDITION",
            Self::Aborted => "ABORTED",
            Self::OutOfRange => "OUT_OF_RANGE",
            Self::Unimplemented => "UNIMPLEMENTED",
            Self::Internal => "INTERNAL",
            Self::Unavailable => "UNAVAILABLE",
            Self::DataLoss => "DATA_LOSS",
        };
        f.write_str(name)
    }
}

impl From<StatusCode> for i32 {
    fn from(code: StatusCode) -> Self {
        code.as_i32()
    }
}

/// The terminal status of a call.
///
/// Fields are read through accessors so that a failure status always carries
/// details, whichever way it was built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StatusFields")]
pub struct Status {
    code: StatusCode,
    details: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    metadata: Metadata,
}

#[derive(Deserialize)]
struct StatusFields {
    code: StatusCode,
    #[serde(default)]
    details: String,
    #[serde(default)]
    metadata: Metadata,
}

impl From<StatusFields> for Status {
    fn from(fields: StatusFields) -> Self {
        let mut status = Self::new(fields.code, fields.details);
        status.metadata = fields.metadata;
        status
    }
}

impl Status {
    /// Create a status with the given code and details.
    ///
    /// Empty details on a failure code are replaced by the code's
    /// description.
    #[must_use]
    pub fn new(code: StatusCode, details: impl Into<String>) -> Self {
        let mut details = details.into();
        if details.is_empty() && !code.is_ok() {
            details = code.description().to_string();
        }
        Self {
            code,
            details,
            metadata: Metadata::new(),
        }
    }

    /// A successful status with no details.
    #[must_use]
    pub fn ok() -> Self {
        Self::new(StatusCode::Ok, "")
    }

    /// Attach a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Canonical code.
    #[must_use]
    pub const fn code(&self) -> StatusCode {
        self.code
    }

    /// Human-readable details. Never empty for failure codes.
    #[must_use]
    pub fn details(&self) -> &str {
        &self.details
    }

    /// Metadata attached to the status.
    #[must_use]
    pub const fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Whether the status denotes success.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.code.is_ok()
    }

    /// Decode a trailer frame.
    ///
    /// Malformed bytes yield a [`DecodeError`]; this never panics.
    pub fn decode(trailer: &[u8]) -> Result<Self, DecodeError> {
        let raw = RpcStatus::decode(trailer)?;

        let code = StatusCode::from_i32(raw.code).unwrap_or(StatusCode::Unknown);
        let metadata = raw
            .details
            .into_iter()
            .map(|detail| {
                let value = match String::from_utf8(detail.value) {
                    Ok(text) => text,
                    Err(err) => BASE64.encode(err.into_bytes()),
                };
                (detail.type_url, value)
            })
            .collect();

        let mut status = Self::new(code, raw.message);
        status.metadata = metadata;
        Ok(status)
    }

    /// Encode this status as a trailer frame.
    ///
    /// Metadata values are written verbatim as UTF-8 payloads.
    #[must_use]
    pub fn encode_trailer(&self) -> Bytes {
        let mut details: Vec<AnyDetail> = self
            .metadata
            .iter()
            .map(|(type_url, value)| AnyDetail {
                type_url: type_url.clone(),
                value: value.as_bytes().to_vec(),
            })
            .collect();
        details.sort_by(|a, b| a.type_url.cmp(&b.type_url));

        let raw = RpcStatus {
            code: self.code.as_i32(),
            message: self.details.clone(),
            details,
        };
        Bytes::from(raw.encode_to_vec())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.details)
    }
}

/// Wire representation of `google.rpc.Status`.
#[derive(Clone, PartialEq, prost::Message)]
struct RpcStatus {
    #[prost(int32, tag = "1")]
    code: i32,
    #[prost(string, tag = "2")]
    message: String,
    #[prost(message, repeated, tag = "3")]
    details: Vec<AnyDetail>,
}

/// Wire representation of `google.protobuf.Any`.
#[derive(Clone, PartialEq, prost::Message)]
struct AnyDetail {
    #[prost(string, tag = "1")]
    type_url: String,
    #[prost(bytes = "vec", tag = "2")]
    value: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_wire_order_is_stable() {
        for (idx, code) in StatusCode::ALL.iter().enumerate() {
            assert_eq!(code.as_i32(), idx as i32);
            assert_eq!(StatusCode::from_i32(idx as i32), Some(*code));
        }
        assert_eq!(StatusCode::Unauthenticated.as_i32(), 8);
        assert_eq!(StatusCode::DataLoss.as_i32(), 16);
        assert_eq!(StatusCode::from_i32(17), None);
        assert_eq!(StatusCode::from_i32(-1), None);
    }

    #[test]
    fn test_from_http_status() {
        assert_eq!(StatusCode::from_http_status(200), StatusCode::Ok);
        assert_eq!(StatusCode::from_http_status(401), StatusCode::Unauthenticated);
        assert_eq!(StatusCode::from_http_status(403), StatusCode::PermissionDenied);
        assert_eq!(StatusCode::from_http_status(404), StatusCode::NotFound);
        assert_eq!(StatusCode::from_http_status(429), StatusCode::ResourceExhausted);
        assert_eq!(StatusCode::from_http_status(503), StatusCode::Unavailable);
        assert_eq!(StatusCode::from_http_status(504), StatusCode::DeadlineExceeded);
        assert_eq!(StatusCode::from_http_status(418), StatusCode::Unknown);
        assert_eq!(StatusCode::from_http_status(500), StatusCode::Unknown);
    }

    #[test]
    fn test_from_http_status_is_deterministic() {
        for http in 0..=u16::MAX {
            assert_eq!(
                StatusCode::from_http_status(http),
                StatusCode::from_http_status(http)
            );
        }
    }

    #[test]
    fn test_decode_not_found() {
        let trailer = Status::new(StatusCode::NotFound, "missing").encode_trailer();
        let status = Status::decode(&trailer).unwrap();
        assert_eq!(status.code(), StatusCode::NotFound);
        assert_eq!(status.details(), "missing");
        assert!(status.metadata().is_empty());
    }

    #[test]
    fn test_decode_empty_trailer_is_ok() {
        // All fields default: code 0, no message.
        let status = Status::decode(&[]).unwrap();
        assert!(status.is_ok());
        assert_eq!(status.details(), "");
    }

    #[test]
    fn test_decode_metadata_from_details() {
        let trailer = Status::new(StatusCode::Internal, "boom")
            .with_metadata("type.example.com/trace", "abc123")
            .encode_trailer();
        let status = Status::decode(&trailer).unwrap();
        assert_eq!(
            status.metadata().get("type.example.com/trace").map(String::as_str),
            Some("abc123")
        );
    }

    #[test]
    fn test_decode_binary_detail_is_base64() {
        let raw = RpcStatus {
            code: 2,
            message: "bad".to_string(),
            details: vec![AnyDetail {
                type_url: "bin".to_string(),
                value: vec![0xff, 0xfe],
            }],
        };
        let status = Status::decode(&raw.encode_to_vec()).unwrap();
        assert_eq!(status.metadata().get("bin").map(String::as_str), Some("//4="));
    }

    #[test]
    fn test_decode_failure_fills_missing_details() {
        let raw = RpcStatus {
            code: StatusCode::Unavailable.as_i32(),
            message: String::new(),
            details: vec![],
        };
        let status = Status::decode(&raw.encode_to_vec()).unwrap();
        assert_eq!(status.details(), StatusCode::Unavailable.description());
    }

    #[test]
    fn test_decode_out_of_range_code_is_unknown() {
        let raw = RpcStatus {
            code: 42,
            message: "odd".to_string(),
            details: vec![],
        };
        let status = Status::decode(&raw.encode_to_vec()).unwrap();
        assert_eq!(status.code(), StatusCode::Unknown);
        assert_eq!(status.details(), "odd");
    }

    #[test]
    fn test_decode_malformed_is_error() {
        // Field 2 (length-delimited) claiming 100 bytes with only 1 present.
        assert!(Status::decode(&[0x12, 0x64, 0x41]).is_err());
        // Truncated varint.
        assert!(Status::decode(&[0x08, 0xff]).is_err());
        // Invalid wire type 7.
        assert!(Status::decode(&[0x0f]).is_err());
    }

    #[test]
    fn test_display() {
        let status = Status::new(StatusCode::NotFound, "missing");
        assert_eq!(status.to_string(), "NOT_FOUND: missing");
    }

    #[test]
    fn test_deserialized_failure_gets_details() {
        let status: Status = serde_json::from_str(r#"{"code":"NOT_FOUND","details":""}"#).unwrap();
        assert_eq!(status.code(), StatusCode::NotFound);
        assert_eq!(status.details(), StatusCode::NotFound.description());
        assert!(status.metadata().is_empty());

        let json = serde_json::to_string(&Status::new(StatusCode::Aborted, "gone")).unwrap();
        let back: Status = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Status::new(StatusCode::Aborted, "gone"));
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&StatusCode::DeadlineExceeded).unwrap();
        assert_eq!(json, "\"DEADLINE_EXCEEDED\"");
    }
}
