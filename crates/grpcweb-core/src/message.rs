//! Request and response payload codec contract.
//!
//! The call engine never looks inside payloads. It asks the request for its
//! serialized bytes before dispatch and, for typed calls, asks a fresh
//! response value to deserialize itself from each received message frame.

use bytes::Bytes;
use thiserror::Error;

/// A payload codec failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct CodecError {
    message: String,
}

impl CodecError {
    /// Create a codec error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<prost::EncodeError> for CodecError {
    fn from(err: prost::EncodeError) -> Self {
        Self::new(err.to_string())
    }
}

impl From<prost::DecodeError> for CodecError {
    fn from(err: prost::DecodeError) -> Self {
        Self::new(err.to_string())
    }
}

/// A message that can travel as a gRPC-Web payload.
pub trait ProtoMessage {
    /// Serialize the message to its wire bytes.
    fn serialize(&self) -> Result<Bytes, CodecError>;

    /// Replace the contents of `self` with the message decoded from `bytes`.
    fn deserialize(&mut self, bytes: &[u8]) -> Result<(), CodecError>;
}

impl ProtoMessage for Bytes {
    fn serialize(&self) -> Result<Bytes, CodecError> {
        Ok(self.clone())
    }

    fn deserialize(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        *self = Bytes::copy_from_slice(bytes);
        Ok(())
    }
}

impl ProtoMessage for Vec<u8> {
    fn serialize(&self) -> Result<Bytes, CodecError> {
        Ok(Bytes::copy_from_slice(self))
    }

    fn deserialize(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        self.clear();
        self.extend_from_slice(bytes);
        Ok(())
    }
}

/// Adapter giving any `prost` message the [`ProtoMessage`] contract.
///
/// ```rust
/// use grpcweb_core::message::{Prost, ProtoMessage};
///
/// #[derive(Clone, PartialEq, prost::Message)]
/// struct Ping {
///     #[prost(uint32, tag = "1")]
///     seq: u32,
/// }
///
/// let bytes = Prost(Ping { seq: 7 }).serialize().unwrap();
/// let mut decoded = Prost::<Ping>::default();
/// decoded.deserialize(&bytes).unwrap();
/// assert_eq!(decoded.0.seq, 7);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Prost<M>(pub M);

impl<M: prost::Message + Default> ProtoMessage for Prost<M> {
    fn serialize(&self) -> Result<Bytes, CodecError> {
        Ok(Bytes::from(self.0.encode_to_vec()))
    }

    fn deserialize(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        self.0 = M::decode(bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_bytes_pass_through() {
        let payload = Bytes::from_static(&[0x01, 0x02]);
        assert_eq!(payload.serialize().unwrap(), payload);

        let mut target = Vec::from([0xff_u8; 4]);
        target.deserialize(&[0x03]).unwrap();
        assert_eq!(target, vec![0x03]);
    }

    #[derive(Clone, PartialEq, prost::Message)]
    struct Echo {
        #[prost(string, tag = "1")]
        text: String,
    }

    #[test]
    fn test_prost_adapter() {
        let bytes = Prost(Echo {
            text: "hi".to_string(),
        })
        .serialize()
        .unwrap();

        let mut echo = Prost::<Echo>::default();
        echo.deserialize(&bytes).unwrap();
        assert_eq!(echo.0.text, "hi");
    }

    #[test]
    fn test_prost_adapter_rejects_garbage() {
        let mut echo = Prost::<Echo>::default();
        assert!(echo.deserialize(&[0x0a, 0x05, b'h']).is_err());
    }
}
