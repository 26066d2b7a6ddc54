//! Incremental parser for the gateway's streamed response body.
//!
//! The body is a concatenation of protobuf length-delimited fields:
//!
//! | Field | Meaning |
//! |-------|---------|
//! | 1 | Message frame |
//! | 2 | Trailer frame (`google.rpc.Status`) |
//! | 15 | Padding, ignored |
//!
//! Any other field number or wire type is a protocol violation. When the
//! gateway honors `X-Accept-Content-Transfer-Encoding: base64` the body is
//! base64 text instead, possibly padded at arbitrary chunk boundaries;
//! [`Base64Decoder`] turns it back into bytes before parsing.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::{Buf, Bytes, BytesMut};

use crate::error::TransportError;
use crate::event::DataEvent;

const MESSAGE_FIELD: u64 = 1;
const TRAILER_FIELD: u64 = 2;
const PADDING_FIELD: u64 = 15;
const LENGTH_DELIMITED: u64 = 2;

/// Longest varint the parser accepts (a full `u64`).
const MAX_VARINT_LEN: usize = 10;

/// A complete field taken from the response stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamField {
    /// Field 1.
    Message(Bytes),
    /// Field 2.
    Trailer(Bytes),
}

impl From<StreamField> for DataEvent {
    fn from(field: StreamField) -> Self {
        match field {
            StreamField::Message(bytes) => Self::message(bytes),
            StreamField::Trailer(bytes) => Self::trailer(bytes),
        }
    }
}

/// Parses fields out of body chunks as they arrive.
///
/// After an error the parser is poisoned and rejects further input.
#[derive(Debug)]
pub struct StreamParser {
    buffer: BytesMut,
    max_frame_size: usize,
    failed: bool,
}

impl StreamParser {
    /// Create a parser rejecting frames larger than `max_frame_size`.
    #[must_use]
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            max_frame_size,
            failed: false,
        }
    }

    /// Feed a chunk and return every field it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<StreamField>, TransportError> {
        if self.failed {
            return Err(TransportError::invalid_frame("parser already failed"));
        }
        self.buffer.extend_from_slice(chunk);

        let mut fields = Vec::new();
        loop {
            match self.next_field() {
                Ok(Some(Some(field))) => fields.push(field),
                Ok(Some(None)) => {}
                Ok(None) => return Ok(fields),
                Err(err) => {
                    self.failed = true;
                    return Err(err);
                }
            }
        }
    }

    /// Whether input ended cleanly on a field boundary.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Try to take one field from the buffer.
    ///
    /// `Ok(None)` means more input is needed; `Ok(Some(None))` means a
    /// padding field was consumed.
    fn next_field(&mut self) -> Result<Option<Option<StreamField>>, TransportError> {
        let Some((tag, tag_len)) = peek_varint(&self.buffer)? else {
            return Ok(None);
        };
        let field = tag >> 3;
        let wire_type = tag & 0x7;
        if wire_type != LENGTH_DELIMITED {
            return Err(TransportError::invalid_frame(format!(
                "field {field} has wire type {wire_type}, expected length-delimited"
            )));
        }
        if !matches!(field, MESSAGE_FIELD | TRAILER_FIELD | PADDING_FIELD) {
            return Err(TransportError::invalid_frame(format!(
                "unexpected field {field} in response stream"
            )));
        }

        let Some((len, len_len)) = peek_varint(&self.buffer[tag_len..])? else {
            return Ok(None);
        };
        let len = usize::try_from(len).unwrap_or(usize::MAX);
        if len > self.max_frame_size {
            return Err(TransportError::FrameTooLarge {
                size: len,
                max: self.max_frame_size,
            });
        }

        let header = tag_len + len_len;
        let Some(frame_end) = header.checked_add(len) else {
            return Err(TransportError::FrameTooLarge {
                size: len,
                max: self.max_frame_size,
            });
        };
        if self.buffer.len() < frame_end {
            return Ok(None);
        }
        self.buffer.advance(header);
        let payload = self.buffer.split_to(len).freeze();

        Ok(Some(match field {
            MESSAGE_FIELD => Some(StreamField::Message(payload)),
            TRAILER_FIELD => Some(StreamField::Trailer(payload)),
            _ => None,
        }))
    }
}

/// Read a varint from the front of `buf` without consuming it.
fn peek_varint(buf: &[u8]) -> Result<Option<(u64, usize)>, TransportError> {
    let mut value = 0_u64;
    for (idx, byte) in buf.iter().take(MAX_VARINT_LEN).enumerate() {
        value |= u64::from(byte & 0x7f) << (7 * idx);
        if byte & 0x80 == 0 {
            return Ok(Some((value, idx + 1)));
        }
    }
    if buf.len() >= MAX_VARINT_LEN {
        return Err(TransportError::invalid_frame("varint too long"));
    }
    Ok(None)
}

/// Decodes base64 text that arrives in arbitrary chunks.
///
/// Whitespace is ignored. Padding may appear at the end of any 4-character
/// group, since the gateway may encode each flushed chunk separately.
#[derive(Debug, Default)]
pub struct Base64Decoder {
    pending: Vec<u8>,
}

impl Base64Decoder {
    /// Create a decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed text and return every byte it completes.
    pub fn push(&mut self, text: &[u8]) -> Result<Vec<u8>, TransportError> {
        self.pending
            .extend(text.iter().copied().filter(|b| !b.is_ascii_whitespace()));

        let complete = self.pending.len() - self.pending.len() % 4;
        let mut out = Vec::with_capacity(complete / 4 * 3);
        let mut segment_start = 0;
        for group_end in (4..=complete).step_by(4) {
            if self.pending[group_end - 4..group_end].contains(&b'=') {
                decode_into(&self.pending[segment_start..group_end], &mut out)?;
                segment_start = group_end;
            }
        }
        decode_into(&self.pending[segment_start..complete], &mut out)?;

        self.pending.drain(..complete);
        Ok(out)
    }

    /// Whether all input formed complete groups.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Full response body decoding: optional base64 followed by field parsing.
#[derive(Debug)]
pub struct BodyDecoder {
    base64: Option<Base64Decoder>,
    parser: StreamParser,
}

impl BodyDecoder {
    /// Create a decoder. `base64` selects text bodies.
    #[must_use]
    pub fn new(base64: bool, max_frame_size: usize) -> Self {
        Self {
            base64: base64.then(Base64Decoder::new),
            parser: StreamParser::new(max_frame_size),
        }
    }

    /// Feed a body chunk and return every field it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<StreamField>, TransportError> {
        match &mut self.base64 {
            Some(decoder) => {
                let raw = decoder.push(chunk)?;
                self.parser.push(&raw)
            }
            None => self.parser.push(chunk),
        }
    }

    /// Whether the body so far ended on a field boundary.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.parser.is_idle() && self.base64.as_ref().is_none_or(Base64Decoder::is_idle)
    }
}

fn decode_into(segment: &[u8], out: &mut Vec<u8>) -> Result<(), TransportError> {
    if segment.is_empty() {
        return Ok(());
    }
    BASE64
        .decode_vec(segment, out)
        .map_err(|e| TransportError::invalid_frame(format!("invalid base64 body: {e}")))
}
