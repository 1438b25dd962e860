//! Length-prefixed binary envelope
//!
//! Camera and depth frames travel as:
//!
//! ```text
//! ┌──────────────────────┬────────────────────────┬──────────────────────┐
//! │ header_length: u32   │ JSON header            │ binary payload       │
//! │ 4 bytes, little-end. │ header_length bytes    │ remaining bytes      │
//! └──────────────────────┴────────────────────────┴──────────────────────┘
//! ```
//!
//! Parsing is a pure function of the buffer. The payload is a zero-copy
//! slice of the input.

use bytes::{BufMut, Bytes, BytesMut};
use serde_json::{Map, Value};
use tracing::trace;

use crate::{ArvosError, EnvelopeErrorReason, Result};

/// Size of the header length prefix.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// A parsed binary message: JSON header plus opaque payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub header: Map<String, Value>,
    pub payload: Bytes,
}

impl Envelope {
    /// The header's `type` field, if present and a string.
    pub fn message_type(&self) -> Option<&str> {
        self.header.get("type").and_then(Value::as_str)
    }

    /// Encode back into wire form.
    pub fn encode(&self) -> Result<Bytes> {
        encode_envelope(&self.header, &self.payload)
    }
}

/// Read a little-endian u32 at `offset`, if the buffer is long enough.
fn read_u32_le(buffer: &[u8], offset: usize) -> Option<u32> {
    let bytes = buffer.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Split one binary message into header and payload.
///
/// # Errors
///
/// - `TruncatedLengthPrefix` if the buffer is shorter than four bytes
/// - `HeaderLengthExceedsBuffer` if `4 + header_length > buffer.len()`
/// - `InvalidJson` if the header bytes are not a UTF-8 JSON object
pub fn parse_envelope(buffer: &Bytes) -> Result<Envelope> {
    let header_length = read_u32_le(buffer, 0).ok_or_else(|| {
        ArvosError::malformed_envelope(
            EnvelopeErrorReason::TruncatedLengthPrefix,
            format!("need {} bytes for the length prefix, got {}", LENGTH_PREFIX_SIZE, buffer.len()),
        )
    })? as usize;

    let header_end = LENGTH_PREFIX_SIZE
        .checked_add(header_length)
        .filter(|end| *end <= buffer.len())
        .ok_or_else(|| {
            ArvosError::malformed_envelope(
                EnvelopeErrorReason::HeaderLengthExceedsBuffer,
                format!(
                    "header claims {} bytes but only {} remain",
                    header_length,
                    buffer.len() - LENGTH_PREFIX_SIZE
                ),
            )
        })?;

    let header_bytes = &buffer[LENGTH_PREFIX_SIZE..header_end];
    let header = match serde_json::from_slice::<Value>(header_bytes) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            return Err(ArvosError::malformed_envelope(
                EnvelopeErrorReason::InvalidJson,
                format!("header must be a JSON object, got {}", json_type_name(&other)),
            ));
        }
        Err(e) => {
            return Err(ArvosError::malformed_envelope(
                EnvelopeErrorReason::InvalidJson,
                e.to_string(),
            ));
        }
    };

    let payload = buffer.slice(header_end..);

    trace!("Parsed envelope: header={} bytes, payload={} bytes", header_length, payload.len());

    Ok(Envelope { header, payload })
}

/// Build a binary message from a header object and payload.
pub fn encode_envelope(header: &Map<String, Value>, payload: &[u8]) -> Result<Bytes> {
    let header_bytes = serde_json::to_vec(header).map_err(|e| {
        ArvosError::malformed_envelope(EnvelopeErrorReason::InvalidJson, e.to_string())
    })?;

    let header_length = u32::try_from(header_bytes.len()).map_err(|_| ArvosError::MessageTooLarge {
        size: header_bytes.len(),
        limit: u32::MAX as usize,
    })?;

    let mut out = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + header_bytes.len() + payload.len());
    out.put_u32_le(header_length);
    out.put_slice(&header_bytes);
    out.put_slice(payload);
    Ok(out.freeze())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
