//! Reassembly of length-prefixed messages from a chunked byte stream
//!
//! Transports with a small MTU (BLE notifications) split each message into
//! arbitrary chunks. The sender prefixes every message with its length:
//!
//! ```text
//! [length: u32 LE][message bytes ...][length: u32 LE][message bytes ...]
//! ```
//!
//! [`StreamReassembler`] buffers chunks and yields every complete message.

use bytes::{Buf, Bytes, BytesMut};
use tracing::{trace, warn};

use crate::{ArvosError, Result};

use super::LENGTH_PREFIX_SIZE;

/// Accumulates stream chunks into whole messages.
#[derive(Debug)]
pub struct StreamReassembler {
    buffer: BytesMut,
    max_message_size: usize,
    /// Oversized length seen after messages that were already returned.
    desync: Option<usize>,
}

impl StreamReassembler {
    pub fn new(max_message_size: usize) -> Self {
        Self { buffer: BytesMut::new(), max_message_size, desync: None }
    }

    /// Append a chunk and drain every message it completes.
    ///
    /// A length prefix above the configured maximum means the stream is
    /// desynchronised and the buffered bytes are discarded. If messages were
    /// completed earlier in the same call they are returned, and the
    /// `MessageTooLarge` error is returned by the next call instead. That
    /// call still buffers its chunk.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<Bytes>> {
        self.buffer.extend_from_slice(chunk);

        if let Some(size) = self.desync.take() {
            return Err(ArvosError::MessageTooLarge { size, limit: self.max_message_size });
        }

        let mut messages = Vec::new();

        while self.buffer.len() >= LENGTH_PREFIX_SIZE {
            let length = u32::from_le_bytes([
                self.buffer[0],
                self.buffer[1],
                self.buffer[2],
                self.buffer[3],
            ]) as usize;

            if length > self.max_message_size {
                warn!(
                    "Discarding {} buffered bytes: message length {} exceeds limit {}",
                    self.buffer.len(),
                    length,
                    self.max_message_size
                );
                self.buffer.clear();
                if messages.is_empty() {
                    return Err(ArvosError::MessageTooLarge { size: length, limit: self.max_message_size });
                }
                self.desync = Some(length);
                break;
            }

            if self.buffer.len() < LENGTH_PREFIX_SIZE + length {
                break;
            }

            self.buffer.advance(LENGTH_PREFIX_SIZE);
            messages.push(self.buffer.split_to(length).freeze());
        }

        trace!("Reassembled {} messages, {} bytes pending", messages.len(), self.buffer.len());
        Ok(messages)
    }

    /// Bytes waiting for the rest of their message.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.desync = None;
    }
}

/// Prefix `message` with its u32 LE length.
///
/// Fails with `MessageTooLarge` if the length does not fit in a u32.
pub fn frame_message(message: &[u8]) -> Result<Bytes> {
    let length = u32::try_from(message.len())
        .map_err(|_| ArvosError::MessageTooLarge { size: message.len(), limit: u32::MAX as usize })?;

    let mut out = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + message.len());
    out.extend_from_slice(&length.to_le_bytes());
    out.extend_from_slice(message);
    Ok(out.freeze())
}
