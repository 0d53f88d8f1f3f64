//! Frame buffer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` for buffer management. Incoming bytes are appended
//! in arrival order and complete frames are consumed from the front. Decoding
//! is transactional: the length prefix is only peeked until the full payload
//! is present, so a delivery that stops mid-frame leaves the buffer
//! byte-for-byte unchanged for the next attempt.
//!
//! # Example
//!
//! ```
//! use chatwire::protocol::{encode_message, FrameBuffer};
//!
//! let mut buffer = FrameBuffer::new();
//! let frame = encode_message("hi").unwrap();
//!
//! // Data arrives in chunks from the socket
//! assert!(buffer.push(&frame[..3]).unwrap().is_empty());
//! assert_eq!(buffer.push(&frame[3..]).unwrap(), vec!["hi".to_string()]);
//! ```

use bytes::{Buf, BytesMut};

use super::wire_format::{read_length_prefix, DEFAULT_MAX_PAYLOAD_SIZE, LENGTH_PREFIX_SIZE};
use crate::error::{ChatwireError, Result};

/// Buffer for accumulating incoming bytes and extracting complete messages.
///
/// Bytes are never reordered, duplicated, or dropped except by consuming a
/// fully decoded frame from the front.
pub struct FrameBuffer {
    /// Accumulated bytes from socket reads.
    buffer: BytesMut,
    /// Maximum allowed payload size.
    max_payload_size: u32,
}

impl FrameBuffer {
    /// Create a new frame buffer with default settings.
    ///
    /// Default capacity: 64 KiB, max payload: 16 MiB.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(64 * 1024),
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }

    /// Create a new frame buffer with a custom max payload size.
    pub fn with_max_payload(max_payload_size: u32) -> Self {
        Self {
            buffer: BytesMut::with_capacity(64 * 1024),
            max_payload_size,
        }
    }

    /// Push a delivery into the buffer and extract all complete messages.
    ///
    /// This is the main API for processing incoming data from the socket.
    /// Bytes are appended first, then as many complete frames as possible
    /// are decoded. A message whose final byte arrives in this delivery is
    /// returned by this call, not deferred. Incomplete trailing bytes stay
    /// buffered for the next push.
    ///
    /// # Errors
    ///
    /// Returns [`ChatwireError::MalformedFrame`] if a declared payload length
    /// exceeds the configured cap or a payload is not valid UTF-8. The byte
    /// stream can no longer be trusted after either; callers must abort the
    /// connection.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<String>> {
        self.buffer.extend_from_slice(data);

        let mut messages = Vec::new();

        while let Some(text) = self.try_decode_one()? {
            messages.push(text);
        }

        Ok(messages)
    }

    /// Try to decode a single message from the front of the buffer.
    ///
    /// Returns:
    /// - `Ok(Some(text))` if a complete frame was consumed
    /// - `Ok(None)` if more data is needed (nothing consumed)
    /// - `Err(...)` on an untrustworthy stream
    fn try_decode_one(&mut self) -> Result<Option<String>> {
        // Partial header: wait for more data, not an error.
        let Some(declared) = read_length_prefix(&self.buffer) else {
            return Ok(None);
        };

        if declared > self.max_payload_size {
            return Err(ChatwireError::MalformedFrame(format!(
                "declared payload length {} exceeds maximum {}",
                declared, self.max_payload_size
            )));
        }

        let payload_len = declared as usize;
        let frame_len = LENGTH_PREFIX_SIZE + payload_len;

        // Partial payload: leave the prefix unconsumed so the next delivery
        // re-checks this exact state.
        if self.buffer.len() < frame_len {
            return Ok(None);
        }

        let text = std::str::from_utf8(&self.buffer[LENGTH_PREFIX_SIZE..frame_len])
            .map_err(|e| ChatwireError::MalformedFrame(format!("payload is not UTF-8: {e}")))?
            .to_owned();

        self.buffer.advance(frame_len);

        Ok(Some(text))
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Discard all buffered bytes.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
