//! Wire format encoding and decoding helpers.
//!
//! Implements the length-prefixed frame format:
//! ```text
//! ┌────────────────┬──────────────────────┐
//! │ Length         │ Payload              │
//! │ 4 bytes        │ Length bytes         │
//! │ uint32 BE      │ UTF-8 text           │
//! └────────────────┴──────────────────────┘
//! ```
//!
//! The prefix carries the exact byte count of the payload. The payload is
//! not null-terminated.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{ChatwireError, Result};

/// Length prefix size in bytes (fixed, exactly 4).
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Default maximum payload size (16 MiB).
///
/// Bounds decoder allocations against a hostile or broken peer. Both ends
/// must agree on the cap for oversized messages to fail symmetrically.
pub const DEFAULT_MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

/// Encode a text message into a complete wire frame.
///
/// Pure function of its input: writes the 4-byte Big Endian length prefix
/// followed by the UTF-8 payload bytes.
///
/// # Errors
///
/// Returns [`ChatwireError::MessageTooLarge`] if the payload exceeds
/// [`DEFAULT_MAX_PAYLOAD_SIZE`].
///
/// # Example
///
/// ```
/// use chatwire::protocol::encode_message;
///
/// let frame = encode_message("hello").unwrap();
/// assert_eq!(&frame[..], &[0, 0, 0, 5, b'h', b'e', b'l', b'l', b'o']);
/// ```
pub fn encode_message(text: &str) -> Result<Bytes> {
    encode_message_with_limit(text, DEFAULT_MAX_PAYLOAD_SIZE)
}

/// Encode a text message with an explicit payload size cap.
///
/// # Errors
///
/// Returns [`ChatwireError::MessageTooLarge`] if the payload exceeds
/// `max_payload_size` or the numeric range of the prefix.
pub fn encode_message_with_limit(text: &str, max_payload_size: u32) -> Result<Bytes> {
    let payload = text.as_bytes();

    let len = u32::try_from(payload.len()).map_err(|_| ChatwireError::MessageTooLarge {
        size: payload.len(),
        max: max_payload_size,
    })?;

    if len > max_payload_size {
        return Err(ChatwireError::MessageTooLarge {
            size: payload.len(),
            max: max_payload_size,
        });
    }

    let mut buf = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    buf.put_u32(len);
    buf.put_slice(payload);
    Ok(buf.freeze())
}

/// Read the length prefix from the front of a buffer without consuming it.
///
/// Returns `None` if fewer than [`LENGTH_PREFIX_SIZE`] bytes are available.
///
/// # Example
///
/// ```
/// use chatwire::protocol::read_length_prefix;
///
/// assert_eq!(read_length_prefix(&[0, 0, 0, 5, b'h']), Some(5));
/// assert_eq!(read_length_prefix(&[0, 0]), None);
/// ```
pub fn read_length_prefix(buf: &[u8]) -> Option<u32> {
    if buf.len() < LENGTH_PREFIX_SIZE {
        return None;
    }
    Some(u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]))
}
