//! Protocol module - wire format and framing.
//!
//! Implements the length-prefixed text frame format:
//! - 4-byte Big Endian length prefix encoding
//! - Frame buffer for accumulating partial reads

mod frame_buffer;
mod wire_format;

pub use frame_buffer::FrameBuffer;
pub use wire_format::{
    encode_message, encode_message_with_limit, read_length_prefix, DEFAULT_MAX_PAYLOAD_SIZE,
    LENGTH_PREFIX_SIZE,
};
