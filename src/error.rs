//! Error types for chatwire.

use thiserror::Error;

/// Main error type for all chatwire operations.
#[derive(Debug, Error)]
pub enum ChatwireError {
    /// Name resolution or connect attempt failed before any bytes were
    /// exchanged.
    #[error("host unreachable: {0}")]
    HostUnreachable(String),

    /// The remote endpoint actively refused the connection.
    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    /// Send attempted while not in the `Connected` state.
    #[error("not connected")]
    NotConnected,

    /// Payload byte length exceeds what the length prefix can carry.
    #[error("message too large: {size} bytes exceeds limit of {max}")]
    MessageTooLarge {
        /// Actual payload size in bytes.
        size: usize,
        /// Maximum allowed payload size.
        max: u32,
    },

    /// Decode hit an internally inconsistent byte stream. The connection
    /// is no longer trustworthy and must be torn down, never resynchronized.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// Any other I/O failure from the underlying stream.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
}

impl ChatwireError {
    /// Classify this error for the presentation boundary.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::HostUnreachable(_) => ErrorKind::HostUnreachable,
            Self::ConnectionRefused(_) => ErrorKind::ConnectionRefused,
            Self::NotConnected => ErrorKind::NotConnected,
            Self::MessageTooLarge { .. } => ErrorKind::MessageTooLarge,
            Self::MalformedFrame(_) => ErrorKind::MalformedFrame,
            Self::Transport(_) => ErrorKind::Transport,
        }
    }
}

/// Coarse error classification surfaced to the presentation layer.
///
/// The core never produces user-facing text; callers map these kinds to
/// whatever display language they need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Resolution or connect failure before any bytes were exchanged.
    HostUnreachable,
    /// Remote actively refused.
    ConnectionRefused,
    /// Send outside the `Connected` state.
    NotConnected,
    /// Encode-time payload size violation.
    MessageTooLarge,
    /// Untrustworthy byte stream detected during decode.
    MalformedFrame,
    /// Generic stream I/O failure.
    Transport,
}

/// Map an error from a TCP connect attempt onto the taxonomy.
///
/// Refusal is distinguished from unreachability; anything else is a generic
/// transport failure.
pub(crate) fn classify_connect_error(err: std::io::Error) -> ChatwireError {
    use std::io::ErrorKind as IoKind;

    match err.kind() {
        IoKind::ConnectionRefused => ChatwireError::ConnectionRefused(err.to_string()),
        IoKind::NotFound | IoKind::AddrNotAvailable | IoKind::TimedOut => {
            ChatwireError::HostUnreachable(err.to_string())
        }
        _ => ChatwireError::Transport(err),
    }
}

/// Result type alias using ChatwireError.
pub type Result<T> = std::result::Result<T, ChatwireError>;
