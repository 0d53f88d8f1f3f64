//! Listener registration contract for connection notifications.
//!
//! The [`ConnectionManager`](crate::ConnectionManager) holds registered
//! listeners and invokes them synchronously, in registration order, while
//! processing connection events. Each notification is delivered before the
//! next event's state transition is applied.

use std::net::SocketAddr;

use crate::error::ChatwireError;

/// Receiver of connection notifications.
///
/// All methods default to no-ops so implementors only override what they
/// display. The core hands over classified errors and raw message text;
/// sender labels, timestamps, and user-facing wording belong to the
/// presentation layer.
pub trait ClientListener {
    /// Fired exactly once per successful connection establishment.
    fn on_connected(&mut self, remote: SocketAddr) {
        let _ = remote;
    }

    /// Fired once per complete decoded message, in arrival order.
    fn on_message(&mut self, text: &str) {
        let _ = text;
    }

    /// Fired on any connection-level failure, after the state has been
    /// reset to idle.
    fn on_error(&mut self, error: &ChatwireError) {
        let _ = error;
    }

    /// Fired when the remote end closes the connection gracefully. Not an
    /// error condition.
    fn on_closed(&mut self) {}
}
