//! # chatwire
//!
//! Point-to-point text messaging client core.
//!
//! Turns an unbounded, arbitrarily-chunked TCP byte stream into a reliable
//! sequence of complete text messages, and manages the lifecycle of the one
//! connection carrying them.
//!
//! ## Architecture
//!
//! - **Frame Codec** ([`protocol`]): length-prefixed framing (`4-byte BE
//!   length || UTF-8 payload`) with an incremental, restartable decoder that
//!   never emits a partial message and never loses bytes across partial
//!   reads.
//! - **Connection Manager** ([`ConnectionManager`]): one outbound TCP
//!   connection, `Idle → Connecting → Connected` lifecycle, sequential
//!   event delivery to registered [`ClientListener`]s.
//!
//! ## Example
//!
//! ```ignore
//! use chatwire::{ClientListener, ConnectionManager};
//!
//! struct Printer;
//!
//! impl ClientListener for Printer {
//!     fn on_message(&mut self, text: &str) {
//!         println!("peer: {text}");
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> chatwire::Result<()> {
//!     let mut manager = ConnectionManager::new();
//!     manager.add_listener(Box::new(Printer));
//!     manager.connect("203.0.113.5", 5000)?;
//!
//!     while manager.process_next_event().await {
//!         // notifications are dispatched inside the pump
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod protocol;

mod connection;
mod event;
mod writer;

pub use connection::{ConnectionManager, ConnectionState};
pub use error::{ChatwireError, ErrorKind, Result};
pub use event::ClientListener;
