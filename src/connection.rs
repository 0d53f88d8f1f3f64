//! Connection manager and lifecycle state machine.
//!
//! The [`ConnectionManager`] owns exactly one outbound TCP connection at a
//! time. A connect request spawns a connection task that resolves the host,
//! dials, and then splits the stream into a read loop and a writer task.
//! Everything the task observes flows back over a single event channel, so
//! listener notifications are delivered sequentially and never concurrently.
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──connect()──► Connecting ──established──► Connected
//!   ▲                     │                           │
//!   └──── error ──────────┘          close / error ───┘
//! ```
//!
//! `connect` is legal from any state and first tears down whatever came
//! before it. `abort` discards the socket, buffered bytes, and any events
//! still queued from the discarded attempt.

use std::net::SocketAddr;

use bytes::Bytes;
use tokio::io::AsyncReadExt;
use tokio::net::{lookup_host, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{classify_connect_error, ChatwireError, Result};
use crate::event::ClientListener;
use crate::protocol::{encode_message_with_limit, FrameBuffer, DEFAULT_MAX_PAYLOAD_SIZE};
use crate::writer::{self, WriterHandle};

/// Read buffer size for the socket read loop.
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection and no attempt in flight.
    Idle,
    /// Connection attempt in flight.
    Connecting,
    /// Connection established; sending is allowed.
    Connected,
}

/// Raw event reported by the connection task.
#[derive(Debug)]
pub(crate) enum ConnEvent {
    /// Connection established; carries the resolved remote address.
    Connected(SocketAddr),
    /// New bytes arrived. No message boundary guarantee at this layer.
    Data(Bytes),
    /// Socket-level failure.
    Error(ChatwireError),
    /// Remote end closed the connection gracefully.
    Closed,
}

/// Handles for one live connection attempt or session.
///
/// Dropping this silences the attempt: the event receiver goes with it, so
/// nothing queued by the task can be observed afterwards.
struct Link {
    writer: WriterHandle,
    events_rx: mpsc::UnboundedReceiver<ConnEvent>,
    task: JoinHandle<()>,
}

/// Manages one outbound connection's lifecycle and frames its traffic.
///
/// The TCP stream is owned exclusively by the spawned connection task; the
/// caller only ever holds this manager. Events are delivered by driving
/// [`process_next_event`](Self::process_next_event) or
/// [`process_pending_events`](Self::process_pending_events) from a single
/// task.
pub struct ConnectionManager {
    state: ConnectionState,
    listeners: Vec<Box<dyn ClientListener + Send>>,
    frame_buffer: FrameBuffer,
    max_payload_size: u32,
    link: Option<Link>,
}

impl ConnectionManager {
    /// Create a manager with default settings.
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Idle,
            listeners: Vec::new(),
            frame_buffer: FrameBuffer::new(),
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            link: None,
        }
    }

    /// Create a manager with a custom payload size cap, applied to both
    /// encode and decode.
    pub fn with_max_payload(max_payload_size: u32) -> Self {
        Self {
            state: ConnectionState::Idle,
            listeners: Vec::new(),
            frame_buffer: FrameBuffer::with_max_payload(max_payload_size),
            max_payload_size,
            link: None,
        }
    }

    /// Register a listener. Listeners are notified in registration order.
    pub fn add_listener(&mut self, listener: Box<dyn ClientListener + Send>) {
        self.listeners.push(listener);
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Initiate an asynchronous connection attempt.
    ///
    /// Any existing connection is aborted first. The attempt itself runs on
    /// a spawned task; its outcome surfaces through listener notifications
    /// once events are processed. Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ChatwireError::HostUnreachable`] for an empty host or port
    /// zero, without starting an attempt.
    pub fn connect(&mut self, host: &str, port: u16) -> Result<()> {
        if host.is_empty() {
            return Err(ChatwireError::HostUnreachable("empty host name".into()));
        }
        if port == 0 {
            return Err(ChatwireError::HostUnreachable(
                "port must be in 1..=65535".into(),
            ));
        }

        self.abort();

        tracing::debug!(host, port, "starting connection attempt");

        let (writer, frames_rx) = writer::channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_connection(host.to_owned(), port, frames_rx, events_tx));

        self.link = Some(Link {
            writer,
            events_rx,
            task,
        });
        self.state = ConnectionState::Connecting;

        Ok(())
    }

    /// Encode a text message and queue it for transmission.
    ///
    /// Fire-and-forget: the call never blocks, and the write outcome
    /// surfaces asynchronously through listener notifications.
    ///
    /// # Errors
    ///
    /// - [`ChatwireError::NotConnected`] outside the `Connected` state; the
    ///   whole call is rejected and nothing is queued.
    /// - [`ChatwireError::MessageTooLarge`] if the payload exceeds the cap;
    ///   nothing is sent.
    pub fn send_text(&mut self, text: &str) -> Result<()> {
        if self.state != ConnectionState::Connected {
            return Err(ChatwireError::NotConnected);
        }

        let frame = encode_message_with_limit(text, self.max_payload_size)?;
        self.send_raw(frame)
    }

    /// Queue a pre-encoded frame for transmission.
    ///
    /// # Errors
    ///
    /// Returns [`ChatwireError::NotConnected`] outside the `Connected`
    /// state.
    pub fn send_raw(&mut self, frame: Bytes) -> Result<()> {
        if self.state != ConnectionState::Connected {
            return Err(ChatwireError::NotConnected);
        }

        let link = self.link.as_ref().ok_or(ChatwireError::NotConnected)?;
        link.writer.try_send(frame)
    }

    /// Discard the current connection, if any, and reset to idle.
    ///
    /// Always succeeds, including mid-attempt. No events from the discarded
    /// connection are delivered afterwards.
    pub fn abort(&mut self) {
        if self.link.is_some() {
            tracing::debug!("aborting connection");
        }
        self.teardown();
    }

    /// Wait for the next connection event and process it.
    ///
    /// Applies the state transition, then dispatches listener notifications.
    /// Returns `false` when there is no live connection to wait on.
    pub async fn process_next_event(&mut self) -> bool {
        let event = match self.link.as_mut() {
            Some(link) => link.events_rx.recv().await,
            None => return false,
        };

        match event {
            Some(event) => {
                self.handle_event(event);
                true
            }
            None => false,
        }
    }

    /// Process every event already queued, without waiting.
    ///
    /// Returns the number of events processed.
    pub fn process_pending_events(&mut self) -> usize {
        let mut processed = 0;

        loop {
            let event = match self.link.as_mut() {
                Some(link) => match link.events_rx.try_recv() {
                    Ok(event) => event,
                    Err(_) => break,
                },
                None => break,
            };

            self.handle_event(event);
            processed += 1;
        }

        processed
    }

    /// Apply one raw event: transition state, then notify listeners in
    /// registration order.
    fn handle_event(&mut self, event: ConnEvent) {
        match event {
            ConnEvent::Connected(addr) => {
                self.state = ConnectionState::Connected;
                tracing::debug!(%addr, "connection established");
                for listener in &mut self.listeners {
                    listener.on_connected(addr);
                }
            }
            ConnEvent::Data(bytes) => match self.frame_buffer.push(&bytes) {
                Ok(messages) => {
                    for text in &messages {
                        for listener in &mut self.listeners {
                            listener.on_message(text);
                        }
                    }
                }
                Err(error) => {
                    // The byte stream can no longer be trusted; abort rather
                    // than attempt to resynchronize.
                    tracing::warn!(%error, "tearing down connection");
                    self.teardown();
                    for listener in &mut self.listeners {
                        listener.on_error(&error);
                    }
                }
            },
            ConnEvent::Error(error) => {
                self.teardown();
                for listener in &mut self.listeners {
                    listener.on_error(&error);
                }
            }
            ConnEvent::Closed => {
                tracing::debug!("remote closed connection");
                self.teardown();
                for listener in &mut self.listeners {
                    listener.on_closed();
                }
            }
        }
    }

    /// Drop the link, discard buffered bytes, and reset to idle.
    fn teardown(&mut self) {
        if let Some(link) = self.link.take() {
            link.task.abort();
        }
        self.frame_buffer.clear();
        self.state = ConnectionState::Idle;
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve the host and dial the first address that accepts.
async fn establish(host: &str, port: u16) -> Result<TcpStream> {
    let addrs = lookup_host((host, port))
        .await
        .map_err(|e| ChatwireError::HostUnreachable(e.to_string()))?;

    let mut last_err = None;

    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(e) => last_err = Some(e),
        }
    }

    Err(match last_err {
        Some(e) => classify_connect_error(e),
        None => ChatwireError::HostUnreachable(format!("no addresses resolved for {host}")),
    })
}

/// Connection task: dial, then bridge the socket to the event channel.
async fn run_connection(
    host: String,
    port: u16,
    frames_rx: mpsc::Receiver<Bytes>,
    events_tx: mpsc::UnboundedSender<ConnEvent>,
) {
    let stream = match establish(&host, port).await {
        Ok(stream) => stream,
        Err(error) => {
            let _ = events_tx.send(ConnEvent::Error(error));
            return;
        }
    };

    let remote = match stream.peer_addr() {
        Ok(addr) => addr,
        Err(e) => {
            let _ = events_tx.send(ConnEvent::Error(ChatwireError::Transport(e)));
            return;
        }
    };

    let _ = events_tx.send(ConnEvent::Connected(remote));

    let (read_half, write_half) = stream.into_split();

    let writer_events = events_tx.clone();
    let writer_task = tokio::spawn(async move {
        if let Err(error) = writer::writer_loop(frames_rx, write_half).await {
            let _ = writer_events.send(ConnEvent::Error(error));
        }
    });

    read_loop(read_half, events_tx).await;
    writer_task.abort();
}

/// Socket read loop: forward raw deliveries until close or failure.
async fn read_loop<R>(mut reader: R, events_tx: mpsc::UnboundedSender<ConnEvent>)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_BUFFER_SIZE];

    loop {
        match reader.read(&mut buf).await {
            Ok(0) => {
                let _ = events_tx.send(ConnEvent::Closed);
                return;
            }
            Ok(n) => {
                let data = Bytes::copy_from_slice(&buf[..n]);
                if events_tx.send(ConnEvent::Data(data)).is_err() {
                    // Manager aborted; nothing left to report to.
                    return;
                }
            }
            Err(e) => {
                let _ = events_tx.send(ConnEvent::Error(ChatwireError::Transport(e)));
                return;
            }
        }
    }
}
