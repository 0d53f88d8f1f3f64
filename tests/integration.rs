//! Integration tests for chatwire.
//!
//! These exercise the full stack over real localhost TCP sockets: connection
//! lifecycle, wire bytes, split-delivery reassembly, and error surfacing.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chatwire::protocol::encode_message;
use chatwire::{ChatwireError, ClientListener, ConnectionManager, ConnectionState, ErrorKind};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// One recorded listener notification.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Notification {
    Connected(SocketAddr),
    Message(String),
    Error(ErrorKind),
    Closed,
}

/// Listener that records every notification for later assertions.
#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<Notification>>>);

impl Recorder {
    fn events(&self) -> Vec<Notification> {
        self.0.lock().unwrap().clone()
    }

    fn messages(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|n| match n {
                Notification::Message(text) => Some(text),
                _ => None,
            })
            .collect()
    }
}

impl ClientListener for Recorder {
    fn on_connected(&mut self, remote: SocketAddr) {
        self.0.lock().unwrap().push(Notification::Connected(remote));
    }

    fn on_message(&mut self, text: &str) {
        self.0
            .lock()
            .unwrap()
            .push(Notification::Message(text.to_owned()));
    }

    fn on_error(&mut self, error: &ChatwireError) {
        self.0.lock().unwrap().push(Notification::Error(error.kind()));
    }

    fn on_closed(&mut self) {
        self.0.lock().unwrap().push(Notification::Closed);
    }
}

/// Drive the event pump until the recorded notifications satisfy `pred`.
async fn pump_until<F>(manager: &mut ConnectionManager, recorder: &Recorder, pred: F)
where
    F: Fn(&[Notification]) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        while !pred(&recorder.events()) {
            assert!(
                manager.process_next_event().await,
                "event stream ended before expected notification"
            );
        }
    })
    .await
    .expect("timed out waiting for notification");
}

fn connected_manager() -> (ConnectionManager, Recorder) {
    let recorder = Recorder::default();
    let mut manager = ConnectionManager::new();
    manager.add_listener(Box::new(recorder.clone()));
    (manager, recorder)
}

/// Full session: connect, send, receive a frame split across deliveries,
/// remote close.
#[tokio::test]
async fn test_full_session() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let server_addr = listener.local_addr().unwrap();

    let (mut manager, recorder) = connected_manager();
    assert_eq!(manager.state(), ConnectionState::Idle);

    manager.connect("127.0.0.1", server_addr.port()).unwrap();
    assert_eq!(manager.state(), ConnectionState::Connecting);

    let (mut server, _) = listener.accept().await.unwrap();

    pump_until(&mut manager, &recorder, |events| {
        events
            .iter()
            .any(|n| matches!(n, Notification::Connected(_)))
    })
    .await;
    assert_eq!(manager.state(), ConnectionState::Connected);
    assert_eq!(recorder.events(), vec![Notification::Connected(server_addr)]);

    // Send "hello" and verify the exact bytes on the wire
    manager.send_text("hello").unwrap();

    let mut wire = [0u8; 9];
    server.read_exact(&mut wire).await.unwrap();
    assert_eq!(&wire, &[0, 0, 0, 5, b'h', b'e', b'l', b'l', b'o']);

    // Remote sends the same frame split across three deliveries
    server.write_all(&[0, 0]).await.unwrap();
    server.flush().await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    server.write_all(&[0, 5, b'h', b'e']).await.unwrap();
    server.flush().await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    server.write_all(&[b'l', b'l', b'o']).await.unwrap();
    server.flush().await.unwrap();

    pump_until(&mut manager, &recorder, |events| {
        events.iter().any(|n| matches!(n, Notification::Message(_)))
    })
    .await;
    assert_eq!(recorder.messages(), vec!["hello".to_string()]);

    // Remote closes gracefully
    drop(server);
    pump_until(&mut manager, &recorder, |events| {
        events.iter().any(|n| matches!(n, Notification::Closed))
    })
    .await;
    assert_eq!(manager.state(), ConnectionState::Idle);

    // Sending while idle is rejected with no transmission
    let result = manager.send_text("too late");
    assert!(matches!(result, Err(ChatwireError::NotConnected)));
}

#[tokio::test]
async fn test_multiple_frames_in_one_delivery() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let (mut manager, recorder) = connected_manager();
    manager.connect("127.0.0.1", port).unwrap();
    let (mut server, _) = listener.accept().await.unwrap();

    let mut combined = Vec::new();
    combined.extend_from_slice(&encode_message("one").unwrap());
    combined.extend_from_slice(&encode_message("two").unwrap());
    combined.extend_from_slice(&encode_message("three").unwrap());
    server.write_all(&combined).await.unwrap();

    pump_until(&mut manager, &recorder, |_| {
        recorder.messages().len() >= 3
    })
    .await;
    assert_eq!(recorder.messages(), vec!["one", "two", "three"]);
}

#[tokio::test]
async fn test_zero_length_message() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let (mut manager, recorder) = connected_manager();
    manager.connect("127.0.0.1", port).unwrap();
    let (mut server, _) = listener.accept().await.unwrap();

    server.write_all(&encode_message("").unwrap()).await.unwrap();

    pump_until(&mut manager, &recorder, |events| {
        events.iter().any(|n| matches!(n, Notification::Message(_)))
    })
    .await;
    assert_eq!(recorder.messages(), vec![String::new()]);
}

#[tokio::test]
async fn test_connection_refused() {
    // Grab a free port, then drop the listener so the port refuses
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let (mut manager, recorder) = connected_manager();
    manager.connect("127.0.0.1", port).unwrap();

    pump_until(&mut manager, &recorder, |events| !events.is_empty()).await;

    assert_eq!(
        recorder.events(),
        vec![Notification::Error(ErrorKind::ConnectionRefused)]
    );
    assert_eq!(manager.state(), ConnectionState::Idle);
}

#[tokio::test]
async fn test_oversized_declared_length_aborts() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let recorder = Recorder::default();
    let mut manager = ConnectionManager::with_max_payload(64);
    manager.add_listener(Box::new(recorder.clone()));

    manager.connect("127.0.0.1", port).unwrap();
    let (mut server, _) = listener.accept().await.unwrap();

    // Declared length far past the cap
    server.write_all(&1_000_000u32.to_be_bytes()).await.unwrap();

    pump_until(&mut manager, &recorder, |events| {
        events.iter().any(|n| matches!(n, Notification::Error(_)))
    })
    .await;

    assert_eq!(
        recorder.events().last(),
        Some(&Notification::Error(ErrorKind::MalformedFrame))
    );
    assert!(recorder.messages().is_empty());
    assert_eq!(manager.state(), ConnectionState::Idle);
}

#[tokio::test]
async fn test_message_too_large_rejected_at_encode() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let recorder = Recorder::default();
    let mut manager = ConnectionManager::with_max_payload(8);
    manager.add_listener(Box::new(recorder.clone()));

    manager.connect("127.0.0.1", port).unwrap();
    let (mut server, _) = listener.accept().await.unwrap();

    pump_until(&mut manager, &recorder, |events| {
        events
            .iter()
            .any(|n| matches!(n, Notification::Connected(_)))
    })
    .await;

    let result = manager.send_text("nine byte");
    assert!(matches!(
        result,
        Err(ChatwireError::MessageTooLarge { size: 9, max: 8 })
    ));
    // Still connected; the rejection changed no state
    assert_eq!(manager.state(), ConnectionState::Connected);

    // Only the follow-up small message reaches the wire
    manager.send_text("ok").unwrap();
    let mut wire = [0u8; 6];
    server.read_exact(&mut wire).await.unwrap();
    assert_eq!(&wire, &[0, 0, 0, 2, b'o', b'k']);
}

#[tokio::test]
async fn test_reconnect_after_close() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let (mut manager, recorder) = connected_manager();

    manager.connect("127.0.0.1", port).unwrap();
    let (server, _) = listener.accept().await.unwrap();
    drop(server);

    pump_until(&mut manager, &recorder, |events| {
        events.iter().any(|n| matches!(n, Notification::Closed))
    })
    .await;
    assert_eq!(manager.state(), ConnectionState::Idle);

    // connect is legal from any state
    manager.connect("127.0.0.1", port).unwrap();
    let (mut server, _) = listener.accept().await.unwrap();

    pump_until(&mut manager, &recorder, |events| {
        events
            .iter()
            .filter(|n| matches!(n, Notification::Connected(_)))
            .count()
            >= 2
    })
    .await;
    assert_eq!(manager.state(), ConnectionState::Connected);

    manager.send_text("back").unwrap();
    let mut wire = [0u8; 8];
    server.read_exact(&mut wire).await.unwrap();
    assert_eq!(&wire, &[0, 0, 0, 4, b'b', b'a', b'c', b'k']);
}

#[tokio::test]
async fn test_connect_replaces_inflight_attempt() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let (mut manager, recorder) = connected_manager();

    // First attempt goes to a port that will refuse
    let refused = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let refused_port = refused.local_addr().unwrap().port();
    drop(refused);

    manager.connect("127.0.0.1", refused_port).unwrap();
    // Replace it immediately; the first attempt's outcome must never surface
    manager.connect("127.0.0.1", port).unwrap();

    let _ = listener.accept().await.unwrap();

    pump_until(&mut manager, &recorder, |events| !events.is_empty()).await;

    assert!(matches!(recorder.events()[0], Notification::Connected(_)));
    assert!(recorder
        .events()
        .iter()
        .all(|n| !matches!(n, Notification::Error(_))));
}
