//! Minimal terminal chat client.
//!
//! Run with: `cargo run --example chat -- <host> <port>`
//!
//! Lines typed on stdin are sent to the peer; received messages and
//! connection events are printed with a timestamp. All formatting lives
//! here, outside the core.

use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use chatwire::{ChatwireError, ClientListener, ConnectionManager};
use tokio::io::{AsyncBufReadExt, BufReader};

struct Display;

fn stamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl ClientListener for Display {
    fn on_connected(&mut self, remote: SocketAddr) {
        println!("[{}] connected to {remote}", stamp());
    }

    fn on_message(&mut self, text: &str) {
        println!("[{}] peer: {text}", stamp());
    }

    fn on_error(&mut self, error: &ChatwireError) {
        println!("[{}] error: {error}", stamp());
    }

    fn on_closed(&mut self) {
        println!("[{}] peer closed the connection", stamp());
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "127.0.0.1".to_string());
    let port: u16 = args.next().as_deref().unwrap_or("5000").parse()?;

    let mut manager = ConnectionManager::new();
    manager.add_listener(Box::new(Display));
    manager.connect(&host, port)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            alive = manager.process_next_event() => {
                if !alive {
                    break;
                }
            }
            line = lines.next_line() => {
                match line? {
                    Some(text) if !text.is_empty() => {
                        if let Err(e) = manager.send_text(&text) {
                            println!("[{}] send failed: {e}", stamp());
                        } else {
                            println!("[{}] you: {text}", stamp());
                        }
                    }
                    Some(_) => {}
                    None => break,
                }
            }
        }
    }

    Ok(())
}
