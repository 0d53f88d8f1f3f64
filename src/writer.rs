//! Dedicated writer task for outbound frames.
//!
//! Outbound frames are pre-encoded `Bytes` handed to a single task that owns
//! the socket write half. Sends never block the caller: the channel is
//! bounded and a full queue surfaces as a transport error.
//!
//! # Architecture
//!
//! ```text
//! send_text ──► mpsc::Sender<Bytes> ──► Writer Task ──► TCP write half
//! ```
//!
//! The task batches frames that are already queued and writes them with a
//! single vectored write where possible.

use std::io::IoSlice;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{ChatwireError, Result};

/// Default outbound channel capacity.
const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Maximum frames to batch in a single write operation.
const MAX_BATCH_SIZE: usize = 64;

/// Handle for queueing frames to the writer task.
#[derive(Clone)]
pub(crate) struct WriterHandle {
    tx: mpsc::Sender<Bytes>,
}

impl WriterHandle {
    /// Queue a frame without waiting.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the queue is full or the writer task has
    /// stopped.
    pub(crate) fn try_send(&self, frame: Bytes) -> Result<()> {
        self.tx.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => ChatwireError::Transport(std::io::Error::new(
                std::io::ErrorKind::WouldBlock,
                "outbound frame queue is full",
            )),
            mpsc::error::TrySendError::Closed(_) => ChatwireError::Transport(
                std::io::Error::new(std::io::ErrorKind::BrokenPipe, "writer task stopped"),
            ),
        })
    }
}

/// Create the outbound frame channel.
///
/// The handle side stays with the connection manager; the receiver is moved
/// into the writer task once the socket is established.
pub(crate) fn channel() -> (WriterHandle, mpsc::Receiver<Bytes>) {
    let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
    (WriterHandle { tx }, rx)
}

/// Spawn the writer task for an established socket.
pub(crate) fn spawn_writer_task<W>(
    writer: W,
    rx: mpsc::Receiver<Bytes>,
) -> JoinHandle<Result<()>>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(writer_loop(rx, writer))
}

/// Main writer loop - receives frames and writes them to the socket.
pub(crate) async fn writer_loop<W>(mut rx: mpsc::Receiver<Bytes>, mut writer: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    loop {
        let first = match rx.recv().await {
            Some(f) => f,
            None => {
                // Channel closed, clean shutdown
                return Ok(());
            }
        };

        // Collect additional ready frames (non-blocking)
        let mut batch = Vec::with_capacity(MAX_BATCH_SIZE);
        batch.push(first);

        while batch.len() < MAX_BATCH_SIZE {
            match rx.try_recv() {
                Ok(frame) => batch.push(frame),
                Err(_) => break,
            }
        }

        write_batch(&mut writer, &batch).await?;
    }
}

/// Write a batch of frames using vectored I/O.
///
/// Falls back to rebuilding the slice list when the kernel accepts only part
/// of the batch.
async fn write_batch<W>(writer: &mut W, batch: &[Bytes]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    if batch.is_empty() {
        return Ok(());
    }

    let total_size: usize = batch.iter().map(Bytes::len).sum();
    let slices: Vec<IoSlice<'_>> = batch.iter().map(|f| IoSlice::new(f)).collect();

    let written = writer.write_vectored(&slices).await?;

    if written == total_size {
        writer.flush().await?;
        return Ok(());
    }

    if written == 0 {
        return Err(ChatwireError::Transport(std::io::Error::new(
            std::io::ErrorKind::WriteZero,
            "write_vectored returned 0",
        )));
    }

    let mut total_written = written;

    while total_written < total_size {
        let remaining = build_remaining_slices(batch, total_written);
        if remaining.is_empty() {
            break;
        }

        let written = writer.write_vectored(&remaining).await?;
        if written == 0 {
            return Err(ChatwireError::Transport(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                "write_vectored returned 0",
            )));
        }

        total_written += written;
    }

    writer.flush().await?;
    Ok(())
}

/// Build the IoSlice list for data remaining after a partial write.
fn build_remaining_slices(batch: &[Bytes], skip_bytes: usize) -> Vec<IoSlice<'_>> {
    let mut slices = Vec::with_capacity(batch.len());
    let mut skipped = 0;

    for frame in batch {
        let end = skipped + frame.len();

        if skip_bytes < end {
            let start_in_frame = skip_bytes.saturating_sub(skipped);
            slices.push(IoSlice::new(&frame[start_in_frame..]));
        }
        skipped = end;
    }

    slices
}
