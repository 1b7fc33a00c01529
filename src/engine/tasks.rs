//! The blocking-read tasks and the sender task that surround the engine loop.
//!
//! Each task owns one end of the I/O, forwards through a bounded queue and
//! observes the shared [`Shutdown`], checked before any other branch. The
//! input reader closes the token when stdin ends or fails, the receiver when
//! the link fails, and the sender when a write fails. A clean hang-up by the
//! peer only closes the inbound queue, so the engine still sees every message
//! sent before it.
use futures_util::StreamExt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::core::network::{Message, MessageReader, MessageWriter};
use crate::core::shutdown::Shutdown;

/// Reads messages off the link and republishes them to the engine.
///
/// A full queue makes this task wait for the engine (backpressure) rather than
/// drop messages.
pub fn spawn_receiver<R>(reader: MessageReader<R>, tx: mpsc::Sender<Message>, shutdown: Shutdown) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let messages = reader.into_stream();
        tokio::pin!(messages);
        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                next = messages.next() => next,
            };
            match next {
                Some(Ok(msg)) => {
                    debug!(kind = ?msg.kind, player = msg.player, "received message");
                    tokio::select! {
                        biased;
                        _ = shutdown.wait() => break,
                        sent = tx.send(msg) => if sent.is_err() { break },
                    }
                }
                Some(Err(e)) => {
                    warn!(error = %e, "failed to read from peer");
                    shutdown.trigger();
                    break;
                }
                None => {
                    info!("connection closed by peer");
                    break;
                }
            }
        }
        debug!("network receiver exiting");
    })
}

/// Reads local input lines and republishes them to the engine.
pub fn spawn_input_reader<I>(input: I, tx: mpsc::Sender<String>, shutdown: Shutdown) -> JoinHandle<()>
where
    I: AsyncBufRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = input.lines();
        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                next = lines.next_line() => next,
            };
            match next {
                Ok(Some(line)) => {
                    tokio::select! {
                        biased;
                        _ = shutdown.wait() => break,
                        sent = tx.send(line) => if sent.is_err() { break },
                    }
                }
                Ok(None) => {
                    info!("input closed");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "failed to read input");
                    break;
                }
            }
        }
        shutdown.trigger();
        debug!("input reader exiting");
    })
}

/// Drains the outbound queue onto the link, one write at a time.
///
/// Ends when the queue is closed and empty, or on shutdown. A failed write is
/// a transport failure and closes the token.
pub fn spawn_sender<W>(mut writer: MessageWriter<W>, mut rx: mpsc::Receiver<Message>, shutdown: Shutdown) -> JoinHandle<()>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown.wait() => return,
                next = rx.recv() => next,
            };
            let Some(msg) = next else { break };
            if let Err(e) = writer.send(&msg).await {
                warn!(error = %e, kind = ?msg.kind, "failed to send message");
                shutdown.trigger();
                return;
            }
            debug!(kind = ?msg.kind, "sent message");
        }
        if let Err(e) = writer.close().await {
            debug!(error = %e, "failed to close the write half");
        }
        debug!("sender exiting");
    })
}
