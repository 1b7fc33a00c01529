//! Session orchestration: the reader/sender tasks around one engine loop.
pub mod input;
pub mod runner;
pub mod tasks;

use tokio::io::{AsyncBufRead, AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::core::config::SessionConfig;
use crate::core::error::SessionError;
use crate::core::lobby::Role;
use crate::core::network::{Message, MessageReader, MessageWriter};
use crate::core::renderer::GameRenderer;
use crate::core::shutdown::Shutdown;
use crate::games::gomoku::View;

pub use runner::{Phase, SessionOutcome, SessionReport, SyncEngine};

/// Everything the engine loop reacts to, in one stream
pub(crate) enum EngineEvent {
    Network(Message),
    /// The receiver handed over everything the peer sent before it hung up.
    PeerClosed,
    Input(String),
    Tick,
    Shutdown,
}

/// Runs one game over an already established link.
///
/// Spawns the network receiver, input reader and sender, drives the engine
/// until the game ends or the session collapses, then closes `shutdown` and
/// waits for every task. A finished game gets up to `config.linger` for its
/// last messages to leave.
pub async fn run_session<R, W, I, V>(
    role: Role,
    config: &SessionConfig,
    reader: R,
    writer: W,
    input: I,
    renderer: V,
    shutdown: Shutdown,
) -> Result<SessionReport, SessionError>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
    I: AsyncBufRead + Unpin + Send + 'static,
    V: GameRenderer<View>,
{
    let (inbound_tx, inbound_rx) = mpsc::channel(config.inbound_queue_depth);
    let (input_tx, input_rx) = mpsc::channel(config.input_queue_depth);
    let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_queue_depth);

    let receiver = tasks::spawn_receiver(MessageReader::new(reader, config.wire), inbound_tx, shutdown.clone());
    let input_reader = tasks::spawn_input_reader(input, input_tx, shutdown.clone());
    let sender = tasks::spawn_sender(MessageWriter::new(writer, config.wire), outbound_rx, shutdown.clone());

    info!(?role, wire = ?config.wire, "session started");
    let engine = SyncEngine::new(role, config, renderer, outbound_tx, shutdown.clone());
    let result = engine.run(inbound_rx, input_rx, config.tick_interval).await;

    // the engine dropped its outbox, so the sender drains what is left and stops
    match tokio::time::timeout(config.linger, sender).await {
        Ok(Ok(())) => debug!("outbound queue drained"),
        Ok(Err(e)) => warn!(error = %e, "sender task failed"),
        Err(_) => warn!(linger = ?config.linger, "peer did not drain in time, dropping queued messages"),
    }

    shutdown.trigger();
    for (name, task) in [("receiver", receiver), ("input", input_reader)] {
        if let Err(e) = task.await {
            warn!(task = name, error = %e, "task failed");
        }
    }
    result
}
