use std::time::Duration;

use crate::core::network::WireFormat;
use crate::games::gomoku::CHAT_CAPACITY;

/// Tunables for one session. The CLI fills this in; tests use `Default`.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Upper bound on how stale the rendered view can get.
    pub tick_interval: Duration,
    /// Inbound messages buffered between the receiver task and the loop.
    /// A full queue makes the receiver wait (backpressure), nothing is dropped.
    pub inbound_queue_depth: usize,
    pub input_queue_depth: usize,
    /// Outbound messages waiting for the sender task. Overflow ends the session.
    pub outbound_queue_depth: usize,
    pub chat_capacity: usize,
    pub wire: WireFormat,
    pub connect_timeout: Duration,
    /// How long a finished game waits for queued messages to reach the peer.
    pub linger: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            inbound_queue_depth: 10,
            input_queue_depth: 1,
            outbound_queue_depth: 64,
            chat_capacity: CHAT_CAPACITY,
            wire: WireFormat::Json,
            connect_timeout: Duration::from_secs(10),
            linger: Duration::from_millis(500),
        }
    }
}
