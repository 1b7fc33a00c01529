//! Wire schema and framing for the duplex game link.
use futures_util::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::core::error::{ProtocolViolation, TransportError};
use crate::games::gomoku::{Outcome, Player};

/// Upper bound for a single encoded message.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Move,
    Chat,
    State,
    Assign,
    Error,
    Notify,
    #[serde(other)]
    Unknown,
}

/// One protocol message. Fields that do not belong to `kind` stay at zero/empty
/// and are ignored by the receiver.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default)]
    pub player: i32,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub turn: i32,
    #[serde(default)]
    pub winner: i32,
}

impl Message {
    fn bare(kind: MessageKind, player: Player) -> Self {
        Self {
            kind,
            player: player.id(),
            x: 0,
            y: 0,
            content: String::new(),
            turn: 0,
            winner: 0,
        }
    }

    pub fn movement(player: Player, x: i32, y: i32) -> Self {
        Self { x, y, ..Self::bare(MessageKind::Move, player) }
    }

    pub fn chat(player: Player, text: impl Into<String>) -> Self {
        Self { content: text.into(), ..Self::bare(MessageKind::Chat, player) }
    }

    /// End-of-game (or turn) authority from the sender.
    pub fn state_sync(player: Player, turn: Option<Player>, winner: Option<Outcome>) -> Self {
        Self {
            turn: turn.map_or(0, Player::id),
            winner: winner.map_or(0, Outcome::wire_id),
            ..Self::bare(MessageKind::State, player)
        }
    }

    /// Tells the peer which player it is.
    pub fn assign(to: Player) -> Self {
        Self::bare(MessageKind::Assign, to)
    }

    pub fn error(player: Player, text: impl Into<String>) -> Self {
        Self { content: text.into(), ..Self::bare(MessageKind::Error, player) }
    }

    pub fn notify(player: Player, text: impl Into<String>) -> Self {
        Self { content: text.into(), ..Self::bare(MessageKind::Notify, player) }
    }

    pub fn sender(&self) -> Result<Player, ProtocolViolation> {
        Player::from_id(self.player).ok_or(ProtocolViolation::UnknownPlayer(self.player))
    }

    /// Decodes the `turn`/`winner` pair of a `state` message.
    pub fn state(&self) -> Result<(Option<Player>, Option<Outcome>), ProtocolViolation> {
        let malformed = || ProtocolViolation::MalformedState { turn: self.turn, winner: self.winner };
        let turn = match self.turn {
            0 => None,
            id => Some(Player::from_id(id).ok_or_else(malformed)?),
        };
        let winner = Outcome::from_wire(self.winner).map_err(|_| malformed())?;
        Ok((turn, winner))
    }
}

/// Framing used on the byte stream.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Big-endian u32 length prefix + postcard body.
    Postcard,
}

/// Read half of the link. Only the receiver task owns one.
pub struct MessageReader<R> {
    inner: BufReader<R>,
    format: WireFormat,
    line: String,
}

impl<R: AsyncRead + Unpin> MessageReader<R> {
    pub fn new(inner: R, format: WireFormat) -> Self {
        Self {
            inner: BufReader::new(inner),
            format,
            line: String::new(),
        }
    }

    /// Next decoded message, or `Ok(None)` when the peer closed at a frame boundary.
    pub async fn next_message(&mut self) -> Result<Option<Message>, TransportError> {
        match self.format {
            WireFormat::Json => self.next_json().await,
            WireFormat::Postcard => self.next_postcard().await,
        }
    }

    async fn next_json(&mut self) -> Result<Option<Message>, TransportError> {
        loop {
            self.line.clear();
            let n = (&mut self.inner)
                .take(MAX_FRAME_LEN as u64 + 1)
                .read_line(&mut self.line)
                .await?;
            if n == 0 {
                return Ok(None);
            }
            if n > MAX_FRAME_LEN {
                return Err(TransportError::FrameTooLarge(n));
            }
            let record = self.line.trim();
            if record.is_empty() {
                continue;
            }
            return Ok(Some(serde_json::from_str(record)?));
        }
    }

    async fn next_postcard(&mut self) -> Result<Option<Message>, TransportError> {
        // only an EOF before the first prefix byte is a clean close
        let mut prefix = [0u8; 4];
        if self.inner.read(&mut prefix[..1]).await? == 0 {
            return Ok(None);
        }
        self.inner.read_exact(&mut prefix[1..]).await?;
        let len = u32::from_be_bytes(prefix) as usize;
        if len > MAX_FRAME_LEN {
            return Err(TransportError::FrameTooLarge(len));
        }
        let mut buf = vec![0u8; len];
        self.inner.read_exact(&mut buf).await?;
        Ok(Some(postcard::from_bytes(&buf)?))
    }

    /// Turns the reader into a stream that ends after a close or the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<Message, TransportError>> {
        stream::unfold(Some(self), |reader| async move {
            let mut reader = reader?;
            match reader.next_message().await {
                Ok(Some(msg)) => Some((Ok(msg), Some(reader))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }
}

/// Write half of the link. Only the sender task owns one, which serializes writes.
pub struct MessageWriter<W> {
    inner: W,
    format: WireFormat,
}

impl<W: AsyncWrite + Unpin> MessageWriter<W> {
    pub fn new(inner: W, format: WireFormat) -> Self {
        Self { inner, format }
    }

    /// Encodes and writes one frame. Frames the peer's reader would refuse are
    /// rejected before anything is written.
    pub async fn send(&mut self, msg: &Message) -> Result<(), TransportError> {
        match self.format {
            WireFormat::Json => {
                let mut bytes = serde_json::to_vec(msg)?;
                bytes.push(b'\n');
                if bytes.len() > MAX_FRAME_LEN {
                    return Err(TransportError::FrameTooLarge(bytes.len()));
                }
                self.inner.write_all(&bytes).await?;
            }
            WireFormat::Postcard => {
                let bytes = postcard::to_stdvec(msg)?;
                if bytes.len() > MAX_FRAME_LEN {
                    return Err(TransportError::FrameTooLarge(bytes.len()));
                }
                self.inner.write_u32(bytes.len() as u32).await?;
                self.inner.write_all(&bytes).await?;
            }
        }
        self.inner.flush().await?;
        Ok(())
    }

    /// Flushes and closes the write direction.
    pub async fn close(&mut self) -> Result<(), TransportError> {
        self.inner.shutdown().await?;
        Ok(())
    }
}
