//! Error taxonomy shared by the game rules, the wire layer and the engine.
use thiserror::Error;

use crate::games::gomoku::{Player, BOARD_SIZE};

/// A placement the rules refuse. Recoverable: the board is left untouched.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidMove {
    #[error("({x}, {y}) is off the board, use 0-{max}", max = BOARD_SIZE - 1)]
    OutOfRange { x: i32, y: i32 },

    #[error("({x}, {y}) is already occupied")]
    Occupied { x: i32, y: i32 },

    #[error("the game is already over")]
    GameOver,
}

/// Something the remote peer sent that we refuse to apply.
///
/// Answered with an `error` message; never ends the game by itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolViolation {
    #[error("move from player {sender} while it is {expected}'s turn")]
    OutOfTurn { sender: Player, expected: TurnLabel },

    #[error("illegal move: {0}")]
    IllegalMove(#[from] InvalidMove),

    #[error("unknown player id {0}")]
    UnknownPlayer(i32),

    #[error("malformed state message (turn {turn}, winner {winner})")]
    MalformedState { turn: i32, winner: i32 },
}

/// Display helper for "whose turn" in violation messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnLabel(pub Option<Player>);

impl std::fmt::Display for TurnLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(player) => write!(f, "player {player}"),
            None => f.write_str("nobody"),
        }
    }
}

/// Duplicate or echoed protocol traffic. Silently ignored, never surfaced.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateConflict {
    #[error("local player is already assigned as player {0}")]
    AlreadyAssigned(Player),

    #[error("echo of our own message")]
    SelfEcho,
}

/// Fatal failure of the connection. Collapses the session.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json decode error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("postcard decode error: {0}")]
    Postcard(#[from] postcard::Error),

    #[error("frame of {0} bytes exceeds the limit")]
    FrameTooLarge(usize),
}

/// Errors that abort [`run_session`](crate::engine::run_session).
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error("render failure: {0}")]
    Render(#[source] std::io::Error),
}
