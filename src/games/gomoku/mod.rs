//! Five-in-a-row on a 15x15 board, played between two terminals.
pub mod board;
pub mod game;
pub mod renderer;

pub use board::{Board, Cell, Player, Pos, BOARD_SIZE, WIN_LENGTH};
pub use game::{ChatLog, GameSnapshot, GameState, MoveOutcome, Outcome, RedrawFlag, Session, CHAT_CAPACITY};
pub use renderer::{ConsoleRenderer, View};
