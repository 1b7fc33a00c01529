use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use super::board::{Board, Player};
use crate::core::error::{InvalidMove, StateConflict};

/// Default number of chat lines kept; older lines are evicted.
pub const CHAT_CAPACITY: usize = 20;

/// How a finished game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Won(Player),
    Draw,
}

impl Outcome {
    /// Wire encoding of the `winner` field: 1/2 for a win, 3 for a draw.
    pub fn wire_id(self) -> i32 {
        match self {
            Outcome::Won(player) => player.id(),
            Outcome::Draw => 3,
        }
    }

    /// Decodes `winner`. `Ok(None)` means the game is still in progress.
    pub fn from_wire(winner: i32) -> Result<Option<Self>, i32> {
        match winner {
            0 => Ok(None),
            3 => Ok(Some(Outcome::Draw)),
            other => Player::from_id(other).map(|p| Some(Outcome::Won(p))).ok_or(other),
        }
    }
}

/// Result of a successful [`GameState::apply_move`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Continued { next: Player },
    Won(Player),
    Drew,
}

impl MoveOutcome {
    pub fn finished(self) -> Option<Outcome> {
        match self {
            MoveOutcome::Continued { .. } => None,
            MoveOutcome::Won(player) => Some(Outcome::Won(player)),
            MoveOutcome::Drew => Some(Outcome::Draw),
        }
    }
}

/// Authoritative board-side state. Lives behind [`Session::game`].
///
/// `winner` doubles as the game-over flag, so the two can never disagree.
#[derive(Debug, Clone, Default)]
pub struct GameState {
    board: Board,
    current: Option<Player>,
    winner: Option<Outcome>,
    local: Option<Player>,
}

impl GameState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Whose turn it is. Only meaningful while the game is not over.
    pub fn current_player(&self) -> Option<Player> {
        self.current
    }

    pub fn winner(&self) -> Option<Outcome> {
        self.winner
    }

    pub fn is_over(&self) -> bool {
        self.winner.is_some()
    }

    pub fn local_player(&self) -> Option<Player> {
        self.local
    }

    /// Fixes our identity once. Player 1 always opens, whichever side we are.
    pub fn assign_local_player(&mut self, player: Player) -> Result<(), StateConflict> {
        if let Some(existing) = self.local {
            return Err(StateConflict::AlreadyAssigned(existing));
        }
        self.local = Some(player);
        self.current = Some(Player::One);
        Ok(())
    }

    /// Validates, places, then checks win before draw and hands the turn over.
    ///
    /// Turn order is the caller's business; on error nothing is mutated.
    pub fn apply_move(&mut self, x: i32, y: i32, player: Player) -> Result<MoveOutcome, InvalidMove> {
        if self.is_over() {
            return Err(InvalidMove::GameOver);
        }
        let pos = self.board.check_placement(x, y)?;
        self.board.place(pos, player);

        let outcome = if self.board.has_five_in_row(player) {
            self.winner = Some(Outcome::Won(player));
            MoveOutcome::Won(player)
        } else if self.board.is_full() {
            self.winner = Some(Outcome::Draw);
            MoveOutcome::Drew
        } else {
            self.current = Some(player.other());
            MoveOutcome::Continued { next: player.other() }
        };
        Ok(outcome)
    }

    /// Overwrites turn and result from the peer's StateSync. The board is untouched.
    pub fn sync_state(&mut self, turn: Option<Player>, winner: Option<Outcome>) {
        self.current = turn;
        self.winner = winner;
    }
}

/// Bounded, oldest-first chat history. Lives behind [`Session::chat`].
#[derive(Debug, Clone)]
pub struct ChatLog {
    lines: VecDeque<String>,
    capacity: usize,
}

impl Default for ChatLog {
    fn default() -> Self {
        Self::with_capacity(CHAT_CAPACITY)
    }
}

impl ChatLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sender: &str, text: &str) {
        self.lines.push_back(format!("[{sender}]: {text}"));
        while self.lines.len() > self.capacity {
            self.lines.pop_front();
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// "Needs redraw" flag, read-and-cleared in one step.
#[derive(Debug)]
pub struct RedrawFlag(AtomicBool);

impl RedrawFlag {
    pub fn new(pending: bool) -> Self {
        Self(AtomicBool::new(pending))
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns whether a redraw was owed and clears it.
    pub fn consume(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

/// The one aggregate of mutable session state.
///
/// Board, chat and the redraw flag are guarded independently so chat traffic
/// never queues behind a move evaluation. None of the locks nest.
#[derive(Debug)]
pub struct Session {
    pub game: Mutex<GameState>,
    pub chat: Mutex<ChatLog>,
    pub redraw: RedrawFlag,
}

impl Session {
    pub fn new(chat_capacity: usize) -> Self {
        Self {
            game: Mutex::new(GameState::new()),
            chat: Mutex::new(ChatLog::with_capacity(chat_capacity)),
            // the first frame is always owed
            redraw: RedrawFlag::new(true),
        }
    }

    pub async fn add_chat(&self, sender: &str, text: &str) {
        self.chat.lock().await.push(sender, text);
        self.redraw.set();
    }

    /// Copies everything the renderer needs, one lock at a time.
    pub async fn snapshot(&self) -> GameSnapshot {
        let (board, local, turn, outcome) = {
            let game = self.game.lock().await;
            (game.board().clone(), game.local_player(), game.current_player(), game.winner())
        };
        let chat = self.chat.lock().await.lines().map(str::to_owned).collect();
        GameSnapshot {
            board,
            chat,
            local,
            turn,
            outcome,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(CHAT_CAPACITY)
    }
}

/// Read-only copy of the session handed to renderers and reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSnapshot {
    pub board: Board,
    pub chat: Vec<String>,
    pub local: Option<Player>,
    pub turn: Option<Player>,
    pub outcome: Option<Outcome>,
}

impl GameSnapshot {
    pub fn is_local_turn(&self) -> bool {
        self.outcome.is_none() && self.local.is_some() && self.turn == self.local
    }
}
