//! Board & rules: placement validity, five-in-a-row detection, full-board draw.
//!
//! Everything here is pure. Callers are expected to run the check and the
//! placement inside one critical section of the session's state lock.
use std::fmt;

use crate::core::error::InvalidMove;

pub const BOARD_SIZE: usize = 15;

/// Number of same-player stones in a row that wins the game.
pub const WIN_LENGTH: usize = 5;

/// Probe directions: horizontal, vertical, diagonal, anti-diagonal.
const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Player {
    One,
    Two,
}

impl Player {
    /// Wire id, 1 or 2.
    pub fn id(self) -> i32 {
        match self {
            Player::One => 1,
            Player::Two => 2,
        }
    }

    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            1 => Some(Player::One),
            2 => Some(Player::Two),
            _ => None,
        }
    }

    pub fn other(self) -> Self {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }

    pub fn mark(self) -> char {
        match self {
            Player::One => 'X',
            Player::Two => 'O',
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Stone(Player),
}

/// A validated board coordinate. `row` is the wire `x`, `col` the wire `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pos {
    pub row: usize,
    pub col: usize,
}

impl Pos {
    /// Bounds-checks raw wire/input coordinates.
    pub fn checked(x: i32, y: i32) -> Option<Self> {
        let row = usize::try_from(x).ok().filter(|r| *r < BOARD_SIZE)?;
        let col = usize::try_from(y).ok().filter(|c| *c < BOARD_SIZE)?;
        Some(Self { row, col })
    }

    fn step(self, (dr, dc): (isize, isize), n: isize) -> Option<Self> {
        let row = self.row.checked_add_signed(dr * n)?;
        let col = self.col.checked_add_signed(dc * n)?;
        (row < BOARD_SIZE && col < BOARD_SIZE).then_some(Self { row, col })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    grid: [[Cell; BOARD_SIZE]; BOARD_SIZE],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub fn new() -> Self {
        Self {
            grid: [[Cell::Empty; BOARD_SIZE]; BOARD_SIZE],
        }
    }

    pub fn get(&self, pos: Pos) -> Cell {
        self.grid[pos.row][pos.col]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell; BOARD_SIZE]> {
        self.grid.iter()
    }

    pub fn is_valid_placement(&self, x: i32, y: i32) -> bool {
        self.check_placement(x, y).is_ok()
    }

    /// Like [`is_valid_placement`](Self::is_valid_placement) but says why not.
    pub fn check_placement(&self, x: i32, y: i32) -> Result<Pos, InvalidMove> {
        let pos = Pos::checked(x, y).ok_or(InvalidMove::OutOfRange { x, y })?;
        match self.get(pos) {
            Cell::Empty => Ok(pos),
            Cell::Stone(_) => Err(InvalidMove::Occupied { x, y }),
        }
    }

    /// Writes the stone. The caller must have validated `pos` under the same lock.
    pub fn place(&mut self, pos: Pos, player: Player) {
        debug_assert_eq!(self.get(pos), Cell::Empty);
        self.grid[pos.row][pos.col] = Cell::Stone(player);
    }

    pub fn has_five_in_row(&self, player: Player) -> bool {
        let stone = Cell::Stone(player);
        self.positions()
            .filter(|pos| self.get(*pos) == stone)
            .any(|pos| {
                DIRECTIONS.iter().any(|&dir| {
                    (1..WIN_LENGTH as isize)
                        .all(|n| pos.step(dir, n).is_some_and(|p| self.get(p) == stone))
                })
            })
    }

    pub fn is_full(&self) -> bool {
        self.grid.iter().flatten().all(|cell| *cell != Cell::Empty)
    }

    pub fn stone_count(&self) -> usize {
        self.grid
            .iter()
            .flatten()
            .filter(|cell| **cell != Cell::Empty)
            .count()
    }

    fn positions(&self) -> impl Iterator<Item = Pos> {
        (0..BOARD_SIZE).flat_map(|row| (0..BOARD_SIZE).map(move |col| Pos { row, col }))
    }
}
