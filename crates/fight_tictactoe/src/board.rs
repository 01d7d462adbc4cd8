//! The 3x3 board and its win/tie rules.

use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Number of cells on the board.
pub const CELL_COUNT: usize = 9;

/// The eight winning lines, as cell ids.
pub const WIN_LINES: [[usize; 3]; 8] = [
    // Rows
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    // Columns
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    // Diagonals
    [0, 4, 8],
    [2, 4, 6],
];

/// Occupancy of a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Square {
    /// Unoccupied.
    Empty,
    /// Occupied by the player using this symbol.
    Occupied(char),
}

impl Square {
    /// Returns the occupying symbol, if any.
    pub fn symbol(self) -> Option<char> {
        match self {
            Square::Empty => None,
            Square::Occupied(symbol) => Some(symbol),
        }
    }
}

/// A cell id paired with its occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// Cell id in `0..9`, row-major.
    pub id: usize,
    /// Current occupancy.
    pub square: Square,
}

/// 3x3 board, cells in row-major order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    squares: [Square; CELL_COUNT],
}

impl Board {
    /// Creates an empty board.
    pub fn new() -> Self {
        Self {
            squares: [Square::Empty; CELL_COUNT],
        }
    }

    /// Gets the square at `pos`, or `None` when out of range.
    pub fn get(&self, pos: usize) -> Option<Square> {
        self.squares.get(pos).copied()
    }

    /// True when `pos` is on the board and unoccupied.
    pub fn is_empty(&self, pos: usize) -> bool {
        matches!(self.get(pos), Some(Square::Empty))
    }

    /// Converts `cell` to a board index if it names an unoccupied cell.
    ///
    /// Takes any integer so that out-of-range attempts from bots and
    /// humans are rejected here rather than at the call site.
    pub fn vacant(&self, cell: i64) -> Option<usize> {
        usize::try_from(cell).ok().filter(|&pos| self.is_empty(pos))
    }

    /// Marks `pos` with `symbol`. Callers validate with [`Board::vacant`] first.
    pub(crate) fn occupy(&mut self, pos: usize, symbol: char) {
        debug_assert!(self.is_empty(pos), "cell {pos} already occupied");
        if let Some(square) = self.squares.get_mut(pos) {
            *square = Square::Occupied(symbol);
        }
    }

    /// All squares in id order.
    pub fn squares(&self) -> &[Square; CELL_COUNT] {
        &self.squares
    }

    /// All cells with their ids.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.squares
            .iter()
            .enumerate()
            .map(|(id, &square)| Cell { id, square })
    }

    /// Number of occupied cells.
    pub fn occupied(&self) -> usize {
        self.squares.iter().filter(|s| **s != Square::Empty).count()
    }

    /// Checks if every cell is occupied.
    #[instrument(skip(self))]
    pub fn is_full(&self) -> bool {
        self.squares.iter().all(|s| *s != Square::Empty)
    }

    /// Checks whether `symbol` holds any complete line.
    #[instrument(skip(self))]
    pub fn has_line(&self, symbol: char) -> bool {
        WIN_LINES.iter().any(|line| {
            line.iter()
                .all(|&pos| self.get(pos) == Some(Square::Occupied(symbol)))
        })
    }

    /// Formats the board as a human-readable grid; empty cells show their id.
    pub fn display(&self) -> String {
        let mut result = String::new();
        for row in 0..3 {
            for col in 0..3 {
                let pos = row * 3 + col;
                match self.squares[pos] {
                    Square::Empty => result.push_str(&pos.to_string()),
                    Square::Occupied(symbol) => result.push(symbol),
                }
                if col < 2 {
                    result.push('|');
                }
            }
            if row < 2 {
                result.push_str("\n-+-+-\n");
            }
        }
        result
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}
