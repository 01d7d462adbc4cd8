//! Plain-data copies of session state handed to bots.
//!
//! Nothing here borrows from the session: every string is owned and every
//! player is reduced to a [`PlayerInfo`], so a bot may do what it likes with
//! its copy.

use crate::board::Board;
use crate::history::{History, MoveStatus};
use crate::player::PlayerInfo;
use serde::{Deserialize, Serialize};

/// One board cell as bots see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellView {
    /// Cell id in `0..9`.
    pub id: usize,
    /// Occupying symbol, empty string when unoccupied.
    pub symbol: String,
}

/// One history entry as bots see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryView {
    /// Attempted cell; absent for turns lost to a bot error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell: Option<i64>,
    /// The mover's identity.
    pub player: PlayerInfo,
    /// Outcome of the attempt.
    pub status: MoveStatus,
}

/// Read-only state handed to a decision callable.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StateView {
    /// All nine cells in id order.
    pub cells: Vec<CellView>,
    /// Every attempt so far.
    pub history: Vec<HistoryView>,
}

impl StateView {
    /// Deep-copies `board` and `history`.
    pub fn capture(board: &Board, history: &History) -> Self {
        let cells = board
            .cells()
            .map(|cell| CellView {
                id: cell.id,
                symbol: cell.square.symbol().map(String::from).unwrap_or_default(),
            })
            .collect();

        let history = history
            .entries()
            .iter()
            .map(|entry| HistoryView {
                cell: entry.cell(),
                player: entry.player().info(),
                status: entry.status(),
            })
            .collect();

        Self { cells, history }
    }

    /// First unoccupied cell by ascending id.
    pub fn first_empty(&self) -> Option<usize> {
        self.cells
            .iter()
            .find(|cell| cell.symbol.is_empty())
            .map(|cell| cell.id)
    }
}
