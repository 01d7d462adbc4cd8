//! Consistency checks for a game session.
//!
//! Each [`Invariant`] relates the board, the history and the strike counter
//! to one another. The session checks all of them after every transition in
//! debug builds; tests call [`violations`] directly.

use crate::board::{Board, Square};
use crate::history::MoveStatus;
use crate::session::{GameSession, STRIKE_LIMIT};
use strum::IntoEnumIterator;

/// A property every reachable session satisfies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
pub enum Invariant {
    /// Replaying the successful history onto an empty board never hits an
    /// occupied cell and reproduces the current board.
    #[strum(to_string = "occupied cells are never overwritten")]
    MonotonicBoard,

    /// Failures never pass the turn, so consecutive successes come from
    /// different players.
    #[strum(to_string = "successful moves alternate between players")]
    AlternatingTurns,

    /// The strike counter equals the run of trailing failures, stays within
    /// the limit, and every mark on the board has a successful entry.
    #[strum(to_string = "strike count matches trailing failures")]
    StrikeCount,
}

impl Invariant {
    /// Checks this invariant against `session`.
    pub fn holds(self, session: &GameSession) -> bool {
        match self {
            Invariant::MonotonicBoard => replays_to_board(session),
            Invariant::AlternatingTurns => {
                let movers: Vec<_> = session
                    .history()
                    .successes()
                    .map(|entry| entry.player().id.as_str())
                    .collect();
                movers.windows(2).all(|pair| pair[0] != pair[1])
            }
            Invariant::StrikeCount => strikes_consistent(session),
        }
    }
}

/// Every invariant `session` breaks, in declaration order.
pub fn violations(session: &GameSession) -> Vec<Invariant> {
    Invariant::iter()
        .filter(|invariant| !invariant.holds(session))
        .collect()
}

fn replays_to_board(session: &GameSession) -> bool {
    let mut replayed = Board::new();

    for entry in session.history().successes() {
        let Some(pos) = entry.cell().and_then(|c| usize::try_from(c).ok()) else {
            return false;
        };
        if !replayed.is_empty(pos) {
            return false;
        }
        replayed.occupy(pos, entry.player().symbol);
    }

    replayed == *session.board()
}

fn strikes_consistent(session: &GameSession) -> bool {
    let strikes = usize::from(session.strike_count());
    let history = session.history();
    let last_is_failure = history
        .last()
        .is_some_and(|e| e.status() == MoveStatus::Failure);
    let marks = session
        .board()
        .squares()
        .iter()
        .filter(|s| **s != Square::Empty)
        .count();

    strikes == history.trailing_failures()
        && strikes <= usize::from(STRIKE_LIMIT)
        && (strikes == 0 || last_is_failure)
        && marks == history.successes().count()
}
