//! Tic-tac-toe game state machine for bot fights.
//!
//! A [`GameSession`] owns the board, the append-only move history, the
//! turn pointer and the strike counter. Every transition emits a
//! [`GameEvent`] to subscribers.
//!
//! # Rules
//!
//! - A move is valid when the cell id is in `0..9` and unoccupied.
//! - An invalid attempt is a strike; the mover keeps the turn.
//! - Three consecutive strikes forfeit the game to the opponent.
//! - A completed row, column or diagonal wins; a full board ties.
//!
//! # Example
//!
//! ```
//! use fight_tictactoe::{GameSession, Player, PlayerKind};
//!
//! let mut session = GameSession::new([
//!     Player::new("p1", "Player 1", 'O', PlayerKind::Human),
//!     Player::new("p2", "Player 2", 'X', PlayerKind::Human),
//! ])?;
//! session.start()?;
//! for cell in [0, 1, 4, 2, 8] {
//!     session.attempt_move(cell);
//! }
//! assert!(session.has_ended());
//! assert_eq!(session.winner().map(|p| p.symbol), Some('O'));
//! # Ok::<(), fight_tictactoe::GameError>(())
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod board;
mod error;
mod events;
mod history;
pub mod invariants;
mod player;
mod session;
mod snapshot;

pub use board::{Board, CELL_COUNT, Cell, Square, WIN_LINES};
pub use error::GameError;
pub use events::{EventBus, GameEvent, WinReason};
pub use history::{History, HistoryEntry, MoveStatus};
pub use player::{Player, PlayerId, PlayerInfo, PlayerKind, Seat};
pub use session::{GameSession, MoveOutcome, Phase, STRIKE_LIMIT};
pub use snapshot::{CellView, HistoryView, StateView};
