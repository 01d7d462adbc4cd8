//! Typed notifications emitted on every session transition.

use crate::player::PlayerInfo;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

/// Why a game was won.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WinReason {
    /// The winner completed a line.
    Line,
    /// The opponent reached the strike limit.
    Forfeit,
}

/// Messages sent from the session to its observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// A move was applied.
    MoveSuccess {
        /// The mover.
        player: PlayerInfo,
        /// The occupied cell.
        cell: usize,
    },
    /// A move was rejected.
    MoveFailure {
        /// The mover.
        player: PlayerInfo,
        /// The attempted cell.
        cell: i64,
        /// Consecutive strikes including this one.
        strikes: u8,
    },
    /// The game ended with a winner. Fires at most once per game.
    Win {
        /// The winning player.
        winner: PlayerInfo,
        /// How the game was won.
        reason: WinReason,
    },
    /// The board filled with no line. Fires at most once per game.
    Tie,
    /// The session returned to its pre-start condition.
    Reset,
    /// The designated start player changed.
    SwapStartPlayer {
        /// Who moves first in the next game.
        start_player: PlayerInfo,
    },
    /// A bot failed to produce a move; the turn counted as a strike.
    Error {
        /// The bot's player.
        player: PlayerInfo,
        /// Diagnostic detail.
        message: String,
        /// Consecutive strikes including this one.
        strikes: u8,
    },
}

impl GameEvent {
    /// True for [`GameEvent::Win`] and [`GameEvent::Tie`].
    pub fn is_terminal(&self) -> bool {
        matches!(self, GameEvent::Win { .. } | GameEvent::Tie)
    }
}

/// Fan-out of events to any number of subscribers.
///
/// Subscribers whose receiver was dropped are pruned on the next emit.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<mpsc::UnboundedSender<GameEvent>>,
}

impl EventBus {
    /// Creates a bus with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<GameEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    /// Delivers `event` to every live subscriber.
    pub fn emit(&mut self, event: GameEvent) {
        debug!(?event, subscribers = self.subscribers.len(), "Emitting event");
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
