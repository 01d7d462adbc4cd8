//! Player records and seats.

use serde::{Deserialize, Serialize};

/// Unique identifier for a player.
pub type PlayerId = String;

/// Where a player's move-selection logic comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PlayerKind {
    /// Moves arrive from outside, one `attempt_move` per action.
    Human,
    /// Built-in strategy: first empty cell by ascending id.
    Preset,
    /// Bot source fetched from a URL when the game starts.
    Remote {
        /// Location of the bot source.
        url: String,
    },
    /// Bot source supplied inline.
    Inline {
        /// The bot source text.
        source: String,
    },
}

impl PlayerKind {
    /// True for every kind except [`PlayerKind::Human`].
    pub fn is_bot(&self) -> bool {
        !matches!(self, PlayerKind::Human)
    }
}

/// A configured player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Player's unique ID.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Mark placed on the board.
    pub symbol: char,
    /// Source of the player's moves.
    #[serde(flatten)]
    pub kind: PlayerKind,
}

impl Player {
    /// Creates a new player.
    pub fn new(
        id: impl Into<PlayerId>,
        name: impl Into<String>,
        symbol: char,
        kind: PlayerKind,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            symbol,
            kind,
        }
    }

    /// Reduces the record to the identity fields bots may see.
    pub fn info(&self) -> PlayerInfo {
        PlayerInfo {
            id: self.id.clone(),
            symbol: self.symbol.to_string(),
            name: self.name.clone(),
        }
    }
}

/// Plain identity record: no kind, no bot source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerInfo {
    /// Player's unique ID.
    pub id: PlayerId,
    /// Mark placed on the board.
    pub symbol: String,
    /// Display name.
    pub name: String,
}

/// One of the two places at the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Seat {
    /// The first configured player.
    First,
    /// The second configured player.
    Second,
}

impl Seat {
    /// Returns the other seat.
    pub fn opponent(self) -> Self {
        match self {
            Seat::First => Seat::Second,
            Seat::Second => Seat::First,
        }
    }

    /// Index into a two-element player array.
    pub fn index(self) -> usize {
        match self {
            Seat::First => 0,
            Seat::Second => 1,
        }
    }
}
