//! Append-only record of every attempted move.

use crate::player::Player;
use derive_new::new;
use serde::{Deserialize, Serialize};

/// Outcome of an attempted move.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MoveStatus {
    /// The cell was occupied by the mover.
    Success,
    /// The attempt was rejected and counted as a strike.
    Failure,
}

/// A single attempt, as recorded at the time it was made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct HistoryEntry {
    /// Cell the mover attempted; `None` when a bot failed to produce one.
    cell: Option<i64>,
    /// The mover's full record at attempt time.
    player: Player,
    /// Whether the attempt succeeded.
    status: MoveStatus,
}

impl HistoryEntry {
    /// Cell the mover attempted, if any.
    pub fn cell(&self) -> Option<i64> {
        self.cell
    }

    /// The mover's record at attempt time.
    pub fn player(&self) -> &Player {
        &self.player
    }

    /// Whether the attempt succeeded.
    pub fn status(&self) -> MoveStatus {
        self.status
    }

    /// True for [`MoveStatus::Success`].
    pub fn succeeded(&self) -> bool {
        self.status == MoveStatus::Success
    }
}

/// Ordered log of attempts; entries are never modified once pushed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    /// All entries in attempt order.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Number of recorded attempts.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been attempted.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The most recent attempt.
    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    /// Iterates over successful attempts only.
    pub fn successes(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter().filter(|e| e.succeeded())
    }

    /// Count of failures since the most recent success.
    pub fn trailing_failures(&self) -> usize {
        self.entries
            .iter()
            .rev()
            .take_while(|e| !e.succeeded())
            .count()
    }
}
