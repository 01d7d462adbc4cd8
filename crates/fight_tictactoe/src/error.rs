//! Session lifecycle errors.

use crate::player::PlayerId;

/// Misuse of the session that cannot be expressed as a strike.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum GameError {
    /// Both players were configured with the same id.
    #[display("Players share the id {:?}", _0)]
    DuplicatePlayerId(PlayerId),

    /// Both players were configured with the same symbol.
    #[display("Players share the symbol {:?}", _0)]
    DuplicateSymbol(char),

    /// `start` was called on a session that is not in its pre-start state.
    #[display("Game already started; reset before starting again")]
    AlreadyStarted,

    /// An automated game was requested with a human seated.
    #[display("Automated play needs two bots but {} is human", _0)]
    HumanSeated(String),
}

impl std::error::Error for GameError {}
