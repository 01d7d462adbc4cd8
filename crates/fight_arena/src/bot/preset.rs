//! Built-in strategy used when a player has no custom code.

use super::{Answer, Bot, BotError};
use fight_tictactoe::StateView;

/// Plays the lowest-numbered empty cell.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstEmptyCell;

impl Bot for FirstEmptyCell {
    fn label(&self) -> &str {
        "preset"
    }

    fn think(&self, state: StateView) -> Result<Answer, BotError> {
        state
            .first_empty()
            .map(|cell| Answer {
                position: cell as i64,
            })
            .ok_or_else(|| BotError::Runtime("no empty cell left".into()))
    }
}
