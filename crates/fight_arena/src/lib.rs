//! Bot runtime and orchestrator for Tic Tac Toe FIGHT.
//!
//! Players are configured as humans, the preset first-empty-cell bot, or
//! Lua bots supplied inline or at a URL. An [`Arena`] resolves the bots,
//! runs them in a sandbox against detached snapshots, and feeds their
//! answers to a [`fight_tictactoe::GameSession`].

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod bot;
pub mod cli;
pub mod config;
mod orchestrator;

pub use bot::{Answer, Bot, BotError, BotRuntime, FirstEmptyCell, LuaBot, Unresolved};
pub use config::{ArenaConfig, ConfigError, Pacing, SandboxLimits};
pub use orchestrator::Arena;
