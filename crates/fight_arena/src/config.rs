//! Arena configuration: players, pacing and sandbox limits.

use derive_getters::Getters;
use derive_more::{Display, Error};
use fight_tictactoe::{GameSession, Player, PlayerKind};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Delays that let observers follow automated play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pacing {
    /// Pause between a bot choosing a cell and the move being applied.
    #[serde(default = "default_move_delay_ms")]
    pub move_delay_ms: u64,
    /// Pause between turns.
    #[serde(default = "default_turn_delay_ms")]
    pub turn_delay_ms: u64,
}

fn default_move_delay_ms() -> u64 {
    300
}

fn default_turn_delay_ms() -> u64 {
    500
}

impl Pacing {
    /// No delays at all.
    pub fn instant() -> Self {
        Self {
            move_delay_ms: 0,
            turn_delay_ms: 0,
        }
    }

    /// Pause before applying a bot's move.
    pub fn move_delay(&self) -> Duration {
        Duration::from_millis(self.move_delay_ms)
    }

    /// Pause between turns.
    pub fn turn_delay(&self) -> Duration {
        Duration::from_millis(self.turn_delay_ms)
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            move_delay_ms: default_move_delay_ms(),
            turn_delay_ms: default_turn_delay_ms(),
        }
    }
}

/// Resource bounds for externally supplied bots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxLimits {
    /// Wall-clock limit for compiling or invoking a bot.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Heap limit for each bot's interpreter state.
    #[serde(default = "default_memory_limit_bytes")]
    pub memory_limit_bytes: usize,
}

fn default_timeout_ms() -> u64 {
    250
}

fn default_memory_limit_bytes() -> usize {
    8 * 1024 * 1024
}

impl SandboxLimits {
    /// Wall-clock limit as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            memory_limit_bytes: default_memory_limit_bytes(),
        }
    }
}

/// Full configuration for a match.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct ArenaConfig {
    /// Exactly two players, first seat first.
    players: Vec<Player>,

    /// Pacing for automated play.
    #[serde(default)]
    pacing: Pacing,

    /// Bounds for sandboxed bots.
    #[serde(default)]
    sandbox: SandboxLimits,
}

impl ArenaConfig {
    /// Creates a configuration for the given players with default pacing
    /// and sandbox limits.
    pub fn new(players: [Player; 2]) -> Self {
        Self {
            players: players.into(),
            pacing: Pacing::default(),
            sandbox: SandboxLimits::default(),
        }
    }

    /// Replaces the pacing.
    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    #[instrument(skip(content))]
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        info!(players = config.players.len(), "Config loaded successfully");
        Ok(config)
    }

    /// Checks player count, bot sources and player distinctness.
    #[instrument(skip(self))]
    pub fn validate(&self) -> Result<(), ConfigError> {
        let players = self.seated_players()?;

        for player in &players {
            match &player.kind {
                PlayerKind::Remote { url } if url.trim().is_empty() => {
                    return Err(ConfigError::new(format!(
                        "Player {} is a remote bot with an empty url",
                        player.id
                    )));
                }
                PlayerKind::Inline { source } if source.trim().is_empty() => {
                    return Err(ConfigError::new(format!(
                        "Player {} is an inline bot with no source",
                        player.id
                    )));
                }
                _ => {}
            }
        }

        GameSession::new(players).map_err(|e| ConfigError::new(e.to_string()))?;
        Ok(())
    }

    /// The two players as a seat-ordered pair.
    pub fn seated_players(&self) -> Result<[Player; 2], ConfigError> {
        <[Player; 2]>::try_from(self.players.clone()).map_err(|players| {
            ConfigError::new(format!(
                "Expected exactly 2 players, found {}",
                players.len()
            ))
        })
    }
}

impl Default for ArenaConfig {
    /// Two preset bots, `O` moving first.
    fn default() -> Self {
        Self::new([
            Player::new("p1", "Player 1", 'O', PlayerKind::Preset),
            Player::new("p2", "Player 2", 'X', PlayerKind::Preset),
        ])
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}
