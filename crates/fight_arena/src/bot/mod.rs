//! Bot runtime: turns a player's configured source into a decision
//! callable and invokes it against a detached snapshot.
//!
//! Every bot, whatever its origin, is resolved once per game start into an
//! `Arc<dyn Bot>`. Invocation runs on a blocking worker under a timeout, so
//! a bot that errors, hangs or answers nonsense costs its player a strike
//! and nothing more.

mod lua;
mod preset;
mod remote;

pub use lua::LuaBot;
pub use preset::FirstEmptyCell;
pub use remote::fetch_source;

use crate::config::SandboxLimits;
use fight_tictactoe::{GameSession, Player, PlayerKind, StateView};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Slack on top of the sandbox limit before the runtime stops waiting.
const INVOKE_GRACE: Duration = Duration::from_millis(100);

/// A bot's reply: the cell it wants to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    /// Target cell id. Not range-checked here; the session strikes bad ids.
    pub position: i64,
}

/// Why a bot could not produce a move.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum BotError {
    /// The remote source could not be retrieved.
    #[display("Failed to fetch bot source from {url}: {reason}")]
    Fetch {
        /// Location that was requested.
        url: String,
        /// Transport or status detail.
        reason: String,
    },

    /// The source did not evaluate to a function.
    #[display("Bot source did not compile: {}", _0)]
    Compile(String),

    /// The bot raised an error while deciding.
    #[display("Bot raised an error: {}", _0)]
    Runtime(String),

    /// The bot returned something other than `{position = <integer>}`.
    #[display("Bot returned a malformed answer: {}", _0)]
    MalformedAnswer(String),

    /// The bot ran past its time limit.
    #[display("Bot exceeded its {}ms time limit", _0)]
    Timeout(u64),
}

impl std::error::Error for BotError {}

/// A resolved decision callable.
///
/// Implementations receive an owned [`StateView`] and never see the
/// session itself.
pub trait Bot: Send + Sync {
    /// Short label for logs.
    fn label(&self) -> &str;

    /// Chooses a cell for the current mover.
    fn think(&self, state: StateView) -> Result<Answer, BotError>;
}

/// Stand-in for a bot whose source failed to resolve.
///
/// Every turn reports the resolution error, so the failure is
/// charged as a strike on the bot's own turns.
#[derive(Debug, Clone)]
pub struct Unresolved {
    error: BotError,
}

impl Unresolved {
    /// Wraps a resolution error.
    pub fn new(error: BotError) -> Self {
        Self { error }
    }
}

impl Bot for Unresolved {
    fn label(&self) -> &str {
        "unresolved"
    }

    fn think(&self, _state: StateView) -> Result<Answer, BotError> {
        Err(self.error.clone())
    }
}

/// Resolves and invokes bots under shared sandbox limits.
#[derive(Debug, Clone)]
pub struct BotRuntime {
    client: reqwest::Client,
    limits: SandboxLimits,
}

impl BotRuntime {
    /// Creates a runtime with its own HTTP client.
    pub fn new(limits: SandboxLimits) -> Self {
        Self {
            client: reqwest::Client::new(),
            limits,
        }
    }

    /// Resolves `player` into a decision callable; `None` for humans.
    ///
    /// # Errors
    ///
    /// Returns [`BotError::Fetch`] when a remote source cannot be retrieved
    /// and [`BotError::Compile`] when a source does not yield a function.
    #[instrument(skip(self, player), fields(player = %player.id))]
    pub async fn resolve(&self, player: &Player) -> Result<Option<Arc<dyn Bot>>, BotError> {
        let bot: Arc<dyn Bot> = match &player.kind {
            PlayerKind::Human => {
                debug!("Human player; nothing to resolve");
                return Ok(None);
            }
            PlayerKind::Preset => Arc::new(FirstEmptyCell),
            PlayerKind::Remote { url } => {
                let source = fetch_source(&self.client, url).await?;
                Arc::new(self.compile(&player.id, source).await?)
            }
            PlayerKind::Inline { source } => Arc::new(self.compile(&player.id, source.clone()).await?),
        };

        info!(bot = bot.label(), "Resolved bot");
        Ok(Some(bot))
    }

    /// Compiles Lua source on a blocking worker.
    async fn compile(&self, name: &str, source: String) -> Result<LuaBot, BotError> {
        let name = name.to_string();
        let limits = self.limits;
        tokio::task::spawn_blocking(move || LuaBot::compile(&name, &source, &limits))
            .await
            .map_err(|e| BotError::Compile(format!("compiler task failed: {e}")))?
    }

    /// Deep copy of the session's board and history.
    pub fn build_snapshot(session: &GameSession) -> StateView {
        session.snapshot()
    }

    /// Invokes `bot` with `state` on a blocking worker, bounded by the
    /// sandbox timeout.
    ///
    /// # Errors
    ///
    /// Any error, panic, malformed answer or timeout from the bot.
    #[instrument(skip(self, bot, state), fields(bot = bot.label()))]
    pub async fn invoke(&self, bot: Arc<dyn Bot>, state: StateView) -> Result<i64, BotError> {
        let limit = self.limits.timeout();
        let task = tokio::task::spawn_blocking(move || bot.think(state));

        match tokio::time::timeout(limit + INVOKE_GRACE, task).await {
            Ok(Ok(Ok(answer))) => {
                debug!(position = answer.position, "Bot answered");
                Ok(answer.position)
            }
            Ok(Ok(Err(e))) => {
                warn!(error = %e, "Bot failed");
                Err(e)
            }
            Ok(Err(join)) => {
                warn!(error = %join, "Bot task panicked");
                Err(BotError::Runtime(format!("bot panicked: {join}")))
            }
            Err(_) => {
                warn!(limit_ms = self.limits.timeout_ms, "Bot timed out");
                Err(BotError::Timeout(self.limits.timeout_ms))
            }
        }
    }
}

impl Default for BotRuntime {
    fn default() -> Self {
        Self::new(SandboxLimits::default())
    }
}
