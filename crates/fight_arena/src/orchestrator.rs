//! Drives bot turns against a shared [`GameSession`].
//!
//! The session sits behind a mutex that is only ever held for synchronous
//! work; bot invocation and pacing delays happen with the lock released.
//! Each driving loop remembers the session epoch it started under and
//! stops quietly once a reset has moved the session on.

use crate::bot::{Bot, BotRuntime, Unresolved};
use crate::config::{ArenaConfig, ConfigError, Pacing, SandboxLimits};
use fight_tictactoe::{GameError, GameEvent, GameSession, MoveOutcome, Phase, Player, Seat};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

type Bots = [Option<Arc<dyn Bot>>; 2];

/// Runs automated and manual games.
///
/// Cheap to clone; clones share the session, resolved bots and runtime.
#[derive(Clone)]
pub struct Arena {
    session: Arc<Mutex<GameSession>>,
    bots: Arc<Mutex<Bots>>,
    runtime: Arc<BotRuntime>,
    pacing: Pacing,
}

impl Arena {
    /// Wraps an existing session.
    pub fn new(session: GameSession, pacing: Pacing, limits: SandboxLimits) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            bots: Arc::new(Mutex::new([None, None])),
            runtime: Arc::new(BotRuntime::new(limits)),
            pacing,
        }
    }

    /// Builds an arena from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the players cannot share a session.
    pub fn from_config(config: &ArenaConfig) -> Result<Self, ConfigError> {
        let session = GameSession::new(config.seated_players()?)
            .map_err(|e| ConfigError::new(e.to_string()))?;
        Ok(Self::new(session, *config.pacing(), *config.sandbox()))
    }

    fn lock(&self) -> MutexGuard<'_, GameSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_bots(&self) -> MutexGuard<'_, Bots> {
        self.bots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` against the session under the lock.
    pub fn with_session<R>(&self, f: impl FnOnce(&GameSession) -> R) -> R {
        f(&self.lock())
    }

    /// Registers an observer for every subsequent event.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<GameEvent> {
        self.lock().subscribe()
    }

    /// Submits a move for the current mover, typically a human.
    pub fn attempt_move(&self, cell: i64) -> MoveOutcome {
        self.lock().attempt_move(cell)
    }

    /// Resets the session. In-flight loops notice and exit.
    pub fn reset(&self) {
        self.lock().reset();
    }

    /// Swaps the start player for the next game.
    pub fn swap_start_player(&self) -> bool {
        self.lock().swap_start_player()
    }

    /// True when either seat is a human.
    pub fn is_manual_game(&self) -> bool {
        self.lock().is_manual_game()
    }

    /// True when the game is in progress and a resolved bot holds the turn.
    pub fn bot_to_move(&self) -> bool {
        let session = self.lock();
        match (session.phase(), session.current_seat()) {
            (Phase::InProgress, Some(seat)) => self.lock_bots()[seat.index()].is_some(),
            _ => false,
        }
    }

    /// Plays a full bot-versus-bot game and returns the final phase.
    ///
    /// Returns early with [`Phase::NotStarted`] if the session is reset
    /// while the game is running.
    ///
    /// # Errors
    ///
    /// [`GameError::HumanSeated`] if either player is human and
    /// [`GameError::AlreadyStarted`] if the session was not reset since the
    /// last game.
    #[instrument(skip(self))]
    pub async fn start_automated_game(&self) -> Result<Phase, GameError> {
        if let Some(human) = self.with_session(|s| {
            s.players()
                .iter()
                .find(|p| !p.kind.is_bot())
                .map(|p| p.id.clone())
        }) {
            warn!(player = %human, "Refusing automated game with a human seated");
            return Err(GameError::HumanSeated(human));
        }

        let epoch = self.prepare().await?;
        info!(epoch, "Automated game started");

        while self.step(epoch).await.is_some() {
            if !self.is_current(epoch) {
                break;
            }
            debug!(delay_ms = self.pacing.turn_delay_ms, "Pausing between turns");
            tokio::time::sleep(self.pacing.turn_delay()).await;
        }

        let phase = self.with_session(|s| s.phase());
        info!(%phase, "Automated game finished");
        Ok(phase)
    }

    /// Starts a game driven by external moves.
    ///
    /// If the start player is a bot it moves once before this returns.
    /// Afterwards callers submit human moves with
    /// [`attempt_move`](Self::attempt_move) and call
    /// [`step_bot`](Self::step_bot) while [`bot_to_move`](Self::bot_to_move)
    /// holds.
    ///
    /// # Errors
    ///
    /// [`GameError::AlreadyStarted`] if the session was not reset since the
    /// last game.
    #[instrument(skip(self))]
    pub async fn start_manual_game(&self) -> Result<(), GameError> {
        let epoch = self.prepare().await?;
        info!(epoch, "Manual game started");

        if self.bot_to_move() {
            self.step(epoch).await;
        }
        Ok(())
    }

    /// Asks the current mover's bot for a move and applies it.
    ///
    /// Returns `None` when no bot holds the turn, the game is over, or the
    /// session was reset while the bot was thinking.
    pub async fn step_bot(&self) -> Option<MoveOutcome> {
        let epoch = self.with_session(|s| s.epoch());
        self.step(epoch).await
    }

    /// Resolves both players' bots and starts the session.
    ///
    /// The seated bots are only replaced once `start` succeeds, so a
    /// refused restart leaves a running game's bots alone.
    async fn prepare(&self) -> Result<u64, GameError> {
        let [first, second] = {
            let session = self.lock();
            if session.phase() != Phase::NotStarted {
                warn!(phase = %session.phase(), "Refusing to start; reset first");
                return Err(GameError::AlreadyStarted);
            }
            session.players().clone()
        };
        let (first, second) = tokio::join!(self.resolve_seat(&first), self.resolve_seat(&second));

        let mut session = self.lock();
        session.start()?;
        *self.lock_bots() = [first, second];
        Ok(session.epoch())
    }

    async fn resolve_seat(&self, player: &Player) -> Option<Arc<dyn Bot>> {
        match self.runtime.resolve(player).await {
            Ok(bot) => bot,
            Err(e) => {
                warn!(player = %player.id, error = %e, "Bot resolution failed; its turns will be strikes");
                Some(Arc::new(Unresolved::new(e)))
            }
        }
    }

    fn is_current(&self, epoch: u64) -> bool {
        let session = self.lock();
        session.epoch() == epoch && session.phase() == Phase::InProgress
    }

    /// One bot turn under `epoch`.
    #[instrument(skip(self))]
    async fn step(&self, epoch: u64) -> Option<MoveOutcome> {
        let (seat, bot, state) = {
            let session = self.lock();
            if session.epoch() != epoch || session.phase() != Phase::InProgress {
                debug!(current = session.epoch(), phase = %session.phase(), "Nothing to step");
                return None;
            }
            let seat = session.current_seat()?;
            let bot = self.lock_bots()[seat.index()].clone()?;
            (seat, bot, BotRuntime::build_snapshot(&session))
        };

        debug!(?seat, cells = state.cells.len(), "Requesting bot move");
        let decision = self.runtime.invoke(bot, state).await;
        tokio::time::sleep(self.pacing.move_delay()).await;

        let mut session = self.lock();
        if session.epoch() != epoch || session.current_seat() != Some(seat) {
            info!("Session moved on while the bot was thinking; dropping its move");
            return None;
        }

        let outcome = match decision {
            Ok(cell) => session.attempt_move(cell),
            Err(e) => session.record_bot_failure(e.to_string()),
        };
        Some(outcome)
    }

    /// Seat of the player the next game starts with.
    pub fn start_seat(&self) -> Seat {
        self.lock().start_seat()
    }
}
