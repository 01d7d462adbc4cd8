//! The authoritative game state machine.
//!
//! All mutation goes through [`GameSession::attempt_move`],
//! [`GameSession::record_bot_failure`], [`GameSession::reset`],
//! [`GameSession::swap_start_player`] and [`GameSession::start`].

use crate::board::Board;
use crate::error::GameError;
use crate::events::{EventBus, GameEvent, WinReason};
use crate::history::{History, HistoryEntry, MoveStatus};
use crate::invariants;
use crate::player::{Player, PlayerInfo, Seat};
use crate::snapshot::StateView;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

/// Consecutive invalid attempts that forfeit the game.
pub const STRIKE_LIMIT: u8 = 3;

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum Phase {
    /// Configured but not started.
    NotStarted,
    /// Moves are being accepted.
    InProgress,
    /// Ended with a winner.
    Won,
    /// Ended with a full board and no winner.
    Tied,
}

impl Phase {
    /// True for [`Phase::Won`] and [`Phase::Tied`].
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Won | Phase::Tied)
    }
}

/// What a call to [`GameSession::attempt_move`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Nothing happened: the game was not in progress.
    Skipped,
    /// The move was applied and the turn passed to `next`.
    Placed {
        /// The new mover.
        next: Seat,
    },
    /// The move completed a line.
    Won {
        /// The mover.
        winner: Seat,
    },
    /// The move filled the board with no line.
    Tied,
    /// The attempt was rejected; the mover keeps the turn.
    Struck {
        /// Consecutive strikes so far.
        strikes: u8,
    },
    /// The attempt was the mover's last strike; the opponent wins.
    Forfeited {
        /// The opponent.
        winner: Seat,
    },
}

/// A two-player game: players, board, history, turn pointer and strikes.
#[derive(Debug)]
pub struct GameSession {
    players: [Player; 2],
    start_seat: Seat,
    current: Option<Seat>,
    board: Board,
    history: History,
    strike_count: u8,
    winner: Option<Seat>,
    phase: Phase,
    epoch: u64,
    events: EventBus,
}

impl GameSession {
    /// Creates a session with an empty board. The first player starts.
    ///
    /// # Errors
    ///
    /// Returns [`GameError`] if the players share an id or a symbol.
    #[instrument(skip(players), fields(first = %players[0].id, second = %players[1].id))]
    pub fn new(players: [Player; 2]) -> Result<Self, GameError> {
        let [first, second] = &players;
        if first.id == second.id {
            warn!(id = %first.id, "Rejecting players with duplicate ids");
            return Err(GameError::DuplicatePlayerId(first.id.clone()));
        }
        if first.symbol == second.symbol {
            warn!(symbol = %first.symbol, "Rejecting players with duplicate symbols");
            return Err(GameError::DuplicateSymbol(first.symbol));
        }

        info!("Creating game session");
        Ok(Self {
            players,
            start_seat: Seat::First,
            current: None,
            board: Board::new(),
            history: History::new(),
            strike_count: 0,
            winner: None,
            phase: Phase::NotStarted,
            epoch: 0,
            events: EventBus::new(),
        })
    }

    /// Registers an observer for every subsequent event.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<GameEvent> {
        self.events.subscribe()
    }

    /// Hands the turn to the start player.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::AlreadyStarted`] unless the session is in
    /// [`Phase::NotStarted`].
    #[instrument(skip(self), fields(epoch = self.epoch))]
    pub fn start(&mut self) -> Result<Seat, GameError> {
        if self.phase != Phase::NotStarted {
            warn!(phase = %self.phase, "Refusing to start");
            return Err(GameError::AlreadyStarted);
        }

        self.current = Some(self.start_seat);
        self.phase = Phase::InProgress;
        info!(start = %self.player(self.start_seat).id, "Game started");
        Ok(self.start_seat)
    }

    /// Attempts to place the current mover's symbol at `cell`.
    ///
    /// Out-of-range and occupied cells are strikes, not errors. A call on
    /// a session that is not in progress is skipped.
    #[instrument(skip(self), fields(epoch = self.epoch))]
    pub fn attempt_move(&mut self, cell: i64) -> MoveOutcome {
        let Some(seat) = self.mover() else {
            return MoveOutcome::Skipped;
        };

        let outcome = match self.board.vacant(cell) {
            Some(pos) => self.place(seat, pos),
            None => self.strike(seat, Some(cell), |player, strikes| GameEvent::MoveFailure {
                player,
                cell,
                strikes,
            }),
        };

        self.debug_check_invariants();
        outcome
    }

    /// Counts a bot's failure to produce a move as a strike for the mover.
    ///
    /// The history records the attempt with no cell and observers receive
    /// [`GameEvent::Error`] rather than [`GameEvent::MoveFailure`].
    #[instrument(skip(self, message), fields(epoch = self.epoch))]
    pub fn record_bot_failure(&mut self, message: impl Into<String>) -> MoveOutcome {
        let Some(seat) = self.mover() else {
            return MoveOutcome::Skipped;
        };

        let message = message.into();
        warn!(player = %self.player(seat).id, error = %message, "Bot failed to move");
        let outcome = self.strike(seat, None, |player, strikes| GameEvent::Error {
            player,
            message,
            strikes,
        });

        self.debug_check_invariants();
        outcome
    }

    /// Swaps which player moves first in the next game.
    ///
    /// Ignored while a game is in progress. Returns whether a swap happened.
    #[instrument(skip(self), fields(epoch = self.epoch))]
    pub fn swap_start_player(&mut self) -> bool {
        if self.phase == Phase::InProgress {
            warn!("Ignoring start player swap during a game");
            return false;
        }

        self.start_seat = self.start_seat.opponent();
        let start_player = self.player(self.start_seat).info();
        info!(start = %start_player.id, "Swapped start player");
        self.events.emit(GameEvent::SwapStartPlayer { start_player });
        true
    }

    /// Clears the board, history, strikes, winner and turn pointer.
    ///
    /// Player configuration and the start player are kept. Bumps the epoch
    /// so that loops driving the previous game can tell it is gone.
    #[instrument(skip(self), fields(epoch = self.epoch))]
    pub fn reset(&mut self) {
        self.board = Board::new();
        self.history.clear();
        self.strike_count = 0;
        self.winner = None;
        self.current = None;
        self.phase = Phase::NotStarted;
        self.epoch += 1;
        info!(epoch = self.epoch, "Session reset");
        self.events.emit(GameEvent::Reset);
    }

    // ─────────────────────────────────────────────────────────────
    //  Transitions
    // ─────────────────────────────────────────────────────────────

    /// The seat allowed to act now, or `None` when moves are skipped.
    fn mover(&self) -> Option<Seat> {
        match (self.phase, self.current) {
            (Phase::InProgress, Some(seat)) => Some(seat),
            (Phase::NotStarted, _) => {
                warn!("Game not started. Skipping.");
                None
            }
            _ => {
                info!(phase = %self.phase, "Game ended. Skipping.");
                None
            }
        }
    }

    fn place(&mut self, seat: Seat, pos: usize) -> MoveOutcome {
        let player = self.player(seat).clone();
        let symbol = player.symbol;
        let info = player.info();

        self.history.push(HistoryEntry::new(
            Some(pos as i64),
            player,
            MoveStatus::Success,
        ));
        self.board.occupy(pos, symbol);
        self.strike_count = 0;
        info!(player = %info.id, cell = pos, "Move applied");
        self.events.emit(GameEvent::MoveSuccess {
            player: info.clone(),
            cell: pos,
        });

        if self.board.has_line(symbol) {
            self.winner = Some(seat);
            self.phase = Phase::Won;
            info!(winner = %info.name, "We have a winner");
            self.events.emit(GameEvent::Win {
                winner: info,
                reason: WinReason::Line,
            });
            MoveOutcome::Won { winner: seat }
        } else if self.board.is_full() {
            self.phase = Phase::Tied;
            info!("The game is tied");
            self.events.emit(GameEvent::Tie);
            MoveOutcome::Tied
        } else {
            let next = seat.opponent();
            self.current = Some(next);
            debug!(next = %self.player(next).id, "Turn passed");
            MoveOutcome::Placed { next }
        }
    }

    fn strike(
        &mut self,
        seat: Seat,
        cell: Option<i64>,
        notice: impl FnOnce(PlayerInfo, u8) -> GameEvent,
    ) -> MoveOutcome {
        let player = self.player(seat).clone();
        let info = player.info();

        self.history
            .push(HistoryEntry::new(cell, player, MoveStatus::Failure));
        self.strike_count += 1;
        let strikes = self.strike_count;
        warn!(player = %info.id, ?cell, strikes, "Invalid move");
        self.events.emit(notice(info.clone(), strikes));

        if strikes < STRIKE_LIMIT {
            return MoveOutcome::Struck { strikes };
        }

        let winner = seat.opponent();
        let winner_info = self.player(winner).info();
        self.winner = Some(winner);
        self.phase = Phase::Won;
        warn!(
            forfeiter = %info.id,
            winner = %winner_info.id,
            "Too many invalid moves; opponent wins"
        );
        self.events.emit(GameEvent::Win {
            winner: winner_info,
            reason: WinReason::Forfeit,
        });
        MoveOutcome::Forfeited { winner }
    }

    fn debug_check_invariants(&self) {
        if cfg!(debug_assertions) {
            let broken = invariants::violations(self);
            assert!(broken.is_empty(), "session invariants violated: {broken:?}");
        }
    }

    #[cfg(test)]
    pub(crate) fn board_mut_for_tests(&mut self) -> &mut Board {
        &mut self.board
    }

    // ─────────────────────────────────────────────────────────────
    //  Queries
    // ─────────────────────────────────────────────────────────────

    /// Both configured players, in seat order.
    pub fn players(&self) -> &[Player; 2] {
        &self.players
    }

    /// The player in `seat`.
    pub fn player(&self, seat: Seat) -> &Player {
        &self.players[seat.index()]
    }

    /// The board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// The move history.
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// True once the game is won or tied.
    pub fn has_ended(&self) -> bool {
        self.phase.is_terminal()
    }

    /// The winner, if the game was won.
    pub fn winner(&self) -> Option<&Player> {
        self.winner.map(|seat| self.player(seat))
    }

    /// The winner's seat, if the game was won.
    pub fn winner_seat(&self) -> Option<Seat> {
        self.winner
    }

    /// Who moves first in the next game.
    pub fn start_player(&self) -> &Player {
        self.player(self.start_seat)
    }

    /// Seat of the start player.
    pub fn start_seat(&self) -> Seat {
        self.start_seat
    }

    /// The mover, once a game has started.
    pub fn current_player(&self) -> Option<&Player> {
        self.current.map(|seat| self.player(seat))
    }

    /// Seat of the mover, once a game has started.
    pub fn current_seat(&self) -> Option<Seat> {
        self.current
    }

    /// Consecutive invalid attempts by the mover.
    pub fn strike_count(&self) -> u8 {
        self.strike_count
    }

    /// Generation counter, bumped by every reset.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// True when either seat is a human.
    pub fn is_manual_game(&self) -> bool {
        self.players.iter().any(|p| !p.kind.is_bot())
    }

    /// Deep copy of board and history for a decision callable.
    pub fn snapshot(&self) -> StateView {
        StateView::capture(&self.board, &self.history)
    }
}
