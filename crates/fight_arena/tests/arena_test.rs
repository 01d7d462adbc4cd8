//! Integration tests for automated and manual games through the arena.

use fight_arena::{Arena, ArenaConfig, Pacing, SandboxLimits};
use fight_tictactoe::{
    GameError, GameEvent, GameSession, MoveOutcome, MoveStatus, Phase, Player, PlayerKind, Seat,
    Square, WinReason,
};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

const LAST_EMPTY: &str = r#"function(state)
  for i = #state.cells, 1, -1 do
    if state.cells[i].symbol == "" then return { position = state.cells[i].id } end
  end
end"#;

fn limits() -> SandboxLimits {
    SandboxLimits {
        timeout_ms: 50,
        ..SandboxLimits::default()
    }
}

fn arena(first: PlayerKind, second: PlayerKind) -> Arena {
    let session = GameSession::new([
        Player::new("p1", "Player 1", 'O', first),
        Player::new("p2", "Player 2", 'X', second),
    ])
    .expect("distinct players");
    Arena::new(session, Pacing::instant(), limits())
}

fn inline(source: &str) -> PlayerKind {
    PlayerKind::Inline {
        source: source.to_string(),
    }
}

fn drain(rx: &mut UnboundedReceiver<GameEvent>) -> Vec<GameEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_preset_vs_preset_start_player_wins() {
    let arena = arena(PlayerKind::Preset, PlayerKind::Preset);
    let mut rx = arena.subscribe();

    let phase = arena.start_automated_game().await.expect("bots only");

    // O: 0 2 4 6, X: 1 3 5; O completes the 2-4-6 diagonal.
    assert_eq!(phase, Phase::Won);
    arena.with_session(|s| {
        assert_eq!(s.winner().map(|p| p.id.as_str()), Some("p1"));
        assert_eq!(s.history().len(), 7);
        assert_eq!(s.board().get(6), Some(Square::Occupied('O')));
    });

    let events = drain(&mut rx);
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    assert!(matches!(
        events.last(),
        Some(GameEvent::Win { winner, reason: WinReason::Line }) if winner.id == "p1"
    ));
}

#[tokio::test]
async fn test_lua_bot_plays_against_preset() {
    let arena = arena(PlayerKind::Preset, inline(LAST_EMPTY));

    arena.start_automated_game().await.expect("bots only");

    // O: 0 1 2, X: 8 7
    arena.with_session(|s| {
        assert_eq!(s.winner().map(|p| p.symbol), Some('O'));
        let cells: Vec<_> = s.history().entries().iter().map(|e| e.cell()).collect();
        assert_eq!(cells, vec![Some(0), Some(8), Some(1), Some(7), Some(2)]);
    });
}

#[tokio::test]
async fn test_swapped_start_lets_second_player_open() {
    let arena = arena(PlayerKind::Preset, inline(LAST_EMPTY));
    assert!(arena.swap_start_player());

    arena.start_automated_game().await.expect("bots only");

    arena.with_session(|s| {
        let first = &s.history().entries()[0];
        assert_eq!(first.player().id, "p2");
        assert_eq!(first.cell(), Some(8));
    });
}

#[tokio::test]
async fn test_snapshot_mutation_does_not_reach_session() {
    let vandal = r#"function(state)
      local pick = -1
      for _, cell in ipairs(state.cells) do
        if cell.symbol == "" and pick < 0 then pick = cell.id end
        cell.symbol = "Z"
      end
      for i = #state.history, 1, -1 do
        state.history[i].player.name = "nobody"
        state.history[i] = nil
      end
      return { position = pick }
    end"#;
    let arena = arena(inline(vandal), PlayerKind::Preset);

    arena.start_automated_game().await.expect("bots only");

    arena.with_session(|s| {
        assert!(s.has_ended());
        assert!(
            s.board()
                .squares()
                .iter()
                .all(|sq| *sq != Square::Occupied('Z'))
        );
        assert_eq!(s.board().occupied(), s.history().successes().count());
        assert!(s
            .history()
            .entries()
            .iter()
            .all(|e| e.player().name != "nobody"));
    });
}

async fn assert_forfeits_with_errors(bad: PlayerKind, expect_in_message: &str) {
    let arena = arena(PlayerKind::Preset, bad);
    let mut rx = arena.subscribe();

    let phase = arena.start_automated_game().await.expect("bots only");
    assert_eq!(phase, Phase::Won);

    arena.with_session(|s| {
        assert_eq!(s.winner_seat(), Some(Seat::First));
        assert_eq!(s.board().occupied(), 1);
        let failures: Vec<_> = s
            .history()
            .entries()
            .iter()
            .filter(|e| e.status() == MoveStatus::Failure)
            .collect();
        assert_eq!(failures.len(), 3);
        assert!(failures.iter().all(|e| e.cell().is_none()));
    });

    let events = drain(&mut rx);
    let errors: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            GameEvent::Error {
                message, strikes, ..
            } => Some((message.clone(), *strikes)),
            _ => None,
        })
        .collect();
    assert_eq!(errors.iter().map(|(_, s)| *s).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert!(
        errors[0].0.contains(expect_in_message),
        "{:?} should mention {expect_in_message:?}",
        errors[0].0
    );
    assert!(!events.iter().any(|e| matches!(e, GameEvent::MoveFailure { .. })));
    assert!(matches!(
        events.last(),
        Some(GameEvent::Win { reason: WinReason::Forfeit, winner }) if winner.id == "p1"
    ));
}

#[tokio::test]
async fn test_raising_bot_forfeits() {
    assert_forfeits_with_errors(inline("function() error('boom') end"), "boom").await;
}

#[tokio::test]
async fn test_malformed_answer_forfeits() {
    assert_forfeits_with_errors(
        inline("function() return { position = 'centre' } end"),
        "malformed",
    )
    .await;
}

#[tokio::test]
async fn test_looping_bot_times_out_and_forfeits() {
    assert_forfeits_with_errors(inline("function() while true do end end"), "time limit").await;
}

#[tokio::test]
async fn test_uncompilable_bot_forfeits() {
    assert_forfeits_with_errors(inline("function(state"), "compile").await;
}

#[tokio::test]
async fn test_out_of_range_answers_are_move_failures() {
    let arena = arena(PlayerKind::Preset, inline("function() return { position = 9 } end"));
    let mut rx = arena.subscribe();

    arena.start_automated_game().await.expect("bots only");

    let failures: Vec<_> = drain(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, GameEvent::MoveFailure { cell: 9, .. }))
        .collect();
    assert_eq!(failures.len(), 3);
    arena.with_session(|s| assert_eq!(s.winner().map(|p| p.id.as_str()), Some("p1")));
}

#[tokio::test]
async fn test_automated_game_refuses_humans() {
    let arena = arena(PlayerKind::Human, PlayerKind::Preset);
    assert!(arena.is_manual_game());
    assert_eq!(
        arena.start_automated_game().await,
        Err(GameError::HumanSeated("p1".into()))
    );
    arena.with_session(|s| assert_eq!(s.phase(), Phase::NotStarted));
}

#[tokio::test]
async fn test_restart_requires_reset() {
    let arena = arena(PlayerKind::Preset, PlayerKind::Preset);
    arena.start_automated_game().await.expect("first game");
    assert_eq!(
        arena.start_automated_game().await,
        Err(GameError::AlreadyStarted)
    );

    arena.reset();
    assert_eq!(arena.start_automated_game().await, Ok(Phase::Won));
}

#[tokio::test]
async fn test_refused_restart_leaves_running_game_untouched() {
    let arena = arena(PlayerKind::Human, inline(LAST_EMPTY));
    arena.start_manual_game().await.expect("fresh session");
    arena.attempt_move(4);
    let mut rx = arena.subscribe();

    assert_eq!(
        arena.start_manual_game().await,
        Err(GameError::AlreadyStarted)
    );
    assert!(drain(&mut rx).is_empty());
    assert!(arena.bot_to_move());

    assert_eq!(
        arena.step_bot().await,
        Some(MoveOutcome::Placed { next: Seat::First })
    );
    arena.with_session(|s| {
        assert_eq!(s.phase(), Phase::InProgress);
        assert_eq!(s.board().get(8), Some(Square::Occupied('X')));
        assert_eq!(s.history().len(), 2);
    });
}

#[tokio::test]
async fn test_manual_game_interleaves_human_and_bot() {
    let arena = arena(PlayerKind::Human, PlayerKind::Preset);
    arena.start_manual_game().await.expect("fresh session");

    // Human holds the first turn; nothing moved yet.
    assert!(!arena.bot_to_move());
    assert_eq!(arena.step_bot().await, None);
    arena.with_session(|s| assert!(s.history().is_empty()));

    assert_eq!(arena.attempt_move(4), MoveOutcome::Placed { next: Seat::Second });
    assert!(arena.bot_to_move());
    assert_eq!(
        arena.step_bot().await,
        Some(MoveOutcome::Placed { next: Seat::First })
    );

    arena.with_session(|s| {
        assert_eq!(s.board().get(4), Some(Square::Occupied('O')));
        assert_eq!(s.board().get(0), Some(Square::Occupied('X')));
        assert_eq!(s.current_seat(), Some(Seat::First));
    });
}

#[tokio::test]
async fn test_manual_game_bot_opens_when_starting() {
    let arena = arena(PlayerKind::Human, PlayerKind::Preset);
    arena.swap_start_player();

    arena.start_manual_game().await.expect("fresh session");

    arena.with_session(|s| {
        assert_eq!(s.history().len(), 1);
        assert_eq!(s.board().get(0), Some(Square::Occupied('X')));
        assert_eq!(s.current_player().map(|p| p.id.as_str()), Some("p1"));
    });
}

#[tokio::test]
async fn test_reset_stops_running_game() {
    let session = GameSession::new([
        Player::new("p1", "Player 1", 'O', PlayerKind::Preset),
        Player::new("p2", "Player 2", 'X', PlayerKind::Preset),
    ])
    .expect("distinct players");
    let arena = Arena::new(
        session,
        Pacing {
            move_delay_ms: 40,
            turn_delay_ms: 40,
        },
        limits(),
    );

    let game = tokio::spawn({
        let arena = arena.clone();
        async move { arena.start_automated_game().await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    arena.reset();

    let phase = game.await.expect("task").expect("bots only");
    assert_eq!(phase, Phase::NotStarted);

    tokio::time::sleep(Duration::from_millis(120)).await;
    arena.with_session(|s| {
        assert_eq!(s.board().occupied(), 0);
        assert!(s.history().is_empty());
        assert_eq!(s.epoch(), 1);
    });
}

#[tokio::test]
async fn test_arena_from_default_config() {
    let config = ArenaConfig::default().with_pacing(Pacing::instant());
    let arena = Arena::from_config(&config).expect("valid config");
    assert!(!arena.is_manual_game());
    assert_eq!(arena.start_seat(), Seat::First);
    assert_eq!(arena.start_automated_game().await, Ok(Phase::Won));
}
