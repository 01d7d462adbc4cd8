//! Remote bot resolution against an in-process HTTP server.

use axum::{Router, http::StatusCode, routing::get};
use fight_arena::{Arena, BotError, BotRuntime, Pacing, SandboxLimits, bot::fetch_source};
use fight_tictactoe::{
    GameError, GameEvent, GameSession, MoveOutcome, Phase, Player, PlayerKind, Seat,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

const CENTRE_FIRST: &str = r#"
local function pick(state)
  if state.cells[5].symbol == "" then return { position = 4 } end
  for _, cell in ipairs(state.cells) do
    if cell.symbol == "" then return { position = cell.id } end
  end
end
return pick
"#;

/// Serves bot sources on an ephemeral port and returns its base URL.
async fn serve_bots() -> String {
    serve_bots_counting(Arc::new(AtomicUsize::new(0))).await
}

/// Like [`serve_bots`], plus `/once.lua`, which serves [`CENTRE_FIRST`] on
/// the first request and fails afterwards. `hits` counts its requests.
async fn serve_bots_counting(hits: Arc<AtomicUsize>) -> String {
    let app = Router::new()
        .route("/centre.lua", get(|| async { CENTRE_FIRST }))
        .route(
            "/broken.lua",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "oops") }),
        )
        .route(
            "/once.lua",
            get(move || {
                let hits = hits.clone();
                async move {
                    if hits.fetch_add(1, Ordering::SeqCst) == 0 {
                        (StatusCode::OK, CENTRE_FIRST)
                    } else {
                        (StatusCode::INTERNAL_SERVER_ERROR, "gone")
                    }
                }
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test server");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}")
}

fn remote(url: String) -> PlayerKind {
    PlayerKind::Remote { url }
}

#[tokio::test]
async fn test_fetch_source_returns_body() {
    let base = serve_bots().await;
    let client = reqwest::Client::new();

    let source = fetch_source(&client, &format!("{base}/centre.lua"))
        .await
        .expect("fetch");
    assert!(source.contains("return pick"));
}

#[tokio::test]
async fn test_fetch_source_rejects_error_status() {
    let base = serve_bots().await;
    let client = reqwest::Client::new();

    for path in ["missing.lua", "broken.lua"] {
        let url = format!("{base}/{path}");
        let err = fetch_source(&client, &url).await.unwrap_err();
        assert!(matches!(err, BotError::Fetch { url: ref u, .. } if *u == url));
    }
}

#[tokio::test]
async fn test_resolve_remote_bot() {
    let base = serve_bots().await;
    let runtime = BotRuntime::new(SandboxLimits::default());
    let player = Player::new("r", "Remote", 'X', remote(format!("{base}/centre.lua")));

    let bot = runtime
        .resolve(&player)
        .await
        .expect("resolve")
        .expect("bot for remote player");

    let session = GameSession::new([
        Player::new("a", "A", 'O', PlayerKind::Human),
        player.clone(),
    ])
    .expect("distinct players");
    let state = BotRuntime::build_snapshot(&session);
    assert_eq!(runtime.invoke(bot, state).await, Ok(4));
}

#[tokio::test]
async fn test_remote_bot_plays_full_game() {
    let base = serve_bots().await;
    let session = GameSession::new([
        Player::new("p1", "Preset", 'O', PlayerKind::Preset),
        Player::new("p2", "Gist", 'X', remote(format!("{base}/centre.lua"))),
    ])
    .expect("distinct players");
    let arena = Arena::new(session, Pacing::instant(), SandboxLimits::default());

    let phase = arena.start_automated_game().await.expect("bots only");

    assert!(phase.is_terminal());
    arena.with_session(|s| {
        let second = &s.history().entries()[1];
        assert_eq!(second.player().id, "p2");
        assert_eq!(second.cell(), Some(4));
    });
}

#[tokio::test]
async fn test_unreachable_source_costs_strikes() {
    let base = serve_bots().await;
    let session = GameSession::new([
        Player::new("p1", "Preset", 'O', PlayerKind::Preset),
        Player::new("p2", "Gone", 'X', remote(format!("{base}/missing.lua"))),
    ])
    .expect("distinct players");
    let arena = Arena::new(session, Pacing::instant(), SandboxLimits::default());
    let mut rx = arena.subscribe();

    assert_eq!(arena.start_automated_game().await, Ok(Phase::Won));

    let mut errors = 0;
    while let Ok(event) = rx.try_recv() {
        if let GameEvent::Error { message, .. } = event {
            assert!(message.contains("missing.lua"));
            errors += 1;
        }
    }
    assert_eq!(errors, 3);
    arena.with_session(|s| assert_eq!(s.winner().map(|p| p.id.as_str()), Some("p1")));
}

#[tokio::test]
async fn test_refused_restart_keeps_seated_bots() {
    let hits = Arc::new(AtomicUsize::new(0));
    let base = serve_bots_counting(hits.clone()).await;
    let session = GameSession::new([
        Player::new("p1", "Human", 'O', PlayerKind::Human),
        Player::new("p2", "Gist", 'X', remote(format!("{base}/once.lua"))),
    ])
    .expect("distinct players");
    let arena = Arena::new(session, Pacing::instant(), SandboxLimits::default());
    let mut rx = arena.subscribe();

    arena.start_manual_game().await.expect("fresh session");
    assert_eq!(arena.attempt_move(0), MoveOutcome::Placed { next: Seat::Second });

    assert_eq!(
        arena.start_manual_game().await,
        Err(GameError::AlreadyStarted)
    );
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    assert_eq!(
        arena.step_bot().await,
        Some(MoveOutcome::Placed { next: Seat::First })
    );
    arena.with_session(|s| {
        assert_eq!(s.history().len(), 2);
        assert_eq!(s.history().entries()[1].cell(), Some(4));
        assert_eq!(s.strike_count(), 0);
    });

    while let Ok(event) = rx.try_recv() {
        assert!(!matches!(event, GameEvent::Error { .. }), "{event:?}");
    }
}
