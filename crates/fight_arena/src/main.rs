//! Tic Tac Toe FIGHT - terminal arena

use anyhow::Result;
use clap::Parser;
use fight_arena::cli::{Cli, Command, GameArgs};
use fight_arena::{Arena, ArenaConfig};
use fight_tictactoe::{GameEvent, STRIKE_LIMIT};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Auto(args) => run_auto(args).await,
        Command::Manual(args) => run_manual(args).await,
    }
}

fn load_arena(args: &GameArgs) -> Result<Arena> {
    let config = match &args.config {
        Some(path) => ArenaConfig::from_file(path)?,
        None => {
            info!("No config given; using two preset bots");
            ArenaConfig::default()
        }
    };

    let arena = Arena::from_config(&config)?;
    if args.swap {
        arena.swap_start_player();
    }
    Ok(arena)
}

/// Run a bot-versus-bot game to completion
#[instrument(skip(args))]
async fn run_auto(args: GameArgs) -> Result<()> {
    let arena = load_arena(&args)?;
    let mut events = arena.subscribe();

    let mut game = tokio::spawn({
        let arena = arena.clone();
        async move { arena.start_automated_game().await }
    });

    let phase = loop {
        tokio::select! {
            Some(event) = events.recv() => print_event(&arena, &event, args.json)?,
            result = &mut game => break result??,
        }
    };
    flush_events(&arena, &mut events, args.json)?;

    info!(%phase, "Game over");
    Ok(())
}

/// Run a game with human moves read from stdin
#[instrument(skip(args))]
async fn run_manual(args: GameArgs) -> Result<()> {
    let arena = load_arena(&args)?;
    let mut events = arena.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    arena.start_manual_game().await?;
    flush_events(&arena, &mut events, args.json)?;

    loop {
        while arena.bot_to_move() {
            if arena.step_bot().await.is_none() {
                break;
            }
            flush_events(&arena, &mut events, args.json)?;
        }

        let prompt = arena.with_session(|s| {
            if s.has_ended() {
                return None;
            }
            s.current_player().map(|p| {
                format!(
                    "{}\n{} ({}) to move, enter a cell 0-8:",
                    s.board().display(),
                    p.name,
                    p.symbol
                )
            })
        });
        let Some(prompt) = prompt else {
            break;
        };
        println!("{prompt}");

        let Some(line) = lines.next_line().await? else {
            info!("Input closed; leaving game");
            break;
        };
        match line.trim().parse::<i64>() {
            Ok(cell) => {
                arena.attempt_move(cell);
            }
            Err(_) => println!("Not a cell number: {:?}", line.trim()),
        }
        flush_events(&arena, &mut events, args.json)?;
    }

    Ok(())
}

fn flush_events(arena: &Arena, events: &mut UnboundedReceiver<GameEvent>, json: bool) -> Result<()> {
    while let Ok(event) = events.try_recv() {
        print_event(arena, &event, json)?;
    }
    Ok(())
}

fn print_event(arena: &Arena, event: &GameEvent, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }

    match event {
        GameEvent::MoveSuccess { player, cell } => {
            println!("{} ({}) takes {}", player.name, player.symbol, cell);
            println!("{}\n", arena.with_session(|s| s.board().display()));
        }
        GameEvent::MoveFailure {
            player,
            cell,
            strikes,
        } => println!(
            "{} ({}) tried {}: invalid move [{}/{}]",
            player.name, player.symbol, cell, strikes, STRIKE_LIMIT
        ),
        GameEvent::Error {
            player,
            message,
            strikes,
        } => println!(
            "{} ({}) bot error: {} [{}/{}]",
            player.name, player.symbol, message, strikes, STRIKE_LIMIT
        ),
        GameEvent::Win { winner, reason } => {
            println!("{} ({}) wins by {:?}!", winner.name, winner.symbol, reason)
        }
        GameEvent::Tie => println!("It's a tie!"),
        GameEvent::Reset => println!("Board reset"),
        GameEvent::SwapStartPlayer { start_player } => {
            println!("{} will move first", start_player.name)
        }
    }
    Ok(())
}
