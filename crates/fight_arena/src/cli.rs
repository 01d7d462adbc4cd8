//! Command-line interface for the `fight` binary.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Tic Tac Toe FIGHT - pit scripted bots and humans against each other
#[derive(Parser, Debug)]
#[command(name = "fight")]
#[command(about = "Tic-tac-toe arena for sandboxed Lua bots", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play a bot-versus-bot game to the end
    Auto(GameArgs),

    /// Play with human moves read from stdin
    Manual(GameArgs),
}

/// Options shared by both modes.
#[derive(Args, Debug, Clone)]
pub struct GameArgs {
    /// Path to arena config (TOML). Two preset bots when omitted.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Let the second player move first
    #[arg(long)]
    pub swap: bool,

    /// Print events as JSON lines instead of text
    #[arg(long)]
    pub json: bool,
}
