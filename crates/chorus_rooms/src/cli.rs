//! Command-line interface for chorus_rooms.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Chorus rooms - lobby matchmaking and tic-tac-toe rooms over JSON events
#[derive(Parser, Debug)]
#[command(name = "chorus_rooms")]
#[command(about = "Drive lobby and game rooms from JSON event lines", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read events from stdin, one JSON object per line, and print what is sent
    Serve,

    /// Run a recorded event file and print what is sent
    Replay {
        /// File with one JSON event per line
        path: PathBuf,
    },
}
