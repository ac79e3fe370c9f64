//! Command-line front end for the scoreboard store.
//!
//! Opens the SQLite-backed store (seeding it on first start), then exports,
//! imports, or prints sessions, games and leaderboards.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use score_engine::{Store, StoreConfig, DATABASE_ENV};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "scoreboard")]
#[command(about = "Local-first scorekeeping for game nights")]
struct Args {
    /// SQLite database file
    #[arg(long, env = DATABASE_ENV)]
    db: Option<PathBuf>,

    /// Do not load the built-in dataset into an empty database
    #[arg(long)]
    no_seed: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Write every player, category and session as an export document
    Export {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replace all data with the contents of an export document
    Import { file: PathBuf },
    /// List sessions with their totals
    Sessions {
        #[arg(long)]
        json: bool,
    },
    /// List every game, oldest first
    Games {
        #[arg(long)]
        json: bool,
    },
    /// Print the overall or per-category leaderboard
    Leaderboard {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    // Logs go to stderr so that exports on stdout stay clean.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("scoreboard=info".parse()?)
                .add_directive("score_engine=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let mut config = StoreConfig::from_env();
    if let Some(db) = args.db {
        config.database_path = db;
    }
    if args.no_seed {
        config = config.without_seed();
    }

    let mut store = Store::open(&config)?;
    info!("using {}", config.database_path.display());

    commands::run(&mut store, args.command)
}
