use std::fs;
use std::io::{self, Write};

use anyhow::{Context, Result};
use score_engine::{SessionGame, SqliteStorage, Standing, Store};
use tracing::info;

use crate::Command;

pub fn run(store: &mut Store<SqliteStorage>, command: Command) -> Result<()> {
    match command {
        Command::Export { output } => {
            let json = store.export_data().to_json_pretty()?;
            match output {
                Some(path) => {
                    fs::write(&path, json)
                        .with_context(|| format!("writing {}", path.display()))?;
                    info!("exported to {}", path.display());
                }
                None => println!("{}", json),
            }
        }
        Command::Import { file } => {
            let json = fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            store
                .import_json(&json)
                .with_context(|| format!("importing {}", file.display()))?;
            let state = store.state();
            println!(
                "imported {} players, {} categories, {} sessions",
                state.players.len(),
                state.categories.len(),
                state.sessions.len()
            );
        }
        Command::Sessions { json } => {
            let state = store.state();
            if json {
                println!("{}", serde_json::to_string_pretty(&state.sessions)?);
                return Ok(());
            }
            let mut out = io::stdout().lock();
            for session in &state.sessions {
                writeln!(
                    out,
                    "{}  {}  ({} games, started {})",
                    session.id,
                    session.name,
                    session.games.len(),
                    session.created_at.to_wire()
                )?;
                for player in &session.players {
                    let total = session.total_scores.get(&player.id).copied().unwrap_or(0);
                    writeln!(out, "    {:<20} {:>6}", player.name, total)?;
                }
            }
        }
        Command::Games { json } => print_games(&store.list_all_games(), json)?,
        Command::Leaderboard { category, json } => {
            let board = match &category {
                Some(id) => {
                    if store.state().category(id).is_none() {
                        anyhow::bail!("unknown category '{}'", id);
                    }
                    store.category_leaderboard(id)
                }
                None => store.global_leaderboard(),
            };
            print_standings(&board, json)?;
        }
    }
    Ok(())
}

fn print_games(games: &[SessionGame], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(games)?);
        return Ok(());
    }
    let mut out = io::stdout().lock();
    for entry in games {
        writeln!(
            out,
            "{}  #{:<3} {:<30} [{}]  {}",
            entry.game.created_at.to_wire(),
            entry.game.game_number,
            entry.game.name,
            entry.game.category_name,
            entry.session_name
        )?;
    }
    Ok(())
}

fn print_standings(board: &[Standing], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(board)?);
        return Ok(());
    }
    let mut out = io::stdout().lock();
    for (place, standing) in board.iter().enumerate() {
        writeln!(out, "{:>3}. {:<20} {:>6}", place + 1, standing.name, standing.score)?;
    }
    Ok(())
}
