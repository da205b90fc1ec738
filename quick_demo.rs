// SPDX-License-Identifier: MIT OR Apache-2.0

//! Quick Quarto demo: two heuristic bots play one game on a single board.
//!
//! Usage: `quick_demo [seed]`

use anyhow::{Context, Result};
use quarto_core::{play_bot_turn, GameEvent, GameMode, GameState, HeuristicAgent, Identity, VictoryOptions};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let seed = match std::env::args().nth(1) {
        Some(arg) => arg.parse::<u64>().context("Seed must be a number")?,
        None => rand::random(),
    };
    tracing::info!(seed, "Starting bot game");

    let mut state = GameState::new(VictoryOptions::BOTH, GameMode::Bot)?;
    let mut bots = [HeuristicAgent::seeded(seed), HeuristicAgent::seeded(seed ^ 0x5eed)];

    while !state.game_over {
        let identity = state.current_turn;
        let bot = match identity {
            Identity::Player1 => &mut bots[0],
            Identity::Player2 => &mut bots[1],
        };
        for event in play_bot_turn(&mut state, identity, bot)? {
            match event {
                GameEvent::PiecePlaced { by, coord, piece } => println!("{by} places {piece} at {coord}"),
                GameEvent::PieceSelected { by, piece } => println!("{by} hands over {piece}"),
                GameEvent::GameWon { winner, positions } => {
                    println!("{winner} wins with {:?}", positions.kind)
                }
                GameEvent::GameDrawn => println!("Draw"),
                _ => {}
            }
        }
    }

    for row in state.board.rows() {
        let cells: Vec<String> = row
            .iter()
            .map(|cell| cell.map_or_else(|| "----".to_string(), |p| p.to_string()))
            .collect();
        println!("{}", cells.join(" "));
    }
    Ok(())
}
