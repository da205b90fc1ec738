// SPDX-License-Identifier: MIT OR Apache-2.0

//! Quarto CLI
//!
//! Headless front end for playing and exercising the game: two players at
//! one terminal, a player against the heuristic bot, or two bots playing an
//! online game through an in-process shared store.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use quarto_cli::{parse_command, render_game, Command, HELP};
use quarto_core::{play_bot_turn, GameMode, GameState, HeuristicAgent, Identity, VictoryOptions};
use quarto_network::{JoinOutcome, Lobby, MemoryStore, Session, SessionConfig, SharedStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;
use tokio::signal;
use tracing_subscriber::EnvFilter;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "quarto-cli", about = "Quarto command-line interface", version)]
struct Args {
    /// How to play
    #[arg(short, long, value_enum, default_value_t = Mode::Bot)]
    mode: Mode,

    /// Count rows, columns and diagonals as wins
    #[arg(long, overrides_with = "no_lines")]
    lines: bool,

    /// Do not count rows, columns and diagonals
    #[arg(long)]
    no_lines: bool,

    /// Also count 2x2 squares as wins
    #[arg(long)]
    squares: bool,

    /// Seed for the bots
    #[arg(long)]
    seed: Option<u64>,

    /// Config file (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Two players sharing this terminal
    Local,
    /// Player 1 against the heuristic bot
    Bot,
    /// Two bots playing through an in-process store
    OnlineDemo,
}

fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(path: Option<&PathBuf>) -> SessionConfig {
    let loaded = match path {
        Some(path) => quarto_network::config::load_config_from(path),
        None => quarto_network::config::load_config(),
    };
    loaded.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Using default configuration");
        SessionConfig::default()
    })
}

fn victory_options(args: &Args, config: &SessionConfig) -> VictoryOptions {
    if !args.lines && !args.no_lines && !args.squares {
        return config.default_victory;
    }
    VictoryOptions {
        lines: !args.no_lines,
        squares: args.squares,
    }
}

fn agent(seed: Option<u64>, offset: u64) -> HeuristicAgent {
    match seed {
        Some(seed) => HeuristicAgent::seeded(seed.wrapping_add(offset)),
        None => HeuristicAgent::new(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    let config = load_config(args.config.as_ref());
    let options = victory_options(&args, &config);
    tracing::debug!(?args, ?options, "Starting");

    match args.mode {
        Mode::Local => play_at_terminal(options, None).await,
        Mode::Bot => play_at_terminal(options, Some(agent(args.seed, 0))).await,
        Mode::OnlineDemo => online_demo(config, options, args.seed).await,
    }
}

/// Read commands from stdin until the game ends. With a bot, the human
/// plays Player 1.
async fn play_at_terminal(options: VictoryOptions, mut bot: Option<HeuristicAgent>) -> Result<()> {
    let mode = if bot.is_some() { GameMode::Bot } else { GameMode::Local };
    let mut state = GameState::new(options, mode).context("Invalid victory options")?;
    let mut stdin_lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

    println!("{HELP}\n");
    println!("{}", render_game(&state));

    while !state.game_over {
        if let Some(bot) = bot.as_mut() {
            if state.current_turn == Identity::Player2 {
                let events = play_bot_turn(&mut state, Identity::Player2, bot)?;
                for event in events {
                    tracing::info!(?event, "Bot moved");
                }
                println!("{}", render_game(&state));
                continue;
            }
        }

        tokio::select! {
            _ = signal::ctrl_c() => {
                println!("\nInterrupted.");
                return Ok(());
            }
            line = stdin_lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    return Ok(());
                };
                if line.trim().is_empty() {
                    continue;
                }
                let command = match parse_command(&line) {
                    Ok(command) => command,
                    Err(e) => {
                        eprintln!("{e}");
                        continue;
                    }
                };

                let actor = state.current_turn;
                let applied = match command {
                    Command::Select(piece) => state.select_piece(actor, piece).map(|_| ()),
                    Command::Place(coord) => state.place_piece(actor, coord).map(|_| ()),
                    Command::Help => {
                        println!("{HELP}");
                        continue;
                    }
                    Command::Quit => return Ok(()),
                };
                match applied {
                    Ok(()) => println!("{}", render_game(&state)),
                    Err(e) => eprintln!("Rejected: {e}"),
                }
            }
        }
    }

    println!("Game over.");
    Ok(())
}

/// Host and guest bots sharing an in-memory store
async fn online_demo(config: SessionConfig, options: VictoryOptions, seed: Option<u64>) -> Result<()> {
    let store: Arc<dyn SharedStore> = Arc::new(MemoryStore::new());
    let lobby = Lobby::new(store.clone(), config.clone());

    let host_link = lobby.create_room().await?;
    println!("Room {} created", host_link.room_id);
    let host = Session::host(store.clone(), &config, host_link.clone(), options).await?;

    let guest_link = match lobby.join_room(&host_link.room_id).await? {
        JoinOutcome::Joined(link) => link,
        other => anyhow::bail!("Guest could not join: {other:?}"),
    };
    let guest = Session::join(store, &config, guest_link).await?;

    let mut host_bot = agent(seed, 0);
    let mut guest_bot = agent(seed, 1);

    loop {
        let Some(state) = host.state().await else {
            anyhow::bail!("Host has no game");
        };
        if state.game_over {
            break;
        }
        let (session, bot, observer) = if host.is_my_turn().await {
            (&host, &mut host_bot, &guest)
        } else {
            (&guest, &mut guest_bot, &host)
        };
        let published = session.play_turn(bot).await?;
        tracing::debug!(identity = ?session.identity(), ?published, "Turn played");

        let Some(after) = session.state().await else {
            anyhow::bail!("Session lost its game");
        };
        wait_for_sync(observer, &after).await?;
        println!("{}", render_game(&after));
    }

    for link in [host.link(), guest.link()] {
        let outcome = lobby.leave_room(link).await?;
        tracing::info!(identity = ?link.identity, ?outcome, "Left room");
    }
    Ok(())
}

/// Wait until `observer` holds the same board and turn as `expected`
async fn wait_for_sync(observer: &Session, expected: &GameState) -> Result<()> {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(state) = observer.state().await {
                if state.board == expected.board
                    && state.current_turn == expected.current_turn
                    && state.game_over == expected.game_over
                {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .context("Peer did not catch up")
}
