// SPDX-License-Identifier: MIT OR Apache-2.0

//! Quarto Core - Game Rules and Board Logic
//!
//! This crate provides the core game functionality including:
//! - Piece attributes and the 16-piece universe
//! - Board representation and wire normalization
//! - Victory detection for line and square topologies
//! - The heuristic opponent
//! - Turn logic, game actions and replay

#![deny(unsafe_code)]
#![deny(clippy::all)]

pub mod action;
pub mod board;
pub mod engine;
pub mod game;
pub mod heuristic;
pub mod piece;
pub mod victory;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One of the two seats in a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Identity {
    /// The host seat; opens the game by selecting a piece
    Player1,
    /// The second seat
    Player2,
}

impl Identity {
    /// Returns the other identity
    pub fn opposite(&self) -> Self {
        match self {
            Identity::Player1 => Identity::Player2,
            Identity::Player2 => Identity::Player1,
        }
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Identity::Player1 => f.write_str("player 1"),
            Identity::Player2 => f.write_str("player 2"),
        }
    }
}

/// Board coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    /// Row index, top to bottom
    pub row: u8,
    /// Column index, left to right
    pub col: u8,
}

impl Coord {
    /// Create a new coordinate
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    /// Check if the coordinate lies on the board
    pub fn is_valid(&self) -> bool {
        (self.row as usize) < board::BOARD_SIZE && (self.col as usize) < board::BOARD_SIZE
    }
}

impl std::fmt::Display for Coord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// How a game is being played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    /// Two people sharing one client
    #[default]
    Local,
    /// Against the heuristic opponent on this client
    Bot,
    /// Two clients synchronized through a shared room
    Online,
}

/// Local-only link between a game and the room it is played in.
///
/// Never serialized: each client keeps its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomLink {
    /// Room code
    pub room_id: String,
    /// Which seat this client occupies
    pub identity: Identity,
    /// Whether this client created the room
    pub is_host: bool,
}

/// Game events emitted during play
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// A piece was handed over to the opponent
    PieceSelected {
        /// The identity that chose the piece
        by: Identity,
        /// The chosen piece
        piece: piece::Piece,
    },
    /// A piece was placed on the board
    PiecePlaced {
        /// The identity that placed it
        by: Identity,
        /// Where it went
        coord: Coord,
        /// The placed piece
        piece: piece::Piece,
    },
    /// The game ended with a winner
    GameWon {
        /// The winner
        winner: Identity,
        /// The winning cells
        positions: victory::WinningPositions,
    },
    /// The board filled up without a win
    GameDrawn,
    /// A remote snapshot started the game on this client
    GameStarted,
    /// The other seat connected to the room
    PeerJoined(Identity),
    /// The other seat left the room
    PeerLeft(Identity),
}

/// Errors that can occur during game play
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    /// The coordinate is outside the board
    #[error("Invalid coordinate {0}")]
    InvalidCoordinate(Coord),

    /// The cell already holds a piece
    #[error("Cell {0} already occupied")]
    OccupiedCell(Coord),

    /// It is the other identity's turn
    #[error("Not {0}'s turn")]
    NotYourTurn(Identity),

    /// A piece must be selected before placing
    #[error("No piece in hand")]
    NoPieceInHand,

    /// The piece in hand must be placed before selecting another
    #[error("A piece is already in hand")]
    PieceAlreadyInHand,

    /// The piece is not in the available pool
    #[error("Piece {0} is not available")]
    PieceUnavailable(piece::Piece),

    /// The game is over
    #[error("Game is already over")]
    GameOver,

    /// No snapshot has been adopted yet
    #[error("Game has not started")]
    NotStarted,

    /// Neither lines nor squares are enabled
    #[error("At least one victory topology must be enabled")]
    NoVictoryTopology,

    /// A snapshot violates the piece partition
    #[error("Inconsistent game state: {0}")]
    InconsistentState(String),
}

pub use action::{ActionError, ActionKind, GameAction};
pub use board::{Board, BoardError, RawBoard, BOARD_SIZE};
pub use engine::{play_bot_turn, PlayerBackend};
pub use game::{GameState, PlaceOutcome, TurnPhase};
pub use heuristic::HeuristicAgent;
pub use piece::{generate_universe, Attribute, Piece, PieceError, PIECE_COUNT};
pub use victory::{VictoryOptions, WinKind, WinningPositions};
