// SPDX-License-Identifier: MIT OR Apache-2.0

//! Game state and turn logic
//!
//! A turn has two phases. The acting identity selects a piece for the
//! opponent (the acting identity flips), then the opponent places it (the
//! acting identity stays). So the identity that just placed is the one that
//! selects next.

use crate::action::ActionKind;
use crate::board::Board;
use crate::piece::{generate_universe, Piece, PIECE_COUNT};
use crate::victory::{self, VictoryOptions, WinningPositions};
use crate::{Coord, GameError, GameEvent, GameMode, Identity, RoomLink};
use serde::{Deserialize, Serialize};

/// What the acting identity has to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    /// Hand a piece from the pool to the opponent
    SelectPiece,
    /// Place the piece in hand
    PlacePiece(Piece),
    /// Nothing left to do
    Finished,
}

/// Result of a successful placement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceOutcome {
    /// The game goes on; the placer selects next
    Continue,
    /// The placer won
    Won(WinningPositions),
    /// The board filled up without a win
    Draw,
}

/// Full state of one game. This is the unit of synchronization: it is always
/// published whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    /// The board
    #[serde(default)]
    pub board: Board,
    /// Pieces neither on the board nor in hand, ascending
    #[serde(default)]
    pub available_pieces: Vec<Piece>,
    /// The piece awaiting placement
    #[serde(default)]
    pub piece_in_hand: Option<Piece>,
    /// The identity expected to act next
    pub current_turn: Identity,
    /// Winner, once there is one
    #[serde(default)]
    pub winner: Option<Identity>,
    /// The board filled up without a win
    #[serde(default)]
    pub is_draw: bool,
    /// No further moves are accepted
    #[serde(default)]
    pub game_over: bool,
    /// The cells that won the game
    #[serde(default)]
    pub winning_positions: Option<WinningPositions>,
    /// Active win topologies
    #[serde(default)]
    pub victory_options: VictoryOptions,
    /// How the game is played; `Online` marks a networked game
    #[serde(default)]
    pub mode: GameMode,
    /// Local-only room binding
    #[serde(skip)]
    pub room_link: Option<RoomLink>,
}

impl GameState {
    /// Create a fresh game. Player 1 opens by selecting a piece.
    pub fn new(options: VictoryOptions, mode: GameMode) -> Result<Self, GameError> {
        options.validate()?;
        Ok(Self {
            board: Board::empty(),
            available_pieces: generate_universe().to_vec(),
            piece_in_hand: None,
            current_turn: Identity::Player1,
            winner: None,
            is_draw: false,
            game_over: false,
            winning_positions: None,
            victory_options: options,
            mode,
            room_link: None,
        })
    }

    /// What the acting identity has to do next
    pub fn phase(&self) -> TurnPhase {
        if self.game_over {
            TurnPhase::Finished
        } else if let Some(piece) = self.piece_in_hand {
            TurnPhase::PlacePiece(piece)
        } else {
            TurnPhase::SelectPiece
        }
    }

    /// Whether this is a networked game
    pub fn is_online(&self) -> bool {
        self.mode == GameMode::Online
    }

    fn ensure_actor(&self, actor: Identity) -> Result<(), GameError> {
        if self.game_over {
            return Err(GameError::GameOver);
        }
        if actor != self.current_turn {
            return Err(GameError::NotYourTurn(actor));
        }
        Ok(())
    }

    /// Hand `piece` to the opponent. The acting identity flips.
    ///
    /// On error the state is untouched.
    pub fn select_piece(&mut self, actor: Identity, piece: Piece) -> Result<GameEvent, GameError> {
        self.ensure_actor(actor)?;
        if self.piece_in_hand.is_some() {
            return Err(GameError::PieceAlreadyInHand);
        }
        let idx = self
            .available_pieces
            .iter()
            .position(|p| *p == piece)
            .ok_or(GameError::PieceUnavailable(piece))?;

        self.available_pieces.remove(idx);
        self.piece_in_hand = Some(piece);
        self.current_turn = actor.opposite();

        tracing::debug!(?actor, %piece, "Piece selected");
        Ok(GameEvent::PieceSelected { by: actor, piece })
    }

    /// Place the piece in hand at `coord`. The acting identity does not flip.
    ///
    /// On error the state is untouched.
    pub fn place_piece(&mut self, actor: Identity, coord: Coord) -> Result<PlaceOutcome, GameError> {
        self.ensure_actor(actor)?;
        let piece = self.piece_in_hand.ok_or(GameError::NoPieceInHand)?;
        if !coord.is_valid() {
            return Err(GameError::InvalidCoordinate(coord));
        }
        if !self.board.is_empty(coord) {
            return Err(GameError::OccupiedCell(coord));
        }

        self.board = self.board.place(coord, piece);
        self.piece_in_hand = None;
        tracing::debug!(?actor, %piece, %coord, "Piece placed");

        if let Some(positions) = victory::check(&self.board, self.victory_options) {
            self.winner = Some(actor);
            self.winning_positions = Some(positions);
            self.game_over = true;
            tracing::info!(winner = ?actor, kind = ?positions.kind, "Game won");
            return Ok(PlaceOutcome::Won(positions));
        }

        if self.board.is_full() {
            self.is_draw = true;
            self.game_over = true;
            tracing::info!("Game drawn");
            return Ok(PlaceOutcome::Draw);
        }

        Ok(PlaceOutcome::Continue)
    }

    /// Replay a recorded action against this state.
    ///
    /// The actor is recovered from the action: a placement keeps the acting
    /// identity, a selection flips it.
    pub fn apply_action(&mut self, action: &ActionKind) -> Result<(), GameError> {
        match *action {
            ActionKind::Place { coord, piece, acting_identity_after } => {
                if let (Some(expected), Some(held)) = (piece, self.piece_in_hand) {
                    if expected != held {
                        return Err(GameError::PieceUnavailable(expected));
                    }
                }
                self.place_piece(acting_identity_after, coord).map(|_| ())
            }
            ActionKind::Select { piece, acting_identity_after } => {
                self.select_piece(acting_identity_after.opposite(), piece).map(|_| ())
            }
        }
    }

    /// Check that pool, hand and board partition the 16 pieces and that the
    /// terminal flags agree with each other.
    pub fn check_partition(&self) -> Result<(), GameError> {
        let mut seen = [false; PIECE_COUNT];
        let all = self
            .available_pieces
            .iter()
            .copied()
            .chain(self.piece_in_hand)
            .chain(self.board.pieces());

        let mut count = 0;
        for piece in all {
            if std::mem::replace(&mut seen[piece.value() as usize], true) {
                return Err(GameError::InconsistentState(format!("piece {piece} appears twice")));
            }
            count += 1;
        }
        if count != PIECE_COUNT {
            return Err(GameError::InconsistentState(format!(
                "{count} pieces accounted for, expected {PIECE_COUNT}"
            )));
        }
        if self.winner.is_some() && !self.game_over {
            return Err(GameError::InconsistentState("winner set on a running game".into()));
        }
        Ok(())
    }
}
