// SPDX-License-Identifier: MIT OR Apache-2.0

//! Player backends and the automated turn driver

use crate::game::{GameState, PlaceOutcome, TurnPhase};
use crate::heuristic::HeuristicAgent;
use crate::piece::Piece;
use crate::{Coord, GameError, GameEvent, Identity};
use rand::Rng;

/// Decision source for one seat
pub trait PlayerBackend {
    /// Where to put the piece in hand; `None` when there is nothing to place
    fn choose_placement(&mut self, state: &GameState) -> Option<Coord>;

    /// Which piece to hand over; `None` when the pool is empty
    fn choose_gift(&mut self, state: &GameState) -> Option<Piece>;
}

impl<R: Rng> PlayerBackend for HeuristicAgent<R> {
    fn choose_placement(&mut self, state: &GameState) -> Option<Coord> {
        let piece = state.piece_in_hand?;
        self.placement(&state.board, piece, state.victory_options)
    }

    fn choose_gift(&mut self, state: &GameState) -> Option<Piece> {
        self.gift(&state.board, &state.available_pieces, state.victory_options)
    }
}

/// Play whatever is left of `identity`'s turn: place the piece in hand if
/// there is one, then hand a piece over unless the game ended.
///
/// Returns the events produced, in order.
pub fn play_bot_turn<B: PlayerBackend + ?Sized>(
    state: &mut GameState,
    identity: Identity,
    backend: &mut B,
) -> Result<Vec<GameEvent>, GameError> {
    let _span = tracing::debug_span!("play_bot_turn", ?identity).entered();
    let mut events = Vec::new();

    if state.current_turn != identity {
        return Err(GameError::NotYourTurn(identity));
    }

    if let TurnPhase::PlacePiece(piece) = state.phase() {
        let coord = backend
            .choose_placement(state)
            .ok_or_else(|| GameError::InconsistentState("no cell offered for the piece in hand".into()))?;
        let outcome = state.place_piece(identity, coord)?;
        events.push(GameEvent::PiecePlaced { by: identity, coord, piece });
        match outcome {
            PlaceOutcome::Won(positions) => {
                events.push(GameEvent::GameWon { winner: identity, positions });
                return Ok(events);
            }
            PlaceOutcome::Draw => {
                events.push(GameEvent::GameDrawn);
                return Ok(events);
            }
            PlaceOutcome::Continue => {}
        }
    }

    match state.phase() {
        TurnPhase::SelectPiece => {
            let piece = backend
                .choose_gift(state)
                .ok_or_else(|| GameError::InconsistentState("no piece left to hand over".into()))?;
            events.push(state.select_piece(identity, piece)?);
        }
        TurnPhase::Finished => return Err(GameError::GameOver),
        TurnPhase::PlacePiece(_) => {}
    }

    Ok(events)
}
