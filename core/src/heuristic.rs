// SPDX-License-Identifier: MIT OR Apache-2.0

//! Heuristic opponent
//!
//! Placement is scored in three tiers: a winning cell is taken outright,
//! then cells are ranked by how many pieces could safely be handed over
//! afterwards, then by offensive potential. A bounded jitter breaks ties.

use crate::board::Board;
use crate::piece::{generate_universe, Piece};
use crate::victory::{self, candidate_sets, VictoryOptions};
use crate::Coord;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Base score of a cell that leaves at least one safe gift (or none needed)
const SAFE_BASE: f64 = 1000.0;
/// Base score of a cell after which every remaining piece loses
const FORCED_LOSS: f64 = 0.0;
/// Weight of each safe piece left after the placement
const SAFE_PIECE_WEIGHT: f64 = 2.0;

/// First empty cell, row-major, where placing `piece` wins
pub fn winning_cell(board: &Board, piece: Piece, options: VictoryOptions) -> Option<Coord> {
    board
        .empty_cells()
        .find(|cell| victory::check(&board.place(*cell, piece), options).is_some())
}

/// Whether handing `gift` over gives the opponent no immediate win
pub fn gift_is_safe(board: &Board, gift: Piece, options: VictoryOptions) -> bool {
    winning_cell(board, gift, options).is_none()
}

/// Pieces neither on the board nor in `hand`
fn remaining_pieces(board: &Board, hand: Option<Piece>) -> Vec<Piece> {
    let mut on_board = [false; crate::PIECE_COUNT];
    for piece in board.pieces().chain(hand) {
        on_board[piece.value() as usize] = true;
    }
    generate_universe()
        .into_iter()
        .filter(|p| !on_board[p.value() as usize])
        .collect()
}

/// Offensive potential of the board through `cell`: every partially filled
/// context with two or more pieces sharing an attribute adds its size squared.
fn offense(board: &Board, cell: Coord, options: VictoryOptions) -> f64 {
    candidate_sets(options)
        .into_iter()
        .filter(|(_, cells)| cells.contains(&cell))
        .map(|(_, cells)| {
            let pieces: Vec<Piece> = cells.iter().filter_map(|c| board.get(*c)).collect();
            let k = pieces.len();
            if k >= 2 && k < cells.len() && victory::shares_attribute(&pieces) {
                (k * k) as f64
            } else {
                0.0
            }
        })
        .sum()
}

/// Score of placing `piece` at `cell`, without jitter
fn score_cell(board: &Board, cell: Coord, piece: Piece, options: VictoryOptions) -> f64 {
    let after = board.place(cell, piece);
    let remaining = remaining_pieces(&after, None);
    let safe = remaining
        .iter()
        .filter(|gift| gift_is_safe(&after, **gift, options))
        .count();

    if safe == 0 && !remaining.is_empty() {
        return FORCED_LOSS;
    }
    SAFE_BASE + SAFE_PIECE_WEIGHT * safe as f64 + offense(&after, cell, options)
}

/// Pick a cell for `piece`.
///
/// Returns `None` only when the board is full.
pub fn choose_placement<R: Rng + ?Sized>(
    board: &Board,
    piece: Piece,
    options: VictoryOptions,
    rng: &mut R,
) -> Option<Coord> {
    if let Some(cell) = winning_cell(board, piece, options) {
        tracing::debug!(%cell, %piece, "Taking winning cell");
        return Some(cell);
    }

    let mut best: Option<(Coord, f64)> = None;
    for cell in board.empty_cells() {
        let score = score_cell(board, cell, piece, options) + rng.gen::<f64>();
        if !best.is_some_and(|(_, top)| score <= top) {
            best = Some((cell, score));
        }
    }

    if let Some((cell, score)) = best {
        tracing::trace!(%cell, score, "Chose placement");
    }
    best.map(|(cell, _)| cell)
}

/// Pick a piece from `pool` to hand to the opponent.
///
/// Uniform among safe pieces when any exist, otherwise uniform among all.
/// Returns `None` only when the pool is empty.
pub fn choose_gift<R: Rng + ?Sized>(
    board: &Board,
    pool: &[Piece],
    options: VictoryOptions,
    rng: &mut R,
) -> Option<Piece> {
    let safe: Vec<Piece> = pool
        .iter()
        .copied()
        .filter(|gift| gift_is_safe(board, *gift, options))
        .collect();

    if safe.is_empty() {
        tracing::debug!(pool = pool.len(), "No safe gift left");
        pool.choose(rng).copied()
    } else {
        safe.choose(rng).copied()
    }
}

/// The automated opponent, owning its random source
#[derive(Debug, Clone)]
pub struct HeuristicAgent<R: Rng = StdRng> {
    rng: R,
}

impl HeuristicAgent<StdRng> {
    /// Agent seeded from the OS
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic agent
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for HeuristicAgent<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> HeuristicAgent<R> {
    /// Agent drawing its jitter from `rng`
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Cell for the piece in hand, see [`choose_placement`]
    pub fn placement(&mut self, board: &Board, piece: Piece, options: VictoryOptions) -> Option<Coord> {
        choose_placement(board, piece, options, &mut self.rng)
    }

    /// Piece to hand over, see [`choose_gift`]
    pub fn gift(&mut self, board: &Board, pool: &[Piece], options: VictoryOptions) -> Option<Piece> {
        choose_gift(board, pool, options, &mut self.rng)
    }
}
