// SPDX-License-Identifier: MIT OR Apache-2.0

//! Victory detection for the line and square topologies

use crate::board::{Board, BOARD_SIZE};
use crate::piece::{Piece, ATTRIBUTE_MASK};
use crate::{Coord, GameError};
use serde::{Deserialize, Serialize};

/// Which win topologies are active for a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VictoryOptions {
    /// Rows, columns and both diagonals
    #[serde(default)]
    pub lines: bool,
    /// Every contiguous 2x2 block
    #[serde(default)]
    pub squares: bool,
}

impl Default for VictoryOptions {
    fn default() -> Self {
        Self::LINES
    }
}

impl VictoryOptions {
    pub const LINES: Self = Self { lines: true, squares: false };
    pub const SQUARES: Self = Self { lines: false, squares: true };
    pub const BOTH: Self = Self { lines: true, squares: true };

    /// Reject configurations with no way to win
    pub fn validate(&self) -> Result<(), GameError> {
        if self.lines || self.squares {
            Ok(())
        } else {
            Err(GameError::NoVictoryTopology)
        }
    }
}

/// The shape that produced a win
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum WinKind {
    Row { index: u8 },
    Column { index: u8 },
    Diagonal,
    AntiDiagonal,
    /// 2x2 block anchored at its top-left cell
    Square { row: u8, col: u8 },
}

/// The four cells of a win
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WinningPositions {
    /// Which topology matched
    pub kind: WinKind,
    /// The matching cells
    pub cells: [Coord; BOARD_SIZE],
}

/// Whether the pieces agree on at least one attribute, all set or all clear
pub fn shares_attribute(pieces: &[Piece]) -> bool {
    if pieces.is_empty() {
        return false;
    }
    let all_set = pieces.iter().fold(ATTRIBUTE_MASK, |acc, p| acc & p.value());
    let all_clear = pieces.iter().fold(ATTRIBUTE_MASK, |acc, p| acc & !p.value());
    all_set != 0 || all_clear & ATTRIBUTE_MASK != 0
}

/// Candidate sets in scan order: rows, columns, main diagonal, anti-diagonal,
/// then squares row-major.
pub fn candidate_sets(options: VictoryOptions) -> Vec<(WinKind, [Coord; BOARD_SIZE])> {
    let n = BOARD_SIZE as u8;
    let mut sets = Vec::new();

    if options.lines {
        for r in 0..n {
            sets.push((WinKind::Row { index: r }, std::array::from_fn(|i| Coord::new(r, i as u8))));
        }
        for c in 0..n {
            sets.push((WinKind::Column { index: c }, std::array::from_fn(|i| Coord::new(i as u8, c))));
        }
        sets.push((WinKind::Diagonal, std::array::from_fn(|i| Coord::new(i as u8, i as u8))));
        sets.push((
            WinKind::AntiDiagonal,
            std::array::from_fn(|i| Coord::new(i as u8, n - 1 - i as u8)),
        ));
    }

    if options.squares {
        for r in 0..n - 1 {
            for c in 0..n - 1 {
                let cells = [
                    Coord::new(r, c),
                    Coord::new(r, c + 1),
                    Coord::new(r + 1, c),
                    Coord::new(r + 1, c + 1),
                ];
                sets.push((WinKind::Square { row: r, col: c }, cells));
            }
        }
    }

    sets
}

/// Whether every cell is occupied and the pieces share an attribute
pub fn is_winning_set(board: &Board, cells: &[Coord]) -> bool {
    let mut pieces = Vec::with_capacity(cells.len());
    for &cell in cells {
        match board.get(cell) {
            Some(piece) => pieces.push(piece),
            None => return false,
        }
    }
    shares_attribute(&pieces)
}

/// The first winning set on the board, lines before squares
pub fn check(board: &Board, options: VictoryOptions) -> Option<WinningPositions> {
    candidate_sets(options)
        .into_iter()
        .find(|(_, cells)| is_winning_set(board, cells))
        .map(|(kind, cells)| WinningPositions { kind, cells })
}
