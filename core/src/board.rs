// SPDX-License-Identifier: MIT OR Apache-2.0

//! Board representation and wire normalization

use crate::piece::{Piece, PieceError, PIECE_COUNT};
use crate::Coord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Side length of the board
pub const BOARD_SIZE: usize = 4;

type Grid = [[Option<Piece>; BOARD_SIZE]; BOARD_SIZE];

/// The 4x4 board.
///
/// Cells are filled monotonically: once a piece lands it never moves. All
/// boards received from the network go through [`normalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "RawBoard", try_from = "Option<RawBoard>")]
pub struct Board {
    cells: Grid,
}

impl Board {
    /// A board with every cell unoccupied
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the cell is unoccupied.
    ///
    /// # Panics
    /// If the coordinate lies outside the board.
    pub fn is_empty(&self, coord: Coord) -> bool {
        self.get(coord).is_none()
    }

    /// The piece at a cell, if any.
    ///
    /// # Panics
    /// If the coordinate lies outside the board.
    pub fn get(&self, coord: Coord) -> Option<Piece> {
        assert!(coord.is_valid(), "coordinate {coord} outside the board");
        self.cells[coord.row as usize][coord.col as usize]
    }

    /// A copy of this board with `piece` placed at `coord`.
    ///
    /// Callers check [`Board::is_empty`] first; placing on an occupied cell is
    /// a logic error.
    #[must_use]
    pub fn place(&self, coord: Coord, piece: Piece) -> Board {
        debug_assert!(self.is_empty(coord), "cell {coord} already occupied");
        let mut next = *self;
        next.cells[coord.row as usize][coord.col as usize] = Some(piece);
        next
    }

    /// Every coordinate in row-major order
    pub fn coords() -> impl Iterator<Item = Coord> {
        (0..BOARD_SIZE as u8).flat_map(|row| (0..BOARD_SIZE as u8).map(move |col| Coord::new(row, col)))
    }

    /// Unoccupied cells in row-major order
    pub fn empty_cells(&self) -> impl Iterator<Item = Coord> + '_ {
        Self::coords().filter(|c| self.is_empty(*c))
    }

    /// Occupied cells with their pieces in row-major order
    pub fn occupied(&self) -> impl Iterator<Item = (Coord, Piece)> + '_ {
        Self::coords().filter_map(|c| self.get(c).map(|p| (c, p)))
    }

    /// Pieces currently on the board
    pub fn pieces(&self) -> impl Iterator<Item = Piece> + '_ {
        self.cells.iter().flatten().filter_map(|cell| *cell)
    }

    /// Number of occupied cells
    pub fn piece_count(&self) -> usize {
        self.pieces().count()
    }

    /// Whether every cell is occupied
    pub fn is_full(&self) -> bool {
        self.piece_count() == BOARD_SIZE * BOARD_SIZE
    }

    /// Row-major view of the cells
    pub fn rows(&self) -> &Grid {
        &self.cells
    }
}

/// Errors raised while rebuilding a board from its wire form
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BoardError {
    /// A sparse-map key is not a number
    #[error("invalid index key {0:?}")]
    InvalidIndex(String),

    /// Row index beyond the board
    #[error("row {0} outside the board")]
    RowOutOfRange(usize),

    /// Column index beyond the board
    #[error("column {col} of row {row} outside the board")]
    ColumnOutOfRange {
        /// Row holding the bad column
        row: usize,
        /// Offending column
        col: usize,
    },

    /// Corrupted piece value
    #[error(transparent)]
    InvalidPiece(#[from] PieceError),

    /// The same piece appears twice
    #[error("piece {0} appears more than once")]
    DuplicatePiece(Piece),
}

/// A board row as it may arrive over the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawRow {
    /// `[p, null, p, p]`, possibly truncated
    Dense(Vec<Option<u8>>),
    /// `{"0": p, "2": p}`
    Sparse(BTreeMap<String, Option<u8>>),
}

/// A board as it may arrive over the wire.
///
/// Realtime stores coerce arrays with holes into index-keyed objects and drop
/// nulls, so both shapes are accepted at every level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawBoard {
    /// Nested arrays
    Dense(Vec<Option<RawRow>>),
    /// Index-keyed rows
    Sparse(BTreeMap<String, Option<RawRow>>),
}

impl From<Board> for RawBoard {
    fn from(board: Board) -> Self {
        RawBoard::Dense(
            board
                .cells
                .iter()
                .map(|row| Some(RawRow::Dense(row.iter().map(|c| c.map(u8::from)).collect())))
                .collect(),
        )
    }
}

impl TryFrom<Option<RawBoard>> for Board {
    type Error = BoardError;

    fn try_from(raw: Option<RawBoard>) -> Result<Self, Self::Error> {
        normalize(raw)
    }
}

fn sparse_entries<T>(map: BTreeMap<String, T>) -> Result<Vec<(usize, T)>, BoardError> {
    map.into_iter()
        .map(|(key, value)| match key.trim().parse::<usize>() {
            Ok(idx) => Ok((idx, value)),
            Err(_) => Err(BoardError::InvalidIndex(key)),
        })
        .collect()
}

/// Rebuild a dense board from any accepted wire shape.
///
/// Missing or null input yields an empty board.
pub fn normalize(raw: Option<RawBoard>) -> Result<Board, BoardError> {
    let mut board = Board::empty();
    let mut seen = [false; PIECE_COUNT];

    let rows: Vec<(usize, Option<RawRow>)> = match raw {
        None => return Ok(board),
        Some(RawBoard::Dense(rows)) => rows.into_iter().enumerate().collect(),
        Some(RawBoard::Sparse(rows)) => sparse_entries(rows)?,
    };

    for (row, raw_row) in rows {
        let Some(raw_row) = raw_row else { continue };
        if row >= BOARD_SIZE {
            return Err(BoardError::RowOutOfRange(row));
        }

        let cells: Vec<(usize, Option<u8>)> = match raw_row {
            RawRow::Dense(cells) => cells.into_iter().enumerate().collect(),
            RawRow::Sparse(cells) => sparse_entries(cells)?,
        };

        for (col, value) in cells {
            let Some(value) = value else { continue };
            if col >= BOARD_SIZE {
                return Err(BoardError::ColumnOutOfRange { row, col });
            }
            let piece = Piece::try_from(value)?;
            if std::mem::replace(&mut seen[value as usize], true) {
                return Err(BoardError::DuplicatePiece(piece));
            }
            board.cells[row][col] = Some(piece);
        }
    }

    Ok(board)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn piece(v: u8) -> Piece {
        Piece::new(v).unwrap()
    }

    #[test]
    fn board_creation() {
        let board = Board::empty();
        assert_eq!(board.empty_cells().count(), 16);
        assert!(!board.is_full());
        assert!(board.is_empty(Coord::new(3, 3)));
    }

    #[test]
    fn place_adds_exactly_one_piece() {
        let board = Board::empty();
        let next = board.place(Coord::new(1, 2), piece(7));
        assert_eq!(board.piece_count(), 0, "original board is untouched");
        assert_eq!(next.piece_count(), 1);
        assert_eq!(next.get(Coord::new(1, 2)), Some(piece(7)));
        assert_eq!(next.occupied().collect::<Vec<_>>(), vec![(Coord::new(1, 2), piece(7))]);
    }

    #[test]
    #[should_panic(expected = "outside the board")]
    fn out_of_range_access_panics() {
        Board::empty().is_empty(Coord::new(4, 0));
    }

    fn decode(value: serde_json::Value) -> Result<Board, BoardError> {
        let raw: Option<RawBoard> = serde_json::from_value(value).unwrap();
        normalize(raw)
    }

    #[test]
    fn normalizes_dense_sparse_and_missing_boards() {
        let dense = decode(json!([[0, null, null, null], null, [null, null, 5], []])).unwrap();
        assert_eq!(dense.get(Coord::new(0, 0)), Some(piece(0)));
        assert_eq!(dense.get(Coord::new(2, 2)), Some(piece(5)));
        assert_eq!(dense.piece_count(), 2);

        let sparse = decode(json!({"0": {"0": 0}, "2": {"2": 5}})).unwrap();
        assert_eq!(sparse, dense);

        let mixed = decode(json!([[0], {"1": 9}])).unwrap();
        assert_eq!(mixed.get(Coord::new(1, 1)), Some(piece(9)));

        assert_eq!(decode(json!(null)).unwrap(), Board::empty());
    }

    #[test]
    fn rejects_malformed_boards() {
        assert_eq!(decode(json!([[16]])), Err(BoardError::InvalidPiece(PieceError(16))));
        assert_eq!(decode(json!({"4": [1]})), Err(BoardError::RowOutOfRange(4)));
        assert_eq!(
            decode(json!([[null, null, null, null, 3]])),
            Err(BoardError::ColumnOutOfRange { row: 0, col: 4 })
        );
        assert_eq!(decode(json!({"x": [1]})), Err(BoardError::InvalidIndex("x".into())));
        assert_eq!(decode(json!([[1, 1]])), Err(BoardError::DuplicatePiece(piece(1))));
    }

    #[test]
    fn board_serde_goes_through_normalize() {
        let board = Board::empty().place(Coord::new(3, 1), piece(12));
        let value = serde_json::to_value(board).unwrap();
        assert_eq!(value[3][1], json!(12));
        let back: Board = serde_json::from_value(value).unwrap();
        assert_eq!(back, board);

        let sparse: Board = serde_json::from_value(json!({"3": {"1": 12}})).unwrap();
        assert_eq!(sparse, board);
    }
}
