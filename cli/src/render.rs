// SPDX-License-Identifier: MIT OR Apache-2.0

//! ASCII rendering for the CLI.
//!
//! Pieces print as their four attribute letters (`DRTH`), uppercase when the
//! attribute is set. Cells of a winning set are marked with `*`.

use quarto_core::{Board, Coord, GameState, Identity, Piece, BOARD_SIZE};
use std::fmt::Write;

const EMPTY_CELL: &str = "----";

/// Render the board with row and column indices
pub fn render_board(board: &Board, winning: &[Coord]) -> String {
    let mut output = String::from("   ");
    for col in 0..BOARD_SIZE {
        let _ = write!(output, "   {col}  ");
    }
    output.push('\n');

    for row in 0..BOARD_SIZE {
        let _ = write!(output, "{row:2} ");
        for col in 0..BOARD_SIZE {
            let coord = Coord::new(row as u8, col as u8);
            let marker = if winning.contains(&coord) { '*' } else { ' ' };
            match board.get(coord) {
                Some(piece) => {
                    let _ = write!(output, " {piece}{marker}");
                }
                None => {
                    let _ = write!(output, " {EMPTY_CELL}{marker}");
                }
            }
        }
        output.push('\n');
    }
    output
}

/// Pieces still available, with the number to type for each
pub fn render_pool(pieces: &[Piece]) -> String {
    if pieces.is_empty() {
        return "Pool: (empty)".to_string();
    }
    let entries: Vec<String> = pieces.iter().map(|p| format!("{}:{}", p.value(), p)).collect();
    format!("Pool: {}", entries.join(" "))
}

fn seat(identity: Identity) -> &'static str {
    match identity {
        Identity::Player1 => "Player 1",
        Identity::Player2 => "Player 2",
    }
}

/// One line saying what happens next, or how the game ended
pub fn render_status(state: &GameState) -> String {
    if let Some(winner) = state.winner {
        return format!("{} wins!", seat(winner));
    }
    if state.is_draw {
        return "Draw: the board is full.".to_string();
    }
    match state.piece_in_hand {
        Some(piece) => format!("{} to place {} ({})", seat(state.current_turn), piece, piece.value()),
        None => format!("{} to select a piece for the opponent", seat(state.current_turn)),
    }
}

/// Board, pool and status together
pub fn render_game(state: &GameState) -> String {
    let winning = state
        .winning_positions
        .map(|w| w.cells.to_vec())
        .unwrap_or_default();
    format!(
        "{}\n{}\n{}\n",
        render_board(&state.board, &winning),
        render_pool(&state.available_pieces),
        render_status(state)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarto_core::{GameMode, VictoryOptions};

    fn piece(v: u8) -> Piece {
        Piece::new(v).unwrap()
    }

    #[test]
    fn empty_board_has_labels_and_blank_cells() {
        let output = render_board(&Board::empty(), &[]);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), BOARD_SIZE + 1);
        assert!(lines[0].contains('0') && lines[0].contains('3'));
        assert_eq!(lines[1].matches(EMPTY_CELL).count(), BOARD_SIZE);
    }

    #[test]
    fn pieces_and_winning_marks() {
        let board = Board::empty()
            .place(Coord::new(0, 0), piece(15))
            .place(Coord::new(2, 1), piece(0));
        let output = render_board(&board, &[Coord::new(0, 0)]);
        assert!(output.contains("DRTH*"));
        assert!(output.contains("drth "));
    }

    #[test]
    fn status_follows_the_turn() {
        let mut state = GameState::new(VictoryOptions::LINES, GameMode::Local).unwrap();
        assert_eq!(render_status(&state), "Player 1 to select a piece for the opponent");

        state.select_piece(Identity::Player1, piece(5)).unwrap();
        assert_eq!(render_status(&state), "Player 2 to place DrTh (5)");
        assert!(render_pool(&state.available_pieces).starts_with("Pool: 0:drth 1:Drth"));
        assert!(!render_pool(&state.available_pieces).contains("5:"));
    }

    #[test]
    fn finished_games() {
        let mut state = GameState::new(VictoryOptions::LINES, GameMode::Local).unwrap();
        state.winner = Some(Identity::Player2);
        state.game_over = true;
        assert_eq!(render_status(&state), "Player 2 wins!");
        assert_eq!(render_pool(&[]), "Pool: (empty)");
    }
}
