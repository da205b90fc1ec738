// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parsing of typed player commands

use quarto_core::{Coord, Piece, PieceError, BOARD_SIZE};
use std::str::FromStr;
use thiserror::Error;

pub const HELP: &str = "\
Commands:
  select <piece>     hand a piece to the opponent (number 0-15 or letters like DrTh)
  place <row> <col>  place the piece in hand (0-3 each)
  help               show this message
  quit               leave the game";

/// A command typed by a player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Select(Piece),
    Place(Coord),
    Help,
    Quit,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command '{0}'. Type 'help' for the list")]
    Unknown(String),

    #[error("Missing {0}")]
    MissingArgument(&'static str),

    #[error("Unexpected extra input '{0}'")]
    TrailingInput(String),

    #[error("'{0}' is neither a piece number nor four attribute letters")]
    BadPiece(String),

    #[error(transparent)]
    PieceRange(#[from] PieceError),

    #[error("'{0}' is not a board index (0-3)")]
    BadIndex(String),
}

/// Parse one line of input
pub fn parse_command(input: &str) -> Result<Command, ParseError> {
    let mut words = input.split_whitespace();
    let verb = words.next().ok_or(ParseError::Empty)?.to_lowercase();

    let command = match verb.as_str() {
        "select" | "s" => {
            let arg = words.next().ok_or(ParseError::MissingArgument("piece"))?;
            Command::Select(parse_piece(arg)?)
        }
        "place" | "p" => {
            let row = parse_index(words.next().ok_or(ParseError::MissingArgument("row"))?)?;
            let col = parse_index(words.next().ok_or(ParseError::MissingArgument("column"))?)?;
            Command::Place(Coord::new(row, col))
        }
        "help" | "h" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        _ => return Err(ParseError::Unknown(verb)),
    };

    match words.next() {
        Some(extra) => Err(ParseError::TrailingInput(extra.to_string())),
        None => Ok(command),
    }
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_command(s)
    }
}

/// A piece by number, or by its display letters (`DrTh` is 5)
fn parse_piece(arg: &str) -> Result<Piece, ParseError> {
    if let Ok(value) = arg.parse::<u8>() {
        return Ok(Piece::try_from(value)?);
    }

    let letters = ['d', 'r', 't', 'h'];
    let chars: Vec<char> = arg.chars().collect();
    if chars.len() != letters.len() {
        return Err(ParseError::BadPiece(arg.to_string()));
    }
    let mut value = 0u8;
    for (bit, (c, letter)) in chars.iter().zip(letters).enumerate() {
        if *c == letter.to_ascii_uppercase() {
            value |= 1 << bit;
        } else if *c != letter {
            return Err(ParseError::BadPiece(arg.to_string()));
        }
    }
    Ok(Piece::try_from(value)?)
}

fn parse_index(arg: &str) -> Result<u8, ParseError> {
    match arg.parse::<u8>() {
        Ok(index) if (index as usize) < BOARD_SIZE => Ok(index),
        _ => Err(ParseError::BadIndex(arg.to_string())),
    }
}
