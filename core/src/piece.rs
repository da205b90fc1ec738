// SPDX-License-Identifier: MIT OR Apache-2.0

//! Piece attributes
//!
//! A piece is a 4-bit value; each bit is one binary attribute. Pieces are
//! plain scalars so they compare, hash and serialize as integers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of independent attributes per piece
pub const ATTRIBUTE_COUNT: u32 = 4;

/// Number of distinct pieces
pub const PIECE_COUNT: usize = 1 << ATTRIBUTE_COUNT;

/// Mask covering every attribute bit
pub const ATTRIBUTE_MASK: u8 = (PIECE_COUNT - 1) as u8;

/// A single binary attribute of a piece
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    /// Hue: dark when set, light when clear
    Dark,
    /// Silhouette: round when set, square when clear
    Round,
    /// Stature: tall when set, short when clear
    Tall,
    /// Cavity: hollow when set, solid when clear
    Hollow,
}

impl Attribute {
    /// All attributes in bit order
    pub const ALL: [Attribute; ATTRIBUTE_COUNT as usize] =
        [Attribute::Dark, Attribute::Round, Attribute::Tall, Attribute::Hollow];

    /// The bit this attribute occupies
    pub const fn bit(self) -> u8 {
        match self {
            Attribute::Dark => 0b0001,
            Attribute::Round => 0b0010,
            Attribute::Tall => 0b0100,
            Attribute::Hollow => 0b1000,
        }
    }
}

/// Error raised when decoding a piece value
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("piece value {0} out of range")]
pub struct PieceError(pub u8);

/// A playing piece
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Piece(u8);

impl Piece {
    /// Create a piece from its bit pattern
    pub const fn new(value: u8) -> Option<Self> {
        if value <= ATTRIBUTE_MASK {
            Some(Self(value))
        } else {
            None
        }
    }

    /// The raw bit pattern
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Whether the piece has the given attribute set
    pub const fn has(self, attribute: Attribute) -> bool {
        self.0 & attribute.bit() != 0
    }

    /// Whether the piece is dark
    pub const fn is_dark(self) -> bool {
        self.has(Attribute::Dark)
    }

    /// Whether the piece is round
    pub const fn is_round(self) -> bool {
        self.has(Attribute::Round)
    }

    /// Whether the piece is tall
    pub const fn is_tall(self) -> bool {
        self.has(Attribute::Tall)
    }

    /// Whether the piece is hollow
    pub const fn is_hollow(self) -> bool {
        self.has(Attribute::Hollow)
    }
}

impl TryFrom<u8> for Piece {
    type Error = PieceError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Piece::new(value).ok_or(PieceError(value))
    }
}

impl From<Piece> for u8 {
    fn from(piece: Piece) -> Self {
        piece.0
    }
}

impl std::fmt::Display for Piece {
    /// Four letters, one per attribute; uppercase when set.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let letters = [('d', 'D'), ('r', 'R'), ('t', 'T'), ('h', 'H')];
        for (attribute, (clear, set)) in Attribute::ALL.iter().zip(letters) {
            let c = if self.has(*attribute) { set } else { clear };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

/// Every piece exactly once, in ascending value order
pub fn generate_universe() -> [Piece; PIECE_COUNT] {
    let mut pieces = [Piece(0); PIECE_COUNT];
    for (value, slot) in pieces.iter_mut().enumerate() {
        *slot = Piece(value as u8);
    }
    pieces
}
