// SPDX-License-Identifier: MIT OR Apache-2.0

//! Six-character room codes

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Length of every room code
pub const ROOM_CODE_LEN: usize = 6;

/// Characters a room code is drawn from
pub const ROOM_CODE_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Why a string is not a room code
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoomCodeError {
    #[error("room code must be {ROOM_CODE_LEN} characters, got {0}")]
    Length(usize),
    #[error("invalid character {0:?} in room code")]
    InvalidChar(char),
}

/// A validated, uppercase room code
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Parse user input: surrounding whitespace is trimmed and letters are
    /// uppercased before validation.
    pub fn parse(input: &str) -> Result<Self, RoomCodeError> {
        let code = input.trim().to_ascii_uppercase();
        if let Some(bad) = code.chars().find(|c| !c.is_ascii_uppercase() && !c.is_ascii_digit()) {
            return Err(RoomCodeError::InvalidChar(bad));
        }
        if code.len() != ROOM_CODE_LEN {
            return Err(RoomCodeError::Length(code.chars().count()));
        }
        Ok(Self(code))
    }

    /// A uniformly random code
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let code = (0..ROOM_CODE_LEN)
            .map(|_| ROOM_CODE_ALPHABET[rng.gen_range(0..ROOM_CODE_ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    /// Deterministic code from a millisecond timestamp: its last six base-36
    /// digits.
    pub fn from_timestamp(millis: u64) -> Self {
        let mut digits = [b'0'; ROOM_CODE_LEN];
        let mut rest = millis;
        for slot in digits.iter_mut().rev() {
            let digit = (rest % 36) as usize;
            *slot = if digit < 10 {
                ROOM_CODE_ALPHABET[26 + digit]
            } else {
                ROOM_CODE_ALPHABET[digit - 10]
            };
            rest /= 36;
        }
        Self(digits.iter().map(|b| *b as char).collect())
    }

    /// The six-character code
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RoomCode {
    type Err = RoomCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RoomCode {
    type Error = RoomCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

impl AsRef<str> for RoomCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
