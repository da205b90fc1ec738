// SPDX-License-Identifier: MIT OR Apache-2.0

//! Discrete game actions and their wire schema

use crate::piece::Piece;
use crate::{Coord, Identity};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What happened in one step of the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// The piece in hand was placed
    Place {
        /// Target cell
        coord: Coord,
        /// The placed piece; older clients may omit it
        piece: Option<Piece>,
        /// Acting identity after the placement (the placer)
        acting_identity_after: Identity,
    },
    /// A piece was handed to the opponent
    Select {
        /// The chosen piece
        piece: Piece,
        /// Acting identity after the selection (the receiver)
        acting_identity_after: Identity,
    },
}

impl ActionKind {
    /// Acting identity once this action has been applied
    pub fn acting_identity_after(&self) -> Identity {
        match self {
            ActionKind::Place { acting_identity_after, .. }
            | ActionKind::Select { acting_identity_after, .. } => *acting_identity_after,
        }
    }

    /// Identity that performed the action
    pub fn actor(&self) -> Identity {
        match self {
            ActionKind::Place { acting_identity_after, .. } => *acting_identity_after,
            ActionKind::Select { acting_identity_after, .. } => acting_identity_after.opposite(),
        }
    }
}

/// An action stamped for delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "WireAction", try_from = "WireAction")]
pub struct GameAction {
    /// The action itself
    pub kind: ActionKind,
    /// Unix time in milliseconds when the action was committed
    pub timestamp: u64,
    /// Strictly increasing ordering key
    pub sequence_id: u64,
}

impl GameAction {
    /// Stamp an action
    pub fn new(kind: ActionKind, sequence_id: u64, timestamp: u64) -> Self {
        Self {
            kind,
            timestamp,
            sequence_id,
        }
    }
}

/// Errors decoding an action from its wire form
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// A field required by the action type is absent
    #[error("{action} action missing {field}")]
    MissingField {
        /// `PLACE` or `SELECT`
        action: &'static str,
        /// The absent field
        field: &'static str,
    },
}

/// Action type tag on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Place,
    Select,
}

/// Flat payload as exchanged with other clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub col: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub piece: Option<Piece>,
    pub acting_identity_after: Identity,
}

/// `{ type, payload, timestamp, sequenceId }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireAction {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub payload: WirePayload,
    #[serde(default)]
    pub timestamp: u64,
    pub sequence_id: u64,
}

impl From<GameAction> for WireAction {
    fn from(action: GameAction) -> Self {
        let (action_type, payload) = match action.kind {
            ActionKind::Place { coord, piece, acting_identity_after } => (
                ActionType::Place,
                WirePayload {
                    row: Some(coord.row),
                    col: Some(coord.col),
                    piece,
                    acting_identity_after,
                },
            ),
            ActionKind::Select { piece, acting_identity_after } => (
                ActionType::Select,
                WirePayload {
                    row: None,
                    col: None,
                    piece: Some(piece),
                    acting_identity_after,
                },
            ),
        };
        WireAction {
            action_type,
            payload,
            timestamp: action.timestamp,
            sequence_id: action.sequence_id,
        }
    }
}

impl TryFrom<WireAction> for GameAction {
    type Error = ActionError;

    fn try_from(wire: WireAction) -> Result<Self, Self::Error> {
        let WirePayload { row, col, piece, acting_identity_after } = wire.payload;
        let kind = match wire.action_type {
            ActionType::Place => {
                let missing = |field| ActionError::MissingField { action: "PLACE", field };
                ActionKind::Place {
                    coord: Coord::new(row.ok_or_else(|| missing("row"))?, col.ok_or_else(|| missing("col"))?),
                    piece,
                    acting_identity_after,
                }
            }
            ActionType::Select => ActionKind::Select {
                piece: piece.ok_or(ActionError::MissingField { action: "SELECT", field: "piece" })?,
                acting_identity_after,
            },
        };
        Ok(GameAction::new(kind, wire.sequence_id, wire.timestamp))
    }
}
