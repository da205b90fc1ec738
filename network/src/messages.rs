// SPDX-License-Identifier: MIT OR Apache-2.0

//! Room record as stored in the shared store

use crate::room_code::RoomCode;
use quarto_core::{GameAction, GameState, Identity};
use serde::{Deserialize, Serialize};

/// Field names of the connection flags, used for targeted updates
pub(crate) const IDENTITY1_CONNECTED: &str = "identity1Connected";
pub(crate) const IDENTITY2_CONNECTED: &str = "identity2Connected";

pub(crate) fn connected_field(identity: Identity) -> &'static str {
    match identity {
        Identity::Player1 => IDENTITY1_CONNECTED,
        Identity::Player2 => IDENTITY2_CONNECTED,
    }
}

/// One room: who is connected, the last published snapshot and the action
/// that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomData {
    pub room_id: RoomCode,
    #[serde(default)]
    pub identity1_connected: bool,
    #[serde(default)]
    pub identity2_connected: bool,
    #[serde(default)]
    pub game_state: Option<GameState>,
    #[serde(default)]
    pub last_action: Option<GameAction>,
    /// Unix milliseconds; only used for pruning
    #[serde(default)]
    pub created_at: i64,
}

impl RoomData {
    /// A fresh room with only the host connected
    pub fn new(room_id: RoomCode, created_at: i64) -> Self {
        Self {
            room_id,
            identity1_connected: true,
            identity2_connected: false,
            game_state: None,
            last_action: None,
            created_at,
        }
    }

    pub fn is_connected(&self, identity: Identity) -> bool {
        match identity {
            Identity::Player1 => self.identity1_connected,
            Identity::Player2 => self.identity2_connected,
        }
    }

    /// Both seats empty: the record should be deleted
    pub fn is_abandoned(&self) -> bool {
        !self.identity1_connected && !self.identity2_connected
    }
}

/// Lifecycle of a room, derived from its record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    /// No record under the code
    Empty,
    /// Only one seat is taken
    AwaitingSecondPlayer,
    /// Both seats taken, no online game published yet
    BothConnected,
    /// Both seats taken and a game is being played
    InProgress,
    /// Record still present with both seats empty
    Abandoned,
}

impl RoomState {
    pub fn of(room: Option<&RoomData>) -> Self {
        let Some(room) = room else {
            return RoomState::Empty;
        };
        match (room.identity1_connected, room.identity2_connected) {
            (false, false) => RoomState::Abandoned,
            (true, true) if room.game_state.as_ref().is_some_and(GameState::is_online) => RoomState::InProgress,
            (true, true) => RoomState::BothConnected,
            _ => RoomState::AwaitingSecondPlayer,
        }
    }
}
