// SPDX-License-Identifier: MIT OR Apache-2.0

//! Quarto Network - serverless room lobby and snapshot synchronization
//!
//! This crate provides the networking functionality including:
//! - A shared key-value store abstraction with change notifications
//! - Room codes and the room lobby (create, join, leave, prune)
//! - The session protocol that keeps two clients on the same game
//! - Configuration loading

#![deny(unsafe_code)]

pub mod config;
pub mod lobby;
pub mod messages;
pub mod room_code;
pub mod session;
pub mod store;

pub use config::SessionConfig;
pub use lobby::{JoinOutcome, LeaveOutcome, Lobby, LobbyEvent};
pub use messages::{RoomData, RoomState};
pub use room_code::{RoomCode, RoomCodeError};
pub use session::{Publish, Session};
pub use store::{MemoryStore, MemoryStoreOptions, SharedStore, StoreError, Transaction, TransactionOutcome};

/// Current wall-clock time in Unix milliseconds
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
