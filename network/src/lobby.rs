// SPDX-License-Identifier: MIT OR Apache-2.0

//! Room lobby on top of the shared store.
//!   * create_room / join_room / leave_room / prune_stale_rooms
//!   * broadcast LobbyEvent via tokio::sync::broadcast

use crate::config::SessionConfig;
use crate::messages::{connected_field, RoomData, RoomState, IDENTITY2_CONNECTED};
use crate::now_millis;
use crate::room_code::{RoomCode, RoomCodeError};
use crate::store::{SharedStore, Transaction};
use anyhow::{Context, Result};
use quarto_core::{Identity, RoomLink};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Result of asking for the second seat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Seat taken; this client plays as identity #2
    Joined(RoomLink),
    /// Both seats are already taken
    RoomFull,
    /// No room under that code
    NotFound,
    /// The code is malformed
    InvalidCode(RoomCodeError),
}

/// Result of giving up a seat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The other seat is still taken; the record stays
    Left,
    /// Both seats are now empty and the record is gone
    RoomDeleted,
    /// There was no record to leave
    NotFound,
}

/// Events emitted by the lobby
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LobbyEvent {
    RoomCreated(RoomCode),
    PlayerJoined {
        room: RoomCode,
        identity: Identity,
    },
    PlayerLeft {
        room: RoomCode,
        identity: Identity,
    },
    RoomDeleted(RoomCode),
}

/// Service for creating, joining and leaving rooms
pub struct Lobby {
    store: Arc<dyn SharedStore>,
    config: SessionConfig,
    /// Lobby event broadcaster
    events_tx: broadcast::Sender<LobbyEvent>,
    /// Keep a receiver alive to prevent channel closure
    _events_rx: broadcast::Receiver<LobbyEvent>,
}

impl Lobby {
    pub fn new(store: Arc<dyn SharedStore>, config: SessionConfig) -> Self {
        let (events_tx, events_rx) = broadcast::channel(config.notification_buffer.max(1));
        Self {
            store,
            config,
            events_tx,
            _events_rx: events_rx,
        }
    }

    /// Get a receiver for lobby events
    pub fn subscribe(&self) -> broadcast::Receiver<LobbyEvent> {
        self.events_tx.subscribe()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<dyn SharedStore> {
        self.store.clone()
    }

    fn emit(&self, event: LobbyEvent) {
        tracing::debug!(?event, "Broadcasting lobby event");
        if let Err(e) = self.events_tx.send(event) {
            tracing::warn!("Failed to broadcast lobby event: {}", e);
        }
    }

    /// Pick a code with no record behind it. After `room_code_attempts`
    /// collisions fall back to a timestamp-derived code.
    async fn generate_code(&self) -> Result<RoomCode> {
        for attempt in 0..self.config.room_code_attempts {
            let code = {
                let mut rng = rand::thread_rng();
                RoomCode::random(&mut rng)
            };
            let existing = self
                .store
                .get(&self.config.room_key(&code))
                .await
                .context("Failed to check room code")?;
            if existing.is_none() {
                return Ok(code);
            }
            tracing::debug!(%code, attempt, "Room code collision");
        }
        let code = RoomCode::from_timestamp(now_millis().max(0) as u64);
        tracing::warn!(%code, "Falling back to timestamp room code");
        Ok(code)
    }

    /// Create a room and take seat #1
    #[tracing::instrument(name = "network.lobby.create", skip(self), fields(room = tracing::field::Empty))]
    pub async fn create_room(&self) -> Result<RoomLink> {
        let code = self.generate_code().await?;
        tracing::Span::current().record("room", tracing::field::display(&code));

        let record = serde_json::to_value(RoomData::new(code.clone(), now_millis()))?;
        let outcome = self
            .store
            .transaction(&self.config.room_key(&code), &|current| match current {
                None => Transaction::Commit(record.clone()),
                Some(_) => Transaction::Abort,
            })
            .await
            .context("Failed to create room")?;

        if !outcome.committed {
            anyhow::bail!("Room code {} was taken concurrently", code);
        }

        tracing::info!("Room created");
        self.emit(LobbyEvent::RoomCreated(code.clone()));
        Ok(RoomLink {
            room_id: code.to_string(),
            identity: Identity::Player1,
            is_host: true,
        })
    }

    /// Take seat #2 of an existing room.
    ///
    /// Only one join can succeed per room; the seat is claimed in a single
    /// transaction on the record.
    #[tracing::instrument(name = "network.lobby.join", skip(self))]
    pub async fn join_room(&self, code: &str) -> Result<JoinOutcome> {
        let code = match RoomCode::parse(code) {
            Ok(code) => code,
            Err(e) => {
                tracing::debug!(input = code, error = %e, "Rejected room code");
                return Ok(JoinOutcome::InvalidCode(e));
            }
        };

        let outcome = self
            .store
            .transaction(&self.config.room_key(&code), &|current| {
                let Some(Value::Object(mut record)) = current else {
                    return Transaction::Abort;
                };
                let taken = record.get(IDENTITY2_CONNECTED).and_then(Value::as_bool).unwrap_or(false);
                if taken {
                    return Transaction::Abort;
                }
                record.insert(IDENTITY2_CONNECTED.to_string(), Value::Bool(true));
                Transaction::Commit(Value::Object(record))
            })
            .await
            .context("Failed to join room")?;

        if outcome.committed {
            tracing::info!("Joined room as player 2");
            self.emit(LobbyEvent::PlayerJoined {
                room: code.clone(),
                identity: Identity::Player2,
            });
            return Ok(JoinOutcome::Joined(RoomLink {
                room_id: code.to_string(),
                identity: Identity::Player2,
                is_host: false,
            }));
        }

        match outcome.value {
            None => {
                tracing::info!("Room not found");
                Ok(JoinOutcome::NotFound)
            }
            Some(_) => {
                tracing::info!("Room is full");
                Ok(JoinOutcome::RoomFull)
            }
        }
    }

    /// Give up this client's seat. The record is deleted only once both
    /// seats are empty.
    #[tracing::instrument(name = "network.lobby.leave", skip(self, link), fields(room = %link.room_id, identity = ?link.identity))]
    pub async fn leave_room(&self, link: &RoomLink) -> Result<LeaveOutcome> {
        let code = RoomCode::parse(&link.room_id)?;
        let own = connected_field(link.identity);
        let other = connected_field(link.identity.opposite());

        let outcome = self
            .store
            .transaction(&self.config.room_key(&code), &|current| {
                let Some(Value::Object(mut record)) = current else {
                    return Transaction::Abort;
                };
                let other_connected = record.get(other).and_then(Value::as_bool).unwrap_or(false);
                if !other_connected {
                    return Transaction::Remove;
                }
                record.insert(own.to_string(), Value::Bool(false));
                Transaction::Commit(Value::Object(record))
            })
            .await
            .context("Failed to leave room")?;

        let result = match (outcome.committed, outcome.value) {
            (false, _) => LeaveOutcome::NotFound,
            (true, None) => LeaveOutcome::RoomDeleted,
            (true, Some(_)) => LeaveOutcome::Left,
        };
        tracing::info!(?result, "Left room");

        if result != LeaveOutcome::NotFound {
            self.emit(LobbyEvent::PlayerLeft {
                room: code.clone(),
                identity: link.identity,
            });
        }
        if result == LeaveOutcome::RoomDeleted {
            self.emit(LobbyEvent::RoomDeleted(code));
        }
        Ok(result)
    }

    /// Current record of a room
    pub async fn room(&self, code: &RoomCode) -> Result<Option<RoomData>> {
        let value = self
            .store
            .get(&self.config.room_key(code))
            .await
            .context("Failed to read room")?;
        value
            .map(serde_json::from_value::<RoomData>)
            .transpose()
            .with_context(|| format!("Malformed record for room {code}"))
    }

    pub async fn room_state(&self, code: &RoomCode) -> Result<RoomState> {
        Ok(RoomState::of(self.room(code).await?.as_ref()))
    }

    /// Delete rooms created longer than `room_ttl_secs` ago. Records without
    /// a readable creation time are left alone.
    #[tracing::instrument(name = "network.lobby.prune", skip(self))]
    pub async fn prune_stale_rooms(&self) -> Result<usize> {
        let cutoff = now_millis() - (self.config.room_ttl_secs as i64).saturating_mul(1000);
        let keys = self
            .store
            .list_keys(&self.config.rooms_prefix())
            .await
            .context("Failed to list rooms")?;

        let mut pruned = 0;
        for key in keys {
            let created_at = self
                .store
                .get(&key)
                .await?
                .and_then(|v| v.get("createdAt").and_then(Value::as_i64));
            match created_at {
                Some(created_at) if created_at < cutoff => {
                    self.store.remove(&key).await.context("Failed to remove stale room")?;
                    tracing::debug!(key, created_at, "Pruned stale room");
                    pruned += 1;
                }
                _ => {}
            }
        }

        if pruned > 0 {
            tracing::info!(pruned, "Pruned stale rooms");
        }
        Ok(pruned)
    }
}
