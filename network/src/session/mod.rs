// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session protocol: one client's view of an online game
//!
//! Every local commit publishes the whole `GameState` together with the
//! `GameAction` that produced it. Remote snapshots are adopted wholesale,
//! unless a local publish is still in flight or the action is not newer than
//! the last one applied. The local `RoomLink` survives every adoption.

use crate::config::SessionConfig;
use crate::store::{SharedStore, StoreError};
use anyhow::Result;
use parking_lot::Mutex;
use quarto_core::{Coord, GameError, GameEvent, GameState, Identity, Piece, PlayerBackend, RoomLink, VictoryOptions};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

// Module declarations
pub mod core;
pub mod guard;
pub mod state;
pub mod sync;

pub use guard::{PendingWriteGuard, PendingWrites, SequenceCounter, SequenceGate, Subscription};

/// What happened to a snapshot publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Publish {
    /// The store accepted the snapshot
    Sent {
        /// Sequence id of the accompanying action, if any
        sequence_id: Option<u64>,
    },
    /// The store rejected it; local state is kept and the next commit
    /// publishes the full snapshot again
    Failed(StoreError),
}

impl Publish {
    pub fn is_sent(&self) -> bool {
        matches!(self, Publish::Sent { .. })
    }
}

/// State shared between the session handle and its notification task
pub(crate) struct SessionInner {
    /// Distinguishes the two clients of a room in logs
    pub(crate) client_id: Uuid,
    pub(crate) store: Arc<dyn SharedStore>,
    /// Store key of the room record
    pub(crate) key: String,
    /// Local-only room binding, reattached to every adopted snapshot
    pub(crate) link: RoomLink,
    /// `None` until the joiner adopts its first snapshot
    pub(crate) state: RwLock<Option<GameState>>,
    pub(crate) pending: PendingWrites,
    /// Set when a remote snapshot was ignored because a publish was in flight
    pub(crate) deferred: AtomicBool,
    pub(crate) sequence: SequenceCounter,
    pub(crate) gate: Mutex<SequenceGate>,
    /// Start guard: set once the first snapshot has been adopted
    pub(crate) started: AtomicBool,
    /// Last seen connection flag of the other seat
    pub(crate) peer_connected: AtomicBool,
    pub(crate) events_tx: broadcast::Sender<GameEvent>,
}

impl SessionInner {
    pub(crate) fn emit(&self, event: GameEvent) {
        tracing::trace!(?event, "Broadcasting game event");
        if let Err(e) = self.events_tx.send(event) {
            tracing::warn!("Failed to broadcast game event: {}", e);
        }
    }
}

/// One client's seat in an online game
pub struct Session {
    pub(crate) inner: Arc<SessionInner>,
    /// Notification task; aborted when the session is dropped
    pub(crate) subscription: Subscription,
    /// Keep a receiver alive to prevent channel closure
    pub(crate) _events_rx: broadcast::Receiver<GameEvent>,
}

impl Session {
    /// Start a fresh online game as the host and publish its first snapshot
    pub async fn host(
        store: Arc<dyn SharedStore>,
        config: &SessionConfig,
        link: RoomLink,
        options: VictoryOptions,
    ) -> Result<Self> {
        core::host(store, config, link, options).await
    }

    /// Attach to a room as the joiner. The game starts on this client when
    /// the first online snapshot is seen, which may already be in the store.
    pub async fn join(store: Arc<dyn SharedStore>, config: &SessionConfig, link: RoomLink) -> Result<Self> {
        core::join(store, config, link).await
    }

    /// Get a receiver for game events
    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.inner.events_tx.subscribe()
    }

    pub fn link(&self) -> &RoomLink {
        &self.inner.link
    }

    pub fn identity(&self) -> Identity {
        self.inner.link.identity
    }

    pub fn client_id(&self) -> Uuid {
        self.inner.client_id
    }

    /// A copy of the current game, once started
    pub async fn state(&self) -> Option<GameState> {
        self.inner.state.read().await.clone()
    }

    pub fn is_started(&self) -> bool {
        self.inner.started.load(Ordering::SeqCst)
    }

    /// Whether a local publish is in flight
    pub fn is_pending(&self) -> bool {
        self.inner.pending.is_pending()
    }

    /// Whether the notification task is still running
    pub fn is_listening(&self) -> bool {
        self.subscription.is_active()
    }

    /// Sequence id of the newest action applied or committed here
    pub fn last_applied_sequence(&self) -> Option<u64> {
        self.inner.gate.lock().last_applied()
    }

    pub async fn is_my_turn(&self) -> bool {
        self.inner
            .state
            .read()
            .await
            .as_ref()
            .is_some_and(|s| !s.game_over && s.current_turn == self.identity())
    }

    /// Hand `piece` to the opponent and publish
    pub async fn select_piece(&self, piece: Piece) -> Result<Publish, GameError> {
        state::commit(&self.inner, state::LocalMove::Select(piece)).await
    }

    /// Place the piece in hand and publish
    pub async fn place_piece(&self, coord: Coord) -> Result<Publish, GameError> {
        state::commit(&self.inner, state::LocalMove::Place(coord)).await
    }

    /// Let `backend` play the rest of this client's turn
    pub async fn play_turn<B: PlayerBackend + Send + ?Sized>(&self, backend: &mut B) -> Result<Vec<Publish>, GameError> {
        state::play_turn(&self.inner, backend).await
    }
}
