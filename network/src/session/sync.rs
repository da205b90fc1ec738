// SPDX-License-Identifier: MIT OR Apache-2.0

//! Remote snapshot handling

use super::{PendingWriteGuard, SessionInner};
use crate::messages::RoomData;
use quarto_core::{ActionKind, GameAction, GameEvent, GameState};
use serde_json::Value;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};

/// Consume store notifications until the channel closes or the owning
/// subscription is dropped
pub(crate) async fn run(inner: Arc<SessionInner>, mut rx: broadcast::Receiver<Option<Value>>) {
    loop {
        match rx.recv().await {
            Ok(value) => handle_notification(&inner, value).await,
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(client = %inner.client_id, skipped, "Notifications lagged; re-reading room");
                match inner.store.get(&inner.key).await {
                    Ok(current) => handle_notification(&inner, current).await,
                    Err(e) => tracing::warn!(error = %e, "Failed to re-read room"),
                }
            }
            Err(RecvError::Closed) => {
                tracing::debug!(client = %inner.client_id, "Notification channel closed");
                break;
            }
        }
    }
}

/// Process one value of the room record
#[tracing::instrument(level = "debug", skip_all, fields(client = %inner.client_id, identity = ?inner.link.identity))]
pub(crate) async fn handle_notification(inner: &SessionInner, value: Option<Value>) {
    let Some(value) = value else {
        tracing::info!("Room record deleted");
        return;
    };
    let room: RoomData = match serde_json::from_value(value) {
        Ok(room) => room,
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring undecodable room record");
            return;
        }
    };

    track_peer(inner, &room);

    let Some(incoming) = room.game_state else {
        return;
    };

    let mut slot = inner.state.write().await;
    if inner.pending.is_pending() {
        tracing::debug!("Local publish in flight; deferring remote snapshot");
        inner.deferred.store(true, Ordering::SeqCst);
        return;
    }
    if !incoming.is_online() {
        tracing::debug!(mode = ?incoming.mode, "Ignoring snapshot without the online marker");
        return;
    }
    if let Err(e) = incoming.victory_options.validate().and_then(|_| incoming.check_partition()) {
        tracing::warn!(error = %e, "Ignoring inconsistent remote snapshot");
        return;
    }

    if !inner.started.load(Ordering::SeqCst) {
        if let Some(action) = &room.last_action {
            inner.gate.lock().record(action.sequence_id);
            inner.sequence.observe(action.sequence_id);
        }
        *slot = Some(adopt(inner, incoming));
        inner.started.store(true, Ordering::SeqCst);
        tracing::info!(seq = ?room.last_action.map(|a| a.sequence_id), "Adopted first snapshot; game started");
        inner.emit(GameEvent::GameStarted);
        return;
    }

    let Some(action) = room.last_action else {
        tracing::trace!("Snapshot carries no action; nothing new");
        return;
    };
    if !inner.gate.lock().admit(action.sequence_id) {
        tracing::debug!(seq = action.sequence_id, "Dropping stale or duplicate action");
        return;
    }
    inner.sequence.observe(action.sequence_id);

    let was_over = slot.as_ref().is_some_and(|s| s.game_over);
    let adopted = adopt(inner, incoming);
    let events = remote_events(&action, &adopted, was_over);
    tracing::debug!(seq = action.sequence_id, kind = ?action.kind, "Adopted remote snapshot");
    *slot = Some(adopted);
    drop(slot);

    for event in events {
        inner.emit(event);
    }
}

/// Drop a publish guard and, once no publish is left in flight, re-read the
/// room if a remote snapshot was ignored meanwhile
pub(crate) async fn release(inner: &SessionInner, guard: PendingWriteGuard) {
    let missed = {
        // Same lock the notification task holds while checking and deferring.
        let _slot = inner.state.write().await;
        drop(guard);
        !inner.pending.is_pending() && inner.deferred.swap(false, Ordering::SeqCst)
    };
    if !missed {
        return;
    }

    tracing::debug!(client = %inner.client_id, "Re-reading room after deferred snapshot");
    match inner.store.get(&inner.key).await {
        Ok(current) => handle_notification(inner, current).await,
        Err(e) => tracing::warn!(client = %inner.client_id, error = %e, "Failed to re-read room"),
    }
}

/// Replace wholesale, keeping only the local room link
fn adopt(inner: &SessionInner, mut incoming: GameState) -> GameState {
    incoming.room_link = Some(inner.link.clone());
    incoming
}

fn remote_events(action: &GameAction, state: &GameState, was_over: bool) -> Vec<GameEvent> {
    let mut events = Vec::new();
    match action.kind {
        ActionKind::Select { piece, .. } => events.push(GameEvent::PieceSelected {
            by: action.kind.actor(),
            piece,
        }),
        ActionKind::Place { coord, piece, .. } => {
            let piece = piece.or_else(|| coord.is_valid().then(|| state.board.get(coord)).flatten());
            if let Some(piece) = piece {
                events.push(GameEvent::PiecePlaced {
                    by: action.kind.actor(),
                    coord,
                    piece,
                });
            }
        }
    }

    if !was_over {
        match (state.winner, state.winning_positions) {
            (Some(winner), Some(positions)) => events.push(GameEvent::GameWon { winner, positions }),
            _ if state.is_draw => events.push(GameEvent::GameDrawn),
            _ => {}
        }
    }
    events
}

/// Report the other seat connecting or leaving
fn track_peer(inner: &SessionInner, room: &RoomData) {
    let other = inner.link.identity.opposite();
    let connected = room.is_connected(other);
    if inner.peer_connected.swap(connected, Ordering::SeqCst) != connected {
        if connected {
            tracing::info!(peer = ?other, "Peer connected");
            inner.emit(GameEvent::PeerJoined(other));
        } else {
            tracing::info!(peer = ?other, "Peer left");
            inner.emit(GameEvent::PeerLeft(other));
        }
    }
}
