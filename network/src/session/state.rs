// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local commits and snapshot publishing

use super::{sync, Publish, SessionInner};
use crate::now_millis;
use crate::store::StoreError;
use quarto_core::{
    ActionKind, Coord, GameAction, GameError, GameEvent, GameState, Piece, PlaceOutcome, PlayerBackend, TurnPhase,
};
use serde_json::{Map, Value};

/// A move made on this client
#[derive(Debug, Clone, Copy)]
pub(crate) enum LocalMove {
    Select(Piece),
    Place(Coord),
}

fn encode(snapshot: &GameState, action: Option<&GameAction>) -> Result<Map<String, Value>, StoreError> {
    let mut fields = Map::new();
    fields.insert("gameState".to_string(), serde_json::to_value(snapshot)?);
    let action = match action {
        Some(action) => serde_json::to_value(action)?,
        None => Value::Null,
    };
    fields.insert("lastAction".to_string(), action);
    Ok(fields)
}

/// Write the snapshot and its action to the room record. Failures are
/// logged and reported, never retried here.
#[tracing::instrument(level = "debug", skip_all, fields(client = %inner.client_id, seq = ?action.map(|a| a.sequence_id)))]
pub(crate) async fn publish(inner: &SessionInner, snapshot: &GameState, action: Option<&GameAction>) -> Publish {
    let sequence_id = action.map(|a| a.sequence_id);
    let fields = match encode(snapshot, action) {
        Ok(fields) => fields,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to encode snapshot");
            return Publish::Failed(e);
        }
    };

    match inner.store.update_fields(&inner.key, fields).await {
        Ok(()) => {
            tracing::debug!("Published snapshot");
            Publish::Sent { sequence_id }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to publish snapshot; keeping local state");
            Publish::Failed(e)
        }
    }
}

/// Apply a local move, then publish the resulting snapshot.
///
/// Validation errors leave the state untouched and publish nothing.
pub(crate) async fn commit(inner: &SessionInner, mv: LocalMove) -> Result<Publish, GameError> {
    let identity = inner.link.identity;

    let (snapshot, action, events, pending) = {
        let mut slot = inner.state.write().await;
        let state = slot.as_mut().ok_or(GameError::NotStarted)?;

        let applied = match mv {
            LocalMove::Select(piece) => state.select_piece(identity, piece).map(|event| {
                let kind = ActionKind::Select {
                    piece,
                    acting_identity_after: identity.opposite(),
                };
                (kind, vec![event])
            }),
            LocalMove::Place(coord) => state.place_piece(identity, coord).map(|outcome| {
                let piece = state.board.get(coord);
                let kind = ActionKind::Place {
                    coord,
                    piece,
                    acting_identity_after: identity,
                };
                let mut events = Vec::new();
                if let Some(piece) = piece {
                    events.push(GameEvent::PiecePlaced { by: identity, coord, piece });
                }
                match outcome {
                    PlaceOutcome::Won(positions) => events.push(GameEvent::GameWon {
                        winner: identity,
                        positions,
                    }),
                    PlaceOutcome::Draw => events.push(GameEvent::GameDrawn),
                    PlaceOutcome::Continue => {}
                }
                (kind, events)
            }),
        };
        let (kind, events) = applied.map_err(|e| {
            tracing::debug!(client = %inner.client_id, ?mv, error = %e, "Rejected local move");
            e
        })?;

        let sequence_id = inner.sequence.next();
        inner.gate.lock().record(sequence_id);
        let action = GameAction::new(kind, sequence_id, now_millis().max(0) as u64);

        // Taken while the state lock is still held: the notification task
        // checks this flag under the same lock.
        let pending = inner.pending.acquire();
        (state.clone(), action, events, pending)
    };

    for event in events {
        inner.emit(event);
    }
    let outcome = publish(inner, &snapshot, Some(&action)).await;
    sync::release(inner, pending).await;
    Ok(outcome)
}

/// Play what is left of this client's turn with `backend`
pub(crate) async fn play_turn<B: PlayerBackend + Send + ?Sized>(
    inner: &SessionInner,
    backend: &mut B,
) -> Result<Vec<Publish>, GameError> {
    let identity = inner.link.identity;
    let mut published = Vec::new();

    let snapshot = inner.state.read().await.clone().ok_or(GameError::NotStarted)?;
    if snapshot.game_over {
        return Err(GameError::GameOver);
    }
    if snapshot.current_turn != identity {
        return Err(GameError::NotYourTurn(identity));
    }

    if let TurnPhase::PlacePiece(_) = snapshot.phase() {
        let coord = backend
            .choose_placement(&snapshot)
            .ok_or_else(|| GameError::InconsistentState("no cell offered for the piece in hand".into()))?;
        published.push(commit(inner, LocalMove::Place(coord)).await?);
    }

    let snapshot = inner.state.read().await.clone().ok_or(GameError::NotStarted)?;
    if snapshot.phase() == TurnPhase::SelectPiece {
        let piece = backend
            .choose_gift(&snapshot)
            .ok_or_else(|| GameError::InconsistentState("no piece left to hand over".into()))?;
        published.push(commit(inner, LocalMove::Select(piece)).await?);
    }

    Ok(published)
}
