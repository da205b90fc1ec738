// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session construction

use super::guard::{PendingWrites, SequenceCounter, SequenceGate, Subscription};
use super::{state, sync, Session, SessionInner};
use crate::config::SessionConfig;
use crate::room_code::RoomCode;
use crate::store::SharedStore;
use anyhow::{Context, Result};
use parking_lot::Mutex;
use quarto_core::{GameMode, GameState, RoomLink, VictoryOptions};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

pub(super) fn new_inner(
    store: Arc<dyn SharedStore>,
    config: &SessionConfig,
    link: RoomLink,
    initial: Option<GameState>,
) -> Result<(Arc<SessionInner>, broadcast::Receiver<quarto_core::GameEvent>)> {
    let code = RoomCode::parse(&link.room_id).context("Session needs a valid room code")?;
    let (events_tx, events_rx) = broadcast::channel(config.notification_buffer.max(1));
    let started = initial.is_some();

    let inner = SessionInner {
        client_id: Uuid::new_v4(),
        store,
        key: config.room_key(&code),
        link,
        state: RwLock::new(initial),
        pending: PendingWrites::new(),
        deferred: AtomicBool::new(false),
        sequence: SequenceCounter::new(),
        gate: Mutex::new(SequenceGate::new()),
        started: AtomicBool::new(started),
        peer_connected: AtomicBool::new(false),
        events_tx,
    };
    Ok((Arc::new(inner), events_rx))
}

/// Subscribe first so nothing written after this point is missed
fn listen(inner: &Arc<SessionInner>) -> Subscription {
    let rx = inner.store.subscribe(&inner.key);
    Subscription::spawn(sync::run(inner.clone(), rx))
}

#[tracing::instrument(level = "debug", skip(store, config, link), fields(room = %link.room_id))]
pub async fn host(
    store: Arc<dyn SharedStore>,
    config: &SessionConfig,
    link: RoomLink,
    options: VictoryOptions,
) -> Result<Session> {
    let mut initial = GameState::new(options, GameMode::Online)?;
    initial.room_link = Some(link.clone());

    let (inner, events_rx) = new_inner(store, config, link, Some(initial.clone()))?;
    let subscription = listen(&inner);
    tracing::info!(client = %inner.client_id, "Hosting online game");

    let pending = inner.pending.acquire();
    let publish = state::publish(&inner, &initial, None).await;
    sync::release(&inner, pending).await;
    if !publish.is_sent() {
        tracing::warn!(?publish, "Initial snapshot not published; the first move will publish it");
    }

    Ok(Session {
        inner,
        subscription,
        _events_rx: events_rx,
    })
}

#[tracing::instrument(level = "debug", skip(store, config, link), fields(room = %link.room_id))]
pub async fn join(store: Arc<dyn SharedStore>, config: &SessionConfig, link: RoomLink) -> Result<Session> {
    let (inner, events_rx) = new_inner(store, config, link, None)?;
    let subscription = listen(&inner);
    tracing::info!(client = %inner.client_id, "Waiting for the host's snapshot");

    // The host may have published before we subscribed.
    match inner.store.get(&inner.key).await {
        Ok(current) => sync::handle_notification(&inner, current).await,
        Err(e) => tracing::warn!(error = %e, "Failed to read room; waiting for notifications"),
    }

    Ok(Session {
        inner,
        subscription,
        _events_rx: events_rx,
    })
}
