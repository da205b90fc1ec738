// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared helpers for session integration tests

#![allow(dead_code)]

use quarto_core::{GameEvent, GameState, Piece, VictoryOptions};
use quarto_network::{JoinOutcome, Lobby, MemoryStore, MemoryStoreOptions, Session, SessionConfig, SharedStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::timeout;
use tracing_subscriber::EnvFilter;

/// How long any single wait may take before the test fails
pub const WAIT: Duration = Duration::from_secs(5);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_test_writer()
        .try_init();
}

pub fn piece(value: u8) -> Piece {
    Piece::new(value).expect("piece value in range")
}

/// Two clients seated in one room over a shared in-memory store
pub struct Table {
    pub store: MemoryStore,
    pub lobby: Lobby,
    pub host: Session,
    pub guest: Session,
}

impl Table {
    pub async fn new(options: MemoryStoreOptions, victory: VictoryOptions) -> Self {
        init_tracing();
        let store = MemoryStore::with_options(options);
        let shared: Arc<dyn SharedStore> = Arc::new(store.clone());
        let config = SessionConfig::default();
        let lobby = Lobby::new(shared.clone(), config.clone());

        let host_link = lobby.create_room().await.expect("create room");
        let host = Session::host(shared.clone(), &config, host_link.clone(), victory)
            .await
            .expect("host session");

        let guest_link = match lobby.join_room(&host_link.room_id).await.expect("join room") {
            JoinOutcome::Joined(link) => link,
            other => panic!("expected to join, got {other:?}"),
        };
        let guest = Session::join(shared, &config, guest_link).await.expect("guest session");

        Self {
            store,
            lobby,
            host,
            guest,
        }
    }

}

/// Wait until `observer` holds the same game as `actor`
pub async fn converged(actor: &Session, observer: &Session) -> GameState {
    let expected = shared_view(&actor.state().await.expect("actor has a game"));
    wait_for(observer, "observer to converge", |s| shared_view(s) == expected).await
}

/// The part of a snapshot both clients agree on
pub fn shared_view(state: &GameState) -> GameState {
    let mut state = state.clone();
    state.room_link = None;
    state
}

/// Poll `session` until its game satisfies `pred`
pub async fn wait_for<F>(session: &Session, what: &str, pred: F) -> GameState
where
    F: Fn(&GameState) -> bool,
{
    let polled = timeout(WAIT, async {
        loop {
            if let Some(state) = session.state().await {
                if pred(&state) {
                    return state;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    match polled {
        Ok(state) => state,
        Err(_) => panic!("timed out waiting for {what}"),
    }
}

/// Next event matching `pred`, skipping the others
pub async fn next_event<F>(rx: &mut broadcast::Receiver<GameEvent>, what: &str, pred: F) -> GameEvent
where
    F: Fn(&GameEvent) -> bool,
{
    let received = timeout(WAIT, async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event channel closed"),
            }
        }
    })
    .await;
    match received {
        Ok(event) => event,
        Err(_) => panic!("timed out waiting for {what}"),
    }
}
