// SPDX-License-Identifier: MIT OR Apache-2.0

//! Two clients playing through the shared store

use quarto_core::{Coord, GameError, GameEvent, GameMode, HeuristicAgent, Identity, VictoryOptions, WinKind};
use async_trait::async_trait;
use quarto_network::store::TransactionFn;
use quarto_network::{
    JoinOutcome, Lobby, MemoryStore, MemoryStoreOptions, Publish, RoomCode, Session, SessionConfig, SharedStore,
    StoreError, TransactionOutcome,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::broadcast;
use std::time::Duration;

mod common;
use common::{converged, init_tracing, next_event, piece, shared_view, wait_for, Table};

/// Commit a move on `actor` and wait until `observer` has adopted it
macro_rules! step {
    ($actor:expr, $observer:expr, select $p:expr) => {{
        let publish = $actor.select_piece(piece($p)).await.expect("legal select");
        assert!(publish.is_sent(), "select {} not published: {publish:?}", $p);
        converged(&$actor, &$observer).await
    }};
    ($actor:expr, $observer:expr, place $r:expr, $c:expr) => {{
        let publish = $actor.place_piece(Coord::new($r, $c)).await.expect("legal place");
        assert!(publish.is_sent(), "place ({}, {}) not published: {publish:?}", $r, $c);
        converged(&$actor, &$observer).await
    }};
}

#[tokio::test]
async fn two_clients_play_to_a_line_win() {
    let t = Table::new(MemoryStoreOptions::default(), VictoryOptions::LINES).await;
    assert!(t.guest.is_started());
    assert_eq!(t.host.identity(), Identity::Player1);
    assert_eq!(t.guest.identity(), Identity::Player2);
    let mut guest_events = t.guest.subscribe();

    step!(t.host, t.guest, select 0);
    step!(t.guest, t.host, place 3, 0);
    step!(t.guest, t.host, select 15);
    step!(t.host, t.guest, place 3, 3);
    step!(t.host, t.guest, select 1);
    step!(t.guest, t.host, place 1, 0);
    step!(t.guest, t.host, select 3);
    step!(t.host, t.guest, place 1, 1);
    step!(t.host, t.guest, select 5);
    step!(t.guest, t.host, place 1, 2);
    step!(t.guest, t.host, select 7);
    let end = step!(t.host, t.guest, place 1, 3);

    assert!(end.game_over);
    assert_eq!(end.winner, Some(Identity::Player1));
    let win = end.winning_positions.expect("winning cells recorded");
    assert_eq!(win.kind, WinKind::Row { index: 1 });
    assert_eq!(win.cells, [Coord::new(1, 0), Coord::new(1, 1), Coord::new(1, 2), Coord::new(1, 3)]);

    for session in [&t.host, &t.guest] {
        let state = session.state().await.unwrap();
        assert!(state.game_over);
        assert_eq!(state.room_link.as_ref(), Some(session.link()), "local link survives adoption");
        assert_eq!(state.mode, GameMode::Online);
        assert!(!session.is_my_turn().await);
    }

    let won = next_event(&mut guest_events, "remote win", |e| matches!(e, GameEvent::GameWon { .. })).await;
    assert_eq!(
        won,
        GameEvent::GameWon {
            winner: Identity::Player1,
            positions: win
        }
    );
    assert_eq!(
        t.guest.select_piece(piece(2)).await,
        Err(GameError::GameOver),
        "finished games accept nothing"
    );
}

#[tokio::test]
async fn joiner_adopts_a_game_already_under_way() {
    init_tracing();
    let store: Arc<dyn SharedStore> = Arc::new(MemoryStore::new());
    let config = SessionConfig::default();
    let lobby = Lobby::new(store.clone(), config.clone());

    let host_link = lobby.create_room().await.unwrap();
    let host = Session::host(store.clone(), &config, host_link.clone(), VictoryOptions::BOTH)
        .await
        .unwrap();
    host.select_piece(piece(9)).await.unwrap();

    let guest_link = match lobby.join_room(&host_link.room_id).await.unwrap() {
        JoinOutcome::Joined(link) => link,
        other => panic!("expected to join, got {other:?}"),
    };
    let guest = Session::join(store, &config, guest_link).await.unwrap();

    let adopted = guest.state().await.expect("adopted the stored snapshot");
    assert_eq!(shared_view(&adopted), shared_view(&host.state().await.unwrap()));
    assert_eq!(adopted.piece_in_hand, Some(piece(9)));
    assert_eq!(adopted.victory_options, VictoryOptions::BOTH);
    assert_eq!(adopted.room_link.as_ref(), Some(guest.link()));
    assert_eq!(guest.last_applied_sequence(), host.last_applied_sequence());
    assert!(guest.is_my_turn().await);

    guest.place_piece(Coord::new(2, 2)).await.unwrap();
    let seen = wait_for(&host, "host to see the placement", |s| s.board.get(Coord::new(2, 2)).is_some()).await;
    assert_eq!(seen.piece_in_hand, None);
    assert_eq!(seen.current_turn, Identity::Player2);
    assert!(guest.last_applied_sequence() > Some(1), "sequence ids keep growing after adoption");
}

#[tokio::test]
async fn duplicate_notifications_start_once_and_apply_once() {
    init_tracing();
    let store = MemoryStore::with_options(MemoryStoreOptions {
        duplicate_notifications: true,
        ..Default::default()
    });
    let shared: Arc<dyn SharedStore> = Arc::new(store);
    let config = SessionConfig::default();
    let lobby = Lobby::new(shared.clone(), config.clone());

    // The guest is seated before the host publishes anything.
    let host_link = lobby.create_room().await.unwrap();
    let guest_link = match lobby.join_room(&host_link.room_id).await.unwrap() {
        JoinOutcome::Joined(link) => link,
        other => panic!("expected to join, got {other:?}"),
    };
    let guest = Session::join(shared.clone(), &config, guest_link).await.unwrap();
    assert!(!guest.is_started());
    assert_eq!(guest.select_piece(piece(0)).await, Err(GameError::NotStarted));
    let mut events = guest.subscribe();

    let host = Session::host(shared, &config, host_link, VictoryOptions::LINES)
        .await
        .unwrap();
    wait_for(&guest, "guest to start", |_| true).await;
    host.select_piece(piece(4)).await.unwrap();
    wait_for(&guest, "guest to see the gift", |s| s.piece_in_hand.is_some()).await;

    // Let every duplicate drain before counting.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let mut started = 0;
    let mut selected = 0;
    while let Ok(event) = events.try_recv() {
        match event {
            GameEvent::GameStarted => started += 1,
            GameEvent::PieceSelected { by, piece: p } => {
                assert_eq!(by, Identity::Player1);
                assert_eq!(p, piece(4));
                selected += 1;
            }
            _ => {}
        }
    }
    assert_eq!(started, 1);
    assert_eq!(selected, 1);
}

#[tokio::test]
async fn sparse_store_carries_a_whole_bot_game() {
    let t = Table::new(
        MemoryStoreOptions {
            sparse_arrays: true,
            duplicate_notifications: true,
            ..Default::default()
        },
        VictoryOptions::BOTH,
    )
    .await;
    let mut host_bot = HeuristicAgent::seeded(11);
    let mut guest_bot = HeuristicAgent::seeded(12);

    for _ in 0..40 {
        if t.host.state().await.unwrap().game_over {
            break;
        }
        if t.host.is_my_turn().await {
            t.host.play_turn(&mut host_bot).await.expect("host turn");
            converged(&t.host, &t.guest).await;
        } else {
            t.guest.play_turn(&mut guest_bot).await.expect("guest turn");
            converged(&t.guest, &t.host).await;
        }
    }

    let host_end = t.host.state().await.unwrap();
    let guest_end = t.guest.state().await.unwrap();
    assert!(host_end.game_over, "sixteen pieces always end the game");
    assert_eq!(shared_view(&host_end), shared_view(&guest_end));
    host_end.check_partition().unwrap();
    assert_eq!(host_end.winner.is_some(), !host_end.is_draw);
}

#[tokio::test]
async fn failed_publish_keeps_local_state_and_next_commit_republishes() {
    let t = Table::new(MemoryStoreOptions::default(), VictoryOptions::LINES).await;
    step!(t.host, t.guest, select 0);
    step!(t.guest, t.host, place 0, 0);
    step!(t.guest, t.host, select 1);

    t.store.set_available(false);
    let outcome = t.host.place_piece(Coord::new(0, 1)).await.unwrap();
    assert_eq!(outcome, Publish::Failed(StoreError::Unavailable));
    assert!(!t.host.is_pending(), "guard released after a failed publish");
    let local = t.host.state().await.unwrap();
    assert_eq!(local.board.get(Coord::new(0, 1)), Some(piece(1)));

    tokio::time::sleep(Duration::from_millis(20)).await;
    let remote = t.guest.state().await.unwrap();
    assert_eq!(remote.board.get(Coord::new(0, 1)), None);
    assert_eq!(remote.piece_in_hand, Some(piece(1)));

    t.store.set_available(true);
    let outcome = t.host.select_piece(piece(2)).await.unwrap();
    assert!(matches!(outcome, Publish::Sent { sequence_id: Some(_) }));
    let caught_up = converged(&t.host, &t.guest).await;
    assert_eq!(caught_up.board.get(Coord::new(0, 1)), Some(piece(1)));
    assert_eq!(caught_up.piece_in_hand, Some(piece(2)));
    assert_eq!(caught_up.current_turn, Identity::Player2);
}

#[tokio::test]
async fn rejected_moves_publish_nothing() {
    let t = Table::new(MemoryStoreOptions::default(), VictoryOptions::LINES).await;
    let key = SessionConfig::default().room_key(&RoomCode::parse(&t.host.link().room_id).unwrap());
    let before = t.store.get(&key).await.unwrap();

    assert_eq!(
        t.guest.select_piece(piece(0)).await,
        Err(GameError::NotYourTurn(Identity::Player2))
    );
    assert_eq!(t.host.place_piece(Coord::new(0, 0)).await, Err(GameError::NoPieceInHand));
    assert_eq!(
        t.host.place_piece(Coord::new(4, 0)).await,
        Err(GameError::NoPieceInHand),
        "the hand is checked before the cell"
    );

    assert_eq!(t.store.get(&key).await.unwrap(), before);
    assert!(!t.host.is_pending());
    assert_eq!(t.host.last_applied_sequence(), None);
}

/// Writes land at once but the acknowledgement arrives `delay` later
struct LateAck {
    inner: MemoryStore,
    delay: Duration,
}

#[async_trait]
impl SharedStore for LateAck {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.inner.set(key, value).await
    }

    async fn update_fields(&self, key: &str, fields: Map<String, Value>) -> Result<(), StoreError> {
        let written = self.inner.update_fields(key, fields).await;
        tokio::time::sleep(self.delay).await;
        written
    }

    async fn transaction(&self, key: &str, decide: TransactionFn<'_>) -> Result<TransactionOutcome, StoreError> {
        self.inner.transaction(key, decide).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove(key).await
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        self.inner.list_keys(prefix).await
    }

    fn subscribe(&self, key: &str) -> broadcast::Receiver<Option<Value>> {
        self.inner.subscribe(key)
    }
}

#[tokio::test]
async fn reply_landing_during_a_slow_publish_is_picked_up() {
    init_tracing();
    let memory = MemoryStore::new();
    let plain: Arc<dyn SharedStore> = Arc::new(memory.clone());
    let slow: Arc<dyn SharedStore> = Arc::new(LateAck {
        inner: memory,
        delay: Duration::from_millis(200),
    });
    let config = SessionConfig::default();
    let lobby = Lobby::new(plain.clone(), config.clone());

    let host_link = lobby.create_room().await.unwrap();
    let host = Session::host(slow, &config, host_link.clone(), VictoryOptions::LINES)
        .await
        .unwrap();
    let guest_link = match lobby.join_room(&host_link.room_id).await.unwrap() {
        JoinOutcome::Joined(link) => link,
        other => panic!("expected to join, got {other:?}"),
    };
    let guest = Session::join(plain, &config, guest_link).await.unwrap();
    assert!(guest.is_started());

    // The guest's whole turn fits inside the host's unacknowledged publish.
    let (published, _) = tokio::join!(host.select_piece(piece(0)), async {
        wait_for(&guest, "guest to receive the gift", |s| s.piece_in_hand.is_some()).await;
        assert!(host.is_pending());
        guest.place_piece(Coord::new(0, 0)).await.unwrap();
        guest.select_piece(piece(1)).await.unwrap();
        assert!(host.is_pending(), "reply landed before the host's acknowledgement");
    });
    assert!(published.unwrap().is_sent());

    let caught_up = converged(&guest, &host).await;
    assert_eq!(caught_up.board.get(Coord::new(0, 0)), Some(piece(0)));
    assert_eq!(caught_up.piece_in_hand, Some(piece(1)));
    assert_eq!(caught_up.current_turn, Identity::Player1);
    assert!(host.is_my_turn().await);
    assert_eq!(host.last_applied_sequence(), guest.last_applied_sequence());
}
