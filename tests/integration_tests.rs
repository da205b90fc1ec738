// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end online games over the in-memory shared store

use quarto_core::{Coord, GameEvent, GameState, Identity, Piece, VictoryOptions, WinKind};
use quarto_network::{
    JoinOutcome, LeaveOutcome, Lobby, MemoryStore, MemoryStoreOptions, RoomCode, RoomState, Session, SessionConfig,
    SharedStore,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

enum Move {
    Select(u8),
    Place(u8, u8),
}

fn piece(value: u8) -> Piece {
    Piece::new(value).expect("piece value in range")
}

fn without_link(state: &GameState) -> GameState {
    let mut state = state.clone();
    state.room_link = None;
    state
}

async fn settle(actor: &Session, observer: &Session) -> GameState {
    let expected = without_link(&actor.state().await.expect("actor has a game"));
    timeout(Duration::from_secs(5), async {
        loop {
            if let Some(state) = observer.state().await {
                if without_link(&state) == expected {
                    return state;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("observer caught up")
}

async fn seat_two_clients(store: Arc<dyn SharedStore>) -> (Lobby, Session, Session) {
    let config = SessionConfig::default();
    let lobby = Lobby::new(store.clone(), config.clone());

    let host_link = lobby.create_room().await.unwrap();
    let host = Session::host(store.clone(), &config, host_link.clone(), VictoryOptions::LINES)
        .await
        .unwrap();
    let guest_link = match lobby.join_room(&host_link.room_id).await.unwrap() {
        JoinOutcome::Joined(link) => link,
        other => panic!("join failed: {other:?}"),
    };
    let guest = Session::join(store, &config, guest_link).await.unwrap();
    (lobby, host, guest)
}

#[tokio::test]
async fn online_game_ends_in_a_row_win_on_both_clients() {
    for options in [
        MemoryStoreOptions::default(),
        MemoryStoreOptions {
            sparse_arrays: true,
            duplicate_notifications: true,
            ..Default::default()
        },
    ] {
        let store: Arc<dyn SharedStore> = Arc::new(MemoryStore::with_options(options));
        let (lobby, host, guest) = seat_two_clients(store).await;
        let mut host_events = host.subscribe();

        // Pieces 1, 3, 5 and 7 are all dark; 0 and 15 go to the bottom row.
        let script = [
            (Identity::Player1, Move::Select(0)),
            (Identity::Player2, Move::Place(3, 0)),
            (Identity::Player2, Move::Select(15)),
            (Identity::Player1, Move::Place(3, 3)),
            (Identity::Player1, Move::Select(1)),
            (Identity::Player2, Move::Place(1, 0)),
            (Identity::Player2, Move::Select(3)),
            (Identity::Player1, Move::Place(1, 1)),
            (Identity::Player1, Move::Select(5)),
            (Identity::Player2, Move::Place(1, 2)),
            (Identity::Player2, Move::Select(7)),
            (Identity::Player1, Move::Place(1, 3)),
        ];

        for (identity, mv) in script {
            let (actor, observer) = match identity {
                Identity::Player1 => (&host, &guest),
                Identity::Player2 => (&guest, &host),
            };
            assert!(actor.is_my_turn().await, "{identity} should be acting");
            let publish = match mv {
                Move::Select(p) => actor.select_piece(piece(p)).await,
                Move::Place(r, c) => actor.place_piece(Coord::new(r, c)).await,
            }
            .expect("scripted move is legal");
            assert!(publish.is_sent());
            settle(actor, observer).await;
        }

        let row_one = [Coord::new(1, 0), Coord::new(1, 1), Coord::new(1, 2), Coord::new(1, 3)];
        for session in [&host, &guest] {
            let state = session.state().await.unwrap();
            assert!(state.game_over);
            assert!(!state.is_draw);
            assert_eq!(state.winner, Some(Identity::Player1));
            let win = state.winning_positions.unwrap();
            assert_eq!(win.kind, WinKind::Row { index: 1 });
            assert_eq!(win.cells, row_one);
            assert_eq!(state.available_pieces.len(), 16 - 6);
        }

        let won = timeout(Duration::from_secs(5), async {
            loop {
                if let Ok(GameEvent::GameWon { winner, .. }) = host_events.recv().await {
                    return winner;
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(won, Identity::Player1);

        let code = RoomCode::parse(&host.link().room_id).unwrap();
        assert_eq!(lobby.room_state(&code).await.unwrap(), RoomState::InProgress);
        assert_eq!(lobby.leave_room(guest.link()).await.unwrap(), LeaveOutcome::Left);
        assert_eq!(lobby.leave_room(host.link()).await.unwrap(), LeaveOutcome::RoomDeleted);
        assert_eq!(lobby.room_state(&code).await.unwrap(), RoomState::Empty);
    }
}

#[tokio::test]
async fn bots_finish_an_online_game_consistently() {
    let store: Arc<dyn SharedStore> = Arc::new(MemoryStore::new());
    let (_lobby, host, guest) = seat_two_clients(store).await;
    let mut bots = [quarto_core::HeuristicAgent::seeded(3), quarto_core::HeuristicAgent::seeded(4)];

    let mut turns = 0;
    while !host.state().await.unwrap().game_over {
        turns += 1;
        assert!(turns <= 20, "a game has at most seventeen turns");
        if host.is_my_turn().await {
            host.play_turn(&mut bots[0]).await.unwrap();
            settle(&host, &guest).await;
        } else {
            guest.play_turn(&mut bots[1]).await.unwrap();
            settle(&guest, &host).await;
        }
    }

    let end = host.state().await.unwrap();
    end.check_partition().unwrap();
    assert_eq!(without_link(&end), without_link(&guest.state().await.unwrap()));
}
