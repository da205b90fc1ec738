// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fuzz test for room record decoding
//! Arbitrary bytes read from the store must never panic the decoder or the
//! rules applied to whatever it accepts.

#![no_main]

use libfuzzer_sys::fuzz_target;
use quarto_network::RoomData;

fuzz_target!(|data: &[u8]| {
    let Ok(room) = serde_json::from_slice::<RoomData>(data) else {
        return;
    };
    let Some(mut state) = room.game_state else {
        return;
    };
    if state.victory_options.validate().is_err() || state.check_partition().is_err() {
        return;
    }

    // Replaying the recorded action either fails cleanly or keeps the
    // partition intact.
    if let Some(action) = room.last_action {
        if state.apply_action(&action.kind).is_ok() {
            assert!(state.check_partition().is_ok());
        }
    }

    let reencoded = serde_json::to_vec(&state).expect("snapshot encodes");
    let again: quarto_core::GameState = serde_json::from_slice(&reencoded).expect("snapshot decodes");
    assert_eq!(again.board, state.board);
});
