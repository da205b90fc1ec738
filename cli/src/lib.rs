// SPDX-License-Identifier: MIT OR Apache-2.0

//! Terminal front end pieces shared by the `quarto-cli` binary and its tests

pub mod command;
pub mod render;

pub use command::{parse_command, Command, ParseError, HELP};
pub use render::{render_board, render_game, render_pool, render_status};
