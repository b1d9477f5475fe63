//! Pure tic-tac-toe logic used by chorus rooms.
//!
//! A [`Board`] is an immutable 3x3 grid: [`Board::place`] returns a new
//! board, [`Board::has_win`] checks the eight lines. Nothing here performs
//! I/O or holds session state.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod board;
mod position;
pub mod rules;
mod types;

pub use board::{Board, BoardError};
pub use position::Position;
pub use types::{Player, Square};

/// Alias used by session code: a player's symbol on the board.
pub type Mark = Player;
