//! Core domain types for tic-tac-toe.

use serde::{Deserialize, Serialize};

/// Player in the game.
///
/// Serialized in lowercase (`"x"` / `"o"`), which is also how the winner is
/// announced on the wire.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum Player {
    /// Player X (goes first).
    #[display("x")]
    X,
    /// Player O (goes second).
    #[display("o")]
    O,
}

impl Player {
    /// Returns the opponent player.
    pub fn opponent(self) -> Self {
        match self {
            Player::X => Player::O,
            Player::O => Player::X,
        }
    }

    /// Board symbol for this player.
    pub fn symbol(self) -> char {
        match self {
            Player::X => 'x',
            Player::O => 'o',
        }
    }
}

/// A square on the tic-tac-toe board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Square {
    /// Empty square.
    #[default]
    Empty,
    /// Square occupied by a player.
    Occupied(Player),
}

impl Square {
    /// Board symbol for this square: `.` when empty.
    pub fn symbol(self) -> char {
        match self {
            Square::Empty => '.',
            Square::Occupied(player) => player.symbol(),
        }
    }

    /// Parses a single board symbol. Upper-case marks are accepted.
    pub fn from_symbol(c: char) -> Option<Self> {
        match c {
            '.' => Some(Square::Empty),
            'x' | 'X' => Some(Square::Occupied(Player::X)),
            'o' | 'O' => Some(Square::Occupied(Player::O)),
            _ => None,
        }
    }

    /// Returns the occupying player, if any.
    pub fn player(self) -> Option<Player> {
        match self {
            Square::Empty => None,
            Square::Occupied(player) => Some(player),
        }
    }
}

impl std::fmt::Display for Square {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opponent() {
        assert_eq!(Player::X.opponent(), Player::O);
        assert_eq!(Player::O.opponent(), Player::X);
    }

    #[test]
    fn test_player_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Player::X).unwrap(), "\"x\"");
        assert_eq!(Player::O.to_string(), "o");
    }

    #[test]
    fn test_square_symbols() {
        assert_eq!(Square::Empty.symbol(), '.');
        assert_eq!(Square::from_symbol('X'), Some(Square::Occupied(Player::X)));
        assert_eq!(Square::from_symbol('?'), None);
    }
}
