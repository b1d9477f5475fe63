//! The 3x3 board and its single placement operation.

use crate::position::Position;
use crate::rules;
use crate::types::{Player, Square};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{instrument, trace};

/// Errors raised by board access and placement.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum BoardError {
    /// Row or column outside `0..3`.
    #[display("coordinates (row {row}, col {col}) are off the board")]
    OutOfRange {
        /// Requested row.
        row: usize,
        /// Requested column.
        col: usize,
    },

    /// The target square already holds a mark.
    #[display("{position} is already occupied by {occupant}")]
    Occupied {
        /// Target square.
        position: Position,
        /// Mark currently on the square.
        occupant: Player,
    },

    /// Text that is not a 9-symbol board.
    #[display("malformed board {input:?}")]
    Malformed {
        /// The rejected input.
        input: String,
    },
}

/// 3x3 tic-tac-toe board.
///
/// On the wire a board is the 9-character string of its symbols in
/// row-major order, e.g. `"x...o...."`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Board {
    /// Squares in row-major order (0-8).
    squares: [Square; 9],
}

impl Board {
    /// Creates a new empty board.
    pub fn new() -> Self {
        Self {
            squares: [Square::Empty; 9],
        }
    }

    /// Gets the square at the given position.
    pub fn get(&self, pos: Position) -> Square {
        self.squares[pos.to_index()]
    }

    /// Gets the square at `row`, `col`.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::OutOfRange`] when either coordinate is outside `0..3`.
    pub fn at(&self, row: usize, col: usize) -> Result<Square, BoardError> {
        Position::from_row_col(row, col)
            .map(|pos| self.get(pos))
            .ok_or(BoardError::OutOfRange { row, col })
    }

    /// Checks if a square is empty.
    pub fn is_empty(&self, pos: Position) -> bool {
        self.get(pos) == Square::Empty
    }

    /// Places `mark` at `row`, `col` and returns the updated board.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::OutOfRange`] for bad coordinates and
    /// [`BoardError::Occupied`] when the square is taken.
    #[instrument(skip(self))]
    pub fn place(&self, row: usize, col: usize, mark: Player) -> Result<Board, BoardError> {
        let pos = Position::from_row_col(row, col).ok_or(BoardError::OutOfRange { row, col })?;
        self.place_at(pos, mark)
    }

    /// Places `mark` at a named position and returns the updated board.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Occupied`] when the square is taken.
    pub fn place_at(&self, pos: Position, mark: Player) -> Result<Board, BoardError> {
        if let Square::Occupied(occupant) = self.get(pos) {
            return Err(BoardError::Occupied {
                position: pos,
                occupant,
            });
        }

        let mut next = *self;
        next.squares[pos.to_index()] = Square::Occupied(mark);
        trace!(position = %pos, %mark, board = %next, "Placed mark");
        Ok(next)
    }

    /// True iff any row, column or diagonal holds three equal marks.
    pub fn has_win(&self) -> bool {
        rules::check_winner(self).is_some()
    }

    /// Returns the player owning a complete line, if any.
    pub fn winner(&self) -> Option<Player> {
        rules::check_winner(self)
    }

    /// Checks if the board is full.
    pub fn is_full(&self) -> bool {
        rules::is_full(self)
    }

    /// Number of squares holding `player`'s mark.
    pub fn count(&self, player: Player) -> usize {
        self.squares
            .iter()
            .filter(|s| **s == Square::Occupied(player))
            .count()
    }

    /// Returns all squares as a slice.
    pub fn squares(&self) -> &[Square; 9] {
        &self.squares
    }
}

impl std::fmt::Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for square in &self.squares {
            write!(f, "{}", square.symbol())?;
        }
        Ok(())
    }
}

impl FromStr for Board {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || BoardError::Malformed {
            input: s.to_string(),
        };

        if s.chars().count() != 9 {
            return Err(malformed());
        }

        let mut squares = [Square::Empty; 9];
        for (slot, c) in squares.iter_mut().zip(s.chars()) {
            *slot = Square::from_symbol(c).ok_or_else(malformed)?;
        }
        Ok(Self { squares })
    }
}

impl From<Board> for String {
    fn from(board: Board) -> Self {
        board.to_string()
    }
}

impl TryFrom<String> for Board {
    type Error = BoardError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_board_is_empty() {
        let board = Board::new();
        assert_eq!(board.to_string(), ".........");
        assert!(Position::ALL.iter().all(|p| board.is_empty(*p)));
    }

    #[test]
    fn test_at_out_of_range() {
        let board = Board::new();
        assert_eq!(board.at(3, 0), Err(BoardError::OutOfRange { row: 3, col: 0 }));
        assert_eq!(board.at(0, 3), Err(BoardError::OutOfRange { row: 0, col: 3 }));
        assert_eq!(board.at(2, 2), Ok(Square::Empty));
    }

    #[test]
    fn test_place_returns_new_board() {
        let board = Board::new();
        let next = board.place(0, 1, Player::X).unwrap();
        assert_eq!(board.to_string(), ".........");
        assert_eq!(next.to_string(), ".x.......");
        assert_eq!(next.at(0, 1), Ok(Square::Occupied(Player::X)));
    }

    #[test]
    fn test_place_occupied_keeps_occupant() {
        let board = Board::new().place(1, 1, Player::O).unwrap();
        let err = board.place(1, 1, Player::X).unwrap_err();
        assert_eq!(
            err,
            BoardError::Occupied {
                position: Position::Center,
                occupant: Player::O
            }
        );
        assert_eq!(board.get(Position::Center), Square::Occupied(Player::O));
    }

    #[test]
    fn test_parse_and_display() {
        let board: Board = "xxo.o....".parse().unwrap();
        assert_eq!(board.get(Position::TopRight), Square::Occupied(Player::O));
        assert_eq!(board.count(Player::X), 2);
        assert_eq!(board.to_string(), "xxo.o....");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("xx".parse::<Board>().is_err());
        assert!("xxo.o...z".parse::<Board>().is_err());
    }

    #[test]
    fn test_serde_uses_wire_string() {
        let board: Board = "x........".parse().unwrap();
        assert_eq!(serde_json::to_string(&board).unwrap(), "\"x........\"");
        let back: Board = serde_json::from_str("\"x........\"").unwrap();
        assert_eq!(back, board);
    }
}
