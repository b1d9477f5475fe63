//! Turn consistency invariant: the turn agrees with phase and board.

use super::Invariant;
use crate::session::{GameSession, SessionPhase, Turn};
use chorus_tictactoe::Player;

/// Invariant: the turn is terminal exactly when the session finished, and
/// while a game runs X moves iff both marks appear equally often.
pub struct TurnConsistencyInvariant;

impl Invariant<GameSession> for TurnConsistencyInvariant {
    fn holds(session: &GameSession) -> bool {
        match (*session.phase(), *session.turn()) {
            (SessionPhase::Finished(_), turn) => turn == Turn::Over,
            (_, Turn::Over) => false,
            (SessionPhase::WaitingForPlayers, _) => true,
            (SessionPhase::InProgress, Turn::Player(mark)) => {
                let board = session.board();
                let x_to_move = board.count(Player::X) == board.count(Player::O);
                (mark == Player::X) == x_to_move
            }
        }
    }

    fn description() -> &'static str {
        "turn is terminal only when finished and alternates with the marks"
    }
}
