//! Mark balance invariant: X moves first, then marks alternate.

use super::Invariant;
use crate::session::GameSession;
use chorus_tictactoe::Player;

/// Invariant: the board holds as many X marks as O marks, or one more X.
pub struct MarkBalanceInvariant;

impl Invariant<GameSession> for MarkBalanceInvariant {
    fn holds(session: &GameSession) -> bool {
        let xs = session.board().count(Player::X);
        let os = session.board().count(Player::O);
        xs == os || xs == os + 1
    }

    fn description() -> &'static str {
        "X count equals O count or exceeds it by one"
    }
}
