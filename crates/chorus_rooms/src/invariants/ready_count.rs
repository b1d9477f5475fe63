//! Ready-count invariant: the counter tracks filled seats.

use super::Invariant;
use crate::session::{GameSession, Outcome, SessionPhase};

/// Invariant: `ready_count` equals the number of filled seats.
///
/// The only exception is an aborted game, where a leave resets the counter
/// to zero while the seats keep their occupants.
pub struct ReadyCountInvariant;

impl Invariant<GameSession> for ReadyCountInvariant {
    fn holds(session: &GameSession) -> bool {
        if *session.phase() == SessionPhase::Finished(Outcome::Aborted) {
            return *session.ready_count() == 0;
        }

        let seated = [session.player_x(), session.player_o()]
            .iter()
            .filter(|seat| seat.is_some())
            .count();
        usize::from(*session.ready_count()) == seated
    }

    fn description() -> &'static str {
        "ready_count equals the number of seated players"
    }
}
