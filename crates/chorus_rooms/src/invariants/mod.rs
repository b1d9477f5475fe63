//! Session invariants.
//!
//! Invariants are logical properties that must hold after every session
//! mutation. They are checked in debug builds and can be tested independently.

pub mod mark_balance;
pub mod ready_count;
pub mod turn_consistency;

pub use mark_balance::MarkBalanceInvariant;
pub use ready_count::ReadyCountInvariant;
pub use turn_consistency::TurnConsistencyInvariant;

use crate::session::GameSession;

/// A logical property that must hold for a given state.
pub trait Invariant<S> {
    /// Checks if the invariant holds for the given state.
    fn holds(state: &S) -> bool;

    /// Human-readable description of the invariant.
    fn description() -> &'static str;
}

/// Violation of an invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub description: String,
}

impl InvariantViolation {
    /// Creates a new invariant violation.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

/// A set of invariants that can be checked together.
///
/// Implementations are provided for tuples.
pub trait InvariantSet<S> {
    /// Checks all invariants in the set.
    ///
    /// Returns the descriptions of every invariant that failed.
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>>;
}

fn check<S, I: Invariant<S>>(state: &S, violations: &mut Vec<InvariantViolation>) {
    if !I::holds(state) {
        violations.push(InvariantViolation::new(I::description()));
    }
}

fn finish(violations: Vec<InvariantViolation>) -> Result<(), Vec<InvariantViolation>> {
    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

impl<S, I1, I2, I3> InvariantSet<S> for (I1, I2, I3)
where
    I1: Invariant<S>,
    I2: Invariant<S>,
    I3: Invariant<S>,
{
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>> {
        let mut violations = Vec::new();
        check::<S, I1>(state, &mut violations);
        check::<S, I2>(state, &mut violations);
        check::<S, I3>(state, &mut violations);
        finish(violations)
    }
}

impl<S, I1, I2> InvariantSet<S> for (I1, I2)
where
    I1: Invariant<S>,
    I2: Invariant<S>,
{
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>> {
        let mut violations = Vec::new();
        check::<S, I1>(state, &mut violations);
        check::<S, I2>(state, &mut violations);
        finish(violations)
    }
}

/// All session invariants as a composable set.
pub type SessionInvariants = (
    ReadyCountInvariant,
    MarkBalanceInvariant,
    TurnConsistencyInvariant,
);

/// Checks every session invariant; exposed for callers holding a session.
pub fn check_session(session: &GameSession) -> Result<(), Vec<InvariantViolation>> {
    SessionInvariants::check_all(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionOptions;
    use crate::handler::{Outbox, RoomHandler};
    use crate::protocol::{ClientId, RoomName};

    #[test]
    fn test_invariant_set_holds_for_new_session() {
        let session = GameSession::new(RoomName::new("r"), SessionOptions::default());
        assert!(check_session(&session).is_ok());
    }

    #[test]
    fn test_invariant_set_holds_through_a_game() {
        let mut session = GameSession::new(RoomName::new("r"), SessionOptions::default());
        let (alice, bob) = (ClientId::new("alice"), ClientId::new("bob"));
        let mut out = Outbox::new();
        session.on_join(&alice, &mut out);
        session.on_join(&bob, &mut out);
        session.try_move(&alice, 1, 1).unwrap();
        assert!(check_session(&session).is_ok());

        session.on_leave(&bob, &mut out);
        assert!(check_session(&session).is_ok());
    }

    #[test]
    fn test_two_invariants_as_set() {
        let session = GameSession::new(RoomName::new("r"), SessionOptions::default());
        type TwoInvariants = (ReadyCountInvariant, MarkBalanceInvariant);
        assert!(TwoInvariants::check_all(&session).is_ok());
    }
}
