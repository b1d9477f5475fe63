//! Chorus rooms: lobby matchmaking and tic-tac-toe game rooms.
//!
//! A hosting runtime owns rooms and membership and feeds events in. This
//! crate decides what happens:
//!
//! - **Lobby**: [`Matchmaker`] pairs arriving clients and requests a room
//!   per pair.
//! - **Rooms**: [`GameSession`] seats X and O, validates moves, detects
//!   wins and draws, and ends the room when a player leaves mid-game.
//! - **Routing**: [`SessionManager`] applies handler [`Effect`]s to a
//!   [`RoomRuntime`]; [`InMemoryRuntime`] is the in-process runtime.
//!
//! # Example
//!
//! ```
//! use chorus_rooms::{InMemoryRuntime, InboundCommand, InboundEvent, RoomsConfig, SessionManager};
//!
//! let mut manager = SessionManager::new(InMemoryRuntime::new(), &RoomsConfig::default());
//! manager.handle(&InboundEvent::lobby("alice", InboundCommand::Join))?;
//! manager.handle(&InboundEvent::lobby("bob", InboundCommand::Join))?;
//! assert_eq!(manager.session_count(), 1);
//! # Ok::<(), chorus_rooms::RuntimeError>(())
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod config;
mod handler;
mod manager;
mod matchmaker;
mod protocol;
mod runtime;
mod session;

pub mod invariants;

// Crate-level exports - Configuration
pub use config::{ConfigError, RoomsConfig, SessionOptions};

// Crate-level exports - Handler interface
pub use handler::{Effect, Outbox, RoomHandler};

// Crate-level exports - Wire protocol
pub use protocol::{
    ClientId, InboundCommand, InboundEvent, OutboundCommand, OutboundMessage, ProtocolError,
    Recipient, RoomName, Scope,
};

// Crate-level exports - Runtime
pub use runtime::{InMemoryRuntime, RoomRuntime, RuntimeError, SentMessage};

// Crate-level exports - Lobby and sessions
pub use manager::SessionManager;
pub use matchmaker::Matchmaker;
pub use session::{GameSession, MoveError, MoveOutcome, Outcome, SessionPhase, Turn};

// Re-exported game types
pub use chorus_tictactoe::{Board, Mark, Player, Position};
