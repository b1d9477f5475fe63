//! Game session: one board, two seats, turn state for one room.

use crate::config::SessionOptions;
use crate::handler::{Outbox, RoomHandler};
use crate::invariants::{InvariantSet, SessionInvariants};
use crate::protocol::{ClientId, OutboundCommand, RoomName};
use chorus_tictactoe::{Board, Player, Position};
use derive_getters::Getters;
use tracing::{debug, info, instrument, warn};

/// Whose move it is, or that no more moves are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    /// This mark moves next.
    Player(Player),
    /// Terminal: the game is over.
    Over,
}

/// How a finished session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A player completed a line.
    Winner(Player),
    /// The board filled up.
    Draw,
    /// A player left mid-game.
    Aborted,
}

/// Lifecycle phase. Moves only forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Fewer than two seats taken.
    WaitingForPlayers,
    /// Both seats taken, turns alternate.
    InProgress,
    /// No further moves are accepted.
    Finished(Outcome),
}

/// Reasons a move is rejected. The display text is what the sender sees.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum MoveError {
    /// The second seat is still empty.
    #[display("waiting for an opponent")]
    NotStarted,

    /// The session already finished.
    #[display("game is over")]
    GameOver,

    /// The sender does not hold the mark whose turn it is.
    #[display("Not your turn")]
    NotYourTurn,

    /// Coordinates outside the board.
    #[display("position was not on board: {position}")]
    OffBoard {
        /// Computed `y * 3 + x`.
        position: i64,
    },

    /// The target square is taken.
    #[display("illegal move, space not available: {occupant}")]
    Occupied {
        /// Mark on the target square.
        occupant: Player,
    },
}

/// Result of an accepted move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The game goes on with `next` to move.
    Continue {
        /// Mark that moves next.
        next: Player,
    },
    /// The mover completed a line.
    Won(Player),
    /// The board is full with no line.
    Draw,
}

/// A game session with two players.
#[derive(Debug, Clone, Getters)]
pub struct GameSession {
    /// Room this session is bound to.
    room: RoomName,
    /// The board.
    board: Board,
    /// Player X.
    player_x: Option<ClientId>,
    /// Player O.
    player_o: Option<ClientId>,
    /// Mark to move.
    turn: Turn,
    /// Number of filled seats; reset to 0 when a leave aborts the game.
    ready_count: u8,
    /// Lifecycle phase.
    phase: SessionPhase,
    /// Behaviour switches.
    options: SessionOptions,
}

impl GameSession {
    /// Creates a new game session.
    #[instrument(skip(options))]
    pub fn new(room: RoomName, options: SessionOptions) -> Self {
        info!(room = %room, "Creating new game session");
        Self {
            room,
            board: Board::new(),
            player_x: None,
            player_o: None,
            turn: Turn::Player(Player::X),
            ready_count: 0,
            phase: SessionPhase::WaitingForPlayers,
            options,
        }
    }

    /// Mark held by `client`, if seated.
    pub fn mark_of(&self, client: &ClientId) -> Option<Player> {
        if self.player_x.as_ref() == Some(client) {
            Some(Player::X)
        } else if self.player_o.as_ref() == Some(client) {
            Some(Player::O)
        } else {
            None
        }
    }

    /// Client seated with `mark`.
    pub fn player(&self, mark: Player) -> Option<&ClientId> {
        match mark {
            Player::X => self.player_x.as_ref(),
            Player::O => self.player_o.as_ref(),
        }
    }

    /// True when `client` holds a seat.
    pub fn has_player(&self, client: &ClientId) -> bool {
        self.mark_of(client).is_some()
    }

    /// True once the session reached a terminal phase.
    pub fn is_finished(&self) -> bool {
        matches!(self.phase, SessionPhase::Finished(_))
    }

    /// Validates and applies a move for `client`.
    ///
    /// Checks run in order: session started and not over, sender holds the
    /// turn, coordinates on the board, square empty. A rejected move leaves
    /// the session untouched.
    #[instrument(skip(self), fields(room = %self.room))]
    pub fn try_move(&mut self, client: &ClientId, x: i64, y: i64) -> Result<MoveOutcome, MoveError> {
        let mark = match (self.phase, self.turn) {
            (SessionPhase::WaitingForPlayers, _) => return Err(MoveError::NotStarted),
            (SessionPhase::Finished(_), _) | (_, Turn::Over) => return Err(MoveError::GameOver),
            (SessionPhase::InProgress, Turn::Player(mark)) => mark,
        };

        if self.mark_of(client) != Some(mark) {
            return Err(MoveError::NotYourTurn);
        }

        let position = Position::from_xy(x, y).ok_or(MoveError::OffBoard {
            position: y.saturating_mul(3).saturating_add(x),
        })?;

        if let Some(occupant) = self.board.get(position).player() {
            return Err(MoveError::Occupied { occupant });
        }

        self.board = self
            .board
            .place_at(position, mark)
            .map_err(|_| MoveError::Occupied { occupant: mark })?;

        let outcome = if self.board.has_win() {
            self.finish(Outcome::Winner(mark));
            MoveOutcome::Won(mark)
        } else if self.board.is_full() {
            self.finish(Outcome::Draw);
            MoveOutcome::Draw
        } else {
            let next = mark.opponent();
            self.turn = Turn::Player(next);
            MoveOutcome::Continue { next }
        };

        debug!(%position, %mark, board = %self.board, ?outcome, "Move applied");
        self.check_invariants();
        Ok(outcome)
    }

    fn finish(&mut self, outcome: Outcome) {
        self.turn = Turn::Over;
        self.phase = SessionPhase::Finished(outcome);
    }

    /// Sends `turn` with the current board to whoever holds `mark`.
    fn send_turn(&self, mark: Player, out: &mut Outbox) {
        if let Some(client) = self.player(mark) {
            out.send_to(client, OutboundCommand::Turn { board: self.board });
        }
    }

    /// Requests removal of both players, O first, then ends the room.
    fn release_players(&self, out: &mut Outbox) {
        for mark in [Player::O, Player::X] {
            if let Some(client) = self.player(mark) {
                out.leave(client);
            }
        }
        out.end_room();
    }

    fn check_invariants(&self) {
        let result = SessionInvariants::check_all(self);
        if let Err(violations) = &result {
            warn!(room = %self.room, ?violations, "Session invariants violated");
        }
        debug_assert!(result.is_ok(), "session invariants violated");
    }
}

impl RoomHandler for GameSession {
    #[instrument(skip(self, out), fields(room = %self.room))]
    fn on_join(&mut self, client: &ClientId, out: &mut Outbox) {
        if self.options.reject_duplicate_join && self.has_player(client) {
            warn!(client_id = %client, "Client already seated, ignoring join");
            return;
        }

        if self.player_x.is_none() {
            info!(client_id = %client, mark = "X", "Seating player as X");
            self.player_x = Some(client.clone());
            out.send_to(client, OutboundCommand::XUser);
        } else if self.player_o.is_none() {
            info!(client_id = %client, mark = "O", "Seating player as O");
            self.player_o = Some(client.clone());
            out.send_to(client, OutboundCommand::OUser);
        } else {
            warn!(client_id = %client, "Room is full");
            if self.options.notify_full_room {
                out.send_to(
                    client,
                    OutboundCommand::Error {
                        msg: "room is full".to_string(),
                    },
                );
            }
            return;
        }

        self.ready_count += 1;
        if self.ready_count == 2 {
            info!("Both players seated, X to move");
            self.turn = Turn::Player(Player::X);
            self.phase = SessionPhase::InProgress;
            self.send_turn(Player::X, out);
        }
        self.check_invariants();
    }

    #[instrument(skip(self, out), fields(room = %self.room))]
    fn on_move(&mut self, client: &ClientId, x: i64, y: i64, out: &mut Outbox) {
        match self.try_move(client, x, y) {
            Ok(MoveOutcome::Continue { next }) => self.send_turn(next, out),
            Ok(MoveOutcome::Won(winner)) => {
                info!(%winner, board = %self.board, "Game won");
                out.broadcast(OutboundCommand::Win { winner });
                self.release_players(out);
            }
            Ok(MoveOutcome::Draw) => {
                info!(board = %self.board, "Game drawn");
                out.broadcast(OutboundCommand::Draw { board: self.board });
                self.release_players(out);
            }
            Err(e) => {
                warn!(client_id = %client, x, y, error = %e, "Rejected move");
                out.send_to(client, OutboundCommand::Error { msg: e.to_string() });
            }
        }
    }

    #[instrument(skip(self, out), fields(room = %self.room))]
    fn on_leave(&mut self, client: &ClientId, out: &mut Outbox) {
        if self.phase != SessionPhase::InProgress {
            debug!(client_id = %client, phase = ?self.phase, "Leave outside a running game");
            return;
        }

        info!(client_id = %client, "Player left mid-game, ending room");
        out.broadcast(OutboundCommand::Endgame);
        out.end_room();
        self.ready_count = 0;
        self.finish(Outcome::Aborted);
        self.check_invariants();
    }

    #[instrument(skip(self, out), fields(room = %self.room))]
    fn on_room_empty(&mut self, out: &mut Outbox) {
        info!("Room is empty, ending the room");
        out.end_room();
    }
}
