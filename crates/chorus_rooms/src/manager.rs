//! Session manager: owns the lobby and one game session per room.

use crate::config::{RoomsConfig, SessionOptions};
use crate::handler::{Effect, Outbox, RoomHandler};
use crate::matchmaker::Matchmaker;
use crate::protocol::{ClientId, InboundCommand, InboundEvent, RoomName, Scope};
use crate::runtime::{RoomRuntime, RuntimeError};
use crate::session::GameSession;
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

/// Routes runtime events to the lobby or a room's session and applies the
/// effects they emit.
///
/// Membership is updated before the handler runs: a joining client is
/// already a member when `on_join` fires and a leaving client is already
/// gone when `on_leave` fires. A joiner the session does not seat is taken
/// back out of the room. Paired clients leave the lobby when their room opens.
#[derive(Debug)]
pub struct SessionManager<R> {
    runtime: R,
    lobby: Matchmaker,
    sessions: HashMap<RoomName, GameSession>,
    options: SessionOptions,
}

impl<R: RoomRuntime> SessionManager<R> {
    /// Creates a manager over `runtime`.
    #[instrument(skip(runtime, config))]
    pub fn new(runtime: R, config: &RoomsConfig) -> Self {
        info!("Creating session manager");
        Self {
            runtime,
            lobby: Matchmaker::new(config.room_name_separator().clone(), *config.reject_duplicate_join()),
            sessions: HashMap::new(),
            options: config.session_options(),
        }
    }

    /// The runtime.
    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// The runtime, mutably.
    pub fn runtime_mut(&mut self) -> &mut R {
        &mut self.runtime
    }

    /// The lobby.
    pub fn lobby(&self) -> &Matchmaker {
        &self.lobby
    }

    /// Session bound to `room`.
    pub fn session(&self, room: &RoomName) -> Option<&GameSession> {
        self.sessions.get(room)
    }

    /// Number of open game rooms.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Handles one event.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::UnknownRoom`] for events aimed at a room with
    /// no session, or any error the runtime raises while applying effects.
    #[instrument(skip(self, event), fields(scope = %event.scope, sender = %event.sender, cmd = event.command.name()))]
    pub fn handle(&mut self, event: &InboundEvent) -> Result<(), RuntimeError> {
        match &event.scope {
            Scope::Lobby => {
                self.track_membership(&event.scope, &event.sender, &event.command)?;
                let mut out = Outbox::new();
                self.lobby.dispatch(&event.sender, &event.command, &mut out);
                self.apply(&Scope::Lobby, out)
            }
            Scope::Room(room) => {
                if !self.sessions.contains_key(room) {
                    warn!(room = %room, "Event for a room without a session");
                    return Err(RuntimeError::UnknownRoom { room: room.clone() });
                }
                self.track_membership(&event.scope, &event.sender, &event.command)?;
                self.dispatch_to_room(room, &event.sender, &event.command)?;
                if event.command == InboundCommand::Join {
                    self.drop_unseated(room, &event.sender)?;
                }
                self.reap_if_empty(room)
            }
        }
    }

    /// Removes `client` from every scope it belongs to, as a disconnect.
    ///
    /// # Errors
    ///
    /// Propagates runtime errors from the resulting leaves.
    #[instrument(skip(self))]
    pub fn disconnect(&mut self, client: &ClientId) -> Result<(), RuntimeError> {
        let mut rooms: Vec<RoomName> = self
            .sessions
            .keys()
            .filter(|room| self.runtime.members(&Scope::Room((*room).clone())).contains(client))
            .cloned()
            .collect();
        rooms.sort();

        for room in rooms {
            // An earlier leave may have ended this room.
            if self.sessions.contains_key(&room) {
                self.handle(&InboundEvent::room(room, client.clone(), InboundCommand::Leave))?;
            }
        }

        if self.runtime.members(&Scope::Lobby).contains(client) || self.lobby.waiting().as_ref() == Some(client) {
            self.handle(&InboundEvent::lobby(client.clone(), InboundCommand::Leave))?;
        }
        Ok(())
    }

    fn track_membership(
        &mut self,
        scope: &Scope,
        client: &ClientId,
        command: &InboundCommand,
    ) -> Result<(), RuntimeError> {
        match command {
            InboundCommand::Join => self.runtime.join(scope, client),
            InboundCommand::Leave => self.runtime.leave(scope, client),
            _ => Ok(()),
        }
    }

    /// Takes a joiner the session turned away back out of the room.
    fn drop_unseated(&mut self, room: &RoomName, client: &ClientId) -> Result<(), RuntimeError> {
        let unseated = self
            .sessions
            .get(room)
            .is_some_and(|session| !session.has_player(client));
        if unseated {
            debug!(room = %room, client_id = %client, "Joiner holds no seat, removing from room");
            self.runtime.leave(&Scope::Room(room.clone()), client)?;
        }
        Ok(())
    }

    fn dispatch_to_room(
        &mut self,
        room: &RoomName,
        client: &ClientId,
        command: &InboundCommand,
    ) -> Result<(), RuntimeError> {
        let mut out = Outbox::new();
        match self.sessions.get_mut(room) {
            Some(session) => session.dispatch(client, command, &mut out),
            None => return Err(RuntimeError::UnknownRoom { room: room.clone() }),
        }
        self.apply(&Scope::Room(room.clone()), out)
    }

    /// Applies effects in emission order. Stops after the room ends.
    fn apply(&mut self, scope: &Scope, out: Outbox) -> Result<(), RuntimeError> {
        for effect in out.into_effects() {
            match effect {
                Effect::Send(message) => self.runtime.deliver(scope, message)?,
                Effect::CreateRoom { name, members } => self.open_room(name, members)?,
                Effect::Leave(client) => self.runtime.leave(scope, &client)?,
                Effect::EndRoom => match scope {
                    Scope::Room(room) => {
                        self.close_room(room)?;
                        return Ok(());
                    }
                    Scope::Lobby => warn!("Lobby asked to end itself, ignoring"),
                },
            }
        }
        Ok(())
    }

    #[instrument(skip(self))]
    fn open_room(&mut self, requested: RoomName, members: [ClientId; 2]) -> Result<(), RuntimeError> {
        let room = self.unique_room_name(requested);
        self.runtime.create_room(&room)?;
        self.sessions
            .insert(room.clone(), GameSession::new(room.clone(), self.options));
        info!(room = %room, "Opened game room");

        let scope = Scope::Room(room.clone());
        for member in members {
            if !self.sessions.contains_key(&room) {
                break;
            }
            self.runtime.leave(&Scope::Lobby, &member)?;
            self.runtime.join(&scope, &member)?;
            self.dispatch_to_room(&room, &member, &InboundCommand::Join)?;
        }
        Ok(())
    }

    fn unique_room_name(&self, requested: RoomName) -> RoomName {
        if !self.runtime.room_exists(&requested) {
            return requested;
        }
        let renamed = (2u64..)
            .map(|n| RoomName::new(format!("{} #{}", requested, n)))
            .find(|candidate| !self.runtime.room_exists(candidate))
            .unwrap_or_else(|| requested.clone());
        debug!(requested = %requested, room = %renamed, "Room name taken, renamed");
        renamed
    }

    #[instrument(skip(self))]
    fn close_room(&mut self, room: &RoomName) -> Result<(), RuntimeError> {
        self.runtime.end_room(room)?;
        if let Some(session) = self.sessions.remove(room) {
            info!(room = %room, phase = ?session.phase(), "Closed game room");
        }
        Ok(())
    }

    fn reap_if_empty(&mut self, room: &RoomName) -> Result<(), RuntimeError> {
        if self.sessions.contains_key(room) && self.runtime.members(&Scope::Room(room.clone())).is_empty() {
            debug!(room = %room, "Room has no members left");
            self.dispatch_to_room(room, &ClientId::new(""), &InboundCommand::RoomEmpty)?;
        }
        Ok(())
    }
}
