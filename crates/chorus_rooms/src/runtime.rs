//! The room runtime collaborator and an in-process implementation.

use crate::protocol::{ClientId, OutboundMessage, Recipient, RoomName, Scope};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

/// Errors raised by a room runtime.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum RuntimeError {
    /// No room with this name exists.
    #[display("unknown room '{room}'")]
    UnknownRoom {
        /// The missing room.
        room: RoomName,
    },

    /// A room with this name already exists.
    #[display("room '{room}' already exists")]
    RoomExists {
        /// The clashing room.
        room: RoomName,
    },
}

/// What the core consumes from the hosting runtime.
///
/// The runtime owns rooms and membership and carries messages to clients.
/// Broadcasts reach every member of the scope at delivery time.
pub trait RoomRuntime {
    /// Creates an empty room.
    fn create_room(&mut self, name: &RoomName) -> Result<(), RuntimeError>;

    /// True if the room exists and has not ended.
    fn room_exists(&self, name: &RoomName) -> bool;

    /// Adds a client to a scope.
    fn join(&mut self, scope: &Scope, client: &ClientId) -> Result<(), RuntimeError>;

    /// Removes a client from a scope. Unknown members are ignored.
    fn leave(&mut self, scope: &Scope, client: &ClientId) -> Result<(), RuntimeError>;

    /// Current members of a scope, in join order.
    fn members(&self, scope: &Scope) -> Vec<ClientId>;

    /// Delivers a message within a scope.
    fn deliver(&mut self, scope: &Scope, message: OutboundMessage) -> Result<(), RuntimeError>;

    /// Terminates a room and detaches its members.
    fn end_room(&mut self, name: &RoomName) -> Result<(), RuntimeError>;
}

/// A message as it left a scope, before broadcast expansion.
///
/// Serializes as the outbound message with the scope's `RoomId` added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentMessage {
    /// Scope the message was sent in.
    #[serde(rename = "RoomId")]
    pub scope: Scope,
    /// The message.
    #[serde(flatten)]
    pub message: OutboundMessage,
}

/// Rooms, membership and mailboxes held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRuntime {
    lobby: Vec<ClientId>,
    rooms: HashMap<RoomName, Vec<ClientId>>,
    ended: Vec<RoomName>,
    sent: Vec<SentMessage>,
    inboxes: HashMap<ClientId, Vec<OutboundMessage>>,
}

impl InMemoryRuntime {
    /// Creates an empty runtime.
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages received by `client`, oldest first.
    pub fn inbox(&self, client: &ClientId) -> &[OutboundMessage] {
        self.inboxes.get(client).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Takes and clears `client`'s inbox.
    pub fn take_inbox(&mut self, client: &ClientId) -> Vec<OutboundMessage> {
        self.inboxes.remove(client).unwrap_or_default()
    }

    /// Everything sent so far, in send order.
    pub fn sent(&self) -> &[SentMessage] {
        &self.sent
    }

    /// Takes and clears the send log.
    pub fn drain_sent(&mut self) -> Vec<SentMessage> {
        std::mem::take(&mut self.sent)
    }

    /// Names of rooms that are still open.
    pub fn open_rooms(&self) -> Vec<RoomName> {
        let mut names: Vec<_> = self.rooms.keys().cloned().collect();
        names.sort();
        names
    }

    /// Rooms that have ended, in order.
    pub fn ended_rooms(&self) -> &[RoomName] {
        &self.ended
    }

    fn scope_members_mut(&mut self, scope: &Scope) -> Result<&mut Vec<ClientId>, RuntimeError> {
        match scope {
            Scope::Lobby => Ok(&mut self.lobby),
            Scope::Room(name) => self
                .rooms
                .get_mut(name)
                .ok_or_else(|| RuntimeError::UnknownRoom { room: name.clone() }),
        }
    }
}

impl RoomRuntime for InMemoryRuntime {
    #[instrument(skip(self))]
    fn create_room(&mut self, name: &RoomName) -> Result<(), RuntimeError> {
        if self.rooms.contains_key(name) {
            return Err(RuntimeError::RoomExists { room: name.clone() });
        }
        info!(room = %name, "Room created");
        self.rooms.insert(name.clone(), Vec::new());
        Ok(())
    }

    fn room_exists(&self, name: &RoomName) -> bool {
        self.rooms.contains_key(name)
    }

    #[instrument(skip(self))]
    fn join(&mut self, scope: &Scope, client: &ClientId) -> Result<(), RuntimeError> {
        let members = self.scope_members_mut(scope)?;
        if !members.contains(client) {
            members.push(client.clone());
        }
        debug!(%scope, client_id = %client, "Member joined");
        Ok(())
    }

    #[instrument(skip(self))]
    fn leave(&mut self, scope: &Scope, client: &ClientId) -> Result<(), RuntimeError> {
        let members = self.scope_members_mut(scope)?;
        let before = members.len();
        members.retain(|m| m != client);
        if members.len() == before {
            debug!(%scope, client_id = %client, "Leave from non-member ignored");
        }
        Ok(())
    }

    fn members(&self, scope: &Scope) -> Vec<ClientId> {
        match scope {
            Scope::Lobby => self.lobby.clone(),
            Scope::Room(name) => self.rooms.get(name).cloned().unwrap_or_default(),
        }
    }

    #[instrument(skip(self, message), fields(cmd = message.command.name()))]
    fn deliver(&mut self, scope: &Scope, message: OutboundMessage) -> Result<(), RuntimeError> {
        let receivers = match &message.recipient {
            Recipient::Client(client) => vec![client.clone()],
            Recipient::Broadcast => self.scope_members_mut(scope)?.clone(),
        };

        if let Scope::Room(name) = scope
            && !self.rooms.contains_key(name)
        {
            warn!(room = %name, "Delivery to unknown room");
            return Err(RuntimeError::UnknownRoom { room: name.clone() });
        }

        for receiver in receivers {
            self.inboxes
                .entry(receiver)
                .or_default()
                .push(message.clone());
        }
        self.sent.push(SentMessage {
            scope: scope.clone(),
            message,
        });
        Ok(())
    }

    #[instrument(skip(self))]
    fn end_room(&mut self, name: &RoomName) -> Result<(), RuntimeError> {
        let members = self
            .rooms
            .remove(name)
            .ok_or_else(|| RuntimeError::UnknownRoom { room: name.clone() })?;
        info!(room = %name, detached = members.len(), "Room ended");
        self.ended.push(name.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::OutboundCommand;
    use serde_json::json;

    #[test]
    fn test_broadcast_reaches_current_members_only() {
        let mut runtime = InMemoryRuntime::new();
        let room = RoomName::new("r");
        let scope = Scope::Room(room.clone());
        let (a, b) = (ClientId::new("a"), ClientId::new("b"));

        runtime.create_room(&room).unwrap();
        runtime.join(&scope, &a).unwrap();
        runtime.join(&scope, &b).unwrap();
        runtime.leave(&scope, &b).unwrap();
        runtime
            .deliver(&scope, OutboundMessage::broadcast(OutboundCommand::Endgame))
            .unwrap();

        assert_eq!(runtime.inbox(&a).len(), 1);
        assert!(runtime.inbox(&b).is_empty());
        assert_eq!(runtime.sent().len(), 1);
    }

    #[test]
    fn test_unknown_room_is_an_error() {
        let mut runtime = InMemoryRuntime::new();
        let room = RoomName::new("nope");
        assert_eq!(
            runtime.join(&Scope::Room(room.clone()), &ClientId::new("a")),
            Err(RuntimeError::UnknownRoom { room: room.clone() })
        );
        assert!(runtime.end_room(&room).is_err());
    }

    #[test]
    fn test_duplicate_room_is_an_error() {
        let mut runtime = InMemoryRuntime::new();
        let room = RoomName::new("r");
        runtime.create_room(&room).unwrap();
        assert_eq!(
            runtime.create_room(&room),
            Err(RuntimeError::RoomExists { room })
        );
    }

    #[test]
    fn test_end_room_detaches_members() {
        let mut runtime = InMemoryRuntime::new();
        let room = RoomName::new("r");
        let scope = Scope::Room(room.clone());
        runtime.create_room(&room).unwrap();
        runtime.join(&scope, &ClientId::new("a")).unwrap();
        runtime.end_room(&room).unwrap();

        assert!(!runtime.room_exists(&room));
        assert!(runtime.members(&scope).is_empty());
        assert_eq!(runtime.ended_rooms(), &[room]);
    }

    #[test]
    fn test_sent_message_wire_form() {
        let sent = SentMessage {
            scope: Scope::Room(RoomName::new("a vs b")),
            message: OutboundMessage::broadcast(OutboundCommand::Endgame),
        };
        assert_eq!(
            serde_json::to_value(&sent).unwrap(),
            json!({ "RoomId": "a vs b", "ReceiverId": "", "Cmd": "endgame" })
        );
    }
}
