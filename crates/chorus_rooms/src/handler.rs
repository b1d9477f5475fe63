//! Handler interface shared by the lobby and game rooms.
//!
//! Handlers never talk to the runtime. They push [`Effect`]s into an
//! [`Outbox`] and the [`SessionManager`](crate::SessionManager) applies them
//! in the order they were pushed.

use crate::protocol::{ClientId, InboundCommand, OutboundCommand, OutboundMessage, RoomName};
use tracing::{debug, warn};

/// Something a handler asks the runtime to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Deliver a message within the handler's scope.
    Send(OutboundMessage),
    /// Create a room with a new game session and join `members` in order.
    CreateRoom {
        /// Requested room name.
        name: RoomName,
        /// Clients to join, first one becomes X.
        members: [ClientId; 2],
    },
    /// Remove a client from the handler's room.
    Leave(ClientId),
    /// Terminate the handler's room.
    EndRoom,
}

/// Ordered effects produced by one handler invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outbox {
    effects: Vec<Effect>,
}

impl Outbox {
    /// Creates an empty outbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends `command` to one client.
    pub fn send_to(&mut self, client: &ClientId, command: OutboundCommand) {
        self.effects
            .push(Effect::Send(OutboundMessage::to(client.clone(), command)));
    }

    /// Sends `command` to everyone in the scope.
    pub fn broadcast(&mut self, command: OutboundCommand) {
        self.effects
            .push(Effect::Send(OutboundMessage::broadcast(command)));
    }

    /// Requests a new room for two clients.
    pub fn create_room(&mut self, name: RoomName, members: [ClientId; 2]) {
        self.effects.push(Effect::CreateRoom { name, members });
    }

    /// Requests removal of a client from the room.
    pub fn leave(&mut self, client: &ClientId) {
        self.effects.push(Effect::Leave(client.clone()));
    }

    /// Requests termination of the room.
    pub fn end_room(&mut self) {
        self.effects.push(Effect::EndRoom);
    }

    /// All effects in emission order.
    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    /// Only the messages, in emission order.
    pub fn messages(&self) -> impl Iterator<Item = &OutboundMessage> {
        self.effects.iter().filter_map(|effect| match effect {
            Effect::Send(message) => Some(message),
            _ => None,
        })
    }

    /// True when termination was requested.
    pub fn ends_room(&self) -> bool {
        self.effects.contains(&Effect::EndRoom)
    }

    /// True when nothing was emitted.
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Consumes the outbox.
    pub fn into_effects(self) -> Vec<Effect> {
        self.effects
    }
}

/// Event hooks invoked for one lobby or room.
///
/// Each instance sees one event at a time and runs it to completion.
pub trait RoomHandler {
    /// A client entered the scope.
    fn on_join(&mut self, client: &ClientId, out: &mut Outbox);

    /// A client left the scope.
    fn on_leave(&mut self, client: &ClientId, out: &mut Outbox);

    /// A client asked to place a mark.
    fn on_move(&mut self, client: &ClientId, x: i64, y: i64, _out: &mut Outbox) {
        warn!(client_id = %client, x, y, "Move sent to a scope without a game");
    }

    /// A client sent chat text.
    fn on_say(&mut self, client: &ClientId, text: &str, _out: &mut Outbox) {
        debug!(client_id = %client, len = text.len(), "Chat not relayed in this scope");
    }

    /// Every participant has gone.
    fn on_room_empty(&mut self, out: &mut Outbox);

    /// Routes a validated command to its hook.
    fn dispatch(&mut self, sender: &ClientId, command: &InboundCommand, out: &mut Outbox) {
        match command {
            InboundCommand::Join => self.on_join(sender, out),
            InboundCommand::Leave => self.on_leave(sender, out),
            InboundCommand::Say { msg } => self.on_say(sender, msg, out),
            InboundCommand::Move { x, y } => self.on_move(sender, *x, *y, out),
            InboundCommand::RoomEmpty => self.on_room_empty(out),
        }
    }
}
