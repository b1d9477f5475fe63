//! Lobby matchmaking: first come, first paired.

use crate::handler::{Outbox, RoomHandler};
use crate::protocol::{ClientId, OutboundCommand, RoomName};
use derive_getters::Getters;
use tracing::{debug, info, instrument, warn};

/// Pairs arriving clients two at a time.
///
/// Holds at most one waiting client. The second arrival closes the pair:
/// a room named `"<waiting><separator><arrival>"` is requested with the
/// waiting client joining first, so it plays X.
#[derive(Debug, Clone, Getters)]
pub struct Matchmaker {
    /// Client waiting for an opponent.
    waiting: Option<ClientId>,
    /// Text between the two ids in a room name.
    separator: String,
    /// Ignore a repeated join from the waiting client.
    reject_duplicate_join: bool,
    /// Pairs formed by this lobby.
    pairs_made: u64,
}

impl Matchmaker {
    /// Creates an empty lobby.
    #[instrument(skip(separator))]
    pub fn new(separator: impl Into<String>, reject_duplicate_join: bool) -> Self {
        let separator = separator.into();
        debug!(%separator, "Creating matchmaker");
        Self {
            waiting: None,
            separator,
            reject_duplicate_join,
            pairs_made: 0,
        }
    }

    /// Room name for a pair.
    pub fn room_name(&self, first: &ClientId, second: &ClientId) -> RoomName {
        RoomName::new(format!("{}{}{}", first, self.separator, second))
    }
}

impl Default for Matchmaker {
    fn default() -> Self {
        Self::new(" vs ", false)
    }
}

impl RoomHandler for Matchmaker {
    #[instrument(skip(self, out))]
    fn on_join(&mut self, client: &ClientId, out: &mut Outbox) {
        let Some(waiting) = self.waiting.take() else {
            info!(client_id = %client, "First user joined, waiting for an opponent");
            self.waiting = Some(client.clone());
            return;
        };

        if self.reject_duplicate_join && waiting == *client {
            warn!(client_id = %client, "Waiting client joined again, ignoring");
            self.waiting = Some(waiting);
            return;
        }

        let name = self.room_name(&waiting, client);
        info!(client_id = %client, opponent = %waiting, room = %name, "Second user joined, creating room");
        out.create_room(name, [waiting, client.clone()]);
        self.pairs_made += 1;
    }

    #[instrument(skip(self, _out))]
    fn on_leave(&mut self, client: &ClientId, _out: &mut Outbox) {
        if self.waiting.as_ref() == Some(client) {
            info!(client_id = %client, "Waiting user left");
            self.waiting = None;
        }
    }

    #[instrument(skip(self, out, text))]
    fn on_say(&mut self, client: &ClientId, text: &str, out: &mut Outbox) {
        debug!(client_id = %client, "Relaying chat");
        out.broadcast(OutboundCommand::Say {
            from: client.clone(),
            msg: text.to_string(),
        });
    }

    fn on_room_empty(&mut self, _out: &mut Outbox) {
        debug!("Lobby empty");
    }
}
