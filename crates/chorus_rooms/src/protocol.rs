//! Wire protocol: inbound client events and outbound room messages.
//!
//! Inbound events arrive as `{ "RoomId", "SenderId", "Cmd", "Data" }` JSON
//! objects. They are validated here, at the boundary, into [`InboundEvent`]
//! so handlers never look at loose payload maps.

use chorus_tictactoe::{Board, Player};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;
use tracing::{debug, instrument, warn};

/// Opaque client identifier supplied by the runtime with every event.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    /// Creates a client id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrows the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ClientId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Name of a runtime-managed room.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
#[serde(transparent)]
pub struct RoomName(String);

impl RoomName {
    /// Creates a room name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrows the raw name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Where an event happens or a message is sent: the lobby or one room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum Scope {
    /// The pre-room scope where clients wait to be paired.
    Lobby,
    /// A game room.
    Room(RoomName),
}

impl Scope {
    /// Room name, or `None` for the lobby.
    pub fn room(&self) -> Option<&RoomName> {
        match self {
            Scope::Lobby => None,
            Scope::Room(name) => Some(name),
        }
    }

    /// Wire `RoomId`: empty for the lobby.
    pub fn wire_id(&self) -> &str {
        self.room().map(RoomName::as_str).unwrap_or("")
    }
}

impl From<Scope> for String {
    fn from(scope: Scope) -> Self {
        scope.wire_id().to_string()
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Lobby => write!(f, "lobby"),
            Scope::Room(name) => write!(f, "room '{}'", name),
        }
    }
}

/// Protocol error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Protocol error: {} at {}:{}", message, file, line)]
pub struct ProtocolError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ProtocolError {
    /// Creates a new protocol error with caller location tracking.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

impl From<serde_json::Error> for ProtocolError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        Self::new(format!("JSON error: {}", err))
    }
}

/// Inbound command names. Matching is case-insensitive so both the
/// hook-style names (`Join`, `Move`) and the lowercase ones are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::IntoStaticStr)]
#[strum(ascii_case_insensitive)]
enum InboundKind {
    #[strum(serialize = "join")]
    Join,
    #[strum(serialize = "leave")]
    Leave,
    #[strum(serialize = "say")]
    Say,
    #[strum(serialize = "move")]
    Move,
    #[strum(serialize = "room-empty", serialize = "roomempty")]
    RoomEmpty,
}

/// A validated inbound command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundCommand {
    /// The sender entered the scope.
    Join,
    /// The sender left the scope.
    Leave,
    /// Chat text to relay.
    Say {
        /// Message body.
        msg: String,
    },
    /// Intended placement at column `x`, row `y`.
    Move {
        /// Column, taken as given.
        x: i64,
        /// Row, taken as given.
        y: i64,
    },
    /// Every participant has left the scope.
    RoomEmpty,
}

impl InboundCommand {
    /// Wire name of this command.
    pub fn name(&self) -> &'static str {
        match self {
            InboundCommand::Join => InboundKind::Join.into(),
            InboundCommand::Leave => InboundKind::Leave.into(),
            InboundCommand::Say { .. } => InboundKind::Say.into(),
            InboundCommand::Move { .. } => InboundKind::Move.into(),
            InboundCommand::RoomEmpty => InboundKind::RoomEmpty.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "RoomId", default)]
    room_id: Option<String>,
    #[serde(rename = "SenderId", default)]
    sender_id: String,
    #[serde(rename = "Cmd")]
    cmd: String,
    #[serde(rename = "Data", default)]
    data: Option<Map<String, Value>>,
}

/// An event delivered by the runtime to one scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    /// Scope the event targets.
    pub scope: Scope,
    /// Client that caused the event.
    pub sender: ClientId,
    /// What happened.
    pub command: InboundCommand,
}

impl InboundEvent {
    /// Creates an event for the lobby.
    pub fn lobby(sender: impl Into<ClientId>, command: InboundCommand) -> Self {
        Self {
            scope: Scope::Lobby,
            sender: sender.into(),
            command,
        }
    }

    /// Creates an event for a room.
    pub fn room(
        room: impl Into<RoomName>,
        sender: impl Into<ClientId>,
        command: InboundCommand,
    ) -> Self {
        Self {
            scope: Scope::Room(room.into()),
            sender: sender.into(),
            command,
        }
    }

    /// Parses and validates one JSON event.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] for malformed JSON, an unknown `Cmd`, a
    /// missing sender, or a payload that does not fit the command.
    #[instrument(skip(text))]
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        let raw: RawEvent = serde_json::from_str(text)?;
        debug!(cmd = %raw.cmd, sender = %raw.sender_id, "Decoding inbound event");

        if raw.sender_id.is_empty() {
            return Err(ProtocolError::new("SenderId must exist"));
        }

        let kind = InboundKind::from_str(&raw.cmd).map_err(|_| {
            warn!(cmd = %raw.cmd, "Unknown command");
            ProtocolError::new(format!("unknown command {:?}", raw.cmd))
        })?;

        let data = raw.data.unwrap_or_default();
        let command = match kind {
            InboundKind::Join => InboundCommand::Join,
            InboundKind::Leave => InboundCommand::Leave,
            InboundKind::RoomEmpty => InboundCommand::RoomEmpty,
            InboundKind::Say => {
                let msg = field(&data, "Msg")
                    .and_then(Value::as_str)
                    .ok_or_else(|| ProtocolError::new("say requires a string Msg"))?;
                InboundCommand::Say {
                    msg: msg.to_string(),
                }
            }
            InboundKind::Move => InboundCommand::Move {
                x: coordinate(&data, "x")?,
                y: coordinate(&data, "y")?,
            },
        };

        let scope = match raw.room_id.filter(|id| !id.is_empty()) {
            Some(id) => Scope::Room(RoomName::new(id)),
            None => Scope::Lobby,
        };

        Ok(Self {
            scope,
            sender: ClientId::new(raw.sender_id),
            command,
        })
    }
}

/// Looks up a payload field, falling back to its lowercase spelling.
fn field<'a>(data: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    data.get(name).or_else(|| data.get(&name.to_lowercase()))
}

/// Reads a move coordinate given as an integer or a numeric string.
fn coordinate(data: &Map<String, Value>, name: &str) -> Result<i64, ProtocolError> {
    let value = field(data, name)
        .ok_or_else(|| ProtocolError::new(format!("move requires coordinate {}", name)))?;

    let parsed = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    parsed.ok_or_else(|| ProtocolError::new(format!("coordinate {} is not an integer: {}", name, value)))
}

/// Receiver of an outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum Recipient {
    /// One client.
    Client(ClientId),
    /// Every participant of the scope.
    Broadcast,
}

impl Recipient {
    /// Wire `ReceiverId`: empty for broadcasts.
    pub fn wire_id(&self) -> &str {
        match self {
            Recipient::Client(id) => id.as_str(),
            Recipient::Broadcast => "",
        }
    }
}

impl From<Recipient> for String {
    fn from(recipient: Recipient) -> Self {
        recipient.wire_id().to_string()
    }
}

/// Outbound command vocabulary, one payload shape per command.
///
/// Serializes as `{ "Cmd": <name>, "Data": { .. } }`. Commands without a
/// payload carry no `Data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, strum::IntoStaticStr)]
#[serde(tag = "Cmd", content = "Data", rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum OutboundCommand {
    /// Chat relay.
    #[serde(rename_all = "PascalCase")]
    Say {
        /// Sender of the chat line.
        from: ClientId,
        /// Chat text.
        msg: String,
    },
    /// Validation failure, human-readable.
    #[serde(rename_all = "PascalCase")]
    Error {
        /// Description of the failure.
        msg: String,
    },
    /// The receiver plays X.
    XUser,
    /// The receiver plays O.
    OUser,
    /// It is the receiver's move.
    #[serde(rename_all = "PascalCase")]
    Turn {
        /// Board snapshot.
        board: Board,
    },
    /// The game has a winner.
    #[serde(rename_all = "PascalCase")]
    Win {
        /// Winning mark.
        winner: Player,
    },
    /// The board filled up without a winner.
    #[serde(rename_all = "PascalCase")]
    Draw {
        /// Final board.
        board: Board,
    },
    /// The session was aborted by a leave.
    Endgame,
}

impl OutboundCommand {
    /// Wire name of this command.
    pub fn name(&self) -> &'static str {
        self.into()
    }
}

/// A message emitted by a handler: `{ "ReceiverId", "Cmd", "Data" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    /// Who receives it.
    #[serde(rename = "ReceiverId")]
    pub recipient: Recipient,
    /// What is sent.
    #[serde(flatten)]
    pub command: OutboundCommand,
}

impl OutboundMessage {
    /// Message for one client.
    pub fn to(client: ClientId, command: OutboundCommand) -> Self {
        Self {
            recipient: Recipient::Client(client),
            command,
        }
    }

    /// Message for the whole scope.
    pub fn broadcast(command: OutboundCommand) -> Self {
        Self {
            recipient: Recipient::Broadcast,
            command,
        }
    }
}
