use serde::{Deserialize, Serialize};

/// Client message for joining the room under a display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinMessage {
    // The display name to use in the room.
    pub name: String,
}

/// Client message carrying one line of chat text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    // The content of the chat line.
    pub text: String,
}

/// A message which can be sent to the server by a single client connection.
/// All messages are processed in the context of the room the connection named
/// in its handshake line.
///
/// An unrecognized `type` tag fails deserialization, naming the offending
/// type. The server treats that as a protocol error rather than ignoring it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Join(JoinMessage),
    Chat(ChatMessage),
}
