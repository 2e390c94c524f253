use serde::{Deserialize, Serialize};

/// A system announcement, e.g. a member joining or leaving the room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteMessage {
    /// The announcement text
    pub text: String,
}

/// A chat line attributed to a named sender
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatBroadcastMessage {
    /// The display name of the sender
    pub name: String,
    /// The content of the chat line
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
/// Messages the server delivers to clients.
/// A message may be broadcast to a whole room or sent to a single connection,
/// the receipient is always a single client connection.
pub enum ServerMessage {
    Note(NoteMessage),
    Chat(ChatBroadcastMessage),
}
