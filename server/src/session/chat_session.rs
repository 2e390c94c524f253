use std::sync::Arc;

use anyhow::Context;
use tokio::sync::{mpsc, Mutex};
use wire::{
    inbound::ClientMessage,
    outbound::{ChatBroadcastMessage, NoteMessage, ServerMessage},
};

use crate::{joke::JokeProvider, room::Room};

/// Chat line a member sends to ask for a joke instead of chatting.
const JOKE_COMMAND: &str = "/joke";
/// Chat line a member sends to ask who is currently in the room.
const MEMBERS_COMMAND: &str = "/members";
/// What the requester hears when the joke service lets us down.
const JOKE_UNAVAILABLE_TEXT: &str = "sorry, the joke service is unavailable right now.";

/// [ChatSession] holds the server-side state of one client connection and
/// translates its inbound messages into room operations.
///
/// A session starts unjoined: it already references its room but has no
/// display name and is not a room member yet. A join message names it and
/// registers it; closing the connection removes it again.
pub(super) struct ChatSession {
    session_id: String,
    display_name: Option<String>,
    room_name: String,
    room: Arc<Mutex<Room>>,
    outbound_tx: mpsc::UnboundedSender<String>,
    jokes: Arc<dyn JokeProvider>,
}

impl ChatSession {
    pub fn new(
        session_id: &str,
        room_name: &str,
        room: Arc<Mutex<Room>>,
        outbound_tx: mpsc::UnboundedSender<String>,
        jokes: Arc<dyn JokeProvider>,
    ) -> Self {
        ChatSession {
            session_id: String::from(session_id),
            display_name: None,
            room_name: String::from(room_name),
            room,
            outbound_tx,
            jokes,
        }
    }

    /// Parse and dispatch one raw inbound line.
    ///
    /// Every error returned here is a protocol error: malformed JSON, an
    /// unrecognized message type, or a message that is invalid in the
    /// session's current state. The caller decides the connection's fate.
    pub async fn handle_message(&mut self, raw: &str) -> anyhow::Result<()> {
        let message =
            serde_json::from_str::<ClientMessage>(raw).context("bad message from client")?;

        match message {
            ClientMessage::Join(join) => self.handle_join(join.name).await,
            ClientMessage::Chat(chat) => match chat.text.as_str() {
                JOKE_COMMAND => self.handle_joke().await,
                MEMBERS_COMMAND => self.handle_members().await,
                _ => self.handle_chat(chat.text).await,
            },
        }
    }

    /// Handle joining: remember the name, register with the room and
    /// announce the arrival to the whole room, the newcomer included.
    async fn handle_join(&mut self, name: String) -> anyhow::Result<()> {
        if self.display_name.is_some() {
            return Err(anyhow::anyhow!("already joined the room"));
        }

        self.display_name = Some(name.clone());

        let mut room = self.room.lock().await;
        room.join(&self.session_id, &name, self.outbound_tx.clone());
        room.broadcast(&ServerMessage::Note(NoteMessage {
            text: format!("{} joined \"{}\".", name, self.room_name),
        }))?;

        Ok(())
    }

    /// Handle a chat line: broadcast it to the room, attributed to this
    /// session's display name.
    async fn handle_chat(&mut self, text: String) -> anyhow::Result<()> {
        let name = self.joined_name()?.to_string();

        let room = self.room.lock().await;
        room.broadcast(&ServerMessage::Chat(ChatBroadcastMessage { name, text }))?;

        Ok(())
    }

    /// Handle a joke request: fetch one from the joke provider and reply to
    /// the requester only, never the room.
    ///
    /// A failed fetch is recoverable. The requester gets an apology line and
    /// the session keeps going.
    async fn handle_joke(&mut self) -> anyhow::Result<()> {
        let name = self.joined_name()?.to_string();

        let text = match self.jokes.fetch().await {
            Ok(joke) => joke,
            Err(e) => {
                tracing::warn!(session_id = %self.session_id, "joke fetch failed: {:#}", e);
                String::from(JOKE_UNAVAILABLE_TEXT)
            }
        };

        self.send(&ServerMessage::Chat(ChatBroadcastMessage { name, text }));

        Ok(())
    }

    /// Handle a member list request: reply to the requester only with a
    /// snapshot of who is in the room right now.
    async fn handle_members(&mut self) -> anyhow::Result<()> {
        let name = self.joined_name()?.to_string();

        let member_names = {
            let room = self.room.lock().await;
            room.member_names()
        };

        self.send(&ServerMessage::Chat(ChatBroadcastMessage {
            name,
            text: format!("In room: {}", member_names.join(", ")),
        }));

        Ok(())
    }

    /// The connection was closed: leave the room and announce the departure
    /// to the remaining members.
    ///
    /// A session that closes before ever joining still announces, with its
    /// unset name rendered as "null". That mirrors the observed behaviour of
    /// the protocol and is kept as a documented quirk rather than fixed.
    pub async fn handle_close(&mut self) -> anyhow::Result<()> {
        let name = self.display_name.as_deref().unwrap_or("null").to_string();

        let mut room = self.room.lock().await;
        room.leave(&self.session_id);
        room.broadcast(&ServerMessage::Note(NoteMessage {
            text: format!("{} left {}.", name, self.room_name),
        }))?;

        Ok(())
    }

    /// Deliver one message to this session's own connection, fire and
    /// forget. A failure of the underlying send capability is discarded and
    /// never surfaces to the caller.
    fn send(&self, message: &ServerMessage) {
        if let Ok(line) = serde_json::to_string(message) {
            let _ = self.outbound_tx.send(line);
        }
    }

    fn joined_name(&self) -> anyhow::Result<&str> {
        self.display_name
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("chat message received before joining"))
    }
}
