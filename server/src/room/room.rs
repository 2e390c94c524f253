use std::collections::HashMap;

use tokio::sync::mpsc;
use wire::outbound::ServerMessage;

#[derive(Debug)]
/// A member of a [Room]: the display name a session joined under and the
/// send capability used to deliver message lines to that session.
struct Member {
    name: String,
    sender: mpsc::UnboundedSender<String>,
}

#[derive(Debug)]
/// [Room] is a named broadcast group holding the currently connected members.
///
/// Membership is keyed by session id, not display name, so two sessions may
/// share a display name. The room never broadcasts on its own; announcing a
/// join or a departure is the session's decision.
pub struct Room {
    name: String,
    members: HashMap<String, Member>,
}

impl Room {
    pub fn new(name: &str) -> Self {
        Room {
            name: String::from(name),
            members: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a member to the room.
    ///
    /// Joining twice with the same session id replaces the previous entry,
    /// keeping the member set duplicate-free.
    pub fn join(&mut self, session_id: &str, name: &str, sender: mpsc::UnboundedSender<String>) {
        self.members.insert(
            String::from(session_id),
            Member {
                name: String::from(name),
                sender,
            },
        );
    }

    /// Remove a member from the room. Removing a session that is not a
    /// member is a no-op.
    pub fn leave(&mut self, session_id: &str) {
        self.members.remove(session_id);
    }

    /// Deliver a message to every current member, the sender included if it
    /// is a member itself.
    ///
    /// The message is serialized once and each delivery is attempted
    /// independently. A member whose send capability fails is skipped without
    /// being removed and without stopping delivery to the remaining members.
    pub fn broadcast(&self, message: &ServerMessage) -> anyhow::Result<()> {
        let line = serde_json::to_string(message)?;

        for member in self.members.values() {
            let _ = member.sender.send(line.clone());
        }

        Ok(())
    }

    /// Snapshot of the display names of the current members, in map
    /// iteration order.
    pub fn member_names(&self) -> Vec<String> {
        self.members
            .values()
            .map(|member| member.name.clone())
            .collect()
    }
}
