use std::{collections::HashMap, sync::Arc};

use tokio::sync::Mutex;

use super::room::Room;

#[derive(Debug, Clone, Default)]
/// [RoomRegistry] is the process-wide mapping from room name to [Room].
///
/// A room is created lazily the first time its name is referenced and lives
/// for the rest of the process, even when it has no members left. The lock
/// covers the whole check-then-insert path, so concurrent lookups for the
/// same name always resolve to a single [Room] instance.
pub struct RoomRegistry {
    rooms: Arc<Mutex<HashMap<String, Arc<Mutex<Room>>>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        RoomRegistry {
            rooms: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Get the room with the given name, creating an empty one if this is
    /// the first reference to it.
    pub async fn get_or_create(&self, name: &str) -> Arc<Mutex<Room>> {
        let mut rooms = self.rooms.lock().await;

        rooms
            .entry(String::from(name))
            .or_insert_with(|| Arc::new(Mutex::new(Room::new(name))))
            .clone()
    }
}
