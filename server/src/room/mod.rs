pub use self::registry::RoomRegistry;
pub use self::room::Room;

mod registry;
#[allow(clippy::module_inception)]
mod room;
