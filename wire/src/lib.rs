/// Set of messages which the server can receive and dispatch on
pub mod inbound;
/// Set of messages the server sends to clients, either as a direct reply or a room broadcast
pub mod outbound;
/// Implementation of message transportation over TCP Streams.
/// Requires 'server' or 'client' features to be enabled and will bring in tokio dependency alongside with other dependencies
pub mod transport;
