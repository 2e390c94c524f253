use std::sync::Arc;

use nanoid::nanoid;
use tokio::{
    net::TcpStream,
    sync::{broadcast, mpsc},
};
use tokio_stream::StreamExt;
use wire::transport;

use crate::{joke::JokeProvider, room::RoomRegistry};

use self::chat_session::ChatSession;

mod chat_session;

/// Given a tcp stream, a room registry and a joke provider, handles the user session
/// until the client disconnects, a protocol error occurs, or the server shuts down
pub async fn handle_session(
    registry: RoomRegistry,
    jokes: Arc<dyn JokeProvider>,
    mut quit_rx: broadcast::Receiver<()>,
    stream: TcpStream,
) -> anyhow::Result<()> {
    let session_id = nanoid!();
    // Split the tcp stream into a stream of inbound lines and a line writer with better ergonomics
    let (mut lines, mut writer) = transport::server::split_tcp_stream(stream);

    // The first line of a connection is the handshake naming the room this session is for
    let room_name = match lines.next().await {
        Some(Ok(line)) if !line.trim().is_empty() => String::from(line.trim()),
        Some(Ok(_)) => return Err(anyhow::anyhow!("empty room name in the handshake")),
        Some(Err(e)) => return Err(e),
        // closed before the handshake, there is no session to clean up
        None => return Ok(()),
    };

    // Resolve the room before the user has a name. Membership is only
    // registered once the client sends a join message.
    let room = registry.get_or_create(&room_name).await;
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
    let mut session = ChatSession::new(&session_id, &room_name, room, outbound_tx, jokes);

    tracing::info!(session_id = %session_id, room = %room_name, "created chat session");

    let result = loop {
        tokio::select! {
            line = lines.next() => match line {
                // The client closed the connection, leave the room and announce the departure
                None => break Ok(()),
                Some(Ok(line)) => {
                    if let Err(e) = session.handle_message(&line).await {
                        // A protocol error is not recovered within the session,
                        // it closes the connection
                        tracing::warn!(session_id = %session_id, "protocol error: {:#}", e);
                        break Err(e);
                    }
                }
                Some(Err(e)) => break Err(e),
            },
            // Messages delivered to this session's send capability are written
            // to the underlying connection here, one line at a time
            Some(line) = outbound_rx.recv() => {
                if writer.write_line(&line).await.is_err() {
                    break Ok(());
                }
            }
            // If the server is shutting down, we can just close the tcp stream
            // and exit the session handler. Since the server is shutting down,
            // we don't need to announce the departure to the other members
            Ok(_) = quit_rx.recv() => {
                tracing::info!(session_id = %session_id, "gracefully shutting down user tcp stream");
                return Ok(());
            }
        }
    };

    session.handle_close().await?;

    result
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::net::TcpListener;
    use wire::{
        inbound::{ChatMessage, ClientMessage, JoinMessage},
        outbound::{ChatBroadcastMessage, NoteMessage, ServerMessage},
        transport::client::{self, ClientMessageWriter, ServerMessageStream},
    };

    use super::*;

    struct NoJokes;

    #[async_trait]
    impl JokeProvider for NoJokes {
        async fn fetch(&self) -> anyhow::Result<String> {
            Err(anyhow::anyhow!("no jokes in this test"))
        }
    }

    /// Binds a server on an ephemeral port and spawns a session handler per
    /// accepted connection, the way main does.
    async fn spawn_test_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("could not bind to an ephemeral port");
        let addr = listener.local_addr().unwrap().to_string();

        tokio::spawn(async move {
            let registry = RoomRegistry::new();
            let jokes: Arc<dyn JokeProvider> = Arc::new(NoJokes);
            let (_quit_tx, quit_rx) = broadcast::channel::<()>(1);

            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(handle_session(
                    registry.clone(),
                    jokes.clone(),
                    quit_rx.resubscribe(),
                    socket,
                ));
            }
        });

        addr
    }

    async fn connect(addr: &str, room: &str) -> (ServerMessageStream, ClientMessageWriter) {
        let stream = TcpStream::connect(addr)
            .await
            .expect("could not connect to the test server");
        let (message_stream, mut message_writer) = client::split_tcp_stream(stream);

        message_writer
            .write_line(room)
            .await
            .expect("could not send the room handshake");

        (message_stream, message_writer)
    }

    async fn next_message(stream: &mut ServerMessageStream) -> ServerMessage {
        tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("timed out waiting for a server message")
            .expect("server closed the connection")
            .expect("could not read a server message")
    }

    #[tokio::test]
    async fn test_join_chat_and_leave_scenario() {
        let addr = spawn_test_server().await;

        // alice joins the lobby and hears her own join note
        let (mut alice_stream, mut alice_writer) = connect(&addr, "lobby").await;
        alice_writer
            .write(&ClientMessage::Join(JoinMessage {
                name: "alice".into(),
            }))
            .await
            .unwrap();
        assert_eq!(
            next_message(&mut alice_stream).await,
            ServerMessage::Note(NoteMessage {
                text: "alice joined \"lobby\".".into(),
            })
        );

        // bob joins, both members hear the note
        let (mut bob_stream, mut bob_writer) = connect(&addr, "lobby").await;
        bob_writer
            .write(&ClientMessage::Join(JoinMessage { name: "bob".into() }))
            .await
            .unwrap();
        let bob_joined = ServerMessage::Note(NoteMessage {
            text: "bob joined \"lobby\".".into(),
        });
        assert_eq!(next_message(&mut alice_stream).await, bob_joined);
        assert_eq!(next_message(&mut bob_stream).await, bob_joined);

        // alice chats, both members receive the attributed line
        alice_writer
            .write(&ClientMessage::Chat(ChatMessage {
                text: "hello".into(),
            }))
            .await
            .unwrap();
        let alice_chat = ServerMessage::Chat(ChatBroadcastMessage {
            name: "alice".into(),
            text: "hello".into(),
        });
        assert_eq!(next_message(&mut alice_stream).await, alice_chat);
        assert_eq!(next_message(&mut bob_stream).await, alice_chat);

        // bob disconnects, alice hears the departure note
        drop(bob_writer);
        drop(bob_stream);
        assert_eq!(
            next_message(&mut alice_stream).await,
            ServerMessage::Note(NoteMessage {
                text: "bob left lobby.".into(),
            })
        );

        // a member list query now only names alice, and only alice hears it
        alice_writer
            .write(&ClientMessage::Chat(ChatMessage {
                text: "/members".into(),
            }))
            .await
            .unwrap();
        assert_eq!(
            next_message(&mut alice_stream).await,
            ServerMessage::Chat(ChatBroadcastMessage {
                name: "alice".into(),
                text: "In room: alice".into(),
            })
        );
    }

    #[tokio::test]
    async fn test_sessions_in_different_rooms_do_not_hear_each_other() {
        let addr = spawn_test_server().await;

        let (mut alice_stream, mut alice_writer) = connect(&addr, "lobby").await;
        alice_writer
            .write(&ClientMessage::Join(JoinMessage {
                name: "alice".into(),
            }))
            .await
            .unwrap();
        next_message(&mut alice_stream).await;

        let (mut carol_stream, mut carol_writer) = connect(&addr, "games").await;
        carol_writer
            .write(&ClientMessage::Join(JoinMessage {
                name: "carol".into(),
            }))
            .await
            .unwrap();
        // carol only hears her own join note for "games", nothing about the lobby
        assert_eq!(
            next_message(&mut carol_stream).await,
            ServerMessage::Note(NoteMessage {
                text: "carol joined \"games\".".into(),
            })
        );

        alice_writer
            .write(&ClientMessage::Chat(ChatMessage {
                text: "lobby only".into(),
            }))
            .await
            .unwrap();
        assert_eq!(
            next_message(&mut alice_stream).await,
            ServerMessage::Chat(ChatBroadcastMessage {
                name: "alice".into(),
                text: "lobby only".into(),
            })
        );

        // carol's next message is her own members query reply, proving the
        // lobby chat never reached her
        carol_writer
            .write(&ClientMessage::Chat(ChatMessage {
                text: "/members".into(),
            }))
            .await
            .unwrap();
        assert_eq!(
            next_message(&mut carol_stream).await,
            ServerMessage::Chat(ChatBroadcastMessage {
                name: "carol".into(),
                text: "In room: carol".into(),
            })
        );
    }

    #[tokio::test]
    async fn test_bad_message_type_closes_the_connection() {
        let addr = spawn_test_server().await;

        let (mut alice_stream, mut alice_writer) = connect(&addr, "lobby").await;
        alice_writer
            .write(&ClientMessage::Join(JoinMessage {
                name: "alice".into(),
            }))
            .await
            .unwrap();
        next_message(&mut alice_stream).await;

        alice_writer.write_line(r#"{"type":"ping"}"#).await.unwrap();

        // the server treats the unrecognized type as a protocol error and
        // closes the connection instead of ignoring the message
        let closed = tokio::time::timeout(Duration::from_secs(5), alice_stream.next())
            .await
            .expect("timed out waiting for the connection to close");
        assert!(closed.is_none());
    }
}
