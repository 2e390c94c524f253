use tokio::net::{TcpListener, TcpStream};
use tokio_stream::StreamExt;
use wire::{
    inbound::{self, ClientMessage},
    outbound::{self, ServerMessage},
    transport,
};

const PORT: usize = 8081;

async fn server_example() -> anyhow::Result<()> {
    // bind to the example port to wait for client connection
    let listener = TcpListener::bind(format!("0.0.0.0:{}", PORT))
        .await
        .expect("could not bind to the port");

    // accept the only client connection we will have
    let tcp_stream = match listener.accept().await {
        Ok((tcp_stream, _addr)) => tcp_stream,
        Err(e) => return Err(anyhow::anyhow!("failed to accept client: {}", e)),
    };

    // break the client connection into higher level API for ease of use
    let (mut line_stream, mut line_writer) = transport::server::split_tcp_stream(tcp_stream);

    // the first line of a connection names the room
    let room = match line_stream.next().await {
        Some(Ok(line)) => line,
        _ => return Err(anyhow::anyhow!("client closed before the handshake")),
    };
    println!("SERVER: client wants room: {}", room);

    // greet the client with a note, pre-serialized like a room broadcast would be
    let note = serde_json::to_string(&ServerMessage::Note(outbound::NoteMessage {
        text: format!("welcome to {}", room),
    }))?;
    line_writer.write_line(&note).await?;

    // listen for message lines from the client until the connection is closed
    while let Some(result) = line_stream.next().await {
        match result {
            // client has sent a line, parse it the way the chat session would
            Ok(line) => match serde_json::from_str::<ClientMessage>(&line) {
                Ok(message) => println!("SERVER: received message: {:?}", message),
                Err(e) => println!("SERVER: bad message: {}", e),
            },
            // could be a bug in the client, malicious client, breaking api changes etc.
            Err(e) => println!("SERVER: failed to read line: {}", e),
        }
    }

    Ok(())
}

async fn client_example() -> anyhow::Result<()> {
    // create a client connection to the server
    let tcp_stream = match TcpStream::connect(format!("localhost:{}", PORT)).await {
        Ok(tcp_stream) => tcp_stream,
        Err(e) => return Err(anyhow::anyhow!("failed to connect to server: {}", e)),
    };

    // break the server connection into higher level API for ease of use
    let (mut message_stream, mut message_writer) = transport::client::split_tcp_stream(tcp_stream);

    // name the room, join, and send a single chat line
    message_writer.write_line("lobby").await?;
    message_writer
        .write(&ClientMessage::Join(inbound::JoinMessage {
            name: "alice".into(),
        }))
        .await?;
    message_writer
        .write(&ClientMessage::Chat(inbound::ChatMessage {
            text: "hello".into(),
        }))
        .await?;

    // read the greeting note from the server
    if let Some(Ok(message)) = message_stream.next().await {
        println!("CLIENT: received message: {:?}", message);
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let (server_result, client_result) = tokio::join!(server_example(), client_example());

    server_result.expect("server example failed");
    client_result.expect("client example failed");
}
