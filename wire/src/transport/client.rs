use anyhow::Context;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{tcp::OwnedWriteHalf, TcpStream},
};
use tokio_stream::{wrappers::LinesStream, StreamExt};

use crate::{inbound, outbound};

use super::common::{BoxedStream, NEW_LINE};

/// [ServerMessageStream] is a stream of [crate::outbound::ServerMessage]s sent by the server
///
/// # Cancel Safety
///
/// This stream is cancel-safe, meaning that it can be used in [tokio::select]
/// without the risk of missing messages.
pub type ServerMessageStream = BoxedStream<anyhow::Result<outbound::ServerMessage>>;

/// [ClientMessageWriter] is a wrapper around a [TcpStream] which writes
/// [crate::inbound::ClientMessage]s to the server
pub struct ClientMessageWriter {
    writer: OwnedWriteHalf,
}

impl ClientMessageWriter {
    pub fn new(writer: OwnedWriteHalf) -> Self {
        Self { writer }
    }

    /// Send a [crate::inbound::ClientMessage] to the backing [TcpStream]
    ///
    /// # Cancel Safety
    ///
    /// This method is not cancellation safe. If it is used as the event
    /// in a [tokio::select!] statement and some other
    /// branch completes first, then the provided message may have been
    /// partially written, but future calls to `write` will start over
    /// from the beginning of the buffer. Causing undefined behaviour.
    pub async fn write(&mut self, message: &inbound::ClientMessage) -> anyhow::Result<()> {
        let serialized = serde_json::to_string(message)?;

        self.write_line(&serialized).await
    }

    /// Send one raw line to the server. Used for the connection handshake,
    /// where the first line of a connection names the room and is not JSON.
    pub async fn write_line(&mut self, line: &str) -> anyhow::Result<()> {
        let mut serialized_bytes = Vec::from(line.as_bytes());
        serialized_bytes.extend_from_slice(NEW_LINE);

        self.writer.write_all(serialized_bytes.as_slice()).await?;

        Ok(())
    }
}

/// Splits a TCP stream into a stream of server messages and a client message writer.
///
/// # Arguments
///
/// - `stream` - A [TcpStream] to split
pub fn split_tcp_stream(stream: TcpStream) -> (ServerMessageStream, ClientMessageWriter) {
    let (reader, writer) = stream.into_split();

    (
        Box::pin(
            LinesStream::new(BufReader::new(reader).lines()).map(|line| {
                line.context("could not read line from the server")
                    .and_then(|line| {
                        serde_json::from_str::<outbound::ServerMessage>(&line)
                            .context("failed to deserialize message from the server")
                    })
            }),
        ),
        ClientMessageWriter::new(writer),
    )
}
