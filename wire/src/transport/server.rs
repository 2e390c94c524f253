use anyhow::Context;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{tcp::OwnedWriteHalf, TcpStream},
};
use tokio_stream::{wrappers::LinesStream, StreamExt};

use super::common::{BoxedStream, NEW_LINE};

/// [LineStream] is a stream of raw lines sent by the client.
///
/// Lines stay unparsed on purpose. The first line of a connection is the room
/// name handshake rather than JSON, and for everything after that a parse
/// failure is a protocol error the session layer wants to handle itself.
///
/// # Cancel Safety
///
/// This stream is cancel-safe, meaning that it can be used in [tokio::select!]
/// without the risk of missing lines.
pub type LineStream = BoxedStream<anyhow::Result<String>>;

/// [LineWriter] is a wrapper around a [TcpStream] which writes pre-serialized
/// message lines to the client
pub struct LineWriter {
    writer: OwnedWriteHalf,
}

impl LineWriter {
    pub fn new(writer: OwnedWriteHalf) -> Self {
        Self { writer }
    }

    /// Send one already-serialized message line to the backing [TcpStream]
    ///
    /// # Cancel Safety
    ///
    /// This method is not cancellation safe. If it is used as the event
    /// in a [tokio::select!] statement and some other
    /// branch completes first, then the provided line may have been
    /// partially written, but future calls to `write_line` will start over
    /// from the beginning of the buffer. Causing undefined behaviour.
    pub async fn write_line(&mut self, line: &str) -> anyhow::Result<()> {
        let mut serialized_bytes = Vec::from(line.as_bytes());
        serialized_bytes.extend_from_slice(NEW_LINE);

        self.writer.write_all(serialized_bytes.as_slice()).await?;

        Ok(())
    }
}

/// Splits a TCP stream into a stream of raw inbound lines and a line writer.
///
/// # Arguments
///
/// - `stream` - A [TcpStream] to split
pub fn split_tcp_stream(stream: TcpStream) -> (LineStream, LineWriter) {
    let (reader, writer) = stream.into_split();

    (
        Box::pin(
            LinesStream::new(BufReader::new(reader).lines())
                .map(|line| line.context("could not read line from the client")),
        ),
        LineWriter::new(writer),
    )
}
