//! Line sinks
//!
//! A `LineSink` writes one newline-terminated line to a transport
//! endpoint. The TCP implementation backs live sessions; `MemorySink`
//! captures lines for assertions in tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;

use crate::error::AppError;

/// Write side of a session transport
#[async_trait]
pub trait LineSink: Send {
    /// Write one line (terminator appended by the sink)
    async fn send_line(&mut self, line: &str) -> Result<(), AppError>;
}

/// Sink over the write half of a TCP stream
pub struct TcpLineSink {
    writer: OwnedWriteHalf,
}

impl TcpLineSink {
    pub fn new(writer: OwnedWriteHalf) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl LineSink for TcpLineSink {
    async fn send_line(&mut self, line: &str) -> Result<(), AppError> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\r\n").await?;
        self.writer.flush().await?;
        Ok(())
    }
}

/// In-memory sink that records every line sent through it
///
/// The returned `SinkLog` handle stays valid after the sink itself has
/// been moved into a session.
#[derive(Default)]
pub struct MemorySink {
    lines: SinkLog,
}

/// Shared view of the lines captured by a [`MemorySink`]
pub type SinkLog = Arc<Mutex<Vec<String>>>;

impl MemorySink {
    pub fn new() -> (Self, SinkLog) {
        let sink = Self::default();
        let log = sink.lines.clone();
        (sink, log)
    }
}

#[async_trait]
impl LineSink for MemorySink {
    async fn send_line(&mut self, line: &str) -> Result<(), AppError> {
        self.lines
            .lock()
            .expect("sink log poisoned")
            .push(line.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::{TcpListener, TcpStream};

    #[tokio::test]
    async fn test_memory_sink_records_lines() {
        let (mut sink, log) = MemorySink::new();

        sink.send_line("hello").await.unwrap();
        sink.send_line("world").await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["hello", "world"]);
    }

    #[tokio::test]
    async fn test_tcp_sink_terminates_lines() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client = TcpStream::connect(addr).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();

        let (_, writer) = client.into_split();
        let mut sink = TcpLineSink::new(writer);
        sink.send_line("nick mybot").await.unwrap();

        let mut line = String::new();
        let mut reader = BufReader::new(server);
        reader.read_line(&mut line).await.unwrap();
        assert_eq!(line, "nick mybot\r\n");
    }
}
