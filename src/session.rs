//! Session struct definition
//!
//! Represents one tracked transport connection: identity metadata, the
//! role tag that selects its dispatch path, the write side of the
//! transport, and the reader task feeding the event loop.

use tokio::task::JoinHandle;

use crate::error::AppError;
use crate::sink::LineSink;

/// Placeholder used for identity fields that do not apply to a role
pub const NOT_APPLICABLE: &str = "N/A";

/// Role of a session, selecting how readiness events are dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Listening socket: readable means a control client is waiting
    AcceptControl,
    /// Accepted control connection: lines are control commands
    ControlCommand,
    /// Outbound IRC connection: lines are protocol messages
    ProtocolMessage,
}

/// One live transport connection
///
/// Owns its transport exclusively: the write half lives in `sink`, the
/// read half inside the reader task. Both are released exactly once,
/// on [`Session::close`] (or drop).
pub struct Session {
    /// Nick of an IRC session, generated name of a control client
    pub display_name: String,
    /// Remote host, `"N/A"` for accepted connections
    pub remote_host: String,
    /// Identity allowed to issue privileged commands, `"N/A"` if none
    pub controller: String,
    /// Dispatch role
    pub behavior: Behavior,
    sink: Option<Box<dyn LineSink>>,
    reader: Option<JoinHandle<()>>,
}

impl Session {
    pub fn new(
        behavior: Behavior,
        display_name: impl Into<String>,
        remote_host: impl Into<String>,
        controller: impl Into<String>,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            remote_host: remote_host.into(),
            controller: controller.into(),
            behavior,
            sink: None,
            reader: None,
        }
    }

    /// Attach the write side of the transport
    pub fn with_sink(mut self, sink: Box<dyn LineSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Attach the reader (or acceptor) task driving this session
    ///
    /// Attached after registration because the task needs the handle the
    /// registry issues.
    pub fn attach_reader(&mut self, reader: JoinHandle<()>) {
        self.reader = Some(reader);
    }

    /// Write one line to this session's transport
    ///
    /// Sessions without a sink (the listener) reject writes.
    pub async fn send_line(&mut self, line: &str) -> Result<(), AppError> {
        match self.sink.as_mut() {
            Some(sink) => sink.send_line(line).await,
            None => Err(AppError::Io(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "session has no line sink",
            ))),
        }
    }

    /// Release the transport: abort the reader task and drop the sink
    pub fn close(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        self.sink = None;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("display_name", &self.display_name)
            .field("remote_host", &self.remote_host)
            .field("controller", &self.controller)
            .field("behavior", &self.behavior)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::sink::MemorySink;

    #[tokio::test]
    async fn test_send_line_through_sink() {
        let (sink, log) = MemorySink::new();
        let mut session = Session::new(Behavior::ControlCommand, "console-00", NOT_APPLICABLE, NOT_APPLICABLE)
            .with_sink(Box::new(sink));

        session.send_line("< hello").await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["< hello"]);
    }

    #[tokio::test]
    async fn test_send_line_without_sink_fails() {
        let mut session =
            Session::new(Behavior::AcceptControl, "console", "localhost", NOT_APPLICABLE);
        assert!(session.send_line("x").await.is_err());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (sink, _log) = MemorySink::new();
        let mut session = Session::new(Behavior::ProtocolMessage, "mybot", "irc.example.org", "admin")
            .with_sink(Box::new(sink));

        session.close();
        session.close();

        assert!(session.send_line("x").await.is_err());
    }
}
