//! Bot actor implementation
//!
//! The central actor that exclusively owns the session registry and
//! processes all readiness events from a single mpsc channel. Each
//! transport gets a small reader task that forwards whole lines (or a
//! hangup notice) into that channel; every registry mutation, including
//! those triggered from inside command handlers, happens here.

use std::net::SocketAddr;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info, warn};

use crate::config::BotConfig;
use crate::error::AppError;
use crate::handlers::{self, Tables};
use crate::proto;
use crate::registry::Registry;
use crate::session::{Behavior, Session, NOT_APPLICABLE};
use crate::sink::TcpLineSink;
use crate::types::SessionId;

/// Channel buffer size for readiness events
const EVENT_BUFFER_SIZE: usize = 256;

/// Readiness events delivered to the bot actor
#[derive(Debug)]
pub enum BotEvent {
    /// The listener session has a pending control connection
    Accepted {
        id: SessionId,
        stream: TcpStream,
        peer: SocketAddr,
    },
    /// A session's transport produced one complete line
    Line { id: SessionId, line: String },
    /// A session's peer closed the transport (EOF or read error)
    Hangup { id: SessionId },
}

/// The bot actor: session registry plus event loop
pub struct Bot {
    config: BotConfig,
    registry: Registry,
    tx: mpsc::Sender<BotEvent>,
    rx: mpsc::Receiver<BotEvent>,
}

impl Bot {
    pub fn new(config: BotConfig) -> Self {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER_SIZE);
        let registry = Registry::new(config.capacity);
        Self {
            config,
            registry,
            tx,
            rx,
        }
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// Number of registered sessions
    pub fn session_count(&self) -> usize {
        self.registry.len()
    }

    /// Registered sessions in ascending slot order
    pub fn sessions(&self) -> impl Iterator<Item = (SessionId, &Session)> {
        self.registry.iter()
    }

    pub fn session(&self, id: SessionId) -> Option<&Session> {
        self.registry.get(id)
    }

    /// Run the event loop
    ///
    /// Waits on the event channel with a bounded tick so an idle
    /// iteration is a no-op rather than an unbounded block. Sessions
    /// registered from inside a handler become visible through events
    /// on later iterations, never retroactively within the current one.
    pub async fn run(mut self, tables: &Tables) {
        info!("bot event loop started");

        loop {
            match time::timeout(self.config.tick, self.rx.recv()).await {
                // Idle tick, nothing ready
                Err(_) => continue,
                Ok(None) => break,
                Ok(Some(event)) => self.handle_event(tables, event).await,
            }
        }

        info!("bot event loop stopped");
    }

    /// Process a single readiness event
    async fn handle_event(&mut self, tables: &Tables, event: BotEvent) {
        match event {
            BotEvent::Accepted { id, stream, peer } => {
                self.handle_accepted(id, stream, peer);
            }
            BotEvent::Line { id, line } => {
                self.handle_line(tables, id, &line).await;
            }
            BotEvent::Hangup { id } => {
                if self.teardown(id) {
                    info!("session {} hung up", id);
                }
            }
        }
    }

    fn handle_accepted(&mut self, id: SessionId, stream: TcpStream, peer: SocketAddr) {
        match self.registry.get(id) {
            Some(listener) if listener.behavior == Behavior::AcceptControl => {}
            _ => {
                debug!("dropping accepted connection for stale listener {}", id);
                return;
            }
        }

        // Rejection closes the new connection but never the listener
        match self.register_control(stream) {
            Ok(control_id) => {
                info!("control client {} connected from {}", control_id, peer);
            }
            Err(e) => warn!("control connection from {} rejected: {}", peer, e),
        }
    }

    async fn handle_line(&mut self, tables: &Tables, id: SessionId, line: &str) {
        let behavior = match self.registry.get(id) {
            Some(session) => session.behavior,
            None => {
                debug!("dropping line for closed session {}", id);
                return;
            }
        };

        let result = match behavior {
            Behavior::AcceptControl => {
                warn!("listener session {} produced a line, ignoring", id);
                Ok(())
            }
            Behavior::ControlCommand => handlers::control_line(self, tables, id, line).await,
            Behavior::ProtocolMessage => handlers::irc_line(self, tables, id, line).await,
        };

        // A transport failure takes down only the affected session
        if let Err(e) = result {
            warn!("session {} failed: {}", id, e);
            self.teardown(id);
        }
    }

    /// Register the control listener as a session
    ///
    /// Its acceptor task forwards pending connections as `Accepted`
    /// events; accept failures are reported and the listener survives.
    pub fn register_listener(&mut self, listener: TcpListener) -> Result<SessionId, AppError> {
        let session = Session::new(
            Behavior::AcceptControl,
            "console",
            "localhost",
            NOT_APPLICABLE,
        );
        let id = self.registry.acquire(session)?;

        let tx = self.tx.clone();
        let acceptor = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => {
                        if tx.send(BotEvent::Accepted { id, stream, peer }).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => warn!("accept failed: {}", e),
                }
            }
        });

        if let Some(session) = self.registry.get_mut(id) {
            session.attach_reader(acceptor);
        }

        info!("control listener registered as session {}", id);
        Ok(id)
    }

    /// Register an accepted control connection
    fn register_control(&mut self, stream: TcpStream) -> Result<SessionId, AppError> {
        let (read_half, write_half) = stream.into_split();

        let session = Session::new(
            Behavior::ControlCommand,
            "console",
            NOT_APPLICABLE,
            NOT_APPLICABLE,
        )
        .with_sink(Box::new(TcpLineSink::new(write_half)));

        let id = self.registry.acquire(session)?;
        let reader = self.spawn_reader(id, read_half);

        if let Some(session) = self.registry.get_mut(id) {
            session.display_name = format!("console-{:02}", id.slot());
            session.attach_reader(reader);
        }

        Ok(id)
    }

    /// Session factory: establish and announce a new outbound IRC session
    ///
    /// Connects to `host` on the configured IRC port, registers the
    /// session, performs the registration handshake, then notifies the
    /// controller and greets the channel. No retry on failure; the
    /// caller turns the error into a user-visible reply.
    pub async fn connect_session(
        &mut self,
        host: &str,
        nick: &str,
        channel: &str,
        controller: &str,
    ) -> Result<SessionId, AppError> {
        // Refuse before connecting rather than after
        if self.registry.is_full() {
            return Err(AppError::RegistryFull);
        }

        info!("connecting to '{}':{}", host, self.config.irc_port);
        let stream = TcpStream::connect((host, self.config.irc_port))
            .await
            .map_err(|e| {
                warn!("cannot connect to '{}': {}", host, e);
                AppError::Connection {
                    host: host.to_string(),
                }
            })?;

        let (read_half, write_half) = stream.into_split();
        let session = Session::new(Behavior::ProtocolMessage, nick, host, controller)
            .with_sink(Box::new(TcpLineSink::new(write_half)));

        let id = self.registry.acquire(session)?;
        let reader = self.spawn_reader(id, read_half);
        if let Some(session) = self.registry.get_mut(id) {
            session.attach_reader(reader);
        }

        if let Err(e) = self.handshake(id, nick, channel, controller).await {
            warn!("handshake with '{}' failed: {}", host, e);
            self.teardown(id);
            return Err(AppError::Connection {
                host: host.to_string(),
            });
        }

        info!("bot instance '{}@{}' running as session {}", nick, host, id);
        Ok(id)
    }

    async fn handshake(
        &mut self,
        id: SessionId,
        nick: &str,
        channel: &str,
        controller: &str,
    ) -> Result<(), AppError> {
        let key = self.config.key.clone();
        let description = self.config.description.clone();

        self.send_to(id, &proto::user(nick, &description)).await?;
        self.send_to(id, &proto::nick(nick)).await?;
        self.send_to(id, &proto::join(channel)).await?;
        self.send_to(id, &proto::privmsg(controller, &format!("My key is {key}")))
            .await?;
        self.send_to(
            id,
            &proto::privmsg(&format!("#{channel}"), "Hello Everyone!"),
        )
        .await?;
        Ok(())
    }

    /// Write one line to a session's transport
    ///
    /// A line addressed to a session that is already gone is dropped
    /// silently; a write failure surfaces as a transport error.
    pub async fn send_to(&mut self, id: SessionId, line: &str) -> Result<(), AppError> {
        match self.registry.get_mut(id) {
            Some(session) => session.send_line(line).await,
            None => {
                debug!("dropping line for closed session {}", id);
                Ok(())
            }
        }
    }

    /// Tear down a session: release the slot and the transport
    ///
    /// Idempotent; a stale or already-freed handle is a no-op.
    pub fn teardown(&mut self, id: SessionId) -> bool {
        match self.registry.release(id) {
            Some(mut session) => {
                session.close();
                info!("session {} ({}) closed", id, session.display_name);
                true
            }
            None => false,
        }
    }

    /// Reader task: one complete line per event, partial lines buffered
    fn spawn_reader(&self, id: SessionId, read_half: OwnedReadHalf) -> JoinHandle<()> {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(read_half).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim_end_matches('\r').to_string();
                        if tx.send(BotEvent::Line { id, line }).await.is_err() {
                            return;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        debug!("read error on session {}: {}", id, e);
                        break;
                    }
                }
            }
            let _ = tx.send(BotEvent::Hangup { id }).await;
        })
    }
}

#[cfg(test)]
impl Bot {
    /// Register a session backed by a capture sink (tests only)
    pub(crate) fn insert_test_session(
        &mut self,
        behavior: Behavior,
        display_name: &str,
        remote_host: &str,
        controller: &str,
    ) -> (SessionId, crate::sink::SinkLog) {
        let (sink, log) = crate::sink::MemorySink::new();
        let session = Session::new(behavior, display_name, remote_host, controller)
            .with_sink(Box::new(sink));
        let id = self.registry.acquire(session).expect("test registry full");
        (id, log)
    }
}
