//! Multiplexing IRC Bot Library
//!
//! A single-process agent that accepts administrative control
//! connections, maintains outbound IRC sessions, and dispatches every
//! incoming line through ordered prefix command tables.
//!
//! # Features
//! - TCP control console (`help`, `list`, `quit`, `connect`)
//! - Runtime creation and teardown of outbound IRC sessions
//! - Ordered first-match-wins command tables per role
//! - Privileged in-chat commands gated on a controller identity and a
//!   shared secret key
//! - Keep-alive handling and IRC line parsing
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `Bot` is the central actor and the only owner of the session
//!   registry; it processes one readiness event at a time
//! - Each transport has a reader task forwarding complete lines (and
//!   hangups) into the actor's event channel
//! - No locks needed - all state access goes through message passing
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use botmux::{Bot, BotConfig, Tables};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = BotConfig::default();
//!     let listener = TcpListener::bind(&config.listen_addr).await.unwrap();
//!
//!     let mut bot = Bot::new(config);
//!     bot.register_listener(listener).unwrap();
//!
//!     let tables = Tables::standard();
//!     bot.run(&tables).await;
//! }
//! ```

pub mod bot;
pub mod command;
pub mod config;
pub mod error;
pub mod handlers;
pub mod proto;
pub mod registry;
pub mod session;
pub mod sink;
pub mod types;

// Re-export main types for convenience
pub use bot::{Bot, BotEvent};
pub use command::{CommandTable, Dispatch};
pub use config::BotConfig;
pub use error::AppError;
pub use handlers::Tables;
pub use proto::IrcMessage;
pub use registry::Registry;
pub use session::{Behavior, Session};
pub use sink::{LineSink, MemorySink, TcpLineSink};
pub use types::SessionId;
