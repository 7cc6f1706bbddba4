//! Error types for the bot
//!
//! Defines application-level errors. Uses thiserror for ergonomic
//! error definitions.

use thiserror::Error;

/// Application-level errors
///
/// Transport failures are recoverable by tearing down just the affected
/// session; nothing here is fatal to the process.
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error on a transport (accept/read/write failure)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Outbound connection could not be established
    #[error("cannot connect to '{host}'")]
    Connection { host: String },

    /// Session registry has no free slot
    #[error("session registry is full")]
    RegistryFull,
}
