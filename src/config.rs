//! Bot configuration
//!
//! An explicit configuration struct built once at startup and handed to
//! the event loop, instead of process-wide globals.

use std::env;
use std::time::Duration;

/// Default control listener address
pub const DEFAULT_ADDR: &str = "127.0.0.1:1337";

/// Default IRC server port for outbound sessions
pub const DEFAULT_IRC_PORT: u16 = 6667;

/// Default secret token gating privileged direct-message commands
pub const DEFAULT_KEY: &str = "KillerBot";

/// Default registry capacity (sessions tracked at once)
pub const DEFAULT_CAPACITY: usize = 32;

/// Runtime configuration for the bot
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Address the control listener binds to
    pub listen_addr: String,
    /// Port used when connecting outbound IRC sessions
    pub irc_port: u16,
    /// Shared secret authorizing privileged chat commands
    pub key: String,
    /// Maximum number of simultaneously tracked sessions
    pub capacity: usize,
    /// Bounded wait per event-loop iteration
    pub tick: Duration,
    /// Realname sent during the IRC handshake
    pub description: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_ADDR.to_string(),
            irc_port: DEFAULT_IRC_PORT,
            key: DEFAULT_KEY.to_string(),
            capacity: DEFAULT_CAPACITY,
            tick: Duration::from_millis(500),
            description: "Too sexy for this server".to_string(),
        }
    }
}

impl BotConfig {
    /// Build a config from the process environment
    ///
    /// The first command-line argument overrides the listen address and
    /// `BOTMUX_KEY` overrides the secret token.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(addr) = env::args().nth(1) {
            config.listen_addr = addr;
        }
        if let Ok(key) = env::var("BOTMUX_KEY") {
            config.key = key;
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BotConfig::default();

        assert_eq!(config.listen_addr, DEFAULT_ADDR);
        assert_eq!(config.irc_port, 6667);
        assert_eq!(config.capacity, 32);
        assert_eq!(config.tick, Duration::from_millis(500));
    }
}
