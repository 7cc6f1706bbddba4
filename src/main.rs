//! Multiplexing IRC Bot - Entry Point
//!
//! Binds the control listener, registers it with the bot actor, and
//! runs the event loop.

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use botmux::{Bot, BotConfig, Tables};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=botmux=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("botmux=info")),
        )
        .init();

    let config = BotConfig::from_env();

    let listener = TcpListener::bind(&config.listen_addr).await?;
    info!("control console listening on {}", config.listen_addr);

    let mut bot = Bot::new(config);
    bot.register_listener(listener)?;

    let tables = Tables::standard();
    bot.run(&tables).await;

    Ok(())
}
