//! Minimal event dump client: `bancho_cat <config.toml>`.

use anyhow::Context;
use bancho_irc::{BanchoClient, Config, Event};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let path = std::env::args()
        .nth(1)
        .context("usage: bancho_cat <config.toml>")?;
    let config = Config::from_file(&path)?;

    let client = BanchoClient::new(config)?;
    let mut events = client.subscribe();

    client.connect().await?;
    loop {
        match events.recv().await {
            Ok(Event::ChannelMessage(msg)) => {
                info!(channel = %msg.channel.name(), from = %msg.user.display_name(), "{}", msg.content);
            }
            Ok(Event::PrivateMessage(msg)) => {
                info!(from = %msg.user.display_name(), "{}", msg.content);
            }
            Ok(event) => info!(?event, "event"),
            Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                info!(skipped, "event stream lagged");
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        }
    }
    Ok(())
}
