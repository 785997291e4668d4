//! # bancho-irc
//!
//! A persistent client for Bancho-style IRC chat gateways: the stripped
//! IRC dialect a game service exposes as its social gateway.
//!
//! The crate keeps one long-lived connection alive for you:
//!
//! - a connection lifecycle state machine with automatic, fixed-delay
//!   reconnection
//! - a byte-stream framer and a verb-routed command dispatcher
//! - an identity cache handing out one shared instance per user/channel
//! - a rate-limited outbound dispatcher that queues and paces writes
//!   against the gateway's anti-flood quotas
//!
//! ## Quick start
//!
//! ```no_run
//! use bancho_irc::{BanchoClient, Config, Event};
//!
//! # async fn run() -> bancho_irc::Result<()> {
//! let mut config = Config::default();
//! config.username = "player".to_owned();
//! config.password = "irc-token".to_owned();
//!
//! let client = BanchoClient::new(config)?;
//! let mut events = client.subscribe();
//!
//! client.connect().await?;
//! let channel = client.channel("#osu")?;
//! client.join_channel(&channel).await?;
//! client.send_message(channel.clone(), "hello!").await?;
//!
//! while let Ok(event) = events.recv().await {
//!     if let Event::ChannelMessage(msg) = event {
//!         println!("<{}> {}", msg.user.display_name(), msg.content);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Custom protocol verbs plug in through [`Registry`]; numeric-id
//! resolution goes through the [`lookup::UserLookup`] collaborator.

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod handlers;
pub mod irc;
pub mod limits;
pub mod lookup;
pub mod outbound;
pub mod state;

pub use client::{BanchoClient, ConnectionState};
pub use config::{ApiConfig, Config, ConfigError, RateLimitConfig};
pub use error::{Error, HandlerError, HandlerResult, Result};
pub use events::{ChannelMessage, Event, PrivateMessage};
pub use handlers::{Handler, Registry};
pub use irc::Line;
pub use limits::{MessageLimiter, QuotaKind};
pub use lookup::{HttpLookup, LookupError, UserInfo, UserLookup};
pub use outbound::Target;
pub use state::{Channel, ChannelKind, Member, User};
