//! Typed domain events published by the client.
//!
//! One broadcast stream per client, subscribed via
//! [`BanchoClient::subscribe`](crate::BanchoClient::subscribe). Event
//! payloads hold the shared `Arc` identities from the cache, so a consumer
//! can retain them and keep seeing in-place updates.

use std::sync::Arc;

use crate::client::ConnectionState;
use crate::state::{Channel, User};

/// A message received on a channel.
#[derive(Debug, Clone)]
pub struct ChannelMessage {
    pub channel: Arc<Channel>,
    pub user: Arc<User>,
    pub content: String,
    /// True for `/me` (CTCP ACTION) messages.
    pub is_action: bool,
}

/// A private message addressed to this client.
#[derive(Debug, Clone)]
pub struct PrivateMessage {
    pub user: Arc<User>,
    pub content: String,
    pub is_action: bool,
}

/// Everything the client reports to application code.
#[derive(Debug, Clone)]
pub enum Event {
    /// State machine transition. `error` carries the reason when the
    /// transition was caused by a failure.
    StateChanged {
        state: ConnectionState,
        error: Option<String>,
    },
    /// Registration accepted; the connection is usable.
    Connected,
    /// Transport lost (`Some(reason)`) or closed on request (`None`).
    Disconnected { error: Option<String> },
    ChannelMessage(ChannelMessage),
    PrivateMessage(PrivateMessage),
    /// Someone (possibly us) entered a channel.
    UserJoined { channel: Arc<Channel>, user: Arc<User> },
    /// Someone (possibly us) left a channel.
    UserParted { channel: Arc<Channel>, user: Arc<User> },
    /// The server refused to put us in `channel`.
    JoinFailed { channel: String, reason: String },
}
