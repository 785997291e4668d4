//! Inbound command handlers.
//!
//! The router consumes a [`Registry`]: a verb-to-handler table. Handlers
//! receive the decoded token list and the originating client, one line at a
//! time, on the reader task. The default table covers the gateway traffic
//! this client reacts to; applications can register additional verbs or
//! replace the defaults before construction.

mod channel;
mod connection;
mod messaging;

pub use channel::{
    JoinHandler, NamesHandler, NoSuchChannelHandler, PartHandler, QuitHandler, TopicHandler,
};
pub use connection::{AuthFailedHandler, WelcomeHandler};
pub use messaging::PrivmsgHandler;

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::trace;

use crate::client::BanchoClient;
use crate::error::HandlerResult;
use crate::irc::Line;

/// A handler for one command verb.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Consume a decoded line. Handlers never run concurrently with each
    /// other.
    async fn handle(&self, client: &BanchoClient, line: &Line) -> HandlerResult;
}

/// Verb-to-handler dispatch table.
pub struct Registry {
    handlers: HashMap<String, Box<dyn Handler>>,
}

impl Registry {
    /// An empty table. Useful for fully custom protocol surfaces.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// The default table: lifecycle numerics, messaging, membership.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("001", WelcomeHandler);
        registry.register("464", AuthFailedHandler);
        registry.register("403", NoSuchChannelHandler);
        registry.register("332", TopicHandler);
        registry.register("353", NamesHandler);
        registry.register("PRIVMSG", PrivmsgHandler);
        registry.register("JOIN", JoinHandler);
        registry.register("PART", PartHandler);
        registry.register("QUIT", QuitHandler);
        registry
    }

    /// Register (or replace) the handler for a verb.
    pub fn register<H: Handler + 'static>(&mut self, verb: &str, handler: H) {
        self.handlers.insert(verb.to_owned(), Box::new(handler));
    }

    /// Dispatch by the line's verb; unrecognized verbs are dropped.
    pub(crate) async fn dispatch(&self, client: &BanchoClient, line: &Line) -> HandlerResult {
        let Some(verb) = line.verb() else {
            return Ok(());
        };
        match self.handlers.get(verb) {
            Some(handler) => handler.handle(client, line).await,
            None => {
                trace!(verb, "no handler registered, dropping");
                Ok(())
            }
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
