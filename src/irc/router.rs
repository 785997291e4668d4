//! Inbound line routing.

use std::sync::Arc;

use tracing::{debug, trace};

use super::{IGNORED_REPLIES, Line};
use crate::client::BanchoClient;
use crate::handlers::Registry;

/// Routes decoded lines: keep-alive probes first, then the ignore set,
/// then registry dispatch by verb.
pub(crate) struct Router {
    registry: Arc<Registry>,
}

impl Router {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Route one decoded line. Runs on the reader task, so handlers are
    /// serialized by construction.
    pub async fn route(&self, client: &BanchoClient, raw: &str) {
        let Some(line) = Line::parse(raw) else {
            return;
        };

        // Keep-alive probes are answered before any other routing and
        // bypass the rate limiter entirely.
        if line.part(0) == Some("PING") {
            let reply = format!("PONG{}", &raw[4..]);
            if let Err(error) = client.send_raw(reply).await {
                debug!(%error, "failed to answer keep-alive probe");
            }
            return;
        }

        let Some(verb) = line.verb() else {
            return;
        };
        if IGNORED_REPLIES.contains(&verb) {
            trace!(verb, "dropping informational reply");
            return;
        }

        if let Err(error) = self.registry.dispatch(client, &line).await {
            debug!(verb, %error, "handler error");
        }
    }
}
