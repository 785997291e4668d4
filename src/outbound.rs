//! Outbound message dispatch: chunk splitting, quota classification, and
//! the rate-limited write path.

use std::sync::Arc;

use tracing::debug;

use crate::client::{BanchoClient, ConnectionState};
use crate::error::{Error, Result};
use crate::limits::QuotaKind;
use crate::state::{Channel, User};

/// Where a message is headed.
#[derive(Debug, Clone)]
pub enum Target {
    User(Arc<User>),
    Channel(Arc<Channel>),
}

impl Target {
    /// The wire spelling of the target.
    pub fn name(&self) -> String {
        match self {
            Self::User(user) => user.irc_target(),
            Self::Channel(channel) => channel.name().to_owned(),
        }
    }

    fn is_private(&self) -> bool {
        matches!(self, Self::User(_))
    }
}

impl From<Arc<User>> for Target {
    fn from(user: Arc<User>) -> Self {
        Self::User(user)
    }
}

impl From<Arc<Channel>> for Target {
    fn from(channel: Arc<Channel>) -> Self {
        Self::Channel(channel)
    }
}

/// Payload budget left once a chunk is wrapped in
/// `PRIVMSG <target> :<chunk>\r\n`.
fn chunk_budget(max_line_len: usize, target: &str) -> usize {
    let overhead = "PRIVMSG ".len() + target.len() + " :".len() + "\r\n".len();
    max_line_len.saturating_sub(overhead).max(1)
}

/// Split on char boundaries so every chunk fits the byte budget. Produces
/// the minimal number of chunks; an empty text still yields one (empty)
/// chunk so the send is observable on the wire.
fn split_chunks(text: &str, budget: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        if current.len() + c.len_utf8() > budget {
            chunks.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    if !current.is_empty() || chunks.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Private targets and highlight-opening texts charge the tighter quota.
fn classify(target: &Target, text: &str, mention_sentinel: char) -> QuotaKind {
    if target.is_private() || text.starts_with(mention_sentinel) {
        QuotaKind::Addressed
    } else {
        QuotaKind::Normal
    }
}

impl BanchoClient {
    /// Send a chat message, split across as few protocol lines as fit.
    ///
    /// Resolves once the final chunk has been handed to the transport; the
    /// protocol offers no delivery acknowledgement beyond that. Rejects
    /// without writing anything when not connected.
    pub async fn send_message(&self, target: impl Into<Target>, text: &str) -> Result<()> {
        self.dispatch_chunks(target.into(), text, false).await
    }

    /// Send a `/me` action (CTCP ACTION framing around the text).
    pub async fn send_action(&self, target: impl Into<Target>, text: &str) -> Result<()> {
        self.dispatch_chunks(target.into(), text, true).await
    }

    async fn dispatch_chunks(&self, target: Target, text: &str, action: bool) -> Result<()> {
        if self.state() != ConnectionState::Connected {
            return Err(Error::NotConnected);
        }
        let name = target.name();
        let kind = classify(&target, text, self.config().mention_sentinel);
        let budget = chunk_budget(self.config().max_line_len, &name);
        let chunks = if action {
            split_chunks(&format!("\u{1}ACTION {text}\u{1}"), budget)
        } else {
            split_chunks(text, budget)
        };

        debug!(target = %name, chunks = chunks.len(), ?kind, "dispatching message");
        for chunk in chunks {
            self.limiter().admit(kind).await;
            self.send_raw(format!("PRIVMSG {name} :{chunk}")).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_chunks_minimal_count() {
        let text = "a".repeat(100);
        let chunks = split_chunks(&text, 48);
        assert_eq!(chunks.len(), 100usize.div_ceil(48));
        assert!(chunks.iter().all(|c| c.len() <= 48));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_split_chunks_exact_fit() {
        let chunks = split_chunks("abcd", 4);
        assert_eq!(chunks, vec!["abcd".to_owned()]);
    }

    #[test]
    fn test_split_chunks_keeps_char_boundaries() {
        // four 3-byte chars against a 4-byte budget: one char per chunk
        let chunks = split_chunks("ああああ", 4);
        assert_eq!(chunks.len(), 4);
        assert!(chunks.iter().all(|c| c == "あ"));
    }

    #[test]
    fn test_split_chunks_empty_text() {
        assert_eq!(split_chunks("", 10), vec![String::new()]);
    }

    #[test]
    fn test_chunk_budget_accounts_for_command_overhead() {
        // "PRIVMSG #osu :" is 14 bytes, plus CR LF
        assert_eq!(chunk_budget(64, "#osu"), 64 - 16);
    }

    #[test]
    fn test_classify() {
        let user: Arc<User> = Arc::new(User::new("player".into(), "Player".into()));
        let channel = Arc::new(Channel::new(
            "#osu".into(),
            crate::state::ChannelKind::Public,
        ));

        let private = Target::from(user);
        let public = Target::from(channel);
        assert_eq!(classify(&private, "hi", '@'), QuotaKind::Addressed);
        assert_eq!(classify(&public, "hi", '@'), QuotaKind::Normal);
        assert_eq!(classify(&public, "@Player hi", '@'), QuotaKind::Addressed);
    }
}
