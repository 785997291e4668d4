//! PRIVMSG handling: channel and private messages.

use async_trait::async_trait;

use super::Handler;
use crate::client::BanchoClient;
use crate::error::{HandlerError, HandlerResult};
use crate::events::{ChannelMessage, Event, PrivateMessage};
use crate::irc::Line;
use crate::state::names::CHANNEL_SENTINEL;

const ACTION_OPEN: &str = "\u{1}ACTION ";
const ACTION_CLOSE: char = '\u{1}';

/// PRIVMSG: chat traffic, channel or private, plain or `/me` action.
pub struct PrivmsgHandler;

#[async_trait]
impl Handler for PrivmsgHandler {
    async fn handle(&self, client: &BanchoClient, line: &Line) -> HandlerResult {
        let nick = line.sender_nick().ok_or(HandlerError::NeedMoreParams)?;
        let target = line.part(2).ok_or(HandlerError::NeedMoreParams)?.to_owned();
        let user = client.user(nick);

        let text = line.text_from(3);
        let (content, is_action) = match text.strip_prefix(ACTION_OPEN) {
            Some(rest) => (rest.trim_end_matches(ACTION_CLOSE).to_owned(), true),
            None => (text, false),
        };

        if target.starts_with(CHANNEL_SENTINEL) {
            // A malformed channel target is dropped, not an error
            let Ok(channel) = client.channel(&target) else {
                return Ok(());
            };
            client.emit(Event::ChannelMessage(ChannelMessage {
                channel,
                user,
                content,
                is_action,
            }));
        } else {
            client.emit(Event::PrivateMessage(PrivateMessage {
                user,
                content,
                is_action,
            }));
        }
        Ok(())
    }
}
