//! Channel membership traffic: JOIN, PART, QUIT, topic, member listing,
//! and the no-such-channel rejection.

use async_trait::async_trait;

use super::Handler;
use crate::client::BanchoClient;
use crate::error::{HandlerError, HandlerResult};
use crate::events::Event;
use crate::irc::Line;

/// JOIN: someone (possibly us) entered a channel.
pub struct JoinHandler;

#[async_trait]
impl Handler for JoinHandler {
    async fn handle(&self, client: &BanchoClient, line: &Line) -> HandlerResult {
        let nick = line.sender_nick().ok_or(HandlerError::NeedMoreParams)?;
        let name = line.text_from(2);
        if name.is_empty() {
            return Err(HandlerError::NeedMoreParams);
        }
        let Ok(channel) = client.channel(&name) else {
            return Ok(());
        };
        let user = client.user(nick);
        channel.insert_member(user.clone(), false);
        if client.is_self(nick) {
            channel.set_joined(true);
            channel.resolve_join(Ok(()));
        }
        client.emit(Event::UserJoined { channel, user });
        Ok(())
    }
}

/// PART: someone (possibly us) left a channel.
pub struct PartHandler;

#[async_trait]
impl Handler for PartHandler {
    async fn handle(&self, client: &BanchoClient, line: &Line) -> HandlerResult {
        let nick = line.sender_nick().ok_or(HandlerError::NeedMoreParams)?;
        let name = line
            .part(2)
            .ok_or(HandlerError::NeedMoreParams)?
            .trim_start_matches(':')
            .to_owned();
        let Ok(channel) = client.channel(&name) else {
            return Ok(());
        };
        let user = client.user(nick);
        channel.remove_member(user.key());
        if client.is_self(nick) {
            channel.set_joined(false);
            channel.resolve_part(Ok(()));
        }
        client.emit(Event::UserParted { channel, user });
        Ok(())
    }
}

/// QUIT: a user left the gateway; drop them from every member set.
pub struct QuitHandler;

#[async_trait]
impl Handler for QuitHandler {
    async fn handle(&self, client: &BanchoClient, line: &Line) -> HandlerResult {
        let nick = line.sender_nick().ok_or(HandlerError::NeedMoreParams)?;
        let user = client.user(nick);
        for channel in client.drop_member_everywhere(user.key()) {
            client.emit(Event::UserParted {
                channel,
                user: user.clone(),
            });
        }
        Ok(())
    }
}

/// 332: channel topic.
pub struct TopicHandler;

#[async_trait]
impl Handler for TopicHandler {
    async fn handle(&self, client: &BanchoClient, line: &Line) -> HandlerResult {
        let name = line.part(3).ok_or(HandlerError::NeedMoreParams)?;
        let Ok(channel) = client.channel(name) else {
            return Ok(());
        };
        channel.set_topic(line.text_from(4));
        Ok(())
    }
}

/// 353: member listing chunk; `@` marks operators.
pub struct NamesHandler;

#[async_trait]
impl Handler for NamesHandler {
    async fn handle(&self, client: &BanchoClient, line: &Line) -> HandlerResult {
        let name = line.part(4).ok_or(HandlerError::NeedMoreParams)?;
        let Ok(channel) = client.channel(name) else {
            return Ok(());
        };
        for entry in line.text_from(5).split(' ').filter(|n| !n.is_empty()) {
            let (nick, op) = match entry.strip_prefix('@') {
                Some(stripped) => (stripped, true),
                None => (entry.trim_start_matches('+'), false),
            };
            channel.insert_member(client.user(nick), op);
        }
        Ok(())
    }
}

/// 403: the server refused a join or part for a channel that does not
/// exist. Settles whichever exchange was pending and reports the failure.
pub struct NoSuchChannelHandler;

#[async_trait]
impl Handler for NoSuchChannelHandler {
    async fn handle(&self, client: &BanchoClient, line: &Line) -> HandlerResult {
        let name = line.part(3).ok_or(HandlerError::NeedMoreParams)?.to_owned();
        let mut reason = line.text_from(4);
        if reason.is_empty() {
            reason = "no such channel".to_owned();
        }
        if let Ok(channel) = client.channel(&name) {
            channel.resolve_join(Err(reason.clone()));
            channel.resolve_part(Err(reason.clone()));
        }
        client.emit(Event::JoinFailed {
            channel: name,
            reason,
        });
        Ok(())
    }
}
