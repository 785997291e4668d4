//! Registration lifecycle numerics.

use async_trait::async_trait;

use super::Handler;
use crate::client::BanchoClient;
use crate::error::HandlerResult;
use crate::irc::Line;

/// 001: the gateway accepted our registration.
pub struct WelcomeHandler;

#[async_trait]
impl Handler for WelcomeHandler {
    async fn handle(&self, client: &BanchoClient, _line: &Line) -> HandlerResult {
        client.finish_connect().await;
        Ok(())
    }
}

/// 464: bad authentication token.
pub struct AuthFailedHandler;

#[async_trait]
impl Handler for AuthFailedHandler {
    async fn handle(&self, client: &BanchoClient, line: &Line) -> HandlerResult {
        let mut reason = line.text_from(3);
        if reason.is_empty() {
            reason = "bad authentication token".to_owned();
        }
        client.auth_failed(reason);
        Ok(())
    }
}
