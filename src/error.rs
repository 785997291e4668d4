//! Unified error handling for bancho-irc.
//!
//! One taxonomy enum for caller-facing failures, grouped by class: transport
//! failures feed the reconnection path, protocol violations and state errors
//! reject at the call site, and remote rejections carry the server's reason
//! without touching the connection. Quota deferral is not an error and never
//! appears here.

use std::time::Duration;

use thiserror::Error;

use crate::lookup::LookupError;

/// Errors surfaced by the client API.
#[derive(Debug, Error)]
pub enum Error {
    // ========================================================================
    // Transport
    // ========================================================================
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed by server")]
    ConnectionClosed,

    #[error("no data received for {0:?}")]
    IdleTimeout(Duration),

    #[error("connect attempt timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("line too long ({actual} bytes, limit {limit})")]
    LineTooLong { actual: usize, limit: usize },

    // ========================================================================
    // Protocol violations (rejected before anything reaches the wire)
    // ========================================================================
    #[error("invalid channel name: {0:?}")]
    InvalidChannelName(String),

    #[error("invalid user id: {0}")]
    InvalidUserId(i64),

    // ========================================================================
    // State errors
    // ========================================================================
    #[error("already connected")]
    AlreadyConnected,

    #[error("not connected")]
    NotConnected,

    #[error("not in channel {0}")]
    NotJoined(String),

    #[error("operation aborted before completion")]
    Aborted,

    // ========================================================================
    // Remote rejections
    // ========================================================================
    #[error("cannot join {channel}: {reason}")]
    JoinRejected { channel: String, reason: String },

    #[error("cannot part {channel}: {reason}")]
    PartRejected { channel: String, reason: String },

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    // ========================================================================
    // Metadata lookup
    // ========================================================================
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("no metadata api credential configured")]
    LookupUnavailable,
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by registry handlers.
///
/// Handler failures are logged and dropped by the router; they never tear
/// down the connection.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("not enough parameters")]
    NeedMoreParams,

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for command handlers.
pub type HandlerResult = std::result::Result<(), HandlerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = Error::JoinRejected {
            channel: "#nope".into(),
            reason: "No such channel".into(),
        };
        assert_eq!(err.to_string(), "cannot join #nope: No such channel");
        assert_eq!(Error::InvalidUserId(-3).to_string(), "invalid user id: -3");
    }
}
