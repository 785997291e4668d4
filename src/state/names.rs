//! Name normalization and validation for the gateway dialect.
//!
//! The gateway spells usernames with underscores in place of spaces and
//! compares them case-insensitively. Channel names carry a leading sentinel
//! and a restricted character set.

use crate::error::Error;

/// Longest username the gateway will address.
pub const MAX_USERNAME_LEN: usize = 28;

/// Leading character that identifies a channel name.
pub const CHANNEL_SENTINEL: char = '#';

/// Prefix of multiplayer lobby channels.
pub const MULTIPLAYER_PREFIX: &str = "#mp_";

/// Longest accepted channel name, sentinel included.
pub const MAX_CHANNEL_LEN: usize = 50;

/// Sanitize a username into its wire spelling: cut at the first line break,
/// spaces become underscores, clipped to [`MAX_USERNAME_LEN`] characters.
pub fn sanitize_username(name: &str) -> String {
    let cut = name.split(['\n', '\r']).next().unwrap_or_default();
    cut.chars()
        .take(MAX_USERNAME_LEN)
        .map(|c| if c == ' ' { '_' } else { c })
        .collect()
}

/// Case-folded cache key for a username.
pub fn username_key(name: &str) -> String {
    sanitize_username(name).to_ascii_lowercase()
}

/// Case-folded cache key for a channel name.
pub fn channel_key(name: &str) -> String {
    name.to_ascii_lowercase()
}

/// Check a channel name's shape: leading sentinel, something after it, no
/// separators or control characters, bounded length.
pub fn validate_channel_name(name: &str) -> Result<(), Error> {
    let invalid = || Error::InvalidChannelName(name.to_owned());

    let mut chars = name.chars();
    if chars.next() != Some(CHANNEL_SENTINEL) {
        return Err(invalid());
    }
    let rest = chars.as_str();
    if rest.is_empty() || name.chars().count() > MAX_CHANNEL_LEN {
        return Err(invalid());
    }
    for c in rest.chars() {
        if c == ' ' || c == ',' || c.is_control() {
            return Err(invalid());
        }
    }
    Ok(())
}

/// Extract the match id from a `#mp_<id>` channel name.
pub fn multiplayer_match_id(name: &str) -> Option<u64> {
    name.strip_prefix(MULTIPLAYER_PREFIX)?.parse().ok()
}
