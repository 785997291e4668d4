//! Client-side state: the identity cache and the shared user/channel types.

pub mod channel;
pub mod names;
pub mod user;

pub use channel::{Channel, ChannelKind, Member};
pub use user::User;

use std::sync::Arc;

use dashmap::DashMap;

use crate::error::Result;

/// The identity cache.
///
/// Maps every normalized name to a single shared instance, created
/// atomically on first reference and never destroyed. Owned by one client
/// instance; there is no process-wide registry.
pub(crate) struct Directory {
    users: DashMap<String, Arc<User>>,
    users_by_id: DashMap<u32, Arc<User>>,
    channels: DashMap<String, Arc<Channel>>,
    /// Whether `#mp_*` names get the multiplayer kind. Requires a metadata
    /// credential; without one every channel stays generic.
    specialize_multiplayer: bool,
}

impl Directory {
    pub fn new(specialize_multiplayer: bool) -> Self {
        Self {
            users: DashMap::new(),
            users_by_id: DashMap::new(),
            channels: DashMap::new(),
            specialize_multiplayer,
        }
    }

    /// The one shared instance for `name`; creates it on first reference.
    pub fn user(&self, name: &str) -> Arc<User> {
        let key = names::username_key(name);
        self.users
            .entry(key.clone())
            .or_insert_with(|| Arc::new(User::new(key, names::sanitize_username(name))))
            .clone()
    }

    pub fn user_by_id(&self, id: u32) -> Option<Arc<User>> {
        self.users_by_id.get(&id).map(|entry| entry.clone())
    }

    /// Record a resolved numeric id against a user.
    pub fn bind_user_id(&self, id: u32, user: &Arc<User>) {
        user.set_id(id);
        self.users_by_id.insert(id, user.clone());
    }

    /// Cached or new channel; validates the name shape first, leaving the
    /// cache untouched on a bad name.
    pub fn channel(&self, name: &str) -> Result<Arc<Channel>> {
        names::validate_channel_name(name)?;
        let key = names::channel_key(name);
        let channel = self
            .channels
            .entry(key)
            .or_insert_with(|| {
                let kind = if self.specialize_multiplayer {
                    match names::multiplayer_match_id(name) {
                        Some(match_id) => ChannelKind::Multiplayer { match_id },
                        None => ChannelKind::Public,
                    }
                } else {
                    ChannelKind::Public
                };
                Arc::new(Channel::new(name.to_owned(), kind))
            })
            .clone();
        Ok(channel)
    }

    pub fn channels(&self) -> Vec<Arc<Channel>> {
        self.channels.iter().map(|entry| entry.clone()).collect()
    }

    /// Remove a user from every member set, returning the channels they
    /// were actually in.
    pub fn drop_member_everywhere(&self, user_key: &str) -> Vec<Arc<Channel>> {
        self.channels
            .iter()
            .filter(|entry| entry.remove_member(user_key))
            .map(|entry| entry.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_user_identity_is_shared() {
        let dir = Directory::new(false);
        let a = dir.user("Some Player");
        let b = dir.user("some_player");
        let c = dir.user("SOME_PLAYER");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &c));
        assert_eq!(a.display_name(), "Some_Player");
    }

    #[test]
    fn test_channel_identity_is_shared() {
        let dir = Directory::new(false);
        let a = dir.channel("#osu").expect("valid name");
        let b = dir.channel("#osu").expect("valid name");
        let c = dir.channel("#OSU").expect("valid name");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn test_invalid_channel_leaves_cache_untouched() {
        let dir = Directory::new(false);
        let err = dir.channel("osu").expect_err("missing sentinel");
        assert!(matches!(err, Error::InvalidChannelName(_)));
        assert!(dir.channels().is_empty());
    }

    #[test]
    fn test_multiplayer_kind_needs_credential() {
        let without = Directory::new(false);
        let chan = without.channel("#mp_123").expect("valid name");
        assert_eq!(chan.kind(), ChannelKind::Public);

        let with = Directory::new(true);
        let chan = with.channel("#mp_123").expect("valid name");
        assert_eq!(chan.kind(), ChannelKind::Multiplayer { match_id: 123 });
        // non-numeric suffix stays generic either way
        let chan = with.channel("#mp_lobby").expect("valid name");
        assert_eq!(chan.kind(), ChannelKind::Public);
    }

    #[test]
    fn test_user_id_binding() {
        let dir = Directory::new(false);
        let user = dir.user("Player");
        assert!(dir.user_by_id(2).is_none());
        dir.bind_user_id(2, &user);
        let by_id = dir.user_by_id(2).expect("bound");
        assert!(Arc::ptr_eq(&by_id, &user));
        assert_eq!(user.id(), Some(2));
    }
}
