//! Shared user identities.

use parking_lot::RwLock;

/// A user known to the client.
///
/// One instance exists per normalized name for the life of the client;
/// holders of an `Arc<User>` see attribute updates in place and never need
/// to re-fetch.
#[derive(Debug)]
pub struct User {
    key: String,
    data: RwLock<UserData>,
}

#[derive(Debug)]
struct UserData {
    display: String,
    id: Option<u32>,
}

impl User {
    pub(crate) fn new(key: String, display: String) -> Self {
        Self {
            key,
            data: RwLock::new(UserData { display, id: None }),
        }
    }

    /// Normalized lowercase identity key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Display spelling (underscored, original case).
    pub fn display_name(&self) -> String {
        self.data.read().display.clone()
    }

    /// Numeric id, once resolved via the metadata lookup.
    pub fn id(&self) -> Option<u32> {
        self.data.read().id
    }

    /// The spelling used to address this user on the wire.
    pub fn irc_target(&self) -> String {
        self.display_name()
    }

    pub(crate) fn set_id(&self, id: u32) {
        self.data.write().id = Some(id);
    }

    pub(crate) fn set_display(&self, display: String) {
        self.data.write().display = display;
    }
}
