//! Shared channel state and join/part negotiation slots.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;

use super::user::User;

/// How the cache classified a channel when it was first referenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Public,
    /// A multiplayer lobby channel (`#mp_<id>`). Only recognized when a
    /// metadata credential is configured; without one every channel is
    /// [`ChannelKind::Public`].
    Multiplayer { match_id: u64 },
}

/// A user currently present in a channel.
#[derive(Debug, Clone)]
pub struct Member {
    pub user: Arc<User>,
    /// Carries the `@` operator prefix from the member listing.
    pub op: bool,
}

/// Outcome of an in-flight join or part exchange. `Err` carries the
/// server's rejection reason.
pub(crate) type OpOutcome = Result<(), String>;

type PendingSlot = Mutex<Option<broadcast::Sender<OpOutcome>>>;

/// A channel known to the client.
///
/// Like [`User`], one instance exists per name for the life of the client.
/// At most one join and one part exchange are in flight at a time; callers
/// arriving while one is pending share its outcome.
#[derive(Debug)]
pub struct Channel {
    name: String,
    kind: ChannelKind,
    data: RwLock<ChannelData>,
    pending_join: PendingSlot,
    pending_part: PendingSlot,
}

#[derive(Debug, Default)]
struct ChannelData {
    topic: Option<String>,
    joined: bool,
    members: HashMap<String, Member>,
}

impl Channel {
    pub(crate) fn new(name: String, kind: ChannelKind) -> Self {
        Self {
            name,
            kind,
            data: RwLock::new(ChannelData::default()),
            pending_join: Mutex::new(None),
            pending_part: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    pub fn topic(&self) -> Option<String> {
        self.data.read().topic.clone()
    }

    /// Whether the client is currently in this channel.
    pub fn is_joined(&self) -> bool {
        self.data.read().joined
    }

    /// Snapshot of the current member set.
    pub fn members(&self) -> Vec<Member> {
        self.data.read().members.values().cloned().collect()
    }

    /// Look up a member by (normalized) name.
    pub fn member(&self, key: &str) -> Option<Member> {
        self.data.read().members.get(key).cloned()
    }

    pub fn member_count(&self) -> usize {
        self.data.read().members.len()
    }

    pub(crate) fn set_topic(&self, topic: String) {
        self.data.write().topic = Some(topic);
    }

    pub(crate) fn set_joined(&self, joined: bool) {
        self.data.write().joined = joined;
    }

    pub(crate) fn insert_member(&self, user: Arc<User>, op: bool) {
        let key = user.key().to_owned();
        self.data.write().members.insert(key, Member { user, op });
    }

    pub(crate) fn remove_member(&self, key: &str) -> bool {
        self.data.write().members.remove(key).is_some()
    }

    // ------------------------------------------------------------------
    // Pending join/part slots
    // ------------------------------------------------------------------

    /// Subscribe to the in-flight join, creating it if none is pending.
    /// The second value is true for the caller that must put the JOIN line
    /// on the wire.
    pub(crate) fn begin_join(&self) -> (broadcast::Receiver<OpOutcome>, bool) {
        Self::begin(&self.pending_join)
    }

    pub(crate) fn begin_part(&self) -> (broadcast::Receiver<OpOutcome>, bool) {
        Self::begin(&self.pending_part)
    }

    fn begin(slot: &PendingSlot) -> (broadcast::Receiver<OpOutcome>, bool) {
        let mut pending = slot.lock();
        match pending.as_ref() {
            Some(tx) => (tx.subscribe(), false),
            None => {
                let (tx, rx) = broadcast::channel(1);
                *pending = Some(tx);
                (rx, true)
            }
        }
    }

    /// Settle the pending join, waking every caller that shares it. No-op
    /// when nothing is pending (e.g. a JOIN the server initiated).
    pub(crate) fn resolve_join(&self, outcome: OpOutcome) {
        if let Some(tx) = self.pending_join.lock().take() {
            let _ = tx.send(outcome);
        }
    }

    pub(crate) fn resolve_part(&self, outcome: OpOutcome) {
        if let Some(tx) = self.pending_part.lock().take() {
            let _ = tx.send(outcome);
        }
    }

    /// Drop the pending join without an outcome; subscribers observe a
    /// closed channel. Used when the initiating write never made it out.
    pub(crate) fn cancel_join(&self) {
        self.pending_join.lock().take();
    }

    pub(crate) fn cancel_part(&self) {
        self.pending_part.lock().take();
    }

    pub(crate) fn has_pending_join(&self) -> bool {
        self.pending_join.lock().is_some()
    }

    pub(crate) fn has_pending_part(&self) -> bool {
        self.pending_part.lock().is_some()
    }
}
