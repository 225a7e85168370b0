use std::collections::{HashMap, HashSet};

use ember_ids::{ConnectionId, UserId};
use tokio::sync::mpsc;

/// Bounded so a single slow consumer can be detected and dropped rather than
/// growing memory without bound.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

pub(crate) struct ConnectionHandle {
    pub user_id: UserId,
    pub tx: mpsc::Sender<String>,
}

/// `userId -> set<connection>` plus the reverse lookup used by fan-out.
/// Guarded by a read-write lock: broadcast methods take a shared read guard
/// directly; register/unregister go through [`crate::hub::Hub`]'s single
/// serializing task, which takes the exclusive guard.
#[derive(Default)]
pub(crate) struct Registry {
    by_user: HashMap<UserId, HashSet<ConnectionId>>,
    connections: HashMap<ConnectionId, ConnectionHandle>,
}

impl Registry {
    pub fn insert(&mut self, id: ConnectionId, user_id: UserId, tx: mpsc::Sender<String>) -> bool {
        let first_connection = !self.by_user.contains_key(&user_id);
        self.by_user.entry(user_id).or_default().insert(id);
        self.connections.insert(id, ConnectionHandle { user_id, tx });
        first_connection
    }

    /// Returns `true` if this was the user's last connection.
    pub fn remove(&mut self, id: ConnectionId) -> Option<(UserId, bool)> {
        let handle = self.connections.remove(&id)?;
        let last = if let Some(set) = self.by_user.get_mut(&handle.user_id) {
            set.remove(&id);
            let now_empty = set.is_empty();
            if now_empty {
                self.by_user.remove(&handle.user_id);
            }
            now_empty
        } else {
            true
        };
        Some((handle.user_id, last))
    }

    pub fn connections_of(&self, user_id: UserId) -> Vec<ConnectionId> {
        self.by_user.get(&user_id).map(|s| s.iter().copied().collect()).unwrap_or_default()
    }

    pub fn all_user_ids(&self) -> Vec<UserId> {
        self.by_user.keys().copied().collect()
    }

    pub fn sender(&self, id: ConnectionId) -> Option<&mpsc::Sender<String>> {
        self.connections.get(&id).map(|h| &h.tx)
    }

    pub fn is_online(&self, user_id: UserId) -> bool {
        self.by_user.contains_key(&user_id)
    }
}
