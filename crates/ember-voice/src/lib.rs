//! Authoritative in-memory map of who is in which voice channel.
//!
//! This is the only place voice transitions are decided. Every mutation
//! holds the store's exclusive lock just long enough to update the map and
//! build a description of what happened; the caller performs the actual
//! hub fan-out *after* the lock is released (see `VoiceBroadcast`).

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use ember_ids::{ChannelId, ServerId, UserId};
use ember_model::{DomainError, DomainResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VoiceState {
    pub user_id: UserId,
    pub channel_id: ChannelId,
    pub server_id: ServerId,
    pub username: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub is_muted: bool,
    pub is_deafened: bool,
    pub is_streaming: bool,
    pub is_server_muted: bool,
    pub is_server_deafened: bool,
    pub joined_at: DateTime<Utc>,
}

/// Identity fields supplied by the caller at join time — the store itself
/// never queries the user repository.
#[derive(Clone, Debug)]
pub struct VoiceProfile {
    pub username: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

/// Partial update; `None` fields preserve the current value. Deafening does
/// not imply muting at the storage layer — that coupling is client UX only,
/// preserved here deliberately per the source's observed behavior.
#[derive(Clone, Copy, Debug, Default)]
pub struct VoiceStateUpdate {
    pub muted: Option<bool>,
    pub deafened: Option<bool>,
    pub streaming: Option<bool>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct AdminVoiceUpdate {
    pub server_muted: Option<bool>,
    pub server_deafened: Option<bool>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceAction {
    Join,
    Leave,
    Update,
}

/// One broadcastable transition: either a full `VoiceState` (join/update) or
/// a bare identity (leave, where the state no longer exists to project).
#[derive(Clone, Debug)]
pub enum VoiceEvent {
    State { state: VoiceState, action: VoiceAction },
    Leave { user_id: UserId, channel_id: ChannelId, server_id: ServerId },
}

#[derive(Clone, Copy, Debug)]
pub enum DirectedVoiceEvent {
    ForceMove { channel_id: ChannelId },
    ForceDisconnect,
}

/// What the caller must relay through the hub after the store's internal
/// lock has been released. `events` preserves emission order — callers must
/// assign `seq` and broadcast in this order so leave-before-join causality
/// holds for moves.
#[derive(Clone, Debug, Default)]
pub struct VoiceBroadcast {
    pub server_id: Option<ServerId>,
    pub events: Vec<VoiceEvent>,
    pub directed: Vec<(UserId, DirectedVoiceEvent)>,
}

impl VoiceBroadcast {
    fn is_empty(&self) -> bool {
        self.events.is_empty() && self.directed.is_empty()
    }
}

#[derive(Default)]
struct Inner {
    by_user: HashMap<UserId, VoiceState>,
    by_channel: HashMap<ChannelId, HashSet<UserId>>,
}

/// Server-scoped authoritative voice membership map, shared across the
/// whole process. Not persisted: a restart drops all voice state, which is
/// acceptable since clients resync on reconnect.
pub struct VoiceStore {
    inner: RwLock<Inner>,
}

impl Default for VoiceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VoiceStore {
    pub fn new() -> Self {
        Self { inner: RwLock::new(Inner::default()) }
    }

    /// Join `channel` (in `server`). If the user is already elsewhere, emits
    /// a `leave` for the old channel followed by a `join` for the new one —
    /// both fall under the same broadcast so the caller assigns
    /// monotonically increasing `seq` values in emission order.
    ///
    /// `user_limit` is the destination channel's configured cap (`None` =
    /// unlimited); `bypass_capacity` should be true iff the caller already
    /// holds `MoveMembers` on the destination.
    pub fn join(
        &self,
        user_id: UserId,
        channel_id: ChannelId,
        server_id: ServerId,
        user_limit: Option<usize>,
        bypass_capacity: bool,
        profile: VoiceProfile,
    ) -> DomainResult<VoiceBroadcast> {
        let mut inner = self.inner.write();

        if let Some(existing) = inner.by_user.get(&user_id) {
            if existing.channel_id == channel_id {
                return Ok(VoiceBroadcast::default());
            }
        }

        if !bypass_capacity {
            if let Some(limit) = user_limit {
                let occupancy = inner.by_channel.get(&channel_id).map(HashSet::len).unwrap_or(0);
                if occupancy >= limit {
                    return Err(DomainError::CapacityExceeded("voice channel is full"));
                }
            }
        }

        let mut broadcast = VoiceBroadcast { server_id: Some(server_id), ..Default::default() };

        if let Some(prior) = inner.by_user.remove(&user_id) {
            if let Some(set) = inner.by_channel.get_mut(&prior.channel_id) {
                set.remove(&user_id);
            }
            broadcast.events.push(VoiceEvent::Leave {
                user_id,
                channel_id: prior.channel_id,
                server_id: prior.server_id,
            });
        }

        let state = VoiceState {
            user_id,
            channel_id,
            server_id,
            username: profile.username,
            display_name: profile.display_name,
            avatar_url: profile.avatar_url,
            is_muted: false,
            is_deafened: false,
            is_streaming: false,
            is_server_muted: false,
            is_server_deafened: false,
            joined_at: Utc::now(),
        };
        inner.by_channel.entry(channel_id).or_default().insert(user_id);
        inner.by_user.insert(user_id, state.clone());
        broadcast.events.push(VoiceEvent::State { state, action: VoiceAction::Join });

        Ok(broadcast)
    }

    /// No-op if the user is not currently in voice.
    pub fn leave(&self, user_id: UserId) -> Option<VoiceBroadcast> {
        let mut inner = self.inner.write();
        let state = inner.by_user.remove(&user_id)?;
        if let Some(set) = inner.by_channel.get_mut(&state.channel_id) {
            set.remove(&user_id);
        }
        Some(VoiceBroadcast {
            server_id: Some(state.server_id),
            events: vec![VoiceEvent::Leave {
                user_id,
                channel_id: state.channel_id,
                server_id: state.server_id,
            }],
            directed: vec![],
        })
    }

    /// Alias for `leave`, called when a user's last connection drops.
    pub fn on_user_offline(&self, user_id: UserId) -> Option<VoiceBroadcast> {
        self.leave(user_id)
    }

    pub fn update_state(&self, user_id: UserId, update: VoiceStateUpdate) -> DomainResult<VoiceBroadcast> {
        let mut inner = self.inner.write();
        let state = inner
            .by_user
            .get_mut(&user_id)
            .ok_or(DomainError::NotFound("not in a voice channel"))?;

        if let Some(muted) = update.muted {
            state.is_muted = muted;
        }
        if let Some(deafened) = update.deafened {
            state.is_deafened = deafened;
        }
        if let Some(streaming) = update.streaming {
            state.is_streaming = streaming;
        }
        let snapshot = state.clone();

        Ok(VoiceBroadcast {
            server_id: Some(snapshot.server_id),
            events: vec![VoiceEvent::State { state: snapshot, action: VoiceAction::Update }],
            directed: vec![],
        })
    }

    pub fn admin_update_state(&self, target: UserId, update: AdminVoiceUpdate) -> DomainResult<VoiceBroadcast> {
        let mut inner = self.inner.write();
        let state = inner
            .by_user
            .get_mut(&target)
            .ok_or(DomainError::NotFound("target not in a voice channel"))?;

        if let Some(muted) = update.server_muted {
            state.is_server_muted = muted;
        }
        if let Some(deafened) = update.server_deafened {
            state.is_server_deafened = deafened;
        }
        let snapshot = state.clone();

        Ok(VoiceBroadcast {
            server_id: Some(snapshot.server_id),
            events: vec![VoiceEvent::State { state: snapshot, action: VoiceAction::Update }],
            directed: vec![],
        })
    }

    /// Force-move `target` into `dest_channel`. Both channels must belong to
    /// the same server — the caller enforces this before calling in since
    /// the store has no channel metadata of its own; passing a mismatched
    /// `dest_server_id` here is a caller bug, not something this store can
    /// detect without a channel repository.
    pub fn move_user(
        &self,
        target: UserId,
        dest_channel: ChannelId,
        dest_server_id: ServerId,
        dest_user_limit: Option<usize>,
        profile: VoiceProfile,
    ) -> DomainResult<VoiceBroadcast> {
        let mut broadcast = self.join(target, dest_channel, dest_server_id, dest_user_limit, true, profile)?;
        broadcast.directed.push((target, DirectedVoiceEvent::ForceMove { channel_id: dest_channel }));
        Ok(broadcast)
    }

    pub fn disconnect_user(&self, target: UserId) -> DomainResult<VoiceBroadcast> {
        let mut broadcast = self.leave(target).ok_or(DomainError::NotFound("target not in a voice channel"))?;
        broadcast.directed.push((target, DirectedVoiceEvent::ForceDisconnect));
        Ok(broadcast)
    }

    /// Read-only snapshot of every voice state in `server`, for `ready`/sync
    /// payloads at connection time.
    pub fn sync_for_server(&self, server_id: ServerId) -> Vec<VoiceState> {
        let inner = self.inner.read();
        inner.by_user.values().filter(|s| s.server_id == server_id).cloned().collect()
    }

    pub fn current_channel(&self, user_id: UserId) -> Option<ChannelId> {
        self.inner.read().by_user.get(&user_id).map(|s| s.channel_id)
    }

    pub fn state_of(&self, user_id: UserId) -> Option<VoiceState> {
        self.inner.read().by_user.get(&user_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> VoiceProfile {
        VoiceProfile { username: "alice".into(), display_name: "Alice".into(), avatar_url: None }
    }

    #[test]
    fn at_most_one_channel_per_user() {
        let store = VoiceStore::new();
        let user = UserId::new();
        let server = ServerId::new();
        let c1 = ChannelId::new();
        let c2 = ChannelId::new();

        store.join(user, c1, server, None, false, profile()).unwrap();
        assert_eq!(store.current_channel(user), Some(c1));

        let b = store.join(user, c2, server, None, false, profile()).unwrap();
        assert_eq!(store.current_channel(user), Some(c2));
        assert_eq!(b.events.len(), 2);
        assert!(matches!(b.events[0], VoiceEvent::Leave { .. }));
        assert!(matches!(b.events[1], VoiceEvent::State { action: VoiceAction::Join, .. }));
    }

    #[test]
    fn capacity_exceeded_without_bypass() {
        let store = VoiceStore::new();
        let server = ServerId::new();
        let channel = ChannelId::new();
        store.join(UserId::new(), channel, server, Some(1), false, profile()).unwrap();
        let err = store.join(UserId::new(), channel, server, Some(1), false, profile()).unwrap_err();
        assert!(matches!(err, DomainError::CapacityExceeded(_)));
    }

    #[test]
    fn leave_is_noop_when_absent() {
        let store = VoiceStore::new();
        assert!(store.leave(UserId::new()).is_none());
    }

    #[test]
    fn move_emits_leave_join_and_directed_force_move() {
        let store = VoiceStore::new();
        let user = UserId::new();
        let server = ServerId::new();
        let c1 = ChannelId::new();
        let c2 = ChannelId::new();
        store.join(user, c1, server, None, false, profile()).unwrap();

        let b = store.move_user(user, c2, server, None, profile()).unwrap();
        assert_eq!(b.events.len(), 2);
        assert_eq!(b.directed.len(), 1);
        assert!(matches!(b.directed[0].1, DirectedVoiceEvent::ForceMove { channel_id } if channel_id == c2));
    }
}
