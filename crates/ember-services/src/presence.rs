use std::sync::Arc;

use async_trait::async_trait;
use ember_hub::{ConnectionLifecycle, Hub};
use ember_ids::UserId;
use ember_model::{DomainResult, UserStatus};
use ember_protocol::{PresenceUpdatePayload, ServerEvent};
use ember_repo::UserRepository;

/// `online` is derived from connection presence; `idle`/`dnd`/`offline`
/// (invisible) are explicit user choices that persist across reconnects. A
/// manual selection of `online` is indistinguishable from the derived state.
pub struct PresenceService {
    users: Arc<dyn UserRepository>,
    hub: Arc<Hub>,
}

impl PresenceService {
    pub fn new(users: Arc<dyn UserRepository>, hub: Arc<Hub>) -> Self {
        Self { users, hub }
    }

    /// A manual status selection. `Offline` here means invisible, not
    /// "has no connection" — the two are broadcast identically.
    pub async fn set_status(&self, user_id: UserId, status: UserStatus, custom_status: Option<&str>) -> DomainResult<()> {
        self.users.update_status(user_id, status, custom_status).await?;
        self.hub.broadcast_to_all(ServerEvent::PresenceUpdate(PresenceUpdatePayload { user_id, status, custom_status: custom_status.map(str::to_string) })).await;
        Ok(())
    }
}

#[async_trait]
impl ConnectionLifecycle for PresenceService {
    /// Re-announces whatever status the user last selected — `idle`/`dnd`
    /// carry over across a reconnect. `offline` here means invisible; the
    /// user stays looking offline and nothing is broadcast.
    async fn on_first_connect(&self, user_id: UserId) {
        let Ok(user) = self.users.get(user_id).await else { return };
        if user.status == UserStatus::Offline {
            return;
        }
        self.hub
            .broadcast_to_all(ServerEvent::PresenceUpdate(PresenceUpdatePayload { user_id, status: user.status, custom_status: user.custom_status }))
            .await;
    }

    /// Broadcasts `offline` only when the user's connection count has
    /// dropped to zero — the hub guarantees this hook fires exactly once per
    /// such edge, so no additional bookkeeping is needed here.
    async fn on_last_disconnect(&self, user_id: UserId) {
        let Ok(user) = self.users.get(user_id).await else { return };
        self.hub
            .broadcast_to_all(ServerEvent::PresenceUpdate(PresenceUpdatePayload { user_id, status: UserStatus::Offline, custom_status: user.custom_status }))
            .await;
    }
}
