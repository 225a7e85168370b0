use std::sync::Arc;

use async_trait::async_trait;
use ember_ids::{ChannelId, ServerId, UserId};
use ember_hub::MembershipProvider;
use ember_perms::Permissions;
use ember_repo::{ChannelRepository, RoleRepository, ServerRepository};

/// Answers the hub's "who should see this" queries straight from the
/// repositories rather than through a separate in-memory cache — this isn't
/// on a per-voice-frame hot path, just per-broadcast, so a couple of extra
/// queries per fan-out is an acceptable trade for never drifting out of sync
/// with the database.
pub struct RepoMembershipProvider {
    servers: Arc<dyn ServerRepository>,
    channels: Arc<dyn ChannelRepository>,
    roles: Arc<dyn RoleRepository>,
}

impl RepoMembershipProvider {
    pub fn new(servers: Arc<dyn ServerRepository>, channels: Arc<dyn ChannelRepository>, roles: Arc<dyn RoleRepository>) -> Self {
        Self { servers, channels, roles }
    }
}

#[async_trait]
impl MembershipProvider for RepoMembershipProvider {
    async fn server_member_ids(&self, server_id: ServerId) -> Vec<UserId> {
        self.servers.list_members(server_id).await.map(|members| members.into_iter().map(|m| m.user_id).collect()).unwrap_or_default()
    }

    async fn channel_viewer_ids(&self, channel_id: ChannelId) -> Vec<UserId> {
        let Ok(channel) = self.channels.get_channel(channel_id).await else { return Vec::new() };
        let Ok(members) = self.servers.list_members(channel.server_id).await else { return Vec::new() };

        let mut viewers = Vec::new();
        for member in members {
            let mask = ember_services::permissions::effective_channel(
                self.servers.as_ref(),
                self.roles.as_ref(),
                self.channels.as_ref(),
                channel.server_id,
                channel_id,
                member.user_id,
            )
            .await;
            if matches!(mask, Ok(m) if m.contains(Permissions::VIEW_CHANNEL)) {
                viewers.push(member.user_id);
            }
        }
        viewers
    }
}
