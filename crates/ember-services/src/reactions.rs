use std::sync::Arc;

use ember_hub::Hub;
use ember_ids::{DmChannelId, DmMessageId, MessageId, UserId};
use ember_model::DomainResult;
use ember_perms::Permissions;
use ember_protocol::{DmReactionUpdatePayload, ReactionGroup, ReactionUpdatePayload, ServerEvent};
use ember_repo::{ChannelRepository, DmRepository, MessageRepository, RoleRepository, ServerRepository};

use crate::permissions;

/// Groups `(emoji, user_id)` pairs into the post-state group list a
/// `reaction_update` event carries. Group order follows first sighting of
/// each emoji, not insertion time within a group.
pub fn group(pairs: Vec<(String, UserId)>) -> Vec<ReactionGroup> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: std::collections::HashMap<String, Vec<UserId>> = std::collections::HashMap::new();
    for (emoji, user_id) in pairs {
        if !groups.contains_key(&emoji) {
            order.push(emoji.clone());
        }
        groups.entry(emoji).or_default().push(user_id);
    }
    order.into_iter().map(|emoji| ReactionGroup { user_ids: groups.remove(&emoji).unwrap_or_default(), emoji }).collect()
}

pub struct ReactionService {
    messages: Arc<dyn MessageRepository>,
    channels: Arc<dyn ChannelRepository>,
    roles: Arc<dyn RoleRepository>,
    servers: Arc<dyn ServerRepository>,
    dms: Arc<dyn DmRepository>,
    hub: Arc<Hub>,
}

impl ReactionService {
    pub fn new(
        messages: Arc<dyn MessageRepository>,
        channels: Arc<dyn ChannelRepository>,
        roles: Arc<dyn RoleRepository>,
        servers: Arc<dyn ServerRepository>,
        dms: Arc<dyn DmRepository>,
        hub: Arc<Hub>,
    ) -> Self {
        Self { messages, channels, roles, servers, dms, hub }
    }

    /// Toggles `emoji` for `user_id` on a channel message and broadcasts the
    /// full post-state group list to the channel's viewers.
    pub async fn toggle_message(&self, message_id: MessageId, user_id: UserId, emoji: &str) -> DomainResult<()> {
        let message = self.messages.get(message_id).await?;
        let channel = self.channels.get_channel(message.channel_id).await?;
        let mask =
            permissions::effective_channel(self.servers.as_ref(), self.roles.as_ref(), self.channels.as_ref(), channel.server_id, channel.id, user_id)
                .await?;
        permissions::require(mask, Permissions::VIEW_CHANNEL | Permissions::ADD_REACTIONS)?;

        self.messages.toggle_reaction(message_id, user_id, emoji).await?;
        let groups = self.message_groups(message_id).await?;

        self.hub
            .broadcast_to_channel_viewers(
                message.channel_id,
                ServerEvent::ReactionUpdate(ReactionUpdatePayload { message_id, channel_id: message.channel_id, groups }),
            )
            .await;
        Ok(())
    }

    /// Toggles `emoji` for `user_id` on a DM message and broadcasts the
    /// post-state group list directly to both participants.
    pub async fn toggle_dm(&self, dm_message_id: DmMessageId, dm_channel_id: DmChannelId, user_id: UserId, emoji: &str) -> DomainResult<()> {
        let channel = self.dms.get_channel(dm_channel_id).await?;

        self.dms.toggle_reaction(dm_message_id, user_id, emoji).await?;
        let groups = self.dm_groups(dm_message_id).await?;

        self.hub
            .broadcast_to_users(
                &[channel.user1_id, channel.user2_id],
                ServerEvent::DmReactionUpdate(DmReactionUpdatePayload { dm_message_id, dm_channel_id, groups }),
            )
            .await;
        Ok(())
    }

    async fn message_groups(&self, message_id: MessageId) -> DomainResult<Vec<ReactionGroup>> {
        let reactions = self.messages.list_reactions(message_id).await?;
        Ok(group(reactions.into_iter().map(|r| (r.emoji, r.user_id)).collect()))
    }

    async fn dm_groups(&self, dm_message_id: DmMessageId) -> DomainResult<Vec<ReactionGroup>> {
        let reactions = self.dms.list_reactions(dm_message_id).await?;
        Ok(group(reactions.into_iter().map(|r| (r.emoji, r.user_id)).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(n: u128) -> UserId {
        UserId::from_uuid(uuid::Uuid::from_u128(n))
    }

    #[test]
    fn groups_by_emoji_preserving_first_sighting_order() {
        let groups = group(vec![
            ("👍".to_string(), uid(1)),
            ("🎉".to_string(), uid(2)),
            ("👍".to_string(), uid(3)),
        ]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].emoji, "👍");
        assert_eq!(groups[0].user_ids, vec![uid(1), uid(3)]);
        assert_eq!(groups[1].emoji, "🎉");
        assert_eq!(groups[1].user_ids, vec![uid(2)]);
    }
}
