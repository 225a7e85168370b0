use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use ember_hub::Hub;
use ember_ids::{DmChannelId, DmMessageId, UserId};
use ember_model::{DmChannel, DmMessage, DomainError, DomainResult};
use ember_protocol::{DmMessageDeletePayload, DmMessageView, ServerEvent};
use ember_repo::{DmRepository, FriendRepository};

const MAX_FETCH_LIMIT: i64 = 100;

/// Mirrors `MessageService`'s semantics scoped to exactly two participants —
/// no role permissions apply, only friendship/membership in the channel
/// itself.
pub struct DmService {
    dms: Arc<dyn DmRepository>,
    friends: Arc<dyn FriendRepository>,
    hub: Arc<Hub>,
}

impl DmService {
    pub fn new(dms: Arc<dyn DmRepository>, friends: Arc<dyn FriendRepository>, hub: Arc<Hub>) -> Self {
        Self { dms, friends, hub }
    }

    /// Requires a mutual friendship before a channel can be opened; existing
    /// channels between two non-friends (e.g. ex-friends) stay readable.
    pub async fn open(&self, user_id: UserId, other_id: UserId) -> DomainResult<DmChannel> {
        if self.friends.find(user_id, other_id).await?.is_none() {
            return Err(DomainError::Forbidden);
        }
        self.dms.get_or_create_channel(user_id, other_id).await
    }

    async fn require_participant(&self, dm_channel_id: DmChannelId, user_id: UserId) -> DomainResult<DmChannel> {
        let channel = self.dms.get_channel(dm_channel_id).await?;
        if channel.user1_id != user_id && channel.user2_id != user_id {
            return Err(DomainError::Forbidden);
        }
        Ok(channel)
    }

    pub async fn create(
        &self,
        dm_channel_id: DmChannelId,
        author_id: UserId,
        content: &str,
        reply_to_id: Option<DmMessageId>,
    ) -> DomainResult<DmMessageView> {
        let channel = self.require_participant(dm_channel_id, author_id).await?;
        let message = DmMessage {
            id: DmMessageId::new(),
            dm_channel_id,
            user_id: author_id,
            content: Some(content.to_string()),
            reply_to_id,
            is_pinned: false,
            edited_at: None,
            created_at: Utc::now(),
        };
        let created = self.dms.create_message(message).await?;
        let view = DmMessageView { message: created.clone(), attachments: Vec::new(), reactions: Vec::new() };

        self.hub
            .broadcast_to_users(&[channel.user1_id, channel.user2_id], ServerEvent::DmMessageCreate(created))
            .await;
        Ok(view)
    }

    pub async fn edit(&self, dm_channel_id: DmChannelId, message_id: DmMessageId, editor_id: UserId, content: &str) -> DomainResult<DmMessage> {
        let channel = self.require_participant(dm_channel_id, editor_id).await?;
        let updated = self.dms.update_message(message_id, content).await?;
        self.hub.broadcast_to_users(&[channel.user1_id, channel.user2_id], ServerEvent::DmMessageUpdate(updated.clone())).await;
        Ok(updated)
    }

    pub async fn delete(&self, dm_channel_id: DmChannelId, message_id: DmMessageId, actor_id: UserId) -> DomainResult<()> {
        let channel = self.require_participant(dm_channel_id, actor_id).await?;
        self.dms.delete_message(message_id).await?;
        self.hub
            .broadcast_to_users(
                &[channel.user1_id, channel.user2_id],
                ServerEvent::DmMessageDelete(DmMessageDeletePayload { id: message_id, dm_channel_id }),
            )
            .await;
        Ok(())
    }

    pub async fn list_before(
        &self,
        dm_channel_id: DmChannelId,
        viewer_id: UserId,
        before: Option<DmMessageId>,
        limit: i64,
    ) -> DomainResult<Vec<DmMessageView>> {
        self.require_participant(dm_channel_id, viewer_id).await?;
        let limit = limit.clamp(1, MAX_FETCH_LIMIT);
        let messages = self.dms.list_messages_before(dm_channel_id, before, limit).await?;

        let ids: Vec<DmMessageId> = messages.iter().map(|m| m.id).collect();
        let attachments = self.dms.list_attachments_for(&ids).await?;
        let reactions = self.dms.list_reactions_for(&ids).await?;

        let mut attachments_by_message: HashMap<DmMessageId, Vec<ember_model::DmAttachment>> = HashMap::new();
        for a in attachments {
            attachments_by_message.entry(a.dm_message_id).or_default().push(a);
        }
        let mut reactions_by_message: HashMap<DmMessageId, Vec<(String, UserId)>> = HashMap::new();
        for r in reactions {
            reactions_by_message.entry(r.dm_message_id).or_default().push((r.emoji, r.user_id));
        }

        Ok(messages
            .into_iter()
            .map(|message| {
                let id = message.id;
                DmMessageView {
                    attachments: attachments_by_message.remove(&id).unwrap_or_default(),
                    reactions: crate::reactions::group(reactions_by_message.remove(&id).unwrap_or_default()),
                    message,
                }
            })
            .collect())
    }

    pub async fn list_channels(&self, user_id: UserId) -> DomainResult<Vec<DmChannel>> {
        self.dms.list_channels_for_user(user_id).await
    }
}
