use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use ember_hub::Hub;
use ember_ids::{ChannelId, MessageId, PinId, UserId};
use ember_model::{ChannelType, DomainError, DomainResult, Message};
use ember_perms::Permissions;
use ember_protocol::{MessageDeletePayload, MessagePinPayload, MessageUnpinPayload, MessageView, ReactionGroup, ReactionUpdatePayload, ServerEvent};
use ember_repo::{ChannelRepository, MessageRepository, RoleRepository, ServerRepository, UserRepository};

use crate::mentions;
use crate::permissions;

const MAX_FETCH_LIMIT: i64 = 100;
const MAX_PINS_PER_CHANNEL: i64 = 50;

pub struct MessageService {
    messages: Arc<dyn MessageRepository>,
    channels: Arc<dyn ChannelRepository>,
    roles: Arc<dyn RoleRepository>,
    servers: Arc<dyn ServerRepository>,
    users: Arc<dyn UserRepository>,
    hub: Arc<Hub>,
}

impl MessageService {
    pub fn new(
        messages: Arc<dyn MessageRepository>,
        channels: Arc<dyn ChannelRepository>,
        roles: Arc<dyn RoleRepository>,
        servers: Arc<dyn ServerRepository>,
        users: Arc<dyn UserRepository>,
        hub: Arc<Hub>,
    ) -> Self {
        Self { messages, channels, roles, servers, users, hub }
    }

    async fn require_channel(&self, channel_id: ChannelId, user_id: UserId, required: Permissions) -> DomainResult<()> {
        let mask = permissions::effective_channel(
            self.servers.as_ref(),
            self.roles.as_ref(),
            self.channels.as_ref(),
            self.channels.get_channel(channel_id).await?.server_id,
            channel_id,
            user_id,
        )
        .await?;
        permissions::require(mask, required)
    }

    pub async fn create(
        &self,
        channel_id: ChannelId,
        author_id: UserId,
        content: &str,
        reply_to_id: Option<MessageId>,
    ) -> DomainResult<MessageView> {
        let channel = self.channels.get_channel(channel_id).await?;
        if channel.r#type != ChannelType::Text {
            return Err(DomainError::InvalidInput("channel is not a text channel".into()));
        }
        self.require_channel(channel_id, author_id, Permissions::SEND_MESSAGES).await?;

        if content.contains("@everyone") || content.contains("@here") {
            self.require_channel(channel_id, author_id, Permissions::MENTION_EVERYONE).await?;
        }

        let mention_ids = mentions::resolve(self.users.as_ref(), content).await;

        let message = Message {
            id: MessageId::new(),
            channel_id,
            user_id: author_id,
            content: Some(content.to_string()),
            reply_to_id,
            is_pinned: false,
            edited_at: None,
            created_at: Utc::now(),
        };
        let created = self.messages.create(message, &mention_ids).await?;
        let view = MessageView { message: created.clone(), attachments: Vec::new(), reactions: Vec::new(), mentions: mention_ids };

        self.hub.broadcast_to_channel_viewers(channel_id, ServerEvent::MessageCreate(created)).await;
        Ok(view)
    }

    pub async fn edit(&self, message_id: MessageId, editor_id: UserId, content: &str) -> DomainResult<Message> {
        let existing = self.messages.get(message_id).await?;
        if existing.user_id != editor_id {
            self.require_channel(existing.channel_id, editor_id, Permissions::MANAGE_MESSAGES).await?;
        }
        let updated = self.messages.update_content(message_id, content).await?;
        self.hub.broadcast_to_channel_viewers(updated.channel_id, ServerEvent::MessageUpdate(updated.clone())).await;
        Ok(updated)
    }

    pub async fn delete(&self, message_id: MessageId, actor_id: UserId) -> DomainResult<()> {
        let existing = self.messages.get(message_id).await?;
        if existing.user_id != actor_id {
            self.require_channel(existing.channel_id, actor_id, Permissions::MANAGE_MESSAGES).await?;
        }
        self.messages.delete(message_id).await?;
        self.hub
            .broadcast_to_channel_viewers(
                existing.channel_id,
                ServerEvent::MessageDelete(MessageDeletePayload { id: message_id, channel_id: existing.channel_id }),
            )
            .await;
        Ok(())
    }

    pub async fn list_before(
        &self,
        channel_id: ChannelId,
        viewer_id: UserId,
        before: Option<MessageId>,
        limit: i64,
    ) -> DomainResult<Vec<MessageView>> {
        self.require_channel(channel_id, viewer_id, Permissions::VIEW_CHANNEL | Permissions::READ_MESSAGE_HISTORY).await?;
        let limit = limit.clamp(1, MAX_FETCH_LIMIT);
        let messages = self.messages.list_before(channel_id, before, limit).await?;
        self.to_views(messages).await
    }

    pub async fn search(
        &self,
        channel_id: Option<ChannelId>,
        viewer_id: UserId,
        query: &str,
        limit: i64,
        offset: i64,
    ) -> DomainResult<Vec<MessageView>> {
        if let Some(channel_id) = channel_id {
            self.require_channel(channel_id, viewer_id, Permissions::VIEW_CHANNEL | Permissions::READ_MESSAGE_HISTORY).await?;
        }
        let limit = limit.clamp(1, MAX_FETCH_LIMIT);
        let messages = self.messages.search(channel_id, query, limit, offset).await?;
        self.to_views(messages).await
    }

    pub async fn pin(&self, message_id: MessageId, actor_id: UserId) -> DomainResult<()> {
        let message = self.messages.get(message_id).await?;
        self.require_channel(message.channel_id, actor_id, Permissions::MANAGE_MESSAGES).await?;

        if self.messages.pin_count(message.channel_id).await? >= MAX_PINS_PER_CHANNEL {
            return Err(DomainError::CapacityExceeded("channel pin limit reached"));
        }

        let pin_id = PinId::new();
        self.messages
            .pin(ember_model::Pin { id: pin_id, message_id, channel_id: message.channel_id, pinned_by: actor_id, created_at: Utc::now() })
            .await?;

        self.hub
            .broadcast_to_channel_viewers(
                message.channel_id,
                ServerEvent::MessagePin(MessagePinPayload { pin_id, message_id, channel_id: message.channel_id, pinned_by: actor_id }),
            )
            .await;
        Ok(())
    }

    pub async fn unpin(&self, message_id: MessageId, actor_id: UserId) -> DomainResult<()> {
        let message = self.messages.get(message_id).await?;
        self.require_channel(message.channel_id, actor_id, Permissions::MANAGE_MESSAGES).await?;
        self.messages.unpin(message_id).await?;
        self.hub
            .broadcast_to_channel_viewers(
                message.channel_id,
                ServerEvent::MessageUnpin(MessageUnpinPayload { message_id, channel_id: message.channel_id }),
            )
            .await;
        Ok(())
    }

    /// Batch-loads attachments, reactions and mentions for a page of
    /// messages in three queries total, regardless of page size.
    async fn to_views(&self, messages: Vec<Message>) -> DomainResult<Vec<MessageView>> {
        let ids: Vec<MessageId> = messages.iter().map(|m| m.id).collect();
        let attachments = self.messages.list_attachments_for(&ids).await?;
        let mentions = self.messages.list_mentions_for(&ids).await?;
        let mut reaction_groups = self.reaction_groups(&ids).await?;

        let mut attachments_by_message: HashMap<MessageId, Vec<ember_model::Attachment>> = HashMap::new();
        for a in attachments {
            attachments_by_message.entry(a.message_id).or_default().push(a);
        }
        let mut mentions_by_message: HashMap<MessageId, Vec<UserId>> = HashMap::new();
        for m in mentions {
            mentions_by_message.entry(m.message_id).or_default().push(m.user_id);
        }

        Ok(messages
            .into_iter()
            .map(|message| {
                let id = message.id;
                MessageView {
                    attachments: attachments_by_message.remove(&id).unwrap_or_default(),
                    reactions: reaction_groups.remove(&id).unwrap_or_default(),
                    mentions: mentions_by_message.remove(&id).unwrap_or_default(),
                    message,
                }
            })
            .collect())
    }

    async fn reaction_groups(&self, message_ids: &[MessageId]) -> DomainResult<HashMap<MessageId, Vec<ReactionGroup>>> {
        let reactions = self.messages.list_reactions_for(message_ids).await?;
        let mut by_message: HashMap<MessageId, Vec<(String, UserId)>> = HashMap::new();
        for r in reactions {
            by_message.entry(r.message_id).or_default().push((r.emoji, r.user_id));
        }
        Ok(by_message.into_iter().map(|(id, pairs)| (id, crate::reactions::group(pairs))).collect())
    }
}
