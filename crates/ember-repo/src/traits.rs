use async_trait::async_trait;
use ember_ids::{
    CategoryId, ChannelId, DmChannelId, DmMessageId, FriendshipId, InviteCode, MessageId, PinId,
    RoleId, ServerId, SessionId, SfuInstanceId, UserId,
};
use ember_model::{
    Ban, Category, Channel, ChannelPermissionOverride, DmAttachment, DmChannel, DmMessage,
    DmReaction, DomainResult, Friendship, Invite, Mention, Message, ReadState, Reaction, Role,
    Server, ServerMember, ServerMute, Session, SfuInstance, User, UserRole,
};

/// Each trait below is a capability-set interface — a service depends on
/// exactly the repositories it needs, and the persistence engine behind
/// them can be swapped without touching service code. All methods take an
/// implicit cancellation bound to the calling HTTP request or WebSocket
/// session via the connection pool's own timeout configuration.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, username: &str, password_hash: &str, email: Option<&str>) -> DomainResult<User>;
    async fn get(&self, id: UserId) -> DomainResult<User>;
    async fn get_by_username(&self, username: &str) -> DomainResult<User>;
    async fn update_status(&self, id: UserId, status: ember_model::UserStatus, custom_status: Option<&str>) -> DomainResult<()>;
    async fn update_profile(&self, id: UserId, display_name: Option<&str>, avatar_url: Option<&str>) -> DomainResult<User>;
    async fn delete(&self, id: UserId) -> DomainResult<()>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(&self, user_id: UserId, refresh_token: &str, expires_at: chrono::DateTime<chrono::Utc>) -> DomainResult<Session>;
    async fn get_by_token(&self, refresh_token: &str) -> DomainResult<Session>;
    async fn delete(&self, id: SessionId) -> DomainResult<()>;
    async fn delete_by_token(&self, refresh_token: &str) -> DomainResult<()>;
    async fn delete_expired(&self) -> DomainResult<u64>;
}

#[async_trait]
pub trait ServerRepository: Send + Sync {
    async fn create(&self, name: &str, owner_id: UserId) -> DomainResult<Server>;
    async fn get(&self, id: ServerId) -> DomainResult<Server>;
    async fn update(&self, id: ServerId, name: Option<&str>, icon_url: Option<&str>) -> DomainResult<Server>;
    async fn delete(&self, id: ServerId) -> DomainResult<()>;
    async fn list_for_user(&self, user_id: UserId) -> DomainResult<Vec<Server>>;

    async fn add_member(&self, server_id: ServerId, user_id: UserId) -> DomainResult<ServerMember>;
    async fn remove_member(&self, server_id: ServerId, user_id: UserId) -> DomainResult<()>;
    async fn get_member(&self, server_id: ServerId, user_id: UserId) -> DomainResult<ServerMember>;
    async fn list_members(&self, server_id: ServerId) -> DomainResult<Vec<ServerMember>>;
    async fn reorder_servers(&self, user_id: UserId, positions: &[(ServerId, i32)]) -> DomainResult<()>;

    async fn create_invite(&self, server_id: ServerId, created_by: Option<UserId>, max_uses: Option<i32>, expires_at: Option<chrono::DateTime<chrono::Utc>>) -> DomainResult<Invite>;
    async fn get_invite(&self, code: &InviteCode) -> DomainResult<Invite>;
    async fn consume_invite(&self, code: &InviteCode) -> DomainResult<Invite>;
    async fn delete_invite(&self, code: &InviteCode) -> DomainResult<()>;

    async fn ban(&self, ban: Ban) -> DomainResult<()>;
    async fn unban(&self, server_id: ServerId, user_id: UserId) -> DomainResult<()>;
    async fn list_bans(&self, server_id: ServerId) -> DomainResult<Vec<Ban>>;
    async fn is_banned(&self, server_id: ServerId, user_id: UserId) -> DomainResult<bool>;

    async fn set_mute(&self, mute: ServerMute) -> DomainResult<()>;
    async fn get_mute(&self, server_id: ServerId, user_id: UserId) -> DomainResult<Option<ServerMute>>;
    async fn clear_mute(&self, server_id: ServerId, user_id: UserId) -> DomainResult<()>;
}

#[async_trait]
pub trait ChannelRepository: Send + Sync {
    async fn create_category(&self, server_id: ServerId, name: &str) -> DomainResult<Category>;
    async fn update_category(&self, id: CategoryId, name: &str) -> DomainResult<Category>;
    async fn delete_category(&self, id: CategoryId) -> DomainResult<()>;
    async fn list_categories(&self, server_id: ServerId) -> DomainResult<Vec<Category>>;

    async fn create_channel(&self, channel: Channel) -> DomainResult<Channel>;
    async fn get_channel(&self, id: ChannelId) -> DomainResult<Channel>;
    async fn update_channel(&self, channel: Channel) -> DomainResult<Channel>;
    async fn delete_channel(&self, id: ChannelId) -> DomainResult<()>;
    async fn list_channels(&self, server_id: ServerId) -> DomainResult<Vec<Channel>>;
    /// Applies every `(channel_id, position)` pair atomically within one
    /// transaction so a reorder is never observed half-applied.
    async fn reorder_channels(&self, positions: &[(ChannelId, i32)]) -> DomainResult<()>;

    async fn set_channel_override(&self, ov: ChannelPermissionOverride) -> DomainResult<()>;
    async fn delete_channel_override(&self, channel_id: ChannelId, role_id: RoleId) -> DomainResult<()>;
    async fn list_channel_overrides(&self, channel_id: ChannelId) -> DomainResult<Vec<ChannelPermissionOverride>>;
}

#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn create(&self, role: Role) -> DomainResult<Role>;
    async fn update(&self, role: Role) -> DomainResult<Role>;
    /// `forbidden` if the target role is the server's default role.
    async fn delete(&self, id: RoleId) -> DomainResult<()>;
    async fn list_for_server(&self, server_id: ServerId) -> DomainResult<Vec<Role>>;
    async fn list_for_user(&self, server_id: ServerId, user_id: UserId) -> DomainResult<Vec<Role>>;
    async fn reorder(&self, positions: &[(RoleId, i32)]) -> DomainResult<()>;
    async fn assign(&self, grant: UserRole) -> DomainResult<()>;
    async fn unassign(&self, user_id: UserId, role_id: RoleId) -> DomainResult<()>;
    async fn default_role(&self, server_id: ServerId) -> DomainResult<Role>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn create(&self, message: Message, mentions: &[UserId]) -> DomainResult<Message>;
    async fn get(&self, id: MessageId) -> DomainResult<Message>;
    async fn update_content(&self, id: MessageId, content: &str) -> DomainResult<Message>;
    /// Soft delete; guarded by `AND deleted = FALSE` at the store level so a
    /// racing double-delete is a no-op rather than a second broadcast.
    async fn delete(&self, id: MessageId) -> DomainResult<()>;
    /// Cursor pagination on `(created_at, id)`, newest first.
    async fn list_before(&self, channel_id: ChannelId, before: Option<MessageId>, limit: i64) -> DomainResult<Vec<Message>>;
    async fn list_attachments_for(&self, message_ids: &[MessageId]) -> DomainResult<Vec<ember_model::Attachment>>;
    async fn list_mentions_for(&self, message_ids: &[MessageId]) -> DomainResult<Vec<Mention>>;
    async fn search(&self, channel_id: Option<ChannelId>, sanitized_query: &str, limit: i64, offset: i64) -> DomainResult<Vec<Message>>;

    async fn toggle_reaction(&self, message_id: MessageId, user_id: UserId, emoji: &str) -> DomainResult<bool>;
    async fn list_reactions(&self, message_id: MessageId) -> DomainResult<Vec<Reaction>>;
    async fn list_reactions_for(&self, message_ids: &[MessageId]) -> DomainResult<Vec<Reaction>>;

    async fn pin(&self, pin: ember_model::Pin) -> DomainResult<()>;
    async fn unpin(&self, message_id: MessageId) -> DomainResult<()>;
    async fn list_pins(&self, channel_id: ChannelId) -> DomainResult<Vec<ember_model::Pin>>;
    async fn pin_count(&self, channel_id: ChannelId) -> DomainResult<i64>;
    async fn pin_by_id(&self, pin_id: PinId) -> DomainResult<ember_model::Pin>;
}

#[async_trait]
pub trait DmRepository: Send + Sync {
    async fn get_or_create_channel(&self, user_a: UserId, user_b: UserId) -> DomainResult<DmChannel>;
    async fn get_channel(&self, id: DmChannelId) -> DomainResult<DmChannel>;
    async fn list_channels_for_user(&self, user_id: UserId) -> DomainResult<Vec<DmChannel>>;

    async fn create_message(&self, message: DmMessage) -> DomainResult<DmMessage>;
    async fn update_message(&self, id: DmMessageId, content: &str) -> DomainResult<DmMessage>;
    async fn delete_message(&self, id: DmMessageId) -> DomainResult<()>;
    async fn list_messages_before(&self, dm_channel_id: DmChannelId, before: Option<DmMessageId>, limit: i64) -> DomainResult<Vec<DmMessage>>;

    async fn toggle_reaction(&self, dm_message_id: DmMessageId, user_id: UserId, emoji: &str) -> DomainResult<bool>;
    async fn list_reactions(&self, dm_message_id: DmMessageId) -> DomainResult<Vec<DmReaction>>;
    async fn list_reactions_for(&self, dm_message_ids: &[DmMessageId]) -> DomainResult<Vec<DmReaction>>;
    async fn list_attachments_for(&self, message_ids: &[DmMessageId]) -> DomainResult<Vec<DmAttachment>>;

    async fn pin(&self, dm_message_id: DmMessageId, pinned_by: UserId) -> DomainResult<()>;
    async fn unpin(&self, dm_message_id: DmMessageId) -> DomainResult<()>;
}

#[async_trait]
pub trait FriendRepository: Send + Sync {
    async fn request(&self, user_id: UserId, friend_id: UserId) -> DomainResult<Friendship>;
    /// Flips status on the single row regardless of which side originated
    /// the request — callers must try both `(user_id, friend_id)`
    /// orientations before concluding `not_found`.
    async fn accept(&self, id: FriendshipId) -> DomainResult<Friendship>;
    async fn decline(&self, id: FriendshipId) -> DomainResult<()>;
    async fn remove(&self, user_id: UserId, friend_id: UserId) -> DomainResult<()>;
    async fn find(&self, user_id: UserId, friend_id: UserId) -> DomainResult<Option<Friendship>>;
    async fn list_for_user(&self, user_id: UserId) -> DomainResult<Vec<Friendship>>;
}

#[async_trait]
pub trait ReadStateRepository: Send + Sync {
    async fn mark_read(&self, user_id: UserId, channel_id: ChannelId, message_id: MessageId) -> DomainResult<()>;
    async fn get(&self, user_id: UserId, channel_id: ChannelId) -> DomainResult<Option<ReadState>>;
    /// Single statement joining every text channel in `server_id` to its
    /// newest message and upserting read-state for `user_id` — a repeat
    /// call is idempotent and yields zero additional rows changed.
    async fn mark_all_read(&self, user_id: UserId, server_id: ServerId) -> DomainResult<u64>;
}

#[async_trait]
pub trait SfuRepository: Send + Sync {
    async fn get(&self, id: SfuInstanceId) -> DomainResult<SfuInstance>;
    async fn least_loaded(&self) -> DomainResult<SfuInstance>;
    async fn increment_server_count(&self, id: SfuInstanceId, delta: i32) -> DomainResult<()>;
}
