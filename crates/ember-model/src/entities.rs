use chrono::{DateTime, Utc};
use ember_ids::{
    AttachmentId, CategoryId, ChannelId, DmAttachmentId, DmChannelId, DmMessageId, DmReactionId,
    FriendshipId, InviteCode, MessageId, PinId, ReactionId, RoleId, ServerId, SessionId,
    SfuInstanceId, UserId,
};
use ember_perms::Permissions;
use serde::{Deserialize, Serialize};

/// `online` is derived from "has a live connection" unless the user has
/// explicitly selected one of the other three (which persists across
/// reconnects). See `PresenceService`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Online,
    Idle,
    Dnd,
    Offline,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    Text,
    Voice,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FriendshipStatus {
    Pending,
    Accepted,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub password_hash: String,
    pub status: UserStatus,
    pub custom_status: Option<String>,
    pub email: Option<String>,
    pub language: String,
    pub is_platform_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// "display_name if non-empty else username" — applied everywhere a
    /// name is projected, per the standardized fallback policy.
    pub fn display_name(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.username,
        }
    }
}

/// API projection of `User` — omits `password_hash`, never serialized to a
/// client under any circumstance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub status: UserStatus,
    pub custom_status: Option<String>,
}

impl From<&User> for UserProfile {
    fn from(u: &User) -> Self {
        UserProfile {
            id: u.id,
            username: u.username.clone(),
            display_name: u.display_name().to_string(),
            avatar_url: u.avatar_url.clone(),
            status: u.status,
            custom_status: u.custom_status.clone(),
        }
    }
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Server {
    pub id: ServerId,
    pub name: String,
    pub icon_url: Option<String>,
    pub owner_id: UserId,
    pub invite_required: bool,
    pub sfu_instance_id: Option<SfuInstanceId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct ServerMember {
    pub server_id: ServerId,
    pub user_id: UserId,
    pub joined_at: DateTime<Utc>,
    /// Per-user ordering of this server in that user's sidebar.
    pub position: i32,
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub server_id: ServerId,
    pub name: String,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Channel {
    pub id: ChannelId,
    pub server_id: ServerId,
    pub category_id: Option<CategoryId>,
    pub name: String,
    pub r#type: ChannelType,
    pub topic: Option<String>,
    pub position: i32,
    pub user_limit: Option<i32>,
    pub bitrate: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Role {
    pub id: RoleId,
    pub server_id: ServerId,
    pub name: String,
    pub color: i32,
    pub position: i32,
    pub permissions: Permissions,
    /// Exactly one per server (the `@everyone` role); undeletable.
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, sqlx::FromRow)]
pub struct UserRole {
    pub user_id: UserId,
    pub role_id: RoleId,
    pub server_id: ServerId,
}

#[derive(Clone, Copy, Debug, sqlx::FromRow)]
pub struct ChannelPermissionOverride {
    pub channel_id: ChannelId,
    pub role_id: RoleId,
    pub allow: Permissions,
    pub deny: Permissions,
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub user_id: UserId,
    pub content: Option<String>,
    pub reply_to_id: Option<MessageId>,
    pub is_pinned: bool,
    pub edited_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Attachment {
    pub id: AttachmentId,
    pub message_id: MessageId,
    pub filename: String,
    pub file_url: String,
    pub file_size: i64,
    pub mime_type: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Reaction {
    pub id: ReactionId,
    pub message_id: MessageId,
    pub user_id: UserId,
    pub emoji: String,
}

#[derive(Clone, Copy, Debug, sqlx::FromRow)]
pub struct Mention {
    pub message_id: MessageId,
    pub user_id: UserId,
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Pin {
    pub id: PinId,
    pub message_id: MessageId,
    pub channel_id: ChannelId,
    pub pinned_by: UserId,
    pub created_at: DateTime<Utc>,
}

/// `user1_id < user2_id` always — DM channel identity is independent of
/// who initiated the conversation.
#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct DmChannel {
    pub id: DmChannelId,
    pub user1_id: UserId,
    pub user2_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl DmChannel {
    pub fn canonical_pair(a: UserId, b: UserId) -> (UserId, UserId) {
        if a.as_uuid() < b.as_uuid() {
            (a, b)
        } else {
            (b, a)
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct DmMessage {
    pub id: DmMessageId,
    pub dm_channel_id: DmChannelId,
    pub user_id: UserId,
    pub content: Option<String>,
    pub reply_to_id: Option<DmMessageId>,
    pub is_pinned: bool,
    pub edited_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct DmAttachment {
    pub id: DmAttachmentId,
    pub dm_message_id: DmMessageId,
    pub filename: String,
    pub file_url: String,
    pub file_size: i64,
    pub mime_type: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct DmReaction {
    pub id: DmReactionId,
    pub dm_message_id: DmMessageId,
    pub user_id: UserId,
    pub emoji: String,
}

/// One row per pair; `status == Accepted` implies mutual visibility
/// regardless of which user is `user_id` vs. `friend_id` — lookups must
/// try both orientations.
#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Friendship {
    pub id: FriendshipId,
    pub user_id: UserId,
    pub friend_id: UserId,
    pub status: FriendshipStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Invite {
    pub code: InviteCode,
    pub server_id: ServerId,
    pub created_by: Option<UserId>,
    pub max_uses: Option<i32>,
    pub uses: i32,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Ban {
    pub server_id: ServerId,
    pub user_id: UserId,
    pub username: String,
    pub reason: Option<String>,
    pub banned_by: UserId,
    pub created_at: DateTime<Utc>,
}

/// `muted_until == None` means indefinite; readers filter rows whose
/// `muted_until` is in the past lazily rather than via an eager sweeper.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct ServerMute {
    pub user_id: UserId,
    pub server_id: ServerId,
    pub muted_until: Option<DateTime<Utc>>,
}

impl ServerMute {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        match self.muted_until {
            Some(until) => until > now,
            None => true,
        }
    }
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct ReadState {
    pub user_id: UserId,
    pub channel_id: ChannelId,
    pub last_read_message_id: Option<MessageId>,
    pub last_read_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct SfuInstance {
    pub id: SfuInstanceId,
    pub url: String,
    pub api_key: String,
    pub api_secret: String,
    pub is_platform_managed: bool,
    pub server_count: i32,
    pub created_at: DateTime<Utc>,
}
