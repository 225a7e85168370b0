use ember_calls::Call;
use ember_ids::{
    CategoryId, ChannelId, DmChannelId, DmMessageId, FriendshipId, MessageId, PinId, ReactionId,
    RoleId, ServerId, UserId,
};
use ember_model::{
    Category, Channel, ChannelPermissionOverride, DmChannel, DmMessage, Friendship, Message, Role,
    Server, UserProfile,
};
use serde::Serialize;

use crate::envelope::{CallSignalPayload, ErrorPayload, ReadyPayload, SfuTokenPayload, VoiceStatePayload};

#[derive(Clone, Debug, Serialize)]
pub struct ReactionGroup {
    pub emoji: String,
    pub user_ids: Vec<UserId>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ReactionUpdatePayload {
    pub message_id: MessageId,
    pub channel_id: ChannelId,
    pub groups: Vec<ReactionGroup>,
}

#[derive(Clone, Debug, Serialize)]
pub struct DmReactionUpdatePayload {
    pub dm_message_id: DmMessageId,
    pub dm_channel_id: DmChannelId,
    pub groups: Vec<ReactionGroup>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PresenceUpdatePayload {
    pub user_id: UserId,
    pub status: ember_model::UserStatus,
    pub custom_status: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct TypingStartPayload {
    pub channel_id: ChannelId,
    pub user_id: UserId,
}

#[derive(Clone, Debug, Serialize)]
pub struct DmTypingStartPayload {
    pub dm_channel_id: DmChannelId,
    pub user_id: UserId,
}

#[derive(Clone, Debug, Serialize)]
pub struct MemberJoinPayload {
    pub server_id: ServerId,
    pub user: UserProfile,
}

#[derive(Clone, Debug, Serialize)]
pub struct MemberLeavePayload {
    pub server_id: ServerId,
    pub user_id: UserId,
}

#[derive(Clone, Debug, Serialize)]
pub struct MemberUpdatePayload {
    pub server_id: ServerId,
    pub user_id: UserId,
    pub role_ids: Vec<RoleId>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ChannelDeletePayload {
    pub server_id: ServerId,
    pub channel_id: ChannelId,
}

#[derive(Clone, Debug, Serialize)]
pub struct ChannelReorderPayload {
    pub server_id: ServerId,
    pub positions: Vec<(ChannelId, i32)>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CategoryDeletePayload {
    pub server_id: ServerId,
    pub category_id: CategoryId,
}

#[derive(Clone, Debug, Serialize)]
pub struct RoleDeletePayload {
    pub server_id: ServerId,
    pub role_id: RoleId,
}

#[derive(Clone, Debug, Serialize)]
pub struct RolesReorderPayload {
    pub server_id: ServerId,
    pub positions: Vec<(RoleId, i32)>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ServerDeletePayload {
    pub server_id: ServerId,
}

#[derive(Clone, Debug, Serialize)]
pub struct MessagePinPayload {
    pub pin_id: PinId,
    pub message_id: MessageId,
    pub channel_id: ChannelId,
    pub pinned_by: UserId,
}

#[derive(Clone, Debug, Serialize)]
pub struct MessageUnpinPayload {
    pub message_id: MessageId,
    pub channel_id: ChannelId,
}

#[derive(Clone, Debug, Serialize)]
pub struct ChannelPermissionDeletePayload {
    pub channel_id: ChannelId,
    pub role_id: RoleId,
}

#[derive(Clone, Debug, Serialize)]
pub struct MessageDeletePayload {
    pub id: MessageId,
    pub channel_id: ChannelId,
}

#[derive(Clone, Debug, Serialize)]
pub struct DmMessageDeletePayload {
    pub id: DmMessageId,
    pub dm_channel_id: DmChannelId,
}

#[derive(Clone, Debug, Serialize)]
pub struct FriendRemovePayload {
    pub user_id: UserId,
    pub friend_id: UserId,
}

/// Server→client domain events, keyed by op name. Each variant carries its
/// own typed payload; marshaling into the untyped `{op, d, seq}` envelope
/// happens only at `ServerEvent::op_name`/`to_envelope` — nowhere else in
/// the service layer touches `serde_json::Value` directly.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum ServerEvent {
    HeartbeatAck,
    Ready(ReadyPayload),
    PresenceUpdate(PresenceUpdatePayload),
    TypingStart(TypingStartPayload),
    MessageCreate(Message),
    MessageUpdate(Message),
    MessageDelete(MessageDeletePayload),
    ChannelCreate(Channel),
    ChannelUpdate(Channel),
    ChannelDelete(ChannelDeletePayload),
    ChannelReorder(ChannelReorderPayload),
    CategoryCreate(Category),
    CategoryUpdate(Category),
    CategoryDelete(CategoryDeletePayload),
    MemberJoin(MemberJoinPayload),
    MemberLeave(MemberLeavePayload),
    MemberUpdate(MemberUpdatePayload),
    RoleCreate(Role),
    RoleUpdate(Role),
    RoleDelete(RoleDeletePayload),
    RolesReorder(RolesReorderPayload),
    ServerCreate(Server),
    ServerUpdate(Server),
    ServerDelete(ServerDeletePayload),
    MessagePin(MessagePinPayload),
    MessageUnpin(MessageUnpinPayload),
    ReactionUpdate(ReactionUpdatePayload),
    ChannelPermissionUpdate(ChannelPermissionOverride),
    ChannelPermissionDelete(ChannelPermissionDeletePayload),
    DmChannelCreate(DmChannel),
    DmMessageCreate(DmMessage),
    DmMessageUpdate(DmMessage),
    DmMessageDelete(DmMessageDeletePayload),
    DmReactionUpdate(DmReactionUpdatePayload),
    DmTypingStart(DmTypingStartPayload),
    DmMessagePin(MessagePinPayload),
    DmMessageUnpin(MessageUnpinPayload),
    VoiceStateUpdate(VoiceStatePayload),
    VoiceForceMove(VoiceStatePayload),
    VoiceForceDisconnect { user_id: UserId },
    VoiceStatesSync(Vec<ember_voice::VoiceState>),
    VoiceSfuToken(SfuTokenPayload),
    FriendRequestCreate(Friendship),
    FriendRequestAccept(Friendship),
    FriendRequestDecline { friendship_id: FriendshipId },
    FriendRemove(FriendRemovePayload),
    P2pCallInitiate(Call),
    P2pCallAccept(Call),
    P2pCallDecline { call_id: ember_ids::CallId },
    P2pCallEnd { call_id: ember_ids::CallId },
    P2pCallBusy,
    P2pSignal(CallSignalPayload),
    Error(ErrorPayload),
}

impl ServerEvent {
    /// The exact op string from the source event catalogue.
    pub fn op_name(&self) -> &'static str {
        use ServerEvent::*;
        match self {
            HeartbeatAck => "heartbeat_ack",
            Ready(_) => "ready",
            PresenceUpdate(_) => "presence_update",
            TypingStart(_) => "typing_start",
            MessageCreate(_) => "message_create",
            MessageUpdate(_) => "message_update",
            MessageDelete(_) => "message_delete",
            ChannelCreate(_) => "channel_create",
            ChannelUpdate(_) => "channel_update",
            ChannelDelete(_) => "channel_delete",
            ChannelReorder(_) => "channel_reorder",
            CategoryCreate(_) => "category_create",
            CategoryUpdate(_) => "category_update",
            CategoryDelete(_) => "category_delete",
            MemberJoin(_) => "member_join",
            MemberLeave(_) => "member_leave",
            MemberUpdate(_) => "member_update",
            RoleCreate(_) => "role_create",
            RoleUpdate(_) => "role_update",
            RoleDelete(_) => "role_delete",
            RolesReorder(_) => "roles_reorder",
            ServerCreate(_) => "server_create",
            ServerUpdate(_) => "server_update",
            ServerDelete(_) => "server_delete",
            MessagePin(_) => "message_pin",
            MessageUnpin(_) => "message_unpin",
            ReactionUpdate(_) => "reaction_update",
            ChannelPermissionUpdate(_) => "channel_permission_update",
            ChannelPermissionDelete(_) => "channel_permission_delete",
            DmChannelCreate(_) => "dm_channel_create",
            DmMessageCreate(_) => "dm_message_create",
            DmMessageUpdate(_) => "dm_message_update",
            DmMessageDelete(_) => "dm_message_delete",
            DmReactionUpdate(_) => "dm_reaction_update",
            DmTypingStart(_) => "dm_typing_start",
            DmMessagePin(_) => "dm_message_pin",
            DmMessageUnpin(_) => "dm_message_unpin",
            VoiceStateUpdate(_) => "voice_state_update",
            VoiceForceMove(_) => "voice_force_move",
            VoiceForceDisconnect { .. } => "voice_force_disconnect",
            VoiceStatesSync(_) => "voice_states_sync",
            VoiceSfuToken(_) => "voice_sfu_token",
            FriendRequestCreate(_) => "friend_request_create",
            FriendRequestAccept(_) => "friend_request_accept",
            FriendRequestDecline { .. } => "friend_request_decline",
            FriendRemove(_) => "friend_remove",
            P2pCallInitiate(_) => "p2p_call_initiate",
            P2pCallAccept(_) => "p2p_call_accept",
            P2pCallDecline { .. } => "p2p_call_decline",
            P2pCallEnd { .. } => "p2p_call_end",
            P2pCallBusy => "p2p_call_busy",
            P2pSignal(_) => "p2p_signal",
            Error(_) => "error",
        }
    }

    /// Whether this event is scoped to a server's membership (used by the
    /// hub to decide `BroadcastToServer` vs. directed delivery at call
    /// sites — most events are directed or pre-resolved by the service).
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
