use ember_calls::{CallKind, SignalKind};
use ember_ids::{CallId, ChannelId, DmChannelId, FriendshipId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Client→server ops. Deserialized directly from the wire `Envelope` via
/// serde's adjacently tagged representation (`tag = "op", content = "d"`),
/// which matches the `{ "op": ..., "d": ... }` shape exactly — no manual
/// `match`-on-string-then-parse-`Value` step is needed before dispatch.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "op", content = "d", rename_all = "snake_case")]
pub enum ClientIntent {
    Heartbeat,
    Typing(TypingIntent),
    VoiceJoin { channel_id: ChannelId },
    VoiceLeave,
    VoiceStateUpdateRequest {
        #[serde(default)]
        muted: Option<bool>,
        #[serde(default)]
        deafened: Option<bool>,
        #[serde(default)]
        streaming: Option<bool>,
    },
    VoiceAdminStateUpdate {
        target_user_id: UserId,
        #[serde(default)]
        server_muted: Option<bool>,
        #[serde(default)]
        server_deafened: Option<bool>,
    },
    VoiceMoveUser { target_user_id: UserId, channel_id: ChannelId },
    VoiceDisconnectUser { target_user_id: UserId },
    FriendRequestCreate { username: String },
    FriendRequestAccept { friendship_id: FriendshipId },
    FriendRequestDecline { friendship_id: FriendshipId },
    FriendRemove { friend_id: UserId },
    P2pCallInitiate { receiver_id: UserId, r#type: CallKind },
    P2pCallAccept { call_id: CallId },
    P2pCallDecline { call_id: CallId },
    P2pCallEnd,
    P2pSignal {
        call_id: CallId,
        r#type: SignalKind,
        #[serde(default)]
        sdp: Option<String>,
        #[serde(default)]
        candidate: Option<Value>,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TypingIntent {
    #[serde(default)]
    pub channel_id: Option<ChannelId>,
    #[serde(default)]
    pub dm_channel_id: Option<DmChannelId>,
}
