use ember_ids::{ChannelId, ServerId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The wire envelope in both directions: `{ "op": string, "d": any, "seq": int64? }`.
///
/// The server stamps `seq` on every outbound event; clients never set it.
/// This is the *only* place the untyped JSON bag appears — everywhere else
/// in the crate, payloads are typed (`ClientIntent` inbound, `ServerEvent`
/// outbound).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope {
    pub op: String,
    #[serde(default)]
    pub d: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
}

impl Envelope {
    pub fn inbound(op: impl Into<String>, d: Value) -> Self {
        Self { op: op.into(), d: Some(d), seq: None }
    }

    pub fn outbound(op: &'static str, d: Value, seq: u64) -> Self {
        Self { op: op.into(), d: Some(d), seq: Some(seq) }
    }
}

/// First server→client event after connect.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReadyPayload {
    pub online_user_ids: Vec<UserId>,
    pub servers: Vec<ReadyServer>,
    pub muted_server_ids: Vec<ServerId>,
    /// Voice occupancy across every server the connecting user belongs to,
    /// so a client never has to wait for the first `voice_state_update` to
    /// know who's already in a channel.
    pub voice_states: Vec<ember_voice::VoiceState>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReadyServer {
    pub id: ServerId,
    pub name: String,
    pub icon_url: Option<String>,
}

/// Server→client voice transition payload; `action` distinguishes join,
/// leave and mute/deafen/stream updates within the same shape.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VoiceStatePayload {
    pub user_id: UserId,
    pub channel_id: Option<ChannelId>,
    pub username: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub is_muted: bool,
    pub is_deafened: bool,
    pub is_streaming: bool,
    pub is_server_muted: bool,
    pub is_server_deafened: bool,
    pub action: ember_voice::VoiceAction,
}

/// Relayed verbatim between call participants; the server never inspects
/// `sdp` or `candidate`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CallSignalPayload {
    pub call_id: ember_ids::CallId,
    #[serde(rename = "type")]
    pub kind: ember_calls::SignalKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate: Option<Value>,
}

/// Directed room credential handed back to the joining connection only;
/// never broadcast to other channel members.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SfuTokenPayload {
    pub url: String,
    pub token: String,
}

/// A directed error response for the requesting connection only — errors
/// are never broadcast. Server→client only, so this carries no `Deserialize`
/// impl (`kind` is `&'static str`, which borrowed deserialization can't
/// produce).
#[derive(Clone, Debug, Serialize)]
pub struct ErrorPayload {
    pub kind: &'static str,
    pub message: String,
    /// Echoes the client op that failed, if any, so the client can
    /// correlate the error with its originating intent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<String>,
}
