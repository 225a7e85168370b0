use std::sync::Arc;

use async_trait::async_trait;
use ember_hub::{ConnectionContext, Hub, IntentRouter};
use ember_ids::UserId;
use ember_model::DomainResult;
use ember_perms::Permissions;
use ember_protocol::{
    ClientIntent, DmTypingStartPayload, ErrorPayload, SfuTokenPayload, ServerEvent, TypingStartPayload,
};
use ember_repo::{ChannelRepository, DmRepository, RoleRepository, ServerRepository};
use ember_services::{FriendService, P2pCallService, VoiceService};

/// The single [`IntentRouter`] registered with the hub: translates each
/// non-heartbeat client op into the matching domain service call, then
/// turns a service error into a directed `error` event instead of letting it
/// propagate — a bad request from one connection must never take down the
/// read loop.
pub struct AppRouter {
    pub voice: Arc<VoiceService>,
    pub calls: Arc<P2pCallService>,
    pub friends: Arc<FriendService>,
    pub channels: Arc<dyn ChannelRepository>,
    pub roles: Arc<dyn RoleRepository>,
    pub servers: Arc<dyn ServerRepository>,
    pub dms: Arc<dyn DmRepository>,
    pub hub: Arc<Hub>,
}

#[async_trait]
impl IntentRouter for AppRouter {
    async fn dispatch(&self, ctx: ConnectionContext, intent: ClientIntent) {
        let outcome = self.handle(ctx.user_id, intent).await;
        if let Err((kind, message)) = outcome {
            self.hub.broadcast_to_user(ctx.user_id, ServerEvent::Error(ErrorPayload { kind, message, in_reply_to: None })).await;
        }
    }
}

impl AppRouter {
    async fn handle(&self, user_id: UserId, intent: ClientIntent) -> Result<(), (&'static str, String)> {
        match intent {
            ClientIntent::Heartbeat => {}

            ClientIntent::Typing(t) => {
                if let Some(channel_id) = t.channel_id {
                    let channel = self.channels.get_channel(channel_id).await.map_err(map_err)?;
                    let mask = ember_services::permissions::effective_channel(
                        self.servers.as_ref(),
                        self.roles.as_ref(),
                        self.channels.as_ref(),
                        channel.server_id,
                        channel_id,
                        user_id,
                    )
                    .await
                    .map_err(map_err)?;
                    if mask.contains(Permissions::VIEW_CHANNEL) {
                        self.hub.broadcast_to_channel_viewers(channel_id, ServerEvent::TypingStart(TypingStartPayload { channel_id, user_id })).await;
                    }
                }
                if let Some(dm_channel_id) = t.dm_channel_id {
                    let channel = self.dms.get_channel(dm_channel_id).await.map_err(map_err)?;
                    self.hub
                        .broadcast_to_users(
                            &[channel.user1_id, channel.user2_id],
                            ServerEvent::DmTypingStart(DmTypingStartPayload { dm_channel_id, user_id }),
                        )
                        .await;
                }
            }

            ClientIntent::VoiceJoin { channel_id } => {
                let token = self.voice.join(user_id, channel_id).await.map_err(map_err)?;
                self.hub.broadcast_to_user(user_id, ServerEvent::VoiceSfuToken(SfuTokenPayload { url: token.url, token: token.token })).await;
            }
            ClientIntent::VoiceLeave => self.voice.leave(user_id).await,
            ClientIntent::VoiceStateUpdateRequest { muted, deafened, streaming } => {
                self.voice.update_state(user_id, ember_voice::VoiceStateUpdate { muted, deafened, streaming }).await.map_err(map_err)?;
            }
            ClientIntent::VoiceAdminStateUpdate { target_user_id, server_muted, server_deafened } => {
                self.voice
                    .admin_update_state(user_id, target_user_id, ember_voice::AdminVoiceUpdate { server_muted, server_deafened })
                    .await
                    .map_err(map_err)?;
            }
            ClientIntent::VoiceMoveUser { target_user_id, channel_id } => {
                self.voice.move_user(user_id, target_user_id, channel_id).await.map_err(map_err)?;
            }
            ClientIntent::VoiceDisconnectUser { target_user_id } => {
                self.voice.disconnect_user(user_id, target_user_id).await.map_err(map_err)?;
            }

            ClientIntent::FriendRequestCreate { username } => {
                self.friends.request_by_username(user_id, &username).await.map_err(map_err)?;
            }
            ClientIntent::FriendRequestAccept { friendship_id } => {
                self.friends.accept(friendship_id, user_id).await.map_err(map_err)?;
            }
            ClientIntent::FriendRequestDecline { friendship_id } => {
                self.friends.decline(friendship_id, user_id).await.map_err(map_err)?;
            }
            ClientIntent::FriendRemove { friend_id } => {
                self.friends.remove(user_id, friend_id).await.map_err(map_err)?;
            }

            ClientIntent::P2pCallInitiate { receiver_id, r#type } => {
                self.calls.initiate(user_id, receiver_id, r#type).await.map_err(map_err)?;
            }
            ClientIntent::P2pCallAccept { call_id } => {
                self.calls.accept(user_id, call_id).await.map_err(map_err)?;
            }
            ClientIntent::P2pCallDecline { call_id } => {
                self.calls.decline(user_id, call_id).await.map_err(map_err)?;
            }
            ClientIntent::P2pCallEnd => {
                self.calls.end(user_id).await.map_err(map_err)?;
            }
            ClientIntent::P2pSignal { call_id, r#type, sdp, candidate } => {
                self.calls.signal(user_id, ember_calls::CallSignal { call_id, kind: r#type, sdp, candidate }).await.map_err(map_err)?;
            }
        }
        Ok(())
    }
}

fn map_err(e: ember_model::DomainError) -> (&'static str, String) {
    (e.kind(), e.to_string())
}
