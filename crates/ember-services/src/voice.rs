use std::sync::Arc;

use async_trait::async_trait;
use ember_hub::{ConnectionLifecycle, Hub};
use ember_ids::{ChannelId, ServerId, UserId};
use ember_model::{ChannelType, DomainError, DomainResult};
use ember_perms::Permissions;
use ember_protocol::{ServerEvent, VoiceStatePayload};
use ember_repo::{ChannelRepository, RoleRepository, ServerRepository, UserRepository};
use ember_voice::{AdminVoiceUpdate, DirectedVoiceEvent, VoiceAction, VoiceBroadcast, VoiceEvent, VoiceProfile, VoiceState, VoiceStateUpdate, VoiceStore};

use crate::permissions;

/// The SFU contract from the external-interfaces side of the system:
/// minting a room token on join, evicting a participant on force disconnect.
/// A failing mint fails the join; the client may retry.
#[async_trait]
pub trait SfuClient: Send + Sync {
    async fn mint_token(&self, server_id: ServerId, channel_id: ChannelId, user_id: UserId) -> DomainResult<SfuToken>;
    async fn evict(&self, user_id: UserId);
}

pub struct SfuToken {
    pub url: String,
    pub token: String,
}

/// Thin adapter over [`VoiceStore`]: resolves permissions and channel
/// metadata, delegates the transition, then relays the returned broadcast
/// through the hub in emission order so leave-before-join causality holds.
pub struct VoiceService {
    store: Arc<VoiceStore>,
    channels: Arc<dyn ChannelRepository>,
    roles: Arc<dyn RoleRepository>,
    servers: Arc<dyn ServerRepository>,
    users: Arc<dyn UserRepository>,
    sfu: Arc<dyn SfuClient>,
    hub: Arc<Hub>,
}

impl VoiceService {
    pub fn new(
        store: Arc<VoiceStore>,
        channels: Arc<dyn ChannelRepository>,
        roles: Arc<dyn RoleRepository>,
        servers: Arc<dyn ServerRepository>,
        users: Arc<dyn UserRepository>,
        sfu: Arc<dyn SfuClient>,
        hub: Arc<Hub>,
    ) -> Self {
        Self { store, channels, roles, servers, users, sfu, hub }
    }

    pub async fn join(&self, user_id: UserId, channel_id: ChannelId) -> DomainResult<SfuToken> {
        let channel = self.channels.get_channel(channel_id).await?;
        if channel.r#type != ChannelType::Voice {
            return Err(DomainError::InvalidInput("channel is not a voice channel".into()));
        }
        let mask =
            permissions::effective_channel(self.servers.as_ref(), self.roles.as_ref(), self.channels.as_ref(), channel.server_id, channel_id, user_id)
                .await?;
        permissions::require(mask, Permissions::VIEW_CHANNEL | Permissions::CONNECT)?;
        let bypass_capacity = ember_perms::can(mask, Permissions::MOVE_MEMBERS);

        let profile = self.profile_of(user_id).await?;
        let user_limit = channel.user_limit.map(|n| n as usize);
        let broadcast = self.store.join(user_id, channel_id, channel.server_id, user_limit, bypass_capacity, profile)?;
        self.relay(broadcast).await;

        self.sfu.mint_token(channel.server_id, channel_id, user_id).await
    }

    pub async fn leave(&self, user_id: UserId) {
        if let Some(broadcast) = self.store.leave(user_id) {
            self.relay(broadcast).await;
        }
    }

    pub async fn update_state(&self, user_id: UserId, update: VoiceStateUpdate) -> DomainResult<()> {
        let broadcast = self.store.update_state(user_id, update)?;
        self.relay(broadcast).await;
        Ok(())
    }

    pub async fn admin_update_state(&self, admin_id: UserId, target: UserId, update: AdminVoiceUpdate) -> DomainResult<()> {
        let channel_id = self.store.current_channel(target).ok_or(DomainError::NotFound("target not in a voice channel"))?;
        let channel = self.channels.get_channel(channel_id).await?;
        let mask =
            permissions::effective_channel(self.servers.as_ref(), self.roles.as_ref(), self.channels.as_ref(), channel.server_id, channel_id, admin_id)
                .await?;
        let mut required = Permissions::empty();
        if update.server_muted.is_some() {
            required |= Permissions::MUTE_MEMBERS;
        }
        if update.server_deafened.is_some() {
            required |= Permissions::DEAFEN_MEMBERS;
        }
        permissions::require(mask, required)?;

        let broadcast = self.store.admin_update_state(target, update)?;
        self.relay(broadcast).await;
        Ok(())
    }

    pub async fn move_user(&self, mover_id: UserId, target: UserId, dest_channel_id: ChannelId) -> DomainResult<()> {
        let current_channel_id = self.store.current_channel(target).ok_or(DomainError::NotFound("target not in a voice channel"))?;
        let current_channel = self.channels.get_channel(current_channel_id).await?;
        let dest_channel = self.channels.get_channel(dest_channel_id).await?;
        if current_channel.server_id != dest_channel.server_id {
            return Err(DomainError::InvalidInput("cross-server move".into()));
        }

        for (server_id, channel_id) in [(current_channel.server_id, current_channel_id), (dest_channel.server_id, dest_channel_id)] {
            let mask =
                permissions::effective_channel(self.servers.as_ref(), self.roles.as_ref(), self.channels.as_ref(), server_id, channel_id, mover_id)
                    .await?;
            permissions::require(mask, Permissions::MOVE_MEMBERS)?;
        }

        let profile = self.profile_of(target).await?;
        let user_limit = dest_channel.user_limit.map(|n| n as usize);
        let broadcast = self.store.move_user(target, dest_channel_id, dest_channel.server_id, user_limit, profile)?;
        self.relay(broadcast).await;
        Ok(())
    }

    pub async fn disconnect_user(&self, actor_id: UserId, target: UserId) -> DomainResult<()> {
        let channel_id = self.store.current_channel(target).ok_or(DomainError::NotFound("target not in a voice channel"))?;
        let channel = self.channels.get_channel(channel_id).await?;
        let mask =
            permissions::effective_channel(self.servers.as_ref(), self.roles.as_ref(), self.channels.as_ref(), channel.server_id, channel_id, actor_id)
                .await?;
        permissions::require(mask, Permissions::MOVE_MEMBERS)?;

        let broadcast = self.store.disconnect_user(target)?;
        self.relay(broadcast).await;
        self.sfu.evict(target).await;
        Ok(())
    }

    pub fn sync_for(&self, server_id: ServerId) -> Vec<VoiceState> {
        self.store.sync_for_server(server_id)
    }

    /// Auto-leave hook for the last-disconnect edge; no-op if not in voice.
    pub async fn on_user_offline(&self, user_id: UserId) {
        if let Some(broadcast) = self.store.on_user_offline(user_id) {
            self.relay(broadcast).await;
        }
    }

    async fn profile_of(&self, user_id: UserId) -> DomainResult<VoiceProfile> {
        let user = self.users.get(user_id).await?;
        Ok(VoiceProfile { username: user.username.clone(), display_name: user.display_name().to_string(), avatar_url: user.avatar_url.clone() })
    }

    /// Relays events in emission order (so a move's `leave` gets a smaller
    /// `seq` than its `join`), then any directed force events.
    async fn relay(&self, broadcast: VoiceBroadcast) {
        for event in broadcast.events {
            match event {
                VoiceEvent::State { state, action } => {
                    self.hub.broadcast_to_server(state.server_id, ServerEvent::VoiceStateUpdate(to_payload(state, action))).await;
                }
                VoiceEvent::Leave { user_id, server_id, .. } => {
                    self.hub
                        .broadcast_to_server(
                            server_id,
                            ServerEvent::VoiceStateUpdate(VoiceStatePayload {
                                user_id,
                                channel_id: None,
                                username: String::new(),
                                display_name: String::new(),
                                avatar_url: None,
                                is_muted: false,
                                is_deafened: false,
                                is_streaming: false,
                                is_server_muted: false,
                                is_server_deafened: false,
                                action: VoiceAction::Leave,
                            }),
                        )
                        .await;
                }
            }
        }
        for (user_id, directed) in broadcast.directed {
            let event = match directed {
                DirectedVoiceEvent::ForceMove { channel_id } => {
                    if self.channels.get_channel(channel_id).await.is_err() {
                        continue;
                    }
                    let Ok(profile) = self.profile_of(user_id).await else { continue };
                    ServerEvent::VoiceForceMove(VoiceStatePayload {
                        user_id,
                        channel_id: Some(channel_id),
                        username: profile.username,
                        display_name: profile.display_name,
                        avatar_url: profile.avatar_url,
                        is_muted: false,
                        is_deafened: false,
                        is_streaming: false,
                        is_server_muted: false,
                        is_server_deafened: false,
                        action: VoiceAction::Join,
                    })
                }
                DirectedVoiceEvent::ForceDisconnect => ServerEvent::VoiceForceDisconnect { user_id },
            };
            self.hub.broadcast_to_user(user_id, event).await;
        }
    }
}

#[async_trait]
impl ConnectionLifecycle for VoiceService {
    async fn on_first_connect(&self, _user_id: UserId) {}

    /// A user with no remaining connections can't still be in a voice
    /// channel; clears it the same way an explicit leave would.
    async fn on_last_disconnect(&self, user_id: UserId) {
        self.on_user_offline(user_id).await;
    }
}

fn to_payload(state: VoiceState, action: VoiceAction) -> VoiceStatePayload {
    VoiceStatePayload {
        user_id: state.user_id,
        channel_id: Some(state.channel_id),
        username: state.username,
        display_name: state.display_name,
        avatar_url: state.avatar_url,
        is_muted: state.is_muted,
        is_deafened: state.is_deafened,
        is_streaming: state.is_streaming,
        is_server_muted: state.is_server_muted,
        is_server_deafened: state.is_server_deafened,
        action,
    }
}
