use std::sync::Arc;

use ember_hub::Hub;
use ember_ids::{CategoryId, ChannelId, RoleId, ServerId, UserId};
use ember_model::{Category, Channel, ChannelPermissionOverride, DomainResult, Role};
use ember_perms::Permissions;
use ember_protocol::{
    CategoryDeletePayload, ChannelDeletePayload, ChannelPermissionDeletePayload, ChannelReorderPayload, RoleDeletePayload, RolesReorderPayload,
    ServerEvent,
};
use ember_repo::{ChannelRepository, RoleRepository, ServerRepository};

use crate::permissions;

/// Server-administration surface: channel/category CRUD and ordering, channel
/// permission overrides, and role definitions. Member-facing role
/// assign/unassign lives on [`crate::MemberService`]; this is the
/// `MANAGE_CHANNELS`/`MANAGE_ROLES` side of the same server.
pub struct ChannelService {
    channels: Arc<dyn ChannelRepository>,
    roles: Arc<dyn RoleRepository>,
    servers: Arc<dyn ServerRepository>,
    hub: Arc<Hub>,
}

impl ChannelService {
    pub fn new(channels: Arc<dyn ChannelRepository>, roles: Arc<dyn RoleRepository>, servers: Arc<dyn ServerRepository>, hub: Arc<Hub>) -> Self {
        Self { channels, roles, servers, hub }
    }

    async fn require_server(&self, server_id: ServerId, actor_id: UserId, required: Permissions) -> DomainResult<()> {
        let mask = permissions::effective_server(self.servers.as_ref(), self.roles.as_ref(), server_id, actor_id).await?;
        permissions::require(mask, required)
    }

    pub async fn create_category(&self, server_id: ServerId, actor_id: UserId, name: &str) -> DomainResult<Category> {
        self.require_server(server_id, actor_id, Permissions::MANAGE_CHANNELS).await?;
        let category = self.channels.create_category(server_id, name).await?;
        self.hub.broadcast_to_server(server_id, ServerEvent::CategoryCreate(category.clone())).await;
        Ok(category)
    }

    pub async fn update_category(&self, server_id: ServerId, actor_id: UserId, id: CategoryId, name: &str) -> DomainResult<Category> {
        self.require_server(server_id, actor_id, Permissions::MANAGE_CHANNELS).await?;
        let category = self.channels.update_category(id, name).await?;
        self.hub.broadcast_to_server(server_id, ServerEvent::CategoryUpdate(category.clone())).await;
        Ok(category)
    }

    pub async fn delete_category(&self, server_id: ServerId, actor_id: UserId, category_id: CategoryId) -> DomainResult<()> {
        self.require_server(server_id, actor_id, Permissions::MANAGE_CHANNELS).await?;
        self.channels.delete_category(category_id).await?;
        self.hub.broadcast_to_server(server_id, ServerEvent::CategoryDelete(CategoryDeletePayload { server_id, category_id })).await;
        Ok(())
    }

    pub async fn create_channel(
        &self,
        server_id: ServerId,
        actor_id: UserId,
        category_id: Option<CategoryId>,
        name: &str,
        r#type: ember_model::ChannelType,
        user_limit: Option<i32>,
        bitrate: Option<i32>,
    ) -> DomainResult<Channel> {
        self.require_server(server_id, actor_id, Permissions::MANAGE_CHANNELS).await?;
        let position = self.channels.list_channels(server_id).await?.len() as i32;
        let channel = Channel {
            id: ChannelId::new(),
            server_id,
            category_id,
            name: name.to_string(),
            r#type,
            topic: None,
            position,
            user_limit,
            bitrate,
            created_at: chrono::Utc::now(),
        };
        let created = self.channels.create_channel(channel).await?;
        self.hub.broadcast_to_server(server_id, ServerEvent::ChannelCreate(created.clone())).await;
        Ok(created)
    }

    pub async fn update_channel(&self, actor_id: UserId, mut channel: Channel) -> DomainResult<Channel> {
        self.require_server(channel.server_id, actor_id, Permissions::MANAGE_CHANNELS).await?;
        let existing = self.channels.get_channel(channel.id).await?;
        channel.position = existing.position;
        channel.r#type = existing.r#type;
        channel.created_at = existing.created_at;
        let updated = self.channels.update_channel(channel).await?;
        self.hub.broadcast_to_server(updated.server_id, ServerEvent::ChannelUpdate(updated.clone())).await;
        Ok(updated)
    }

    pub async fn delete_channel(&self, server_id: ServerId, actor_id: UserId, channel_id: ChannelId) -> DomainResult<()> {
        self.require_server(server_id, actor_id, Permissions::MANAGE_CHANNELS).await?;
        self.channels.delete_channel(channel_id).await?;
        self.hub.broadcast_to_server(server_id, ServerEvent::ChannelDelete(ChannelDeletePayload { server_id, channel_id })).await;
        Ok(())
    }

    pub async fn reorder_channels(&self, server_id: ServerId, actor_id: UserId, positions: Vec<(ChannelId, i32)>) -> DomainResult<()> {
        self.require_server(server_id, actor_id, Permissions::MANAGE_CHANNELS).await?;
        self.channels.reorder_channels(&positions).await?;
        self.hub.broadcast_to_server(server_id, ServerEvent::ChannelReorder(ChannelReorderPayload { server_id, positions })).await;
        Ok(())
    }

    pub async fn set_channel_override(&self, server_id: ServerId, actor_id: UserId, ov: ChannelPermissionOverride) -> DomainResult<()> {
        self.require_server(server_id, actor_id, Permissions::MANAGE_ROLES).await?;
        self.channels.set_channel_override(ov.clone()).await?;
        self.hub.broadcast_to_server(server_id, ServerEvent::ChannelPermissionUpdate(ov)).await;
        Ok(())
    }

    pub async fn delete_channel_override(&self, server_id: ServerId, actor_id: UserId, channel_id: ChannelId, role_id: RoleId) -> DomainResult<()> {
        self.require_server(server_id, actor_id, Permissions::MANAGE_ROLES).await?;
        self.channels.delete_channel_override(channel_id, role_id).await?;
        self.hub.broadcast_to_server(server_id, ServerEvent::ChannelPermissionDelete(ChannelPermissionDeletePayload { channel_id, role_id })).await;
        Ok(())
    }

    pub async fn create_role(&self, server_id: ServerId, actor_id: UserId, name: &str, color: i32, permissions: Permissions) -> DomainResult<Role> {
        self.require_server(server_id, actor_id, Permissions::MANAGE_ROLES).await?;
        let position = self.roles.list_for_server(server_id).await?.len() as i32;
        let role = Role { id: RoleId::new(), server_id, name: name.to_string(), color, position, permissions, is_default: false, created_at: chrono::Utc::now() };
        let created = self.roles.create(role).await?;
        self.hub.broadcast_to_server(server_id, ServerEvent::RoleCreate(created.clone())).await;
        Ok(created)
    }

    pub async fn update_role(&self, actor_id: UserId, mut role: Role) -> DomainResult<Role> {
        self.require_server(role.server_id, actor_id, Permissions::MANAGE_ROLES).await?;
        let existing = self.roles.list_for_server(role.server_id).await?.into_iter().find(|r| r.id == role.id).ok_or(ember_model::DomainError::NotFound("role"))?;
        role.position = existing.position;
        role.is_default = existing.is_default;
        role.created_at = existing.created_at;
        let updated = self.roles.update(role).await?;
        self.hub.broadcast_to_server(updated.server_id, ServerEvent::RoleUpdate(updated.clone())).await;
        Ok(updated)
    }

    pub async fn delete_role(&self, server_id: ServerId, actor_id: UserId, role_id: RoleId) -> DomainResult<()> {
        self.require_server(server_id, actor_id, Permissions::MANAGE_ROLES).await?;
        self.roles.delete(role_id).await?;
        self.hub.broadcast_to_server(server_id, ServerEvent::RoleDelete(RoleDeletePayload { server_id, role_id })).await;
        Ok(())
    }

    pub async fn reorder_roles(&self, server_id: ServerId, actor_id: UserId, positions: Vec<(RoleId, i32)>) -> DomainResult<()> {
        self.require_server(server_id, actor_id, Permissions::MANAGE_ROLES).await?;
        self.roles.reorder(&positions).await?;
        self.hub.broadcast_to_server(server_id, ServerEvent::RolesReorder(RolesReorderPayload { server_id, positions })).await;
        Ok(())
    }
}
