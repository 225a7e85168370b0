use std::sync::Arc;

use chrono::Utc;
use ember_hub::Hub;
use ember_ids::{RoleId, ServerId, UserId};
use ember_model::{Ban, DomainResult, UserRole};
use ember_protocol::{MemberLeavePayload, MemberUpdatePayload, ServerDeletePayload, ServerEvent};
use ember_repo::{RoleRepository, ServerRepository};

pub struct MemberService {
    servers: Arc<dyn ServerRepository>,
    roles: Arc<dyn RoleRepository>,
    hub: Arc<Hub>,
}

impl MemberService {
    pub fn new(servers: Arc<dyn ServerRepository>, roles: Arc<dyn RoleRepository>, hub: Arc<Hub>) -> Self {
        Self { servers, roles, hub }
    }

    pub async fn assign_role(&self, server_id: ServerId, user_id: UserId, role_id: RoleId) -> DomainResult<()> {
        self.roles.assign(UserRole { user_id, role_id, server_id }).await?;
        let role_ids = self.roles.list_for_user(server_id, user_id).await?.into_iter().map(|r| r.id).collect();
        self.hub.broadcast_to_server(server_id, ServerEvent::MemberUpdate(MemberUpdatePayload { server_id, user_id, role_ids })).await;
        Ok(())
    }

    pub async fn unassign_role(&self, server_id: ServerId, user_id: UserId, role_id: RoleId) -> DomainResult<()> {
        self.roles.unassign(user_id, role_id).await?;
        let role_ids = self.roles.list_for_user(server_id, user_id).await?.into_iter().map(|r| r.id).collect();
        self.hub.broadcast_to_server(server_id, ServerEvent::MemberUpdate(MemberUpdatePayload { server_id, user_id, role_ids })).await;
        Ok(())
    }

    /// Removes the membership row, forces every connection of the target
    /// offline, tells the rest of the server the member left, and directs a
    /// `server_delete` at the kicked user's own sessions so their client
    /// drops the server from its list.
    pub async fn kick(&self, server_id: ServerId, user_id: UserId) -> DomainResult<()> {
        self.servers.remove_member(server_id, user_id).await?;
        self.hub.broadcast_to_server(server_id, ServerEvent::MemberLeave(MemberLeavePayload { server_id, user_id })).await;
        self.hub.broadcast_to_user(user_id, ServerEvent::ServerDelete(ServerDeletePayload { server_id })).await;
        self.hub.disconnect_user(user_id);
        Ok(())
    }

    pub async fn ban(&self, server_id: ServerId, user_id: UserId, username: &str, reason: Option<&str>, banned_by: UserId) -> DomainResult<()> {
        self.servers
            .ban(Ban { server_id, user_id, username: username.to_string(), reason: reason.map(str::to_string), banned_by, created_at: Utc::now() })
            .await?;
        self.kick(server_id, user_id).await
    }
}
