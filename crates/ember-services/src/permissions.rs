use ember_ids::{ChannelId, ServerId, UserId};
use ember_model::{DomainError, DomainResult};
use ember_perms::{ChannelOverride, Permissions, RoleGrant};
use ember_repo::{ChannelRepository, RoleRepository, ServerRepository};

/// Loads the inputs `ember_perms` needs and resolves server-scoped
/// permissions for `user_id`. Rejects with `forbidden` up front if `user_id`
/// is not a member of `server_id` — `RoleRepository::list_for_user` returns
/// the server's default-role grants for any id, member or not, so this check
/// is what keeps a non-member's empty-override mask from being mistaken for
/// a member-with-no-roles mask.
pub async fn effective_server(
    servers: &dyn ServerRepository,
    roles: &dyn RoleRepository,
    server_id: ServerId,
    user_id: UserId,
) -> DomainResult<Permissions> {
    servers.get_member(server_id, user_id).await.map_err(|_| DomainError::Forbidden)?;
    let grants = role_grants(roles, server_id, user_id).await?;
    Ok(ember_perms::effective_server(&grants))
}

/// Same as [`effective_server`] but also applies the channel's per-role
/// overrides.
pub async fn effective_channel(
    servers: &dyn ServerRepository,
    roles: &dyn RoleRepository,
    channels: &dyn ChannelRepository,
    server_id: ServerId,
    channel_id: ChannelId,
    user_id: UserId,
) -> DomainResult<Permissions> {
    servers.get_member(server_id, user_id).await.map_err(|_| DomainError::Forbidden)?;
    let grants = role_grants(roles, server_id, user_id).await?;
    let overrides = channel_overrides(channels, channel_id).await?;
    Ok(ember_perms::effective_channel(&grants, &overrides))
}

async fn role_grants(
    roles: &dyn RoleRepository,
    server_id: ServerId,
    user_id: UserId,
) -> DomainResult<Vec<RoleGrant>> {
    let user_roles = roles.list_for_user(server_id, user_id).await?;
    Ok(user_roles
        .into_iter()
        .map(|r| RoleGrant { role_id: r.id, position: r.position, permissions: r.permissions })
        .collect())
}

async fn channel_overrides(channels: &dyn ChannelRepository, channel_id: ChannelId) -> DomainResult<Vec<ChannelOverride>> {
    let overrides = channels.list_channel_overrides(channel_id).await?;
    Ok(overrides.into_iter().map(|o| ChannelOverride { role_id: o.role_id, allow: o.allow, deny: o.deny }).collect())
}

/// Fails closed with `forbidden` unless `mask` carries every bit in `required`.
pub fn require(mask: Permissions, required: Permissions) -> DomainResult<()> {
    if ember_perms::can(mask, required) {
        Ok(())
    } else {
        Err(ember_model::DomainError::Forbidden)
    }
}
