use async_trait::async_trait;
use ember_ids::{InviteCode, ServerId, UserId};
use ember_model::{Ban, DomainError, DomainResult, Invite, Server, ServerMember, ServerMute};
use rand::Rng;

use crate::traits::ServerRepository;

use super::PgRepo;

fn generate_invite_code() -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnpqrstuvwxyz23456789";
    let mut rng = rand::thread_rng();
    (0..8).map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char).collect()
}

#[async_trait]
impl ServerRepository for PgRepo {
    async fn create(&self, name: &str, owner_id: UserId) -> DomainResult<Server> {
        let mut tx = self.pool.begin().await?;

        let server = sqlx::query_as::<_, Server>(
            "INSERT INTO servers (id, name, owner_id, invite_required, created_at)
             VALUES ($1, $2, $3, FALSE, NOW())
             RETURNING id, name, icon_url, owner_id, invite_required, sfu_instance_id, created_at",
        )
        .bind(ServerId::new())
        .bind(name)
        .bind(owner_id)
        .fetch_one(&mut *tx)
        .await?;

        // Every server is created with exactly one undeletable default role.
        sqlx::query(
            "INSERT INTO roles (id, server_id, name, color, position, permissions, is_default, created_at)
             VALUES ($1, $2, '@everyone', 0, 0, $3, TRUE, NOW())",
        )
        .bind(ember_ids::RoleId::new())
        .bind(server.id)
        .bind(ember_perms::Permissions::VIEW_CHANNEL | ember_perms::Permissions::SEND_MESSAGES | ember_perms::Permissions::CONNECT | ember_perms::Permissions::SPEAK)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO server_members (server_id, user_id, joined_at, position)
             VALUES ($1, $2, NOW(), 0)",
        )
        .bind(server.id)
        .bind(owner_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(server)
    }

    async fn get(&self, id: ServerId) -> DomainResult<Server> {
        sqlx::query_as::<_, Server>(
            "SELECT id, name, icon_url, owner_id, invite_required, sfu_instance_id, created_at FROM servers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DomainError::NotFound("server"))
    }

    async fn update(&self, id: ServerId, name: Option<&str>, icon_url: Option<&str>) -> DomainResult<Server> {
        sqlx::query_as::<_, Server>(
            "UPDATE servers SET name = COALESCE($1, name), icon_url = COALESCE($2, icon_url)
             WHERE id = $3
             RETURNING id, name, icon_url, owner_id, invite_required, sfu_instance_id, created_at",
        )
        .bind(name)
        .bind(icon_url)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DomainError::NotFound("server"))
    }

    async fn delete(&self, id: ServerId) -> DomainResult<()> {
        sqlx::query("DELETE FROM servers WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(())
    }

    async fn list_for_user(&self, user_id: UserId) -> DomainResult<Vec<Server>> {
        sqlx::query_as::<_, Server>(
            "SELECT s.id, s.name, s.icon_url, s.owner_id, s.invite_required, s.sfu_instance_id, s.created_at
             FROM servers s
             JOIN server_members sm ON sm.server_id = s.id
             WHERE sm.user_id = $1
             ORDER BY sm.position ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn add_member(&self, server_id: ServerId, user_id: UserId) -> DomainResult<ServerMember> {
        let next_position: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM server_members WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        sqlx::query_as::<_, ServerMember>(
            "INSERT INTO server_members (server_id, user_id, joined_at, position)
             VALUES ($1, $2, NOW(), $3)
             RETURNING server_id, user_id, joined_at, position",
        )
        .bind(server_id)
        .bind(user_id)
        .bind(next_position)
        .fetch_one(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn remove_member(&self, server_id: ServerId, user_id: UserId) -> DomainResult<()> {
        sqlx::query("DELETE FROM server_members WHERE server_id = $1 AND user_id = $2")
            .bind(server_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_member(&self, server_id: ServerId, user_id: UserId) -> DomainResult<ServerMember> {
        sqlx::query_as::<_, ServerMember>(
            "SELECT server_id, user_id, joined_at, position FROM server_members WHERE server_id = $1 AND user_id = $2",
        )
        .bind(server_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DomainError::NotFound("server member"))
    }

    async fn list_members(&self, server_id: ServerId) -> DomainResult<Vec<ServerMember>> {
        sqlx::query_as::<_, ServerMember>(
            "SELECT server_id, user_id, joined_at, position FROM server_members WHERE server_id = $1",
        )
        .bind(server_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn reorder_servers(&self, user_id: UserId, positions: &[(ServerId, i32)]) -> DomainResult<()> {
        let mut tx = self.pool.begin().await?;
        for (server_id, position) in positions {
            sqlx::query("UPDATE server_members SET position = $1 WHERE server_id = $2 AND user_id = $3")
                .bind(position)
                .bind(server_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn create_invite(
        &self,
        server_id: ServerId,
        created_by: Option<UserId>,
        max_uses: Option<i32>,
        expires_at: Option<chrono::DateTime<chrono::Utc>>,
    ) -> DomainResult<Invite> {
        sqlx::query_as::<_, Invite>(
            "INSERT INTO invites (code, server_id, created_by, max_uses, uses, expires_at, created_at)
             VALUES ($1, $2, $3, $4, 0, $5, NOW())
             RETURNING code, server_id, created_by, max_uses, uses, expires_at, created_at",
        )
        .bind(generate_invite_code())
        .bind(server_id)
        .bind(created_by)
        .bind(max_uses)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn get_invite(&self, code: &InviteCode) -> DomainResult<Invite> {
        sqlx::query_as::<_, Invite>(
            "SELECT code, server_id, created_by, max_uses, uses, expires_at, created_at FROM invites WHERE code = $1",
        )
        .bind(&code.0)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DomainError::NotFound("invite"))
    }

    async fn consume_invite(&self, code: &InviteCode) -> DomainResult<Invite> {
        let invite = sqlx::query_as::<_, Invite>(
            "UPDATE invites SET uses = uses + 1
             WHERE code = $1
               AND (expires_at IS NULL OR expires_at > NOW())
               AND (max_uses IS NULL OR uses < max_uses)
             RETURNING code, server_id, created_by, max_uses, uses, expires_at, created_at",
        )
        .bind(&code.0)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DomainError::InvalidInput("invite expired or exhausted".into()))?;
        Ok(invite)
    }

    async fn delete_invite(&self, code: &InviteCode) -> DomainResult<()> {
        sqlx::query("DELETE FROM invites WHERE code = $1").bind(&code.0).execute(&self.pool).await?;
        Ok(())
    }

    async fn ban(&self, ban: Ban) -> DomainResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO bans (server_id, user_id, username, reason, banned_by, created_at)
             VALUES ($1, $2, $3, $4, $5, NOW())
             ON CONFLICT (server_id, user_id) DO UPDATE SET reason = EXCLUDED.reason, banned_by = EXCLUDED.banned_by",
        )
        .bind(ban.server_id)
        .bind(ban.user_id)
        .bind(&ban.username)
        .bind(&ban.reason)
        .bind(ban.banned_by)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM server_members WHERE server_id = $1 AND user_id = $2")
            .bind(ban.server_id)
            .bind(ban.user_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn unban(&self, server_id: ServerId, user_id: UserId) -> DomainResult<()> {
        sqlx::query("DELETE FROM bans WHERE server_id = $1 AND user_id = $2")
            .bind(server_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_bans(&self, server_id: ServerId) -> DomainResult<Vec<Ban>> {
        sqlx::query_as::<_, Ban>(
            "SELECT server_id, user_id, username, reason, banned_by, created_at FROM bans WHERE server_id = $1",
        )
        .bind(server_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn is_banned(&self, server_id: ServerId, user_id: UserId) -> DomainResult<bool> {
        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM bans WHERE server_id = $1 AND user_id = $2")
            .bind(server_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(exists.is_some())
    }

    async fn set_mute(&self, mute: ServerMute) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO server_mutes (user_id, server_id, muted_until)
             VALUES ($1, $2, $3)
             ON CONFLICT (user_id, server_id) DO UPDATE SET muted_until = EXCLUDED.muted_until",
        )
        .bind(mute.user_id)
        .bind(mute.server_id)
        .bind(mute.muted_until)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_mute(&self, server_id: ServerId, user_id: UserId) -> DomainResult<Option<ServerMute>> {
        sqlx::query_as::<_, ServerMute>(
            "SELECT user_id, server_id, muted_until FROM server_mutes WHERE server_id = $1 AND user_id = $2",
        )
        .bind(server_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn clear_mute(&self, server_id: ServerId, user_id: UserId) -> DomainResult<()> {
        sqlx::query("DELETE FROM server_mutes WHERE server_id = $1 AND user_id = $2")
            .bind(server_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
