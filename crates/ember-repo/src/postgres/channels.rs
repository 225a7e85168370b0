use async_trait::async_trait;
use ember_ids::{CategoryId, ChannelId, RoleId, ServerId};
use ember_model::{Category, Channel, ChannelPermissionOverride, DomainError, DomainResult};

use crate::traits::ChannelRepository;

use super::PgRepo;

#[async_trait]
impl ChannelRepository for PgRepo {
    async fn create_category(&self, server_id: ServerId, name: &str) -> DomainResult<Category> {
        let next_position: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM categories WHERE server_id = $1",
        )
        .bind(server_id)
        .fetch_one(&self.pool)
        .await?;

        sqlx::query_as::<_, Category>(
            "INSERT INTO categories (id, server_id, name, position, created_at)
             VALUES ($1, $2, $3, $4, NOW())
             RETURNING id, server_id, name, position, created_at",
        )
        .bind(CategoryId::new())
        .bind(server_id)
        .bind(name)
        .bind(next_position)
        .fetch_one(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn update_category(&self, id: CategoryId, name: &str) -> DomainResult<Category> {
        sqlx::query_as::<_, Category>(
            "UPDATE categories SET name = $1 WHERE id = $2
             RETURNING id, server_id, name, position, created_at",
        )
        .bind(name)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DomainError::NotFound("category"))
    }

    async fn delete_category(&self, id: CategoryId) -> DomainResult<()> {
        sqlx::query("DELETE FROM categories WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(())
    }

    async fn list_categories(&self, server_id: ServerId) -> DomainResult<Vec<Category>> {
        sqlx::query_as::<_, Category>(
            "SELECT id, server_id, name, position, created_at FROM categories WHERE server_id = $1 ORDER BY position ASC",
        )
        .bind(server_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn create_channel(&self, channel: Channel) -> DomainResult<Channel> {
        sqlx::query_as::<_, Channel>(
            "INSERT INTO channels (id, server_id, category_id, name, type, topic, position, user_limit, bitrate, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW())
             RETURNING id, server_id, category_id, name, type, topic, position, user_limit, bitrate, created_at",
        )
        .bind(channel.id)
        .bind(channel.server_id)
        .bind(channel.category_id)
        .bind(&channel.name)
        .bind(channel.r#type)
        .bind(&channel.topic)
        .bind(channel.position)
        .bind(channel.user_limit)
        .bind(channel.bitrate)
        .fetch_one(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn get_channel(&self, id: ChannelId) -> DomainResult<Channel> {
        sqlx::query_as::<_, Channel>(
            "SELECT id, server_id, category_id, name, type, topic, position, user_limit, bitrate, created_at
             FROM channels WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DomainError::NotFound("channel"))
    }

    async fn update_channel(&self, channel: Channel) -> DomainResult<Channel> {
        sqlx::query_as::<_, Channel>(
            "UPDATE channels SET name = $1, topic = $2, category_id = $3, user_limit = $4, bitrate = $5
             WHERE id = $6
             RETURNING id, server_id, category_id, name, type, topic, position, user_limit, bitrate, created_at",
        )
        .bind(&channel.name)
        .bind(&channel.topic)
        .bind(channel.category_id)
        .bind(channel.user_limit)
        .bind(channel.bitrate)
        .bind(channel.id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DomainError::NotFound("channel"))
    }

    async fn delete_channel(&self, id: ChannelId) -> DomainResult<()> {
        // Cascades messages, channel_permission_overrides and read_states
        // via ON DELETE CASCADE.
        sqlx::query("DELETE FROM channels WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(())
    }

    async fn list_channels(&self, server_id: ServerId) -> DomainResult<Vec<Channel>> {
        sqlx::query_as::<_, Channel>(
            "SELECT id, server_id, category_id, name, type, topic, position, user_limit, bitrate, created_at
             FROM channels WHERE server_id = $1 ORDER BY position ASC",
        )
        .bind(server_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn reorder_channels(&self, positions: &[(ChannelId, i32)]) -> DomainResult<()> {
        let mut tx = self.pool.begin().await?;
        for (channel_id, position) in positions {
            sqlx::query("UPDATE channels SET position = $1 WHERE id = $2")
                .bind(position)
                .bind(channel_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn set_channel_override(&self, ov: ChannelPermissionOverride) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO channel_permission_overrides (channel_id, role_id, allow, deny)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (channel_id, role_id) DO UPDATE SET allow = EXCLUDED.allow, deny = EXCLUDED.deny",
        )
        .bind(ov.channel_id)
        .bind(ov.role_id)
        .bind(ov.allow)
        .bind(ov.deny)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_channel_override(&self, channel_id: ChannelId, role_id: RoleId) -> DomainResult<()> {
        sqlx::query("DELETE FROM channel_permission_overrides WHERE channel_id = $1 AND role_id = $2")
            .bind(channel_id)
            .bind(role_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_channel_overrides(&self, channel_id: ChannelId) -> DomainResult<Vec<ChannelPermissionOverride>> {
        sqlx::query_as::<_, ChannelPermissionOverride>(
            "SELECT channel_id, role_id, allow, deny FROM channel_permission_overrides WHERE channel_id = $1",
        )
        .bind(channel_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }
}
