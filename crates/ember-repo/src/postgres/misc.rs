use async_trait::async_trait;
use ember_ids::{ChannelId, MessageId, ServerId, SfuInstanceId, UserId};
use ember_model::{DomainError, DomainResult, ReadState, SfuInstance};

use crate::traits::{ReadStateRepository, SfuRepository};

use super::PgRepo;

#[async_trait]
impl ReadStateRepository for PgRepo {
    async fn mark_read(&self, user_id: UserId, channel_id: ChannelId, message_id: MessageId) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO read_states (user_id, channel_id, last_read_message_id, last_read_at)
             VALUES ($1, $2, $3, NOW())
             ON CONFLICT (user_id, channel_id) DO UPDATE
               SET last_read_message_id = EXCLUDED.last_read_message_id, last_read_at = EXCLUDED.last_read_at",
        )
        .bind(user_id)
        .bind(channel_id)
        .bind(message_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, user_id: UserId, channel_id: ChannelId) -> DomainResult<Option<ReadState>> {
        sqlx::query_as::<_, ReadState>(
            "SELECT user_id, channel_id, last_read_message_id, last_read_at
             FROM read_states WHERE user_id = $1 AND channel_id = $2",
        )
        .bind(user_id)
        .bind(channel_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn mark_all_read(&self, user_id: UserId, server_id: ServerId) -> DomainResult<u64> {
        let result = sqlx::query(
            "INSERT INTO read_states (user_id, channel_id, last_read_message_id, last_read_at)
             SELECT $1, c.id, latest.id, NOW()
             FROM channels c
             JOIN LATERAL (
                 SELECT id FROM messages
                 WHERE channel_id = c.id AND deleted = FALSE
                 ORDER BY created_at DESC LIMIT 1
             ) latest ON TRUE
             WHERE c.server_id = $2 AND c.type = 'text'
             ON CONFLICT (user_id, channel_id) DO UPDATE
               SET last_read_message_id = EXCLUDED.last_read_message_id, last_read_at = EXCLUDED.last_read_at",
        )
        .bind(user_id)
        .bind(server_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl SfuRepository for PgRepo {
    async fn get(&self, id: SfuInstanceId) -> DomainResult<SfuInstance> {
        sqlx::query_as::<_, SfuInstance>(
            "SELECT id, url, api_key, api_secret, is_platform_managed, server_count, created_at
             FROM sfu_instances WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DomainError::NotFound("sfu instance"))
    }

    async fn least_loaded(&self) -> DomainResult<SfuInstance> {
        sqlx::query_as::<_, SfuInstance>(
            "SELECT id, url, api_key, api_secret, is_platform_managed, server_count, created_at
             FROM sfu_instances ORDER BY server_count ASC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DomainError::NotFound("sfu instance"))
    }

    async fn increment_server_count(&self, id: SfuInstanceId, delta: i32) -> DomainResult<()> {
        sqlx::query("UPDATE sfu_instances SET server_count = server_count + $1 WHERE id = $2")
            .bind(delta)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
