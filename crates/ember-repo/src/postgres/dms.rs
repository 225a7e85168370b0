use async_trait::async_trait;
use ember_ids::{DmChannelId, DmMessageId, UserId};
use ember_model::{DmAttachment, DmChannel, DmMessage, DmReaction, DomainError, DomainResult};

use crate::traits::DmRepository;

use super::PgRepo;

const DM_MESSAGE_SELECT: &str =
    "id, dm_channel_id, user_id, content, reply_to_id, is_pinned, edited_at, created_at";

#[async_trait]
impl DmRepository for PgRepo {
    async fn get_or_create_channel(&self, user_a: UserId, user_b: UserId) -> DomainResult<DmChannel> {
        let (user1_id, user2_id) = DmChannel::canonical_pair(user_a, user_b);

        if let Some(existing) = sqlx::query_as::<_, DmChannel>(
            "SELECT id, user1_id, user2_id, created_at FROM dm_channels WHERE user1_id = $1 AND user2_id = $2",
        )
        .bind(user1_id)
        .bind(user2_id)
        .fetch_optional(&self.pool)
        .await?
        {
            return Ok(existing);
        }

        sqlx::query_as::<_, DmChannel>(
            "INSERT INTO dm_channels (id, user1_id, user2_id, created_at) VALUES ($1, $2, $3, NOW())
             ON CONFLICT (user1_id, user2_id) DO UPDATE SET user1_id = EXCLUDED.user1_id
             RETURNING id, user1_id, user2_id, created_at",
        )
        .bind(ember_ids::DmChannelId::new())
        .bind(user1_id)
        .bind(user2_id)
        .fetch_one(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn get_channel(&self, id: DmChannelId) -> DomainResult<DmChannel> {
        sqlx::query_as::<_, DmChannel>("SELECT id, user1_id, user2_id, created_at FROM dm_channels WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DomainError::NotFound("dm channel"))
    }

    async fn list_channels_for_user(&self, user_id: UserId) -> DomainResult<Vec<DmChannel>> {
        sqlx::query_as::<_, DmChannel>(
            "SELECT id, user1_id, user2_id, created_at FROM dm_channels
             WHERE user1_id = $1 OR user2_id = $1
             ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn create_message(&self, message: DmMessage) -> DomainResult<DmMessage> {
        sqlx::query_as::<_, DmMessage>(&format!(
            "INSERT INTO dm_messages (id, dm_channel_id, user_id, content, reply_to_id, is_pinned, created_at)
             VALUES ($1, $2, $3, $4, $5, FALSE, NOW())
             RETURNING {DM_MESSAGE_SELECT}"
        ))
        .bind(message.id)
        .bind(message.dm_channel_id)
        .bind(message.user_id)
        .bind(&message.content)
        .bind(message.reply_to_id)
        .fetch_one(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn update_message(&self, id: DmMessageId, content: &str) -> DomainResult<DmMessage> {
        sqlx::query_as::<_, DmMessage>(&format!(
            "UPDATE dm_messages SET content = $1, edited_at = NOW()
             WHERE id = $2 AND deleted = FALSE
             RETURNING {DM_MESSAGE_SELECT}"
        ))
        .bind(content)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DomainError::NotFound("dm message"))
    }

    async fn delete_message(&self, id: DmMessageId) -> DomainResult<()> {
        sqlx::query("UPDATE dm_messages SET deleted = TRUE, content = NULL WHERE id = $1 AND deleted = FALSE")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_messages_before(
        &self,
        dm_channel_id: DmChannelId,
        before: Option<DmMessageId>,
        limit: i64,
    ) -> DomainResult<Vec<DmMessage>> {
        let rows = match before {
            Some(cursor) => {
                sqlx::query_as::<_, DmMessage>(&format!(
                    "SELECT {DM_MESSAGE_SELECT} FROM dm_messages
                     WHERE dm_channel_id = $1 AND deleted = FALSE
                       AND (created_at, id) < (SELECT created_at, id FROM dm_messages WHERE id = $2)
                     ORDER BY created_at DESC, id DESC
                     LIMIT $3"
                ))
                .bind(dm_channel_id)
                .bind(cursor)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, DmMessage>(&format!(
                    "SELECT {DM_MESSAGE_SELECT} FROM dm_messages
                     WHERE dm_channel_id = $1 AND deleted = FALSE
                     ORDER BY created_at DESC, id DESC
                     LIMIT $2"
                ))
                .bind(dm_channel_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows)
    }

    async fn toggle_reaction(&self, dm_message_id: DmMessageId, user_id: UserId, emoji: &str) -> DomainResult<bool> {
        let mut tx = self.pool.begin().await?;

        // Serializes concurrent togglers of the same (message, user, emoji) so
        // the delete-or-insert decision below always sees a stable snapshot
        // instead of racing another toggle's half-finished delete.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1 || $2 || $3, 0))")
            .bind(dm_message_id.to_string())
            .bind(user_id.to_string())
            .bind(emoji)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM dm_reactions WHERE dm_message_id = $1 AND user_id = $2 AND emoji = $3")
            .bind(dm_message_id)
            .bind(user_id)
            .bind(emoji)
            .execute(&mut *tx)
            .await?;

        let now_present = if deleted.rows_affected() > 0 {
            false
        } else {
            sqlx::query("INSERT INTO dm_reactions (id, dm_message_id, user_id, emoji) VALUES ($1, $2, $3, $4)")
                .bind(ember_ids::DmReactionId::new())
                .bind(dm_message_id)
                .bind(user_id)
                .bind(emoji)
                .execute(&mut *tx)
                .await?;
            true
        };

        tx.commit().await?;
        Ok(now_present)
    }

    async fn list_reactions(&self, dm_message_id: DmMessageId) -> DomainResult<Vec<DmReaction>> {
        sqlx::query_as::<_, DmReaction>(
            "SELECT id, dm_message_id, user_id, emoji FROM dm_reactions WHERE dm_message_id = $1",
        )
        .bind(dm_message_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn list_reactions_for(&self, dm_message_ids: &[DmMessageId]) -> DomainResult<Vec<DmReaction>> {
        if dm_message_ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, DmReaction>(
            "SELECT id, dm_message_id, user_id, emoji FROM dm_reactions WHERE dm_message_id = ANY($1)",
        )
        .bind(dm_message_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn list_attachments_for(&self, message_ids: &[DmMessageId]) -> DomainResult<Vec<DmAttachment>> {
        if message_ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, DmAttachment>(
            "SELECT id, dm_message_id, filename, file_url, file_size, mime_type, created_at
             FROM dm_attachments WHERE dm_message_id = ANY($1)",
        )
        .bind(message_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn pin(&self, dm_message_id: DmMessageId, _pinned_by: UserId) -> DomainResult<()> {
        sqlx::query("UPDATE dm_messages SET is_pinned = TRUE WHERE id = $1")
            .bind(dm_message_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn unpin(&self, dm_message_id: DmMessageId) -> DomainResult<()> {
        sqlx::query("UPDATE dm_messages SET is_pinned = FALSE WHERE id = $1")
            .bind(dm_message_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
