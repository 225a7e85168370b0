use async_trait::async_trait;
use ember_ids::{ChannelId, MessageId, PinId, UserId};
use ember_model::{Attachment, DomainError, DomainResult, Mention, Message, Pin, Reaction};

use crate::traits::MessageRepository;

use super::PgRepo;

/// Caller's max pin count is enforced one layer up in the message service;
/// the repository only counts and inserts.
const MESSAGE_SELECT: &str =
    "id, channel_id, user_id, content, reply_to_id, is_pinned, edited_at, created_at";

/// Splits on whitespace, drops empty tokens, wraps each in quotes and
/// appends `:*` for prefix matching, then joins with `&` so every term
/// must match — the only sanitization `to_tsquery` gets, deliberately no
/// smarter than that.
fn sanitize_query(raw: &str) -> Option<String> {
    let terms: Vec<String> = raw
        .split_whitespace()
        .map(|term| term.replace('\'', ""))
        .filter(|term| !term.is_empty())
        .map(|term| format!("'{term}':*"))
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" & "))
    }
}

#[async_trait]
impl MessageRepository for PgRepo {
    async fn create(&self, message: Message, mentions: &[UserId]) -> DomainResult<Message> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Message>(&format!(
            "INSERT INTO messages (id, channel_id, user_id, content, reply_to_id, is_pinned, created_at)
             VALUES ($1, $2, $3, $4, $5, FALSE, NOW())
             RETURNING {MESSAGE_SELECT}"
        ))
        .bind(message.id)
        .bind(message.channel_id)
        .bind(message.user_id)
        .bind(&message.content)
        .bind(message.reply_to_id)
        .fetch_one(&mut *tx)
        .await?;

        for user_id in mentions {
            sqlx::query("INSERT INTO mentions (message_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
                .bind(created.id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn get(&self, id: MessageId) -> DomainResult<Message> {
        sqlx::query_as::<_, Message>(&format!("SELECT {MESSAGE_SELECT} FROM messages WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DomainError::NotFound("message"))
    }

    async fn update_content(&self, id: MessageId, content: &str) -> DomainResult<Message> {
        sqlx::query_as::<_, Message>(&format!(
            "UPDATE messages SET content = $1, edited_at = NOW()
             WHERE id = $2 AND deleted = FALSE
             RETURNING {MESSAGE_SELECT}"
        ))
        .bind(content)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DomainError::NotFound("message"))
    }

    async fn delete(&self, id: MessageId) -> DomainResult<()> {
        sqlx::query("UPDATE messages SET deleted = TRUE, content = NULL WHERE id = $1 AND deleted = FALSE")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_before(
        &self,
        channel_id: ChannelId,
        before: Option<MessageId>,
        limit: i64,
    ) -> DomainResult<Vec<Message>> {
        let rows = match before {
            Some(cursor) => {
                sqlx::query_as::<_, Message>(&format!(
                    "SELECT {MESSAGE_SELECT} FROM messages
                     WHERE channel_id = $1 AND deleted = FALSE
                       AND (created_at, id) < (SELECT created_at, id FROM messages WHERE id = $2)
                     ORDER BY created_at DESC, id DESC
                     LIMIT $3"
                ))
                .bind(channel_id)
                .bind(cursor)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Message>(&format!(
                    "SELECT {MESSAGE_SELECT} FROM messages
                     WHERE channel_id = $1 AND deleted = FALSE
                     ORDER BY created_at DESC, id DESC
                     LIMIT $2"
                ))
                .bind(channel_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows)
    }

    async fn list_attachments_for(&self, message_ids: &[MessageId]) -> DomainResult<Vec<Attachment>> {
        if message_ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, Attachment>(
            "SELECT id, message_id, filename, file_url, file_size, mime_type, created_at
             FROM attachments WHERE message_id = ANY($1)",
        )
        .bind(message_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn list_mentions_for(&self, message_ids: &[MessageId]) -> DomainResult<Vec<Mention>> {
        if message_ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, Mention>("SELECT message_id, user_id FROM mentions WHERE message_id = ANY($1)")
            .bind(message_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn search(
        &self,
        channel_id: Option<ChannelId>,
        sanitized_query: &str,
        limit: i64,
        offset: i64,
    ) -> DomainResult<Vec<Message>> {
        let Some(tsquery) = sanitize_query(sanitized_query) else {
            return Ok(Vec::new());
        };

        let rows = match channel_id {
            Some(channel_id) => {
                sqlx::query_as::<_, Message>(&format!(
                    "SELECT {MESSAGE_SELECT} FROM messages
                     WHERE channel_id = $1 AND deleted = FALSE
                       AND to_tsvector('english', COALESCE(content, '')) @@ to_tsquery('english', $2)
                     ORDER BY created_at DESC
                     LIMIT $3 OFFSET $4"
                ))
                .bind(channel_id)
                .bind(tsquery)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Message>(&format!(
                    "SELECT {MESSAGE_SELECT} FROM messages
                     WHERE deleted = FALSE
                       AND to_tsvector('english', COALESCE(content, '')) @@ to_tsquery('english', $1)
                     ORDER BY created_at DESC
                     LIMIT $2 OFFSET $3"
                ))
                .bind(tsquery)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows)
    }

    async fn toggle_reaction(&self, message_id: MessageId, user_id: UserId, emoji: &str) -> DomainResult<bool> {
        let mut tx = self.pool.begin().await?;

        // Serializes concurrent togglers of the same (message, user, emoji) so
        // the delete-or-insert decision below always sees a stable snapshot
        // instead of racing another toggle's half-finished delete.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1 || $2 || $3, 0))")
            .bind(message_id.to_string())
            .bind(user_id.to_string())
            .bind(emoji)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query(
            "DELETE FROM reactions WHERE message_id = $1 AND user_id = $2 AND emoji = $3",
        )
        .bind(message_id)
        .bind(user_id)
        .bind(emoji)
        .execute(&mut *tx)
        .await?;

        let now_present = if deleted.rows_affected() > 0 {
            false
        } else {
            sqlx::query("INSERT INTO reactions (id, message_id, user_id, emoji) VALUES ($1, $2, $3, $4)")
                .bind(ember_ids::ReactionId::new())
                .bind(message_id)
                .bind(user_id)
                .bind(emoji)
                .execute(&mut *tx)
                .await?;
            true
        };

        tx.commit().await?;
        Ok(now_present)
    }

    async fn list_reactions(&self, message_id: MessageId) -> DomainResult<Vec<Reaction>> {
        sqlx::query_as::<_, Reaction>("SELECT id, message_id, user_id, emoji FROM reactions WHERE message_id = $1")
            .bind(message_id)
            .fetch_all(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn list_reactions_for(&self, message_ids: &[MessageId]) -> DomainResult<Vec<Reaction>> {
        if message_ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, Reaction>("SELECT id, message_id, user_id, emoji FROM reactions WHERE message_id = ANY($1)")
            .bind(message_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn pin(&self, pin: Pin) -> DomainResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO pins (id, message_id, channel_id, pinned_by, created_at) VALUES ($1, $2, $3, $4, NOW())")
            .bind(pin.id)
            .bind(pin.message_id)
            .bind(pin.channel_id)
            .bind(pin.pinned_by)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE messages SET is_pinned = TRUE WHERE id = $1")
            .bind(pin.message_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn unpin(&self, message_id: MessageId) -> DomainResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM pins WHERE message_id = $1").bind(message_id).execute(&mut *tx).await?;
        sqlx::query("UPDATE messages SET is_pinned = FALSE WHERE id = $1")
            .bind(message_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn list_pins(&self, channel_id: ChannelId) -> DomainResult<Vec<Pin>> {
        sqlx::query_as::<_, Pin>(
            "SELECT id, message_id, channel_id, pinned_by, created_at FROM pins
             WHERE channel_id = $1 ORDER BY created_at DESC",
        )
        .bind(channel_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn pin_count(&self, channel_id: ChannelId) -> DomainResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM pins WHERE channel_id = $1")
            .bind(channel_id)
            .fetch_one(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn pin_by_id(&self, pin_id: PinId) -> DomainResult<Pin> {
        sqlx::query_as::<_, Pin>("SELECT id, message_id, channel_id, pinned_by, created_at FROM pins WHERE id = $1")
            .bind(pin_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DomainError::NotFound("pin"))
    }
}

#[cfg(test)]
mod tests {
    use super::sanitize_query;

    #[test]
    fn sanitize_joins_terms_with_and() {
        assert_eq!(sanitize_query("hello world").unwrap(), "'hello':* & 'world':*");
    }

    #[test]
    fn sanitize_strips_quotes_and_blank_input() {
        assert_eq!(sanitize_query("o'brien").unwrap(), "'obrien':*");
        assert!(sanitize_query("   ").is_none());
    }
}
