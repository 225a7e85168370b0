use async_trait::async_trait;
use ember_ids::{FriendshipId, UserId};
use ember_model::{DomainError, DomainResult, Friendship};

use crate::traits::FriendRepository;

use super::PgRepo;

const FRIENDSHIP_SELECT: &str = "id, user_id, friend_id, status, created_at, updated_at";

#[async_trait]
impl FriendRepository for PgRepo {
    async fn request(&self, user_id: UserId, friend_id: UserId) -> DomainResult<Friendship> {
        if self.find(user_id, friend_id).await?.is_some() {
            return Err(DomainError::AlreadyExists("friendship"));
        }

        sqlx::query_as::<_, Friendship>(&format!(
            "INSERT INTO friendships (id, user_id, friend_id, status, created_at, updated_at)
             VALUES ($1, $2, $3, 'pending', NOW(), NOW())
             RETURNING {FRIENDSHIP_SELECT}"
        ))
        .bind(FriendshipId::new())
        .bind(user_id)
        .bind(friend_id)
        .fetch_one(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn accept(&self, id: FriendshipId) -> DomainResult<Friendship> {
        sqlx::query_as::<_, Friendship>(&format!(
            "UPDATE friendships SET status = 'accepted', updated_at = NOW()
             WHERE id = $1 AND status = 'pending'
             RETURNING {FRIENDSHIP_SELECT}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DomainError::NotFound("friendship"))
    }

    async fn decline(&self, id: FriendshipId) -> DomainResult<()> {
        sqlx::query("DELETE FROM friendships WHERE id = $1 AND status = 'pending'")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn remove(&self, user_id: UserId, friend_id: UserId) -> DomainResult<()> {
        sqlx::query(
            "DELETE FROM friendships WHERE (user_id = $1 AND friend_id = $2) OR (user_id = $2 AND friend_id = $1)",
        )
        .bind(user_id)
        .bind(friend_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find(&self, user_id: UserId, friend_id: UserId) -> DomainResult<Option<Friendship>> {
        sqlx::query_as::<_, Friendship>(&format!(
            "SELECT {FRIENDSHIP_SELECT} FROM friendships
             WHERE (user_id = $1 AND friend_id = $2) OR (user_id = $2 AND friend_id = $1)"
        ))
        .bind(user_id)
        .bind(friend_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn list_for_user(&self, user_id: UserId) -> DomainResult<Vec<Friendship>> {
        sqlx::query_as::<_, Friendship>(&format!(
            "SELECT {FRIENDSHIP_SELECT} FROM friendships WHERE user_id = $1 OR friend_id = $1"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }
}
