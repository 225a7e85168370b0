use async_trait::async_trait;
use ember_ids::{SessionId, UserId};
use ember_model::{DomainError, DomainResult, Session, User, UserStatus};

use crate::traits::{SessionRepository, UserRepository};

use super::PgRepo;

#[async_trait]
impl UserRepository for PgRepo {
    async fn create(&self, username: &str, password_hash: &str, email: Option<&str>) -> DomainResult<User> {
        let existing: Option<i64> = sqlx::query_scalar("SELECT 1 FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(DomainError::AlreadyExists("username"));
        }

        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (id, username, password_hash, email, status, language, is_platform_admin, created_at)
             VALUES ($1, $2, $3, $4, 'offline', 'en', FALSE, NOW())
             RETURNING id, username, display_name, avatar_url, password_hash, status, custom_status, email, language, is_platform_admin, created_at",
        )
        .bind(UserId::new())
        .bind(username)
        .bind(password_hash)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn get(&self, id: UserId) -> DomainResult<User> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, display_name, avatar_url, password_hash, status, custom_status, email, language, is_platform_admin, created_at
             FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DomainError::NotFound("user"))
    }

    async fn get_by_username(&self, username: &str) -> DomainResult<User> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, display_name, avatar_url, password_hash, status, custom_status, email, language, is_platform_admin, created_at
             FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DomainError::NotFound("user"))
    }

    async fn update_status(&self, id: UserId, status: UserStatus, custom_status: Option<&str>) -> DomainResult<()> {
        sqlx::query("UPDATE users SET status = $1, custom_status = $2 WHERE id = $3")
            .bind(status)
            .bind(custom_status)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_profile(&self, id: UserId, display_name: Option<&str>, avatar_url: Option<&str>) -> DomainResult<User> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET display_name = COALESCE($1, display_name), avatar_url = COALESCE($2, avatar_url)
             WHERE id = $3
             RETURNING id, username, display_name, avatar_url, password_hash, status, custom_status, email, language, is_platform_admin, created_at",
        )
        .bind(display_name)
        .bind(avatar_url)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DomainError::NotFound("user"))
    }

    async fn delete(&self, id: UserId) -> DomainResult<()> {
        // Cascades sessions, user_roles, friendships and server_members via
        // ON DELETE CASCADE foreign keys declared in the migration.
        sqlx::query("DELETE FROM users WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionRepository for PgRepo {
    async fn create(&self, user_id: UserId, refresh_token: &str, expires_at: chrono::DateTime<chrono::Utc>) -> DomainResult<Session> {
        sqlx::query_as::<_, Session>(
            "INSERT INTO sessions (id, user_id, refresh_token, expires_at, created_at)
             VALUES ($1, $2, $3, $4, NOW())
             RETURNING id, user_id, refresh_token, expires_at, created_at",
        )
        .bind(SessionId::new())
        .bind(user_id)
        .bind(refresh_token)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn get_by_token(&self, refresh_token: &str) -> DomainResult<Session> {
        sqlx::query_as::<_, Session>(
            "SELECT id, user_id, refresh_token, expires_at, created_at FROM sessions WHERE refresh_token = $1",
        )
        .bind(refresh_token)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DomainError::NotFound("session"))
    }

    async fn delete(&self, id: SessionId) -> DomainResult<()> {
        sqlx::query("DELETE FROM sessions WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(())
    }

    async fn delete_by_token(&self, refresh_token: &str) -> DomainResult<()> {
        sqlx::query("DELETE FROM sessions WHERE refresh_token = $1")
            .bind(refresh_token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_expired(&self) -> DomainResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < NOW()").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
