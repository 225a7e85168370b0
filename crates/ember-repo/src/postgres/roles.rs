use async_trait::async_trait;
use ember_ids::{RoleId, ServerId, UserId};
use ember_model::{DomainError, DomainResult, Role, UserRole};

use crate::traits::RoleRepository;

use super::PgRepo;

#[async_trait]
impl RoleRepository for PgRepo {
    async fn create(&self, role: Role) -> DomainResult<Role> {
        sqlx::query_as::<_, Role>(
            "INSERT INTO roles (id, server_id, name, color, position, permissions, is_default, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, FALSE, NOW())
             RETURNING id, server_id, name, color, position, permissions, is_default, created_at",
        )
        .bind(role.id)
        .bind(role.server_id)
        .bind(&role.name)
        .bind(role.color)
        .bind(role.position)
        .bind(role.permissions)
        .fetch_one(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn update(&self, role: Role) -> DomainResult<Role> {
        sqlx::query_as::<_, Role>(
            "UPDATE roles SET name = $1, color = $2, permissions = $3 WHERE id = $4
             RETURNING id, server_id, name, color, position, permissions, is_default, created_at",
        )
        .bind(&role.name)
        .bind(role.color)
        .bind(role.permissions)
        .bind(role.id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DomainError::NotFound("role"))
    }

    async fn delete(&self, id: RoleId) -> DomainResult<()> {
        let is_default: bool = sqlx::query_scalar("SELECT is_default FROM roles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DomainError::NotFound("role"))?;
        if is_default {
            return Err(DomainError::Forbidden);
        }
        sqlx::query("DELETE FROM roles WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(())
    }

    async fn list_for_server(&self, server_id: ServerId) -> DomainResult<Vec<Role>> {
        sqlx::query_as::<_, Role>(
            "SELECT id, server_id, name, color, position, permissions, is_default, created_at
             FROM roles WHERE server_id = $1 ORDER BY position ASC",
        )
        .bind(server_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn list_for_user(&self, server_id: ServerId, user_id: UserId) -> DomainResult<Vec<Role>> {
        sqlx::query_as::<_, Role>(
            "SELECT r.id, r.server_id, r.name, r.color, r.position, r.permissions, r.is_default, r.created_at
             FROM roles r
             LEFT JOIN user_roles ur ON ur.role_id = r.id AND ur.user_id = $2
             WHERE r.server_id = $1 AND (r.is_default OR ur.user_id IS NOT NULL)",
        )
        .bind(server_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn reorder(&self, positions: &[(RoleId, i32)]) -> DomainResult<()> {
        let mut tx = self.pool.begin().await?;
        for (role_id, position) in positions {
            sqlx::query("UPDATE roles SET position = $1 WHERE id = $2")
                .bind(position)
                .bind(role_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn assign(&self, grant: UserRole) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO user_roles (user_id, role_id, server_id) VALUES ($1, $2, $3)
             ON CONFLICT DO NOTHING",
        )
        .bind(grant.user_id)
        .bind(grant.role_id)
        .bind(grant.server_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn unassign(&self, user_id: UserId, role_id: RoleId) -> DomainResult<()> {
        sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role_id = $2")
            .bind(user_id)
            .bind(role_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn default_role(&self, server_id: ServerId) -> DomainResult<Role> {
        sqlx::query_as::<_, Role>(
            "SELECT id, server_id, name, color, position, permissions, is_default, created_at
             FROM roles WHERE server_id = $1 AND is_default",
        )
        .bind(server_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DomainError::NotFound("default role"))
    }
}
