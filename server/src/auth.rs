use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use ember_ids::UserId;
use ember_model::{DomainError, DomainResult};
use ember_repo::SessionRepository;

/// Resolves the bearer token carried on the `/ws` upgrade to the user it
/// belongs to. Authentication is pluggable: the hub and services only ever
/// see a resolved `UserId`.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn authenticate(&self, bearer_token: &str) -> DomainResult<UserId>;
}

pub struct SessionAuthProvider {
    sessions: Arc<dyn SessionRepository>,
}

impl SessionAuthProvider {
    pub fn new(sessions: Arc<dyn SessionRepository>) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl AuthProvider for SessionAuthProvider {
    async fn authenticate(&self, bearer_token: &str) -> DomainResult<UserId> {
        let session = self.sessions.get_by_token(bearer_token).await.map_err(|_| DomainError::Unauthorized)?;
        if session.expires_at < Utc::now() {
            return Err(DomainError::Unauthorized);
        }
        Ok(session.user_id)
    }
}

/// Accepts any `dev:<user-uuid>` token as that user with no session lookup.
/// Only wired in when `--dev-mode` is passed.
pub struct DevAuthProvider;

#[async_trait]
impl AuthProvider for DevAuthProvider {
    async fn authenticate(&self, bearer_token: &str) -> DomainResult<UserId> {
        let raw = bearer_token.strip_prefix("dev:").ok_or(DomainError::Unauthorized)?;
        let uuid = uuid::Uuid::parse_str(raw).map_err(|_| DomainError::Unauthorized)?;
        Ok(UserId::from_uuid(uuid))
    }
}
