use std::sync::Arc;

use async_trait::async_trait;
use ember_ids::{ChannelId, ServerId, UserId};
use ember_model::DomainResult;
use ember_repo::SfuRepository;
use ember_services::{SfuClient, SfuToken};
use sha2::{Digest, Sha256};
use tracing::debug;

/// The SFU contract's only concrete implementation this deployment carries:
/// a signed room token the SFU independently verifies against the same
/// instance secret, rather than a round trip into the media server (out of
/// scope here).
pub struct HmacSfuClient {
    instances: Arc<dyn SfuRepository>,
}

impl HmacSfuClient {
    pub fn new(instances: Arc<dyn SfuRepository>) -> Self {
        Self { instances }
    }
}

#[async_trait]
impl SfuClient for HmacSfuClient {
    async fn mint_token(&self, server_id: ServerId, channel_id: ChannelId, user_id: UserId) -> DomainResult<SfuToken> {
        let instance = self.instances.least_loaded().await?;
        let payload = format!("{}:{}:{}:{}", instance.api_key, server_id.as_uuid(), channel_id.as_uuid(), user_id.as_uuid());

        let mut hasher = Sha256::new();
        hasher.update(instance.api_secret.as_bytes());
        hasher.update(payload.as_bytes());
        let signature = hex::encode(hasher.finalize());

        Ok(SfuToken { url: instance.url, token: format!("{payload}.{signature}") })
    }

    async fn evict(&self, user_id: UserId) {
        debug!(%user_id, "sfu eviction requested; no external media server wired into this deployment");
    }
}
