use std::sync::Arc;

use ember_ids::{ChannelId, MessageId, ServerId, UserId};
use ember_model::{DomainResult, ReadState};
use ember_repo::ReadStateRepository;

pub struct ReadStateService {
    read_states: Arc<dyn ReadStateRepository>,
}

impl ReadStateService {
    pub fn new(read_states: Arc<dyn ReadStateRepository>) -> Self {
        Self { read_states }
    }

    pub async fn mark_read(&self, user_id: UserId, channel_id: ChannelId, message_id: MessageId) -> DomainResult<()> {
        self.read_states.mark_read(user_id, channel_id, message_id).await
    }

    pub async fn get(&self, user_id: UserId, channel_id: ChannelId) -> DomainResult<Option<ReadState>> {
        self.read_states.get(user_id, channel_id).await
    }

    /// Idempotent: a repeat call joins each text channel to the same newest
    /// message and upserts the same row, so it yields zero additional
    /// unread counts on the second run.
    pub async fn mark_all_read(&self, user_id: UserId, server_id: ServerId) -> DomainResult<u64> {
        self.read_states.mark_all_read(user_id, server_id).await
    }
}
