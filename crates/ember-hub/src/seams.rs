use async_trait::async_trait;
use ember_ids::{ChannelId, ConnectionId, ServerId, UserId};
use ember_protocol::ClientIntent;

/// Identifies the connection an inbound intent arrived on.
#[derive(Clone, Copy, Debug)]
pub struct ConnectionContext {
    pub connection_id: ConnectionId,
    pub user_id: UserId,
}

/// The hub knows nothing about domain logic; a single router is registered
/// at startup and every non-heartbeat client op is handed to it. This is the
/// Dependency Inversion seam between transport and services.
#[async_trait]
pub trait IntentRouter: Send + Sync {
    async fn dispatch(&self, ctx: ConnectionContext, intent: ClientIntent);
}

/// `BroadcastToServer`/`BroadcastToChannelViewers` need up-to-date
/// membership and permission data; the hub consults this injected provider
/// rather than querying a repository directly.
#[async_trait]
pub trait MembershipProvider: Send + Sync {
    async fn server_member_ids(&self, server_id: ServerId) -> Vec<UserId>;
    async fn channel_viewer_ids(&self, channel_id: ChannelId) -> Vec<UserId>;
}

/// Called on the first connection of a user (edge into "online") and the
/// last disconnection (edge into "offline"), each observed exactly once by
/// the registry's serializing task. Invoked after the registry lock is
/// released, so a hook may itself call back into the hub.
#[async_trait]
pub trait ConnectionLifecycle: Send + Sync {
    async fn on_first_connect(&self, user_id: UserId);
    async fn on_last_disconnect(&self, user_id: UserId);
}
