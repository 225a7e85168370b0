//! DTOs for the HTTP contract surface. Handlers themselves are out of
//! scope (owned by the CRUD layer this crate is a collaborator of); these
//! types are the shapes `ember-services` accepts and returns so that
//! contract is explicit even though this repository does not implement
//! the routing.

use ember_ids::{ChannelId, MessageId};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize)]
pub struct CreateMessageRequest {
    pub content: Option<String>,
    pub reply_to_id: Option<MessageId>,
    #[serde(default)]
    pub attachment_ids: Vec<ember_ids::AttachmentId>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct UpdateMessageRequest {
    pub content: String,
}

/// Cursor pagination over `(created_at, id)` — stable under concurrent
/// inserts, unlike offset pagination.
#[derive(Clone, Debug, Deserialize)]
pub struct ListMessagesQuery {
    pub before: Option<MessageId>,
    #[serde(default = "default_message_limit")]
    pub limit: i64,
}

fn default_message_limit() -> i64 {
    50
}

pub const MAX_MESSAGE_LIMIT: i64 = 100;

#[derive(Clone, Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub channel: Option<ChannelId>,
    #[serde(default = "default_message_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct MessageListResponse {
    pub messages: Vec<crate::MessageView>,
}
