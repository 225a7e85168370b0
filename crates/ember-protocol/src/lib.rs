pub mod envelope;
pub mod events;
pub mod http;
pub mod intents;

pub use envelope::*;
pub use events::*;
pub use intents::*;

use ember_model::{Attachment, DmAttachment, DmMessage, Message};
use serde::Serialize;

/// A message enriched with its attachments and reaction groups, batch-loaded
/// to avoid N+1 queries when listing a page of messages.
#[derive(Clone, Debug, Serialize)]
pub struct MessageView {
    #[serde(flatten)]
    pub message: Message,
    pub attachments: Vec<Attachment>,
    pub reactions: Vec<ReactionGroup>,
    pub mentions: Vec<ember_ids::UserId>,
}

/// The DM counterpart of [`MessageView`]. DMs carry no structured mention
/// rows — `@username` resolution there only drives notification delivery.
#[derive(Clone, Debug, Serialize)]
pub struct DmMessageView {
    #[serde(flatten)]
    pub message: DmMessage,
    pub attachments: Vec<DmAttachment>,
    pub reactions: Vec<ReactionGroup>,
}
