//! Domain services: the repository-backed, permission-gated operations each
//! [`ember_hub::IntentRouter`] implementation dispatches into. Every service
//! owns exactly the repository capabilities it needs and an [`ember_hub::Hub`]
//! handle for broadcasting the events its mutations produce.

mod calls;
mod channels;
mod dms;
mod friends;
mod members;
mod mentions;
mod messages;
pub mod permissions;
mod presence;
mod reactions;
mod read_state;
mod voice;

pub use calls::P2pCallService;
pub use channels::ChannelService;
pub use dms::DmService;
pub use friends::FriendService;
pub use members::MemberService;
pub use permissions::{effective_channel, effective_server, require};
pub use messages::MessageService;
pub use presence::PresenceService;
pub use reactions::ReactionService;
pub use read_state::ReadStateService;
pub use voice::{SfuClient, SfuToken, VoiceService};
