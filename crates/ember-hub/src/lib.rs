//! The WebSocket fan-out hub: connection bookkeeping, heartbeat/keepalive
//! enforcement, and sequence-numbered broadcast to servers, channels, and
//! individual users.
//!
//! The hub knows nothing about domain logic. Everything it needs from the
//! rest of the system arrives through the seams in [`seams`]: a single
//! [`IntentRouter`] dispatches inbound ops, a [`MembershipProvider`] answers
//! "who should see this", and [`ConnectionLifecycle`] hooks fire on the
//! first-connect/last-disconnect edges.

mod hub;
mod registry;
mod seams;

pub use hub::{Hub, HEARTBEAT_INTERVAL};
pub use seams::{ConnectionContext, ConnectionLifecycle, IntentRouter, MembershipProvider};
