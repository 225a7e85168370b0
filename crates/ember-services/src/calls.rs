use std::sync::Arc;

use ember_calls::{CallDirected, CallKind, CallRegistry, CallSignal};
use ember_hub::Hub;
use ember_ids::{CallId, UserId};
use ember_model::DomainResult;
use ember_protocol::{CallSignalPayload, ServerEvent};
use ember_repo::FriendRepository;

/// Thin adapter over [`CallRegistry`]: checks the friendship precondition,
/// delegates the state transition, then relays each directed outcome
/// through the hub. Signaling itself is never inspected, only relayed.
pub struct P2pCallService {
    registry: Arc<CallRegistry>,
    friends: Arc<dyn FriendRepository>,
    hub: Arc<Hub>,
}

impl P2pCallService {
    pub fn new(registry: Arc<CallRegistry>, friends: Arc<dyn FriendRepository>, hub: Arc<Hub>) -> Self {
        Self { registry, friends, hub }
    }

    pub async fn initiate(&self, caller_id: UserId, receiver_id: UserId, kind: CallKind) -> DomainResult<()> {
        if self.friends.find(caller_id, receiver_id).await?.is_none() {
            return Err(ember_model::DomainError::Forbidden);
        }
        let directed = self.registry.initiate(caller_id, receiver_id, kind)?;
        self.relay(directed).await;
        Ok(())
    }

    pub async fn accept(&self, user_id: UserId, call_id: CallId) -> DomainResult<()> {
        let directed = self.registry.accept(user_id, call_id)?;
        self.relay(vec![directed]).await;
        Ok(())
    }

    pub async fn decline(&self, user_id: UserId, call_id: CallId) -> DomainResult<()> {
        let directed = self.registry.decline(user_id, call_id)?;
        self.relay(vec![directed]).await;
        Ok(())
    }

    pub async fn end(&self, user_id: UserId) -> DomainResult<()> {
        let directed = self.registry.end(user_id)?;
        self.relay(vec![directed]).await;
        Ok(())
    }

    pub async fn signal(&self, sender_id: UserId, signal: CallSignal) -> DomainResult<()> {
        let directed = self.registry.signal(sender_id, signal)?;
        self.relay(vec![directed]).await;
        Ok(())
    }

    /// Polled periodically by the hosting binary to auto-decline calls stuck
    /// in `ringing` past the timeout.
    pub async fn sweep_expired_ringing(&self) {
        let directed = self.registry.sweep_expired_ringing();
        self.relay(directed).await;
    }

    async fn relay(&self, directed: Vec<(UserId, CallDirected)>) {
        for (user_id, outcome) in directed {
            let event = match outcome {
                CallDirected::Initiate { call } => ServerEvent::P2pCallInitiate(call),
                CallDirected::Ringing { call } => ServerEvent::P2pCallInitiate(call),
                CallDirected::Busy => ServerEvent::P2pCallBusy,
                CallDirected::Accept { call } => ServerEvent::P2pCallAccept(call),
                CallDirected::Decline { call_id } => ServerEvent::P2pCallDecline { call_id },
                CallDirected::End { call_id } => ServerEvent::P2pCallEnd { call_id },
                CallDirected::Signal { call_id, signal } => {
                    ServerEvent::P2pSignal(CallSignalPayload { call_id, kind: signal.kind, sdp: signal.sdp, candidate: signal.candidate })
                }
            };
            self.hub.broadcast_to_user(user_id, event).await;
        }
    }
}
