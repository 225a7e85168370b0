//! In-memory registry of one-to-one WebRTC calls and their signaling relay.
//!
//! Exactly one active call per user; the server never inspects SDP, it only
//! relays `Signal` payloads verbatim between the two participants.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ember_ids::{CallId, UserId};
use ember_model::{DomainError, DomainResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// A `ringing` call not advanced within this long is auto-declined.
pub const RINGING_TIMEOUT: Duration = Duration::from_secs(45);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    Voice,
    Video,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallState {
    Ringing,
    Accepted,
    Ended,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Call {
    pub id: CallId,
    pub caller_id: UserId,
    pub receiver_id: UserId,
    pub kind: CallKind,
    pub state: CallState,
    pub started_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
}

impl Call {
    pub fn other(&self, user_id: UserId) -> Option<UserId> {
        if user_id == self.caller_id {
            Some(self.receiver_id)
        } else if user_id == self.receiver_id {
            Some(self.caller_id)
        } else {
            None
        }
    }

    pub fn is_participant(&self, user_id: UserId) -> bool {
        user_id == self.caller_id || user_id == self.receiver_id
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalKind {
    Offer,
    Answer,
    IceCandidate,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CallSignal {
    pub call_id: CallId,
    #[serde(rename = "type")]
    pub kind: SignalKind,
    pub sdp: Option<String>,
    pub candidate: Option<serde_json::Value>,
}

/// What the caller must relay through the hub. A directed event always goes
/// to exactly one user — call signaling never broadcasts.
pub enum CallDirected {
    Initiate { call: Call },
    Ringing { call: Call },
    Busy,
    Accept { call: Call },
    Decline { call_id: CallId },
    End { call_id: CallId },
    Signal { call_id: CallId, signal: CallSignal },
}

#[derive(Default)]
struct Inner {
    calls: HashMap<CallId, Call>,
    active_call_of: HashMap<UserId, CallId>,
}

pub struct CallRegistry {
    inner: RwLock<Inner>,
}

impl Default for CallRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CallRegistry {
    pub fn new() -> Self {
        Self { inner: RwLock::new(Inner::default()) }
    }

    /// `None` directed pair means "no call was created" (the busy case).
    pub fn initiate(
        &self,
        caller: UserId,
        receiver: UserId,
        kind: CallKind,
    ) -> DomainResult<Vec<(UserId, CallDirected)>> {
        let mut inner = self.inner.write();

        if inner.active_call_of.contains_key(&caller) {
            return Err(DomainError::Busy);
        }
        if inner.active_call_of.contains_key(&receiver) {
            return Ok(vec![(caller, CallDirected::Busy)]);
        }

        let call = Call {
            id: CallId::new(),
            caller_id: caller,
            receiver_id: receiver,
            kind,
            state: CallState::Ringing,
            started_at: Utc::now(),
            accepted_at: None,
        };
        inner.active_call_of.insert(caller, call.id);
        inner.active_call_of.insert(receiver, call.id);
        inner.calls.insert(call.id, call.clone());

        Ok(vec![
            (caller, CallDirected::Initiate { call: call.clone() }),
            (receiver, CallDirected::Ringing { call }),
        ])
    }

    pub fn accept(&self, user_id: UserId, call_id: CallId) -> DomainResult<(UserId, CallDirected)> {
        let mut inner = self.inner.write();
        let call = inner.calls.get_mut(&call_id).ok_or(DomainError::NotFound("call"))?;
        if call.receiver_id != user_id {
            return Err(DomainError::Forbidden);
        }
        if call.state != CallState::Ringing {
            return Err(DomainError::WrongState("call is not ringing"));
        }
        call.state = CallState::Accepted;
        call.accepted_at = Some(Utc::now());
        Ok((call.caller_id, CallDirected::Accept { call: call.clone() }))
    }

    pub fn decline(&self, user_id: UserId, call_id: CallId) -> DomainResult<(UserId, CallDirected)> {
        let mut inner = self.inner.write();
        let call = inner.calls.get(&call_id).ok_or(DomainError::NotFound("call"))?;
        if !call.is_participant(user_id) {
            return Err(DomainError::Forbidden);
        }
        if call.state != CallState::Ringing {
            return Err(DomainError::WrongState("call is not ringing"));
        }
        let other = call.other(user_id).expect("participant checked above");
        Self::remove_call_locked(&mut inner, call_id);
        Ok((other, CallDirected::Decline { call_id }))
    }

    pub fn end(&self, user_id: UserId) -> DomainResult<(UserId, CallDirected)> {
        let mut inner = self.inner.write();
        let call_id = *inner.active_call_of.get(&user_id).ok_or(DomainError::NotFound("no active call"))?;
        let call = inner.calls.get(&call_id).expect("active_call_of is consistent with calls").clone();
        let other = call.other(user_id).expect("user_id is a participant by construction");
        Self::remove_call_locked(&mut inner, call_id);
        Ok((other, CallDirected::End { call_id }))
    }

    pub fn signal(&self, sender: UserId, signal: CallSignal) -> DomainResult<(UserId, CallDirected)> {
        let inner = self.inner.read();
        let call = inner.calls.get(&signal.call_id).ok_or(DomainError::NotFound("call"))?;
        if !call.is_participant(sender) {
            return Err(DomainError::Forbidden);
        }
        if call.state == CallState::Ended {
            return Err(DomainError::WrongState("call has ended"));
        }
        let other = call.other(sender).expect("participant checked above");
        let call_id = signal.call_id;
        Ok((other, CallDirected::Signal { call_id, signal }))
    }

    /// Sweep calls stuck in `ringing` for longer than `RINGING_TIMEOUT`;
    /// returns the directed decline events for each timed-out call. Intended
    /// to be polled by a periodic task in the hosting binary.
    pub fn sweep_expired_ringing(&self) -> Vec<(UserId, CallDirected)> {
        let mut inner = self.inner.write();
        let cutoff = Utc::now() - chrono::Duration::from_std(RINGING_TIMEOUT).expect("constant fits");
        let expired: Vec<CallId> = inner
            .calls
            .values()
            .filter(|c| c.state == CallState::Ringing && c.started_at < cutoff)
            .map(|c| c.id)
            .collect();

        let mut out = Vec::new();
        for call_id in expired {
            if let Some(call) = inner.calls.get(&call_id).cloned() {
                Self::remove_call_locked(&mut inner, call_id);
                out.push((call.caller_id, CallDirected::Decline { call_id }));
                out.push((call.receiver_id, CallDirected::Decline { call_id }));
            }
        }
        out
    }

    fn remove_call_locked(inner: &mut Inner, call_id: CallId) {
        if let Some(call) = inner.calls.remove(&call_id) {
            inner.active_call_of.remove(&call.caller_id);
            inner.active_call_of.remove(&call.receiver_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_receiver_does_not_create_a_call() {
        let reg = CallRegistry::new();
        let (u1, u2, u3) = (UserId::new(), UserId::new(), UserId::new());
        reg.initiate(u1, u2, CallKind::Voice).unwrap();
        reg.accept(u2, reg_active_call(&reg, u1)).unwrap();

        let out = reg.initiate(u3, u2, CallKind::Voice).unwrap();
        assert_eq!(out.len(), 1);
        assert!(matches!(out[0].1, CallDirected::Busy));
    }

    fn reg_active_call(reg: &CallRegistry, user: UserId) -> CallId {
        *reg.inner.read().active_call_of.get(&user).unwrap()
    }

    #[test]
    fn decline_while_ringing_ends_the_call() {
        let reg = CallRegistry::new();
        let (u1, u2) = (UserId::new(), UserId::new());
        reg.initiate(u1, u2, CallKind::Voice).unwrap();
        let call_id = reg_active_call(&reg, u1);
        let (other, _) = reg.decline(u2, call_id).unwrap();
        assert_eq!(other, u1);
        assert!(reg.end(u1).is_err());
    }

    #[test]
    fn one_active_call_per_user() {
        let reg = CallRegistry::new();
        let (u1, u2, u3) = (UserId::new(), UserId::new(), UserId::new());
        reg.initiate(u1, u2, CallKind::Voice).unwrap();
        assert!(matches!(reg.initiate(u1, u3, CallKind::Voice), Err(DomainError::Busy)));
    }
}
