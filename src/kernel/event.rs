use serde::{Deserialize, Serialize};
use super::session::SessionRecord;
use super::time::Millis;
use crate::collectors::Domain;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ForegroundKind {
    EnterForeground,
    ExitForeground,
}

/// One foreground/background transition as reported by the host usage log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    pub package: String,
    pub kind: ForegroundKind,
    pub timestamp: Millis,
}

impl RawEvent {
    pub fn enter(package: &str, timestamp: i64) -> Self {
        Self { package: package.to_string(), kind: ForegroundKind::EnterForeground, timestamp: Millis(timestamp) }
    }

    pub fn exit(package: &str, timestamp: i64) -> Self {
        Self { package: package.to_string(), kind: ForegroundKind::ExitForeground, timestamp: Millis(timestamp) }
    }
}

/// Telephony call state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallState {
    Idle,
    Ringing,
    OffHook,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallEvent {
    pub state: CallState,
    pub number: String,
    pub timestamp: Millis,
    /// Set by the outgoing-call hook, which always reports OffHook.
    pub outgoing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEvent {
    pub sender: String,
    pub body: String,
    pub date: Millis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockState {
    Locked,
    Unlocked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockEvent {
    pub state: LockState,
    pub timestamp: Millis,
}

/// Everything the host pushes into the agent. All variants funnel through
/// the same bounded channel so ordering is preserved per source.
#[derive(Debug, Clone)]
pub enum Event {
    Usage(RawEvent),
    Call(CallEvent),
    Message(MessageEvent),
    Lock(LockEvent),
}

impl Event {
    /// Collector domain whose feed delivers this event.
    pub fn domain(&self) -> Domain {
        match self {
            Event::Usage(_) => Domain::Usage,
            Event::Call(_) => Domain::Calls,
            Event::Message(_) => Domain::Messages,
            Event::Lock(_) => Domain::Unlock,
        }
    }
}

/// Live notifications delivered to gateway subscribers, at most once.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PushEvent {
    CallStateChanged(CallEvent),
    MessageReceived(MessageEvent),
    LockStateChanged(LockEvent),
    SessionCompleted(SessionRecord),
    /// The consumer asked for its stored data to be synchronised.
    SyncRequested,
}
