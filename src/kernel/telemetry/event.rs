use serde::{Deserialize, Serialize};
use crate::collectors::Domain;
use crate::kernel::lifecycle::ServiceState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TelemetryEvent {
    SessionEmitted {
        duration_secs: i64,
    },

    SessionDropped {
        reason: DropReason,
    },

    /// Open session discarded by a repeated ENTER.
    SessionReplaced,

    OrphanExit,

    EventExcluded,

    OpenSessionsFlushed {
        count: usize,
    },

    Transition {
        from: ServiceState,
        to: ServiceState,
    },

    TransitionRejected {
        current: ServiceState,
    },

    CollectorStopFailed {
        domain: Domain,
    },

    /// Queued by a subscription that was stopped before the reactor drained it.
    StaleEventDropped {
        domain: Domain,
    },

    Push(PushOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropReason {
    TooShort,
    LabelUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PushOutcome {
    Delivered,
    /// No subscriber was listening; nothing is buffered for later.
    Unobserved,
}
