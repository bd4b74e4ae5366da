//! Per-domain collectors behind one capability interface.
//!
//! Every collector answers the same four questions (permission, start, stop,
//! fetch-since); the registry iterates them uniformly and never special-cases
//! a domain.

pub mod calls;
pub mod messages;
pub mod registry;
pub mod unlock;
pub mod usage;

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::host::{HostError, HostServices};
use crate::kernel::ingest::IngestQueue;
use crate::kernel::session::SessionRecord;
use crate::kernel::time::Millis;

pub use calls::{CallKind, CallRecord, CallsCollector};
pub use messages::{MessageRecord, MessagesCollector};
pub use registry::CollectorRegistry;
pub use unlock::{UnlockCollector, UnlockJournal, UnlockRecord};
pub use usage::UsageCollector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Usage,
    Calls,
    Messages,
    Unlock,
    /// Capture only. Has a permission but no registry collector.
    Media,
}

impl Domain {
    pub const ALL: [Domain; 5] = [Domain::Usage, Domain::Calls, Domain::Messages, Domain::Unlock, Domain::Media];

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "usage" | "apps" => Some(Domain::Usage),
            "calls" => Some(Domain::Calls),
            "messages" | "sms" => Some(Domain::Messages),
            "unlock" => Some(Domain::Unlock),
            "media" => Some(Domain::Media),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "domain", rename_all = "lowercase")]
pub enum Record {
    Usage(SessionRecord),
    Call(CallRecord),
    Message(MessageRecord),
    Unlock(UnlockRecord),
}

impl Record {
    pub fn occurred_at(&self) -> Millis {
        match self {
            Record::Usage(s) => s.start,
            Record::Call(c) => c.date,
            Record::Message(m) => m.date,
            Record::Unlock(u) => u.timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CollectorState {
    pub domain: Domain,
    pub permission_granted: bool,
    pub active: bool,
}

pub trait Collector: Send + Sync {
    fn domain(&self) -> Domain;

    fn check_permission(&self) -> bool;

    /// Begins live collection. Idempotent.
    fn start(&self) -> Result<(), HostError>;

    /// Ends live collection. Must leave the collector inactive even when the
    /// host reports a failure.
    fn stop(&self) -> Result<(), HostError>;

    fn is_active(&self) -> bool;

    /// Historical query, newest first, `occurred_at >= since`. Never touches
    /// live state. Fails soft: a missing permission or host failure yields
    /// an empty vector.
    fn fetch_since(&self, since: Millis) -> Vec<Record>;

    fn state(&self) -> CollectorState {
        CollectorState {
            domain: self.domain(),
            permission_granted: self.check_permission(),
            active: self.is_active(),
        }
    }
}

/// Applies the fetch contract: drop anything older than `since`, newest first.
/// The sort is stable so equal timestamps keep source order.
pub fn newest_first(mut records: Vec<Record>, since: Millis) -> Vec<Record> {
    records.retain(|r| r.occurred_at() >= since);
    records.sort_by(|a, b| b.occurred_at().cmp(&a.occurred_at()));
    records
}

/// Live-feed bookkeeping shared by the collectors: one host subscription per
/// domain, tracked by an atomic flag so start/stop stay idempotent. Stopping
/// retires the domain's epoch, which makes the reactor drop anything this
/// subscription still has queued.
#[derive(Debug)]
pub(crate) struct FeedSubscription {
    domain: Domain,
    active: AtomicBool,
}

impl FeedSubscription {
    pub(crate) fn new(domain: Domain) -> Self {
        Self { domain, active: AtomicBool::new(false) }
    }

    pub(crate) fn start(&self, granted: bool, host: &HostServices, queue: &IngestQueue) -> Result<(), HostError> {
        if !granted {
            return Err(HostError::PermissionDenied(self.domain));
        }
        if self.active.load(Ordering::SeqCst) {
            return Ok(());
        }
        host.feed.subscribe(self.domain, queue.sink(self.domain))?;
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub(crate) fn stop(&self, host: &HostServices, queue: &IngestQueue) -> Result<(), HostError> {
        if !self.active.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        queue.retire(self.domain);
        host.feed.unsubscribe(self.domain)
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}
