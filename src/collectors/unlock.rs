use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, PoisonError, RwLock};

use super::{newest_first, Collector, Domain, FeedSubscription, Record};
use crate::host::{HostError, HostServices};
use crate::kernel::event::{LockEvent, LockState};
use crate::kernel::ingest::IngestQueue;
use crate::kernel::time::Millis;

pub const DEFAULT_JOURNAL_CAPACITY: usize = 1_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockRecord {
    pub state: LockState,
    pub timestamp: Millis,
}

impl From<LockEvent> for UnlockRecord {
    fn from(e: LockEvent) -> Self {
        Self { state: e.state, timestamp: e.timestamp }
    }
}

/// Bounded history of lock-state transitions. The host keeps no log of its
/// own, so the reactor appends here and fetches read a copy.
#[derive(Debug, Clone)]
pub struct UnlockJournal {
    entries: Arc<RwLock<VecDeque<UnlockRecord>>>,
    capacity: usize,
}

impl UnlockJournal {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::with_capacity(capacity.min(DEFAULT_JOURNAL_CAPACITY)))),
            capacity: capacity.max(1),
        }
    }

    pub fn append(&self, record: UnlockRecord) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(record);
    }

    /// Copy-on-read so queries never hold the lock while sorting.
    pub fn snapshot(&self) -> Vec<UnlockRecord> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for UnlockJournal {
    fn default() -> Self {
        Self::new(DEFAULT_JOURNAL_CAPACITY)
    }
}

/// Device lock/unlock transitions. Observing lock state needs no grant.
pub struct UnlockCollector {
    host: HostServices,
    queue: IngestQueue,
    journal: UnlockJournal,
    feed: FeedSubscription,
}

impl UnlockCollector {
    pub fn new(host: HostServices, queue: IngestQueue, journal: UnlockJournal) -> Self {
        Self { host, queue, journal, feed: FeedSubscription::new(Domain::Unlock) }
    }
}

impl Collector for UnlockCollector {
    fn domain(&self) -> Domain {
        Domain::Unlock
    }

    fn check_permission(&self) -> bool {
        true
    }

    fn start(&self) -> Result<(), HostError> {
        self.feed.start(self.check_permission(), &self.host, &self.queue)
    }

    fn stop(&self) -> Result<(), HostError> {
        self.feed.stop(&self.host, &self.queue)
    }

    fn is_active(&self) -> bool {
        self.feed.is_active()
    }

    fn fetch_since(&self, since: Millis) -> Vec<Record> {
        let records = self.journal.snapshot().into_iter().map(Record::Unlock).collect();
        newest_first(records, since)
    }
}
