use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{newest_first, Collector, Domain, FeedSubscription, Record};
use crate::host::{CallRow, HostError, HostServices};
use crate::kernel::ingest::IngestQueue;
use crate::kernel::time::Millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallKind {
    Incoming,
    Outgoing,
    Missed,
    Voicemail,
    Rejected,
    Blocked,
    Unknown(i32),
}

impl CallKind {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => CallKind::Incoming,
            2 => CallKind::Outgoing,
            3 => CallKind::Missed,
            4 => CallKind::Voicemail,
            5 => CallKind::Rejected,
            6 => CallKind::Blocked,
            other => CallKind::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRecord {
    pub number: String,
    pub name: String,
    pub kind: CallKind,
    pub date: Millis,
    pub duration_secs: i64,
    /// Not exposed by the basic call log; always -1.
    pub sim_slot: i32,
    pub is_conference: bool,
}

impl From<CallRow> for CallRecord {
    fn from(row: CallRow) -> Self {
        Self {
            number: row.number.unwrap_or_default(),
            name: row.cached_name.unwrap_or_default(),
            kind: CallKind::from_code(row.call_type),
            date: row.date,
            duration_secs: row.duration_secs,
            sim_slot: -1,
            is_conference: false,
        }
    }
}

/// Call log history plus live call-state changes (including the outgoing-call hook).
pub struct CallsCollector {
    host: HostServices,
    queue: IngestQueue,
    feed: FeedSubscription,
}

impl CallsCollector {
    pub fn new(host: HostServices, queue: IngestQueue) -> Self {
        Self { host, queue, feed: FeedSubscription::new(Domain::Calls) }
    }
}

impl Collector for CallsCollector {
    fn domain(&self) -> Domain {
        Domain::Calls
    }

    fn check_permission(&self) -> bool {
        self.host.permissions.is_granted(Domain::Calls)
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
        if !self.check_permission() {
            return Vec::new();
        }
        match self.host.calls.query_calls(since) {
            Ok(rows) => newest_first(rows.into_iter().map(|r| Record::Call(r.into())).collect(), since),
            Err(e) => {
                warn!("Call log query failed: {}", e);
                Vec::new()
            }
        }
    }
}
