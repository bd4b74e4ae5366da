use tracing::warn;

use super::{newest_first, Collector, Domain, FeedSubscription, Record};
use crate::host::{HostError, HostServices};
use crate::kernel::ingest::IngestQueue;
use crate::kernel::session::SessionReconstructor;
use crate::kernel::time::Millis;

/// Foreground usage sessions.
///
/// Live transitions go to the reactor's reconstructor through the feed. A
/// fetch replays the host usage log through a fresh reconstructor, so the
/// live working set is never read or mutated by a query.
pub struct UsageCollector {
    host: HostServices,
    queue: IngestQueue,
    excluded_prefixes: Vec<String>,
    feed: FeedSubscription,
}

impl UsageCollector {
    pub fn new(host: HostServices, queue: IngestQueue, excluded_prefixes: Vec<String>) -> Self {
        Self {
            host,
            queue,
            excluded_prefixes,
            feed: FeedSubscription::new(Domain::Usage),
        }
    }
}

impl Collector for UsageCollector {
    fn domain(&self) -> Domain {
        Domain::Usage
    }

    fn check_permission(&self) -> bool {
        self.host.permissions.is_granted(Domain::Usage)
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

        let until = self.host.clock.now();
        let events = match self.host.usage.query_events(since, until) {
            Ok(events) => events,
            Err(e) => {
                warn!("Usage log query failed: {}", e);
                return Vec::new();
            }
        };

        let mut replay = SessionReconstructor::with_exclusions(self.excluded_prefixes.clone());
        let records = replay
            .fold(&events, self.host.labels.as_ref())
            .into_iter()
            .map(Record::Usage)
            .collect();
        newest_first(records, since)
    }
}
