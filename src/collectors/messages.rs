use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{newest_first, Collector, Domain, FeedSubscription, Record};
use crate::host::{HostError, HostServices, MessageRow};
use crate::kernel::ingest::IngestQueue;
use crate::kernel::time::Millis;

/// Message type code the host uses for received messages.
pub const MESSAGE_TYPE_INBOX: i32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub sender: String,
    pub recipient: String,
    pub body: String,
    pub date: Millis,
    pub kind: i32,
    pub read: bool,
    pub thread_id: i64,
}

impl From<MessageRow> for MessageRecord {
    fn from(row: MessageRow) -> Self {
        let address = row.address.unwrap_or_default();
        // Inbox rows carry the counterpart as sender, everything else as recipient.
        let (sender, recipient) = if row.message_type == MESSAGE_TYPE_INBOX {
            (address, String::new())
        } else {
            (String::new(), address)
        };
        Self {
            sender,
            recipient,
            body: row.body.unwrap_or_default(),
            date: row.date,
            kind: row.message_type,
            read: row.read != 0,
            thread_id: row.thread_id,
        }
    }
}

pub struct MessagesCollector {
    host: HostServices,
    queue: IngestQueue,
    feed: FeedSubscription,
}

impl MessagesCollector {
    pub fn new(host: HostServices, queue: IngestQueue) -> Self {
        Self { host, queue, feed: FeedSubscription::new(Domain::Messages) }
    }
}

impl Collector for MessagesCollector {
    fn domain(&self) -> Domain {
        Domain::Messages
    }

    fn check_permission(&self) -> bool {
        self.host.permissions.is_granted(Domain::Messages)
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
        match self.host.messages.query_messages(since) {
            Ok(rows) => newest_first(rows.into_iter().map(|r| Record::Message(r.into())).collect(), since),
            Err(e) => {
                warn!("Message store query failed: {}", e);
                Vec::new()
            }
        }
    }
}
