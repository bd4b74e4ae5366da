//! Host -> reactor ingestion queue.
//!
//! Every live subscription receives a sink stamped with its domain's current
//! epoch. Unsubscribing retires that epoch, so whatever the old subscription
//! left in the queue is recognised as stale by the reactor and dropped before
//! it reaches the reconstructor or the push channel.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};

use super::event::Event;
use crate::collectors::Domain;

/// An event tagged with the subscription epoch it was delivered under.
#[derive(Debug, Clone)]
pub struct Stamped {
    pub epoch: u64,
    pub event: Event,
}

/// Current subscription epoch per domain, shared by collectors and the reactor.
#[derive(Debug, Clone, Default)]
pub struct FeedEpochs {
    current: Arc<RwLock<HashMap<Domain, u64>>>,
}

impl FeedEpochs {
    pub fn current(&self, domain: Domain) -> u64 {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&domain)
            .copied()
            .unwrap_or(0)
    }

    pub fn is_current(&self, domain: Domain, epoch: u64) -> bool {
        self.current(domain) == epoch
    }

    /// Invalidates every sink handed out for `domain` so far.
    pub fn retire(&self, domain: Domain) -> u64 {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let epoch = current.entry(domain).or_insert(0);
        *epoch += 1;
        *epoch
    }
}

/// Sender handed to the host for one subscription. Host callbacks cannot
/// block, so delivery is `try_send` only.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<Stamped>,
    epoch: u64,
}

impl EventSink {
    pub fn try_send(&self, event: Event) -> Result<(), TrySendError<Event>> {
        self.tx.try_send(Stamped { epoch: self.epoch, event }).map_err(|e| match e {
            TrySendError::Full(s) => TrySendError::Full(s.event),
            TrySendError::Closed(s) => TrySendError::Closed(s.event),
        })
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// Collector-side handle: mints sinks and retires them.
#[derive(Debug, Clone)]
pub struct IngestQueue {
    tx: mpsc::Sender<Stamped>,
    epochs: FeedEpochs,
}

impl IngestQueue {
    pub fn sink(&self, domain: Domain) -> EventSink {
        EventSink { tx: self.tx.clone(), epoch: self.epochs.current(domain) }
    }

    pub fn retire(&self, domain: Domain) {
        self.epochs.retire(domain);
    }

    pub fn epochs(&self) -> &FeedEpochs {
        &self.epochs
    }
}

/// Reactor-side handle.
#[derive(Debug)]
pub struct IngestReceiver {
    rx: mpsc::Receiver<Stamped>,
    epochs: FeedEpochs,
}

impl IngestReceiver {
    pub fn try_recv(&mut self) -> Result<Stamped, TryRecvError> {
        self.rx.try_recv()
    }

    pub fn epochs(&self) -> &FeedEpochs {
        &self.epochs
    }
}

pub fn channel(capacity: usize) -> (IngestQueue, IngestReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let epochs = FeedEpochs::default();
    (IngestQueue { tx, epochs: epochs.clone() }, IngestReceiver { rx, epochs })
}
