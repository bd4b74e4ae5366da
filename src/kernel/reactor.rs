use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::event::{Event, PushEvent};
use super::ingest::{IngestReceiver, Stamped};
use super::session::{IngestOutcome, SessionReconstructor, SessionRecord};
use super::telemetry::event::{DropReason, PushOutcome, TelemetryEvent};
use super::telemetry::recorder::{TelemetryRecorder, MAX_EVENTS};
use crate::collectors::{Domain, UnlockJournal};
use crate::host::LabelResolver;

pub const DEFAULT_CADENCE_MS: u64 = 50;

#[derive(Debug, Clone)]
pub struct ReactorConfig {
    pub cadence_ms: u64,
    pub excluded_prefixes: Vec<String>,
    pub telemetry_capacity: usize,
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self {
            cadence_ms: DEFAULT_CADENCE_MS,
            excluded_prefixes: super::session::DEFAULT_EXCLUDED_PREFIXES.iter().map(|p| p.to_string()).collect(),
            telemetry_capacity: MAX_EVENTS,
        }
    }
}

/// Single serialization point for live host events.
///
/// Every callback the host fires lands in one bounded channel; the reactor
/// drains it and applies events strictly in arrival order. It is the only
/// owner of the live reconstructor, so the open-session map is never touched
/// concurrently.
///
/// Events stamped with a retired feed epoch were queued by a subscription
/// that has since been stopped; they are dropped unseen. A retired usage
/// epoch also discards every open session.
pub struct Reactor {
    pub receiver: IngestReceiver,
    reconstructor: SessionReconstructor,
    usage_epoch: u64,
    labels: Arc<dyn LabelResolver>,
    push: broadcast::Sender<PushEvent>,
    unlock_journal: UnlockJournal,
    pub telemetry: TelemetryRecorder,
    cadence_ms: u64,
}

impl Reactor {
    pub fn new(
        receiver: IngestReceiver,
        labels: Arc<dyn LabelResolver>,
        push: broadcast::Sender<PushEvent>,
        unlock_journal: UnlockJournal,
        config: ReactorConfig,
    ) -> Self {
        let usage_epoch = receiver.epochs().current(Domain::Usage);
        Self {
            receiver,
            reconstructor: SessionReconstructor::with_exclusions(config.excluded_prefixes),
            usage_epoch,
            labels,
            push,
            unlock_journal,
            telemetry: TelemetryRecorder::with_capacity(config.telemetry_capacity),
            cadence_ms: config.cadence_ms.max(1),
        }
    }

    /// One cadence tick: drains whatever is queued right now, dropping stale
    /// events. Returns completed sessions.
    pub fn tick(&mut self) -> Vec<SessionRecord> {
        let current = self.receiver.epochs().current(Domain::Usage);
        self.sync_usage_epoch(current);

        let mut completed = Vec::new();
        while let Ok(Stamped { epoch, event }) = self.receiver.try_recv() {
            let domain = event.domain();
            if !self.receiver.epochs().is_current(domain, epoch) {
                self.telemetry.record(TelemetryEvent::StaleEventDropped { domain });
                continue;
            }
            if domain == Domain::Usage {
                self.sync_usage_epoch(epoch);
            }
            completed.extend(self.apply(event));
        }
        completed
    }

    /// Pure Step: applies a batch in order. Returns completed sessions.
    /// MUST NOT await I/O or timers.
    pub fn step(&mut self, events: Vec<Event>) -> Vec<SessionRecord> {
        events.into_iter().filter_map(|e| self.apply(e)).collect()
    }

    /// Drops open sessions without emitting them (shutdown and feed restart).
    pub fn flush(&mut self) -> usize {
        let count = self.reconstructor.flush();
        if count > 0 {
            self.telemetry.record(TelemetryEvent::OpenSessionsFlushed { count });
        }
        count
    }

    pub fn open_sessions(&self) -> usize {
        self.reconstructor.open_sessions()
    }

    /// Async Driver Loop. Drains the channel on a fixed cadence until
    /// `shutdown` fires, then flushes.
    pub async fn run(&mut self, shutdown: CancellationToken) {
        info!("Reactor started. Cadence: {}ms", self.cadence_ms);

        let mut cadence = interval(Duration::from_millis(self.cadence_ms));
        cadence.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = cadence.tick() => {}
            }

            let completed = self.tick();
            if !completed.is_empty() {
                debug!("{} session(s) completed", completed.len());
            }
        }

        let dropped = self.flush();
        info!("Reactor stopped; discarded {} open session(s)", dropped);
    }

    fn apply(&mut self, event: Event) -> Option<SessionRecord> {
        match event {
            Event::Usage(raw) => {
                let outcome = self.reconstructor.apply(&raw, self.labels.as_ref());
                let record = self.observe(outcome)?;
                self.publish(PushEvent::SessionCompleted(record.clone()));
                Some(record)
            }
            Event::Call(call) => {
                self.publish(PushEvent::CallStateChanged(call));
                None
            }
            Event::Message(message) => {
                self.publish(PushEvent::MessageReceived(message));
                None
            }
            Event::Lock(lock) => {
                self.unlock_journal.append(lock.clone().into());
                self.publish(PushEvent::LockStateChanged(lock));
                None
            }
        }
    }

    fn sync_usage_epoch(&mut self, epoch: u64) {
        if epoch == self.usage_epoch {
            return;
        }
        self.usage_epoch = epoch;
        let dropped = self.flush();
        if dropped > 0 {
            debug!("Usage feed restarted; discarded {} open session(s)", dropped);
        }
    }

    fn observe(&mut self, outcome: IngestOutcome) -> Option<SessionRecord> {
        let event = match outcome {
            IngestOutcome::Emitted(record) => {
                self.telemetry.record(TelemetryEvent::SessionEmitted { duration_secs: record.duration_secs });
                return Some(record);
            }
            IngestOutcome::Opened => return None,
            IngestOutcome::Excluded => TelemetryEvent::EventExcluded,
            IngestOutcome::Replaced { .. } => TelemetryEvent::SessionReplaced,
            IngestOutcome::OrphanExit => TelemetryEvent::OrphanExit,
            IngestOutcome::TooShort { .. } => TelemetryEvent::SessionDropped { reason: DropReason::TooShort },
            IngestOutcome::LabelUnavailable => TelemetryEvent::SessionDropped { reason: DropReason::LabelUnavailable },
        };
        self.telemetry.record(event);
        None
    }

    fn publish(&mut self, event: PushEvent) {
        // broadcast::send only fails when nobody is subscribed.
        let outcome = match self.push.send(event) {
            Ok(_) => PushOutcome::Delivered,
            Err(_) => PushOutcome::Unobserved,
        };
        self.telemetry.record(TelemetryEvent::Push(outcome));
    }
}
