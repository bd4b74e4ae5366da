use image::DynamicImage;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::warn;

use super::{
    CallLog, CallRow, EntryPointResolver, EventFeed, EventSink, HostError, LabelResolver,
    LivenessIndicator, MediaSource, MessageRow, MessageStore, Notice, PermissionProbe, UsageLog,
};
use crate::collectors::Domain;
use crate::kernel::event::{CallEvent, CallState, Event, LockEvent, LockState, MessageEvent, RawEvent};
use crate::kernel::time::{Clock, Millis};

fn guard<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory host. State is scripted by the caller; live events are only
/// delivered for domains that currently hold a subscription, the same way a
/// real host only calls back registered listeners.
#[derive(Debug)]
pub struct SimulatedHost {
    granted: Mutex<HashSet<Domain>>,
    permission_requests: Mutex<Vec<Domain>>,
    labels: Mutex<HashMap<String, String>>,
    usage_log: Mutex<Vec<RawEvent>>,
    call_rows: Mutex<Vec<CallRow>>,
    message_rows: Mutex<Vec<MessageRow>>,
    sinks: Mutex<HashMap<Domain, EventSink>>,
    failing_unsubscribe: Mutex<HashSet<Domain>>,
    failing_queries: AtomicBool,
    entry_points: Mutex<HashSet<i64>>,
    notice: Mutex<Option<Notice>>,
    notices_posted: AtomicUsize,
    cameras: Mutex<HashSet<bool>>,
    now: AtomicI64,
}

impl Default for SimulatedHost {
    fn default() -> Self {
        Self {
            granted: Mutex::new(HashSet::new()),
            permission_requests: Mutex::new(Vec::new()),
            labels: Mutex::new(HashMap::new()),
            usage_log: Mutex::new(Vec::new()),
            call_rows: Mutex::new(Vec::new()),
            message_rows: Mutex::new(Vec::new()),
            sinks: Mutex::new(HashMap::new()),
            failing_unsubscribe: Mutex::new(HashSet::new()),
            failing_queries: AtomicBool::new(false),
            entry_points: Mutex::new(HashSet::new()),
            notice: Mutex::new(None),
            notices_posted: AtomicUsize::new(0),
            // Front and back
            cameras: Mutex::new([true, false].into_iter().collect()),
            now: AtomicI64::new(0),
        }
    }
}

impl SimulatedHost {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Scripting ---

    pub fn grant(&self, domain: Domain) {
        guard(&self.granted).insert(domain);
    }

    pub fn grant_all(&self) {
        let mut granted = guard(&self.granted);
        for d in Domain::ALL {
            granted.insert(d);
        }
    }

    pub fn revoke(&self, domain: Domain) {
        guard(&self.granted).remove(&domain);
    }

    pub fn install(&self, package: &str, label: &str) {
        guard(&self.labels).insert(package.to_string(), label.to_string());
    }

    pub fn uninstall(&self, package: &str) {
        guard(&self.labels).remove(package);
    }

    pub fn register_entry_point(&self, token: i64) {
        guard(&self.entry_points).insert(token);
    }

    pub fn set_now(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn set_camera(&self, front: bool, present: bool) {
        let mut cams = guard(&self.cameras);
        if present {
            cams.insert(front);
        } else {
            cams.remove(&front);
        }
    }

    pub fn fail_unsubscribe(&self, domain: Domain) {
        guard(&self.failing_unsubscribe).insert(domain);
    }

    pub fn fail_queries(&self, fail: bool) {
        self.failing_queries.store(fail, Ordering::SeqCst);
    }

    pub fn add_call_row(&self, row: CallRow) {
        guard(&self.call_rows).push(row);
    }

    pub fn add_message_row(&self, row: MessageRow) {
        guard(&self.message_rows).push(row);
    }

    /// Appends to the usage history and, when subscribed, delivers live.
    pub fn usage_event(&self, event: RawEvent) -> bool {
        guard(&self.usage_log).push(event.clone());
        self.deliver(Domain::Usage, Event::Usage(event))
    }

    pub fn call_state(&self, state: CallState, number: &str, timestamp: i64) -> bool {
        self.deliver(Domain::Calls, Event::Call(CallEvent {
            state,
            number: number.to_string(),
            timestamp: Millis(timestamp),
            outgoing: false,
        }))
    }

    pub fn outgoing_call(&self, number: &str, timestamp: i64) -> bool {
        self.deliver(Domain::Calls, Event::Call(CallEvent {
            state: CallState::OffHook,
            number: number.to_string(),
            timestamp: Millis(timestamp),
            outgoing: true,
        }))
    }

    pub fn message_arrived(&self, sender: &str, body: &str, date: i64) -> bool {
        self.deliver(Domain::Messages, Event::Message(MessageEvent {
            sender: sender.to_string(),
            body: body.to_string(),
            date: Millis(date),
        }))
    }

    pub fn lock_state(&self, state: LockState, timestamp: i64) -> bool {
        self.deliver(Domain::Unlock, Event::Lock(LockEvent { state, timestamp: Millis(timestamp) }))
    }

    fn deliver(&self, domain: Domain, event: Event) -> bool {
        let sinks = guard(&self.sinks);
        match sinks.get(&domain) {
            Some(sink) => match sink.try_send(event) {
                Ok(()) => true,
                Err(e) => {
                    // Host callbacks cannot block; a full queue loses the event.
                    warn!("Dropping {:?} host event: {}", domain, e);
                    false
                }
            },
            None => false,
        }
    }

    // --- Inspection ---

    pub fn is_subscribed(&self, domain: Domain) -> bool {
        guard(&self.sinks).contains_key(&domain)
    }

    pub fn permission_requests(&self) -> Vec<Domain> {
        guard(&self.permission_requests).clone()
    }

    pub fn current_notice(&self) -> Option<Notice> {
        guard(&self.notice).clone()
    }

    pub fn notices_posted(&self) -> usize {
        self.notices_posted.load(Ordering::SeqCst)
    }

    fn check_queries(&self) -> Result<(), HostError> {
        if self.failing_queries.load(Ordering::SeqCst) {
            return Err(HostError::QueryFailed("simulated provider failure".to_string()));
        }
        Ok(())
    }
}

impl PermissionProbe for SimulatedHost {
    fn is_granted(&self, domain: Domain) -> bool {
        guard(&self.granted).contains(&domain)
    }

    fn request(&self, domain: Domain) {
        guard(&self.permission_requests).push(domain);
    }
}

impl LabelResolver for SimulatedHost {
    fn display_name(&self, package: &str) -> Result<String, HostError> {
        guard(&self.labels)
            .get(package)
            .cloned()
            .ok_or_else(|| HostError::PackageNotFound(package.to_string()))
    }
}

impl UsageLog for SimulatedHost {
    fn query_events(&self, since: Millis, until: Millis) -> Result<Vec<RawEvent>, HostError> {
        self.check_queries()?;
        Ok(guard(&self.usage_log)
            .iter()
            .filter(|e| e.timestamp >= since && e.timestamp <= until)
            .cloned()
            .collect())
    }
}

impl CallLog for SimulatedHost {
    fn query_calls(&self, since: Millis) -> Result<Vec<CallRow>, HostError> {
        self.check_queries()?;
        Ok(guard(&self.call_rows).iter().filter(|r| r.date >= since).cloned().collect())
    }
}

impl MessageStore for SimulatedHost {
    fn query_messages(&self, since: Millis) -> Result<Vec<MessageRow>, HostError> {
        self.check_queries()?;
        Ok(guard(&self.message_rows).iter().filter(|r| r.date >= since).cloned().collect())
    }
}

impl EventFeed for SimulatedHost {
    fn subscribe(&self, domain: Domain, sink: EventSink) -> Result<(), HostError> {
        guard(&self.sinks).insert(domain, sink);
        Ok(())
    }

    fn unsubscribe(&self, domain: Domain) -> Result<(), HostError> {
        guard(&self.sinks).remove(&domain);
        if guard(&self.failing_unsubscribe).contains(&domain) {
            return Err(HostError::Unavailable(format!("{:?} listener already gone", domain)));
        }
        Ok(())
    }
}

impl EntryPointResolver for SimulatedHost {
    fn resolve(&self, token: i64) -> bool {
        guard(&self.entry_points).contains(&token)
    }
}

impl LivenessIndicator for SimulatedHost {
    fn post(&self, notice: &Notice) {
        *guard(&self.notice) = Some(notice.clone());
        self.notices_posted.fetch_add(1, Ordering::SeqCst);
    }

    fn withdraw(&self) {
        *guard(&self.notice) = None;
    }
}

impl MediaSource for SimulatedHost {
    fn screen_frame(&self) -> Result<DynamicImage, HostError> {
        Ok(DynamicImage::new_rgb8(64, 48))
    }

    fn camera_frame(&self, front: bool) -> Result<DynamicImage, HostError> {
        if !guard(&self.cameras).contains(&front) {
            return Err(HostError::Unavailable(format!("no {} camera", if front { "front" } else { "back" })));
        }
        Ok(DynamicImage::new_rgb8(640, 480))
    }

    fn audio_chunk(&self, _sample_rate: u32, samples: usize) -> Result<Vec<i16>, HostError> {
        Ok(vec![0; samples])
    }
}

impl Clock for SimulatedHost {
    fn now(&self) -> Millis {
        Millis(self.now.load(Ordering::SeqCst))
    }
}
