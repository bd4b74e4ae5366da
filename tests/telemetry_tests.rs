use std::sync::Arc;
use tokio::sync::broadcast;

use hostwatch::collectors::UnlockJournal;
use hostwatch::host::SimulatedHost;
use hostwatch::kernel::event::{Event, LockEvent, LockState, RawEvent};
use hostwatch::kernel::ingest;
use hostwatch::kernel::reactor::{Reactor, ReactorConfig};
use hostwatch::kernel::telemetry::event::TelemetryEvent;
use hostwatch::kernel::telemetry::recorder::{TelemetryRecorder, MAX_EVENTS};
use hostwatch::kernel::time::Millis;

fn reactor(push: broadcast::Sender<hostwatch::kernel::event::PushEvent>) -> Reactor {
    let host = Arc::new(SimulatedHost::new());
    host.install("com.example.a", "App A");
    let (_queue, rx) = ingest::channel(8);
    Reactor::new(rx, host, push, UnlockJournal::default(), ReactorConfig::default())
}

#[test]
fn test_session_outcomes_counted() {
    let (push, _keep) = broadcast::channel(64);
    let mut reactor = reactor(push);

    reactor.step(vec![
        Event::Usage(RawEvent::enter("android", 0)),
        Event::Usage(RawEvent::exit("com.example.a", 100)),
        Event::Usage(RawEvent::enter("com.example.a", 1_000)),
        Event::Usage(RawEvent::enter("com.example.a", 2_000)),
        Event::Usage(RawEvent::exit("com.example.a", 2_500)),
        Event::Usage(RawEvent::enter("com.example.a", 10_000)),
        Event::Usage(RawEvent::exit("com.example.a", 16_000)),
        Event::Usage(RawEvent::enter("com.example.missing", 20_000)),
        Event::Usage(RawEvent::exit("com.example.missing", 30_000)),
    ]);

    let stats = reactor.telemetry.snapshot().session_stats;
    assert_eq!(stats.excluded, 1);
    assert_eq!(stats.orphan_exits, 1);
    assert_eq!(stats.replaced, 1);
    assert_eq!(stats.too_short, 1);
    assert_eq!(stats.label_unavailable, 1);
    assert_eq!(stats.emitted, 1);
    assert_eq!(stats.total_duration_secs, 6);
    assert_eq!(stats.avg_duration_secs, 6.0);
}

#[test]
fn test_push_without_subscriber_is_unobserved() {
    let (push, rx) = broadcast::channel(4);
    drop(rx);
    let mut reactor = reactor(push);

    reactor.step(vec![Event::Lock(LockEvent { state: LockState::Unlocked, timestamp: Millis(1) })]);

    let stats = reactor.telemetry.snapshot().push_stats;
    assert_eq!(stats.unobserved, 1);
    assert_eq!(stats.delivered, 0);
}

#[test]
fn test_flush_recorded_only_when_nonempty() {
    let (push, _keep) = broadcast::channel(4);
    let mut reactor = reactor(push);

    assert_eq!(reactor.flush(), 0);
    assert!(reactor.telemetry.is_empty());

    reactor.step(vec![Event::Usage(RawEvent::enter("com.example.a", 0))]);
    assert_eq!(reactor.open_sessions(), 1);
    assert_eq!(reactor.flush(), 1);
    assert_eq!(reactor.telemetry.snapshot().session_stats.flushed, 1);
}

#[test]
fn test_recorder_is_bounded() {
    let mut recorder = TelemetryRecorder::new();
    for _ in 0..MAX_EVENTS + 10 {
        recorder.record(TelemetryEvent::OrphanExit);
    }
    assert_eq!(recorder.len(), MAX_EVENTS);
    assert_eq!(recorder.snapshot().evicted, 10);
    assert_eq!(recorder.snapshot().session_stats.orphan_exits, MAX_EVENTS as u64);

    recorder.clear();
    assert!(recorder.is_empty());
    assert_eq!(recorder.snapshot().evicted, 0);
}

#[test]
fn test_recorder_capacity_configurable() {
    let mut recorder = TelemetryRecorder::with_capacity(3);
    assert_eq!(recorder.capacity(), 3);
    recorder.record(TelemetryEvent::SessionEmitted { duration_secs: 100 });
    for _ in 0..3 {
        recorder.record(TelemetryEvent::SessionEmitted { duration_secs: 2 });
    }

    let snap = recorder.snapshot();
    assert_eq!(snap.evicted, 1);
    assert_eq!(snap.session_stats.total_duration_secs, 6, "Evicted event no longer counted");

    let config = ReactorConfig { telemetry_capacity: 2, ..ReactorConfig::default() };
    let (_queue, rx) = ingest::channel(8);
    let (push, _keep) = broadcast::channel(4);
    let reactor = Reactor::new(rx, Arc::new(SimulatedHost::new()), push, UnlockJournal::default(), config);
    assert_eq!(reactor.telemetry.capacity(), 2);
}
