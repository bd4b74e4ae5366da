use std::sync::Arc;

use hostwatch::collectors::{
    newest_first, CallKind, CallsCollector, Collector, CollectorRegistry, Domain, MessagesCollector, Record,
    UnlockCollector, UnlockJournal, UnlockRecord, UsageCollector,
};
use hostwatch::host::{CallRow, HostServices, MessageRow, SimulatedHost};
use hostwatch::kernel::event::{Event, LockState, RawEvent};
use hostwatch::kernel::ingest::{self, Stamped};
use hostwatch::kernel::time::Millis;

fn host() -> (Arc<SimulatedHost>, HostServices) {
    let host = Arc::new(SimulatedHost::new());
    let services = HostServices::simulated(host.clone());
    (host, services)
}

fn call_row(number: &str, call_type: i32, date: i64) -> CallRow {
    CallRow {
        number: Some(number.to_string()),
        call_type,
        date: Millis(date),
        duration_secs: 12,
        cached_name: None,
    }
}

fn message_row(address: &str, message_type: i32, date: i64) -> MessageRow {
    MessageRow {
        address: Some(address.to_string()),
        body: Some("hello".to_string()),
        date: Millis(date),
        message_type,
        read: 1,
        thread_id: 7,
    }
}

#[test]
fn test_usage_fetch_newest_first_and_filtered() {
    let (host, services) = host();
    let (queue, _rx) = ingest::channel(8);
    host.grant(Domain::Usage);
    host.install("com.example.a", "App A");
    host.install("com.example.b", "App B");
    host.set_now(100_000);

    for e in [
        RawEvent::enter("com.example.a", 1_000),
        RawEvent::exit("com.example.a", 5_000),
        RawEvent::enter("com.example.b", 10_000),
        RawEvent::exit("com.example.b", 13_000),
        RawEvent::enter("com.example.a", 20_000),
        RawEvent::exit("com.example.a", 30_000),
    ] {
        host.usage_event(e);
    }

    let collector = UsageCollector::new(services, queue, vec![]);
    let records = collector.fetch_since(Millis(10_000));

    let starts: Vec<Millis> = records.iter().map(Record::occurred_at).collect();
    assert_eq!(starts, vec![Millis(20_000), Millis(10_000)], "Newest first, since is inclusive");

    // Fetch never touches live state; repeating it gives the same answer.
    assert_eq!(collector.fetch_since(Millis(10_000)), records);
    assert!(!collector.is_active());
}

#[test]
fn test_usage_fetch_fails_soft() {
    let (host, services) = host();
    let (queue, _rx) = ingest::channel(8);
    host.install("com.example.a", "App A");
    host.set_now(100_000);
    host.usage_event(RawEvent::enter("com.example.a", 1_000));
    host.usage_event(RawEvent::exit("com.example.a", 9_000));

    let collector = UsageCollector::new(services, queue, vec![]);
    assert!(collector.fetch_since(Millis::ZERO).is_empty(), "No permission yields empty, not an error");

    host.grant(Domain::Usage);
    assert_eq!(collector.fetch_since(Millis::ZERO).len(), 1);

    host.fail_queries(true);
    assert!(collector.fetch_since(Millis::ZERO).is_empty(), "Provider failure yields empty");
}

#[test]
fn test_call_rows_mapped() {
    let (host, services) = host();
    let (queue, _rx) = ingest::channel(8);
    host.grant(Domain::Calls);
    host.add_call_row(call_row("555-0100", 1, 1_000));
    host.add_call_row(call_row("555-0101", 3, 3_000));
    host.add_call_row(CallRow { number: None, call_type: 42, date: Millis(2_000), duration_secs: 0, cached_name: Some("Bob".into()) });

    let collector = CallsCollector::new(services, queue);
    let records = collector.fetch_since(Millis(1_000));
    assert_eq!(records.len(), 3);

    let calls: Vec<_> = records
        .into_iter()
        .map(|r| match r {
            Record::Call(c) => c,
            other => panic!("Unexpected record {:?}", other),
        })
        .collect();
    assert_eq!(calls[0].kind, CallKind::Missed);
    assert_eq!(calls[1].kind, CallKind::Unknown(42));
    assert_eq!(calls[1].number, "", "Missing number maps to empty");
    assert_eq!(calls[1].name, "Bob");
    assert_eq!(calls[2].kind, CallKind::Incoming);
    assert!(calls.iter().all(|c| c.sim_slot == -1 && !c.is_conference));
}

#[test]
fn test_message_direction_from_type() {
    let (host, services) = host();
    let (queue, _rx) = ingest::channel(8);
    host.grant(Domain::Messages);
    host.add_message_row(message_row("+100", 1, 5_000));
    host.add_message_row(message_row("+200", 2, 6_000));
    host.add_message_row(message_row("+300", 1, 100));

    let collector = MessagesCollector::new(services, queue);
    let records = collector.fetch_since(Millis(5_000));
    assert_eq!(records.len(), 2, "Older rows filtered out");

    match (&records[0], &records[1]) {
        (Record::Message(sent), Record::Message(received)) => {
            assert_eq!(sent.recipient, "+200");
            assert!(sent.sender.is_empty());
            assert_eq!(received.sender, "+100");
            assert!(received.recipient.is_empty());
            assert!(received.read);
        }
        other => panic!("Unexpected records {:?}", other),
    }
}

#[test]
fn test_unlock_journal_bounded() {
    let journal = UnlockJournal::new(3);
    for t in 0..5 {
        journal.append(UnlockRecord { state: LockState::Unlocked, timestamp: Millis(t) });
    }
    assert_eq!(journal.len(), 3);
    let kept: Vec<i64> = journal.snapshot().iter().map(|r| r.timestamp.as_i64()).collect();
    assert_eq!(kept, vec![2, 3, 4], "Oldest evicted first");
}

#[test]
fn test_unlock_fetch_reads_journal() {
    let (_host, services) = host();
    let (queue, _rx) = ingest::channel(8);
    let journal = UnlockJournal::new(10);
    journal.append(UnlockRecord { state: LockState::Locked, timestamp: Millis(10) });
    journal.append(UnlockRecord { state: LockState::Unlocked, timestamp: Millis(20) });

    let collector = UnlockCollector::new(services, queue, journal);
    assert!(collector.check_permission());
    let records = collector.fetch_since(Millis(15));
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].occurred_at(), Millis(20));
}

#[test]
fn test_start_stop_idempotent_and_live_delivery() {
    let (host, services) = host();
    let (queue, mut rx) = ingest::channel(8);
    let epochs = queue.epochs().clone();
    host.grant(Domain::Calls);

    let collector = CallsCollector::new(services, queue);
    assert!(!host.call_state(hostwatch::kernel::event::CallState::Ringing, "555", 1), "Not subscribed yet");

    collector.start().unwrap();
    collector.start().unwrap();
    assert!(collector.is_active());
    assert!(host.outgoing_call("555-0199", 2));
    match rx.try_recv() {
        Ok(Stamped { event: Event::Call(call), .. }) => assert!(call.outgoing),
        other => panic!("Expected call event, got {:?}", other),
    }

    collector.stop().unwrap();
    collector.stop().unwrap();
    assert!(!collector.is_active());
    assert!(!host.is_subscribed(Domain::Calls));
    assert_eq!(epochs.current(Domain::Calls), 1, "Each real stop retires the feed epoch once");
    assert_eq!(epochs.current(Domain::Unlock), 0, "Other domains untouched");
}

#[test]
fn test_start_without_permission_fails() {
    let (host, services) = host();
    let (queue, _rx) = ingest::channel(8);
    let collector = MessagesCollector::new(services, queue);

    assert!(collector.start().is_err());
    assert!(!collector.is_active());
    assert!(!host.is_subscribed(Domain::Messages));
}

#[test]
fn test_registry_single_domain_commands() {
    let (host, services) = host();
    let (queue, _rx) = ingest::channel(8);
    let mut registry = CollectorRegistry::new();
    registry.register(Arc::new(CallsCollector::new(services.clone(), queue.clone())));
    registry.register(Arc::new(UnlockCollector::new(services, queue, UnlockJournal::default())));

    assert!(!registry.start_one(Domain::Calls), "No permission");
    assert!(!registry.start_one(Domain::Media), "Media has no collector");
    assert!(registry.start_one(Domain::Unlock));

    host.grant(Domain::Calls);
    assert!(registry.start_one(Domain::Calls));
    assert_eq!(registry.domains(), vec![Domain::Calls, Domain::Unlock]);
    assert!(registry.states().iter().all(|s| s.active));

    assert!(registry.stop_one(Domain::Calls));
    assert!(!registry.stop_one(Domain::Usage));
    assert!(registry.fetch_since(Domain::Usage, Millis::ZERO).is_empty());
}

#[test]
fn test_newest_first_stable_for_ties() {
    let a = Record::Unlock(UnlockRecord { state: LockState::Locked, timestamp: Millis(5) });
    let b = Record::Unlock(UnlockRecord { state: LockState::Unlocked, timestamp: Millis(5) });
    let c = Record::Unlock(UnlockRecord { state: LockState::Locked, timestamp: Millis(1) });

    let sorted = newest_first(vec![c.clone(), a.clone(), b.clone()], Millis::ZERO);
    assert_eq!(sorted, vec![a, b, c]);
}

#[test]
fn test_domain_parse() {
    assert_eq!(Domain::parse("SMS"), Some(Domain::Messages));
    assert_eq!(Domain::parse("apps"), Some(Domain::Usage));
    assert_eq!(Domain::parse("location"), None);
}
