use hostwatch::host::SimulatedHost;
use hostwatch::kernel::event::RawEvent;
use hostwatch::kernel::session::{IngestOutcome, SessionReconstructor};
use hostwatch::kernel::time::Millis;

fn labelled_host() -> SimulatedHost {
    let host = SimulatedHost::new();
    host.install("com.example.a", "App A");
    host.install("com.example.b", "App B");
    host
}

#[test]
fn test_single_session_emitted() {
    let host = labelled_host();
    let mut r = SessionReconstructor::new();

    let records = r.fold(&[RawEvent::enter("com.example.a", 0), RawEvent::exit("com.example.a", 5000)], &host);

    assert_eq!(records.len(), 1);
    let rec = &records[0];
    assert_eq!(rec.package, "com.example.a");
    assert_eq!(rec.display_name, "App A");
    assert_eq!(rec.start, Millis(0));
    assert_eq!(rec.end, Millis(5000));
    assert_eq!(rec.duration_secs, 5);
    assert_eq!(r.open_sessions(), 0, "Matched session should be consumed");
}

#[test]
fn test_sub_second_session_dropped() {
    let host = labelled_host();
    let mut r = SessionReconstructor::new();

    let records = r.fold(&[RawEvent::enter("com.example.a", 0), RawEvent::exit("com.example.a", 500)], &host);

    assert!(records.is_empty(), "500ms truncates to 0s and must not be emitted");
    assert_eq!(r.open_sessions(), 0);
}

#[test]
fn test_duration_boundary() {
    let host = labelled_host();

    // (exit timestamp, emitted?)
    let cases = [(1000, false), (1999, false), (2000, true), (2999, true)];
    for (exit_at, expected) in cases {
        let mut r = SessionReconstructor::new();
        let records = r.fold(&[RawEvent::enter("com.example.a", 0), RawEvent::exit("com.example.a", exit_at)], &host);
        assert_eq!(!records.is_empty(), expected, "exit at {}ms", exit_at);
        if expected {
            assert_eq!(records[0].duration_secs, 2);
        }
    }
}

#[test]
fn test_repeated_enter_replaces_open_session() {
    let host = labelled_host();
    let mut r = SessionReconstructor::new();

    assert_eq!(r.apply(&RawEvent::enter("com.example.a", 0), &host), IngestOutcome::Opened);
    assert_eq!(
        r.apply(&RawEvent::enter("com.example.a", 100), &host),
        IngestOutcome::Replaced { discarded_start: Millis(0) }
    );
    assert_eq!(r.open_sessions(), 1, "Sessions must not stack");

    let records = r.fold(&[RawEvent::exit("com.example.a", 3000)], &host);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].start, Millis(100), "First open session is discarded");
    assert_eq!(records[0].duration_secs, 2);
}

#[test]
fn test_orphan_exit_ignored() {
    let host = labelled_host();
    let mut r = SessionReconstructor::new();

    assert_eq!(r.apply(&RawEvent::exit("com.example.a", 4000), &host), IngestOutcome::OrphanExit);
    assert_eq!(r.open_sessions(), 0);
}

#[test]
fn test_platform_packages_never_tracked() {
    let host = labelled_host();
    host.install("com.android.settings", "Settings");
    let mut r = SessionReconstructor::new();

    for pkg in ["android", "com.android.settings", "com.google.android.gms"] {
        assert_eq!(r.apply(&RawEvent::enter(pkg, 0), &host), IngestOutcome::Excluded);
        assert_eq!(r.apply(&RawEvent::exit(pkg, 10_000), &host), IngestOutcome::Excluded);
    }
    assert_eq!(r.open_sessions(), 0, "Excluded packages never open sessions");
}

#[test]
fn test_label_failure_drops_only_that_record() {
    let host = labelled_host();
    let mut r = SessionReconstructor::new();

    let events = [
        RawEvent::enter("com.gone.app", 0),
        RawEvent::enter("com.example.b", 1000),
        RawEvent::exit("com.gone.app", 6000),
        RawEvent::exit("com.example.b", 9000),
    ];
    let records = r.fold(&events, &host);

    assert_eq!(records.len(), 1, "Uninstalled package record is dropped");
    assert_eq!(records[0].package, "com.example.b");
    assert_eq!(records[0].duration_secs, 8);
    assert_eq!(r.open_sessions(), 0, "Dropped record still consumes its open session");
}

#[test]
fn test_delivery_order_not_resorted() {
    let host = labelled_host();
    let mut r = SessionReconstructor::new();

    // Exit delivered with an earlier timestamp than its enter: negative duration, dropped.
    let records = r.fold(&[RawEvent::enter("com.example.a", 5000), RawEvent::exit("com.example.a", 1000)], &host);
    assert!(records.is_empty());
}

#[test]
fn test_record_count_matches_qualifying_exits() {
    let host = labelled_host();
    let mut r = SessionReconstructor::new();

    let events = [
        RawEvent::enter("com.example.a", 0),
        RawEvent::enter("com.example.b", 500),
        RawEvent::exit("com.example.b", 1200),  // 0s, dropped
        RawEvent::exit("com.example.a", 4000),  // 4s, emitted
        RawEvent::exit("com.example.a", 9000),  // orphan
        RawEvent::enter("com.example.b", 10_000),
        RawEvent::enter("com.example.b", 11_000), // replaces
        RawEvent::exit("com.example.b", 14_500), // 3s, emitted
        RawEvent::enter("com.example.a", 20_000),
        RawEvent::exit("com.example.a", 21_999), // 1s, dropped
    ];
    let records = r.fold(&events, &host);

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].package, "com.example.a");
    assert_eq!(records[1].start, Millis(11_000));
    assert_eq!(records[1].duration_secs, 3);
}

#[test]
fn test_fold_is_deterministic() {
    let host = labelled_host();
    let events: Vec<RawEvent> = (0..20)
        .flat_map(|i| {
            let pkg = if i % 2 == 0 { "com.example.a" } else { "com.example.b" };
            let t = i * 3_000;
            vec![RawEvent::enter(pkg, t), RawEvent::exit(pkg, t + (i % 4) * 1_000 + 500)]
        })
        .collect();

    let first = SessionReconstructor::new().fold(&events, &host);
    let second = SessionReconstructor::new().fold(&events, &host);
    assert_eq!(first, second);
    assert!(!first.is_empty());
}

#[test]
fn test_flush_discards_without_emitting() {
    let host = labelled_host();
    let mut r = SessionReconstructor::new();
    r.fold(&[RawEvent::enter("com.example.a", 0), RawEvent::enter("com.example.b", 0)], &host);

    assert_eq!(r.flush(), 2);
    assert_eq!(r.open_sessions(), 0);
    assert!(r.fold(&[RawEvent::exit("com.example.a", 10_000)], &host).is_empty(), "Flushed sessions cannot close");
}

#[test]
fn test_extreme_timestamps_do_not_overflow() {
    let host = labelled_host();
    let mut r = SessionReconstructor::new();

    let records = r.fold(&[RawEvent::enter("com.example.a", i64::MIN), RawEvent::exit("com.example.a", i64::MAX)], &host);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].duration_secs, i64::MAX / 1000, "Duration saturates");

    let records = r.fold(&[RawEvent::enter("com.example.b", i64::MAX), RawEvent::exit("com.example.b", i64::MIN)], &host);
    assert!(records.is_empty(), "Negative span is too short");
    assert_eq!(r.open_sessions(), 0);

    assert_eq!(Millis(i64::MAX).whole_seconds_since(Millis(i64::MIN)), i64::MAX / 1000);
    assert_eq!(Millis(i64::MIN).whole_seconds_since(Millis(i64::MAX)), i64::MIN / 1000);
}
