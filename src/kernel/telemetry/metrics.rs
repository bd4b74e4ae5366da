use std::collections::VecDeque;
use super::event::{DropReason, PushOutcome, TelemetryEvent};
use crate::kernel::lifecycle::ServiceState;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    pub session_stats: SessionStats,
    pub lifecycle_stats: LifecycleStats,
    pub push_stats: PushStats,
    pub ingest_stats: IngestStats,
    /// Events pushed out of the ring buffer; counters above cover only what remains.
    pub evicted: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionStats {
    pub emitted: u64,
    pub too_short: u64,
    pub label_unavailable: u64,
    pub replaced: u64,
    pub orphan_exits: u64,
    pub excluded: u64,
    pub flushed: u64,
    pub total_duration_secs: i64,
    pub avg_duration_secs: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LifecycleStats {
    pub transitions: u64,
    /// Entries into RUNNING.
    pub runs: u64,
    /// STARTING -> DORMANT without reaching RUNNING.
    pub aborted_starts: u64,
    pub rejected: u64,
    pub collector_stop_failures: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PushStats {
    pub delivered: u64,
    pub unobserved: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestStats {
    pub stale_dropped: u64,
}

pub fn compute_snapshot(events: &VecDeque<TelemetryEvent>) -> TelemetrySnapshot {
    let mut snap = TelemetrySnapshot::default();

    for event in events {
        match event {
            TelemetryEvent::SessionEmitted { duration_secs } => {
                snap.session_stats.emitted += 1;
                snap.session_stats.total_duration_secs += duration_secs;
            }
            TelemetryEvent::SessionDropped { reason } => match reason {
                DropReason::TooShort => snap.session_stats.too_short += 1,
                DropReason::LabelUnavailable => snap.session_stats.label_unavailable += 1,
            },
            TelemetryEvent::SessionReplaced => snap.session_stats.replaced += 1,
            TelemetryEvent::OrphanExit => snap.session_stats.orphan_exits += 1,
            TelemetryEvent::EventExcluded => snap.session_stats.excluded += 1,
            TelemetryEvent::OpenSessionsFlushed { count } => snap.session_stats.flushed += *count as u64,
            TelemetryEvent::Transition { from, to } => {
                snap.lifecycle_stats.transitions += 1;
                match (from, to) {
                    (_, ServiceState::Running) => snap.lifecycle_stats.runs += 1,
                    (ServiceState::Starting, ServiceState::Dormant) => snap.lifecycle_stats.aborted_starts += 1,
                    _ => {}
                }
            }
            TelemetryEvent::TransitionRejected { .. } => snap.lifecycle_stats.rejected += 1,
            TelemetryEvent::CollectorStopFailed { .. } => snap.lifecycle_stats.collector_stop_failures += 1,
            TelemetryEvent::StaleEventDropped { .. } => snap.ingest_stats.stale_dropped += 1,
            TelemetryEvent::Push(outcome) => match outcome {
                PushOutcome::Delivered => snap.push_stats.delivered += 1,
                PushOutcome::Unobserved => snap.push_stats.unobserved += 1,
            },
        }
    }

    if snap.session_stats.emitted > 0 {
        snap.session_stats.avg_duration_secs =
            snap.session_stats.total_duration_secs as f64 / snap.session_stats.emitted as f64;
    }

    snap
}
