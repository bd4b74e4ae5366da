//! Session reconstruction: folds foreground/background transitions into
//! completed sessions.
//!
//! # ORDERING INVARIANT
//! Events are applied in delivery order, never re-sorted. Given the same
//! ordered input the reconstructor yields the same ordered output; the only
//! outside dependency is display-name lookup, and a failed lookup drops that
//! one record without touching reconstruction state.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use super::event::{ForegroundKind, RawEvent};
use super::time::Millis;
use crate::host::LabelResolver;

/// Sessions must last strictly longer than this (whole seconds) to be emitted.
pub const MIN_SESSION_SECS: i64 = 1;

/// Platform namespaces that are never tracked.
pub const DEFAULT_EXCLUDED_PREFIXES: [&str; 3] = ["android", "com.google.android", "com.android"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub package: String,
    pub display_name: String,
    pub start: Millis,
    pub end: Millis,
    pub duration_secs: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenSession {
    pub package: String,
    pub start: Millis,
}

/// What a single event did to the working set. Used for telemetry; callers
/// that only want records go through `ingest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Excluded,
    Opened,
    /// A second ENTER arrived with no EXIT in between; the stale open
    /// session is dropped (missed-event recovery).
    Replaced { discarded_start: Millis },
    OrphanExit,
    TooShort { duration_secs: i64 },
    LabelUnavailable,
    Emitted(SessionRecord),
}

#[derive(Debug, Clone)]
pub struct SessionReconstructor {
    open: HashMap<String, OpenSession>,
    excluded_prefixes: Vec<String>,
}

impl Default for SessionReconstructor {
    fn default() -> Self {
        Self::with_exclusions(DEFAULT_EXCLUDED_PREFIXES.iter().map(|p| p.to_string()).collect())
    }
}

impl SessionReconstructor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exclusions(excluded_prefixes: Vec<String>) -> Self {
        Self {
            open: HashMap::new(),
            excluded_prefixes,
        }
    }

    pub fn is_excluded(&self, package: &str) -> bool {
        self.excluded_prefixes.iter().any(|p| package.starts_with(p.as_str()))
    }

    pub fn ingest(&mut self, event: &RawEvent, labels: &dyn LabelResolver) -> Option<SessionRecord> {
        match self.apply(event, labels) {
            IngestOutcome::Emitted(record) => Some(record),
            _ => None,
        }
    }

    /// Folds an ordered batch, returning emitted records in emission order.
    pub fn fold<'a, I>(&mut self, events: I, labels: &dyn LabelResolver) -> Vec<SessionRecord>
    where
        I: IntoIterator<Item = &'a RawEvent>,
    {
        events.into_iter().filter_map(|e| self.ingest(e, labels)).collect()
    }

    pub fn apply(&mut self, event: &RawEvent, labels: &dyn LabelResolver) -> IngestOutcome {
        if self.is_excluded(&event.package) {
            return IngestOutcome::Excluded;
        }

        match event.kind {
            ForegroundKind::EnterForeground => {
                let fresh = OpenSession { package: event.package.clone(), start: event.timestamp };
                match self.open.insert(event.package.clone(), fresh) {
                    Some(stale) => IngestOutcome::Replaced { discarded_start: stale.start },
                    None => IngestOutcome::Opened,
                }
            }
            ForegroundKind::ExitForeground => {
                // The matched open session is consumed whether or not a record
                // comes out of it.
                let Some(open) = self.open.remove(&event.package) else {
                    return IngestOutcome::OrphanExit;
                };

                let duration_secs = event.timestamp.whole_seconds_since(open.start);
                if duration_secs <= MIN_SESSION_SECS {
                    return IngestOutcome::TooShort { duration_secs };
                }

                match labels.display_name(&open.package) {
                    Ok(display_name) => IngestOutcome::Emitted(SessionRecord {
                        package: open.package,
                        display_name,
                        start: open.start,
                        end: event.timestamp,
                        duration_secs,
                    }),
                    Err(e) => {
                        debug!("Dropping session for {}: {}", open.package, e);
                        IngestOutcome::LabelUnavailable
                    }
                }
            }
        }
    }

    /// Discards every open session without emitting. Returns how many were dropped.
    pub fn flush(&mut self) -> usize {
        let n = self.open.len();
        self.open.clear();
        n
    }

    pub fn open_sessions(&self) -> usize {
        self.open.len()
    }

    pub fn open_session(&self, package: &str) -> Option<&OpenSession> {
        self.open.get(package)
    }
}
