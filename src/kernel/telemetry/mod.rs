//! Ingestion and lifecycle telemetry.
//!
//! # SAFETY INVARIANT
//! Telemetry is a READ-ONLY side-effect layer.
//! It must **NEVER** be read inside decision logic (reconstruction, lifecycle
//! transitions, collector activation). It exists solely for observability and
//! verification.
//!
//! # PRIVACY INVARIANT
//! Telemetry events carry no collected content (package names, numbers,
//! message bodies). Only domains, states, durations and counts.

pub mod event;
pub mod metrics;
pub mod recorder;
