//! Host facade.
//!
//! The agent never talks to the operating environment directly. Everything it
//! consumes (permission state, raw event callbacks, log rows, media frames)
//! and everything it emits to the host (liveness notice) goes through the
//! traits below. `sim` provides an in-memory host for tests and the demo
//! binary.

pub mod sim;

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::collectors::Domain;
use crate::kernel::event::RawEvent;
use crate::kernel::time::{Clock, Millis};

pub use crate::kernel::ingest::EventSink;
pub use sim::SimulatedHost;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("permission denied for {0:?}")]
    PermissionDenied(Domain),
    #[error("package not found: {0}")]
    PackageNotFound(String),
    #[error("host query failed: {0}")]
    QueryFailed(String),
    #[error("host resource unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub trait PermissionProbe: Send + Sync {
    fn is_granted(&self, domain: Domain) -> bool;
    /// May open host settings UI. The outcome is only observable through a
    /// later `is_granted`.
    fn request(&self, domain: Domain);
}

pub trait LabelResolver: Send + Sync {
    fn display_name(&self, package: &str) -> Result<String, HostError>;
}

pub trait UsageLog: Send + Sync {
    /// Foreground transitions in `[since, until]`, in occurrence order.
    fn query_events(&self, since: Millis, until: Millis) -> Result<Vec<RawEvent>, HostError>;
}

/// Raw call log row, before mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRow {
    pub number: Option<String>,
    pub call_type: i32,
    pub date: Millis,
    pub duration_secs: i64,
    pub cached_name: Option<String>,
}

pub trait CallLog: Send + Sync {
    fn query_calls(&self, since: Millis) -> Result<Vec<CallRow>, HostError>;
}

/// Raw message store row, before mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRow {
    pub address: Option<String>,
    pub body: Option<String>,
    pub date: Millis,
    pub message_type: i32,
    pub read: i32,
    pub thread_id: i64,
}

pub trait MessageStore: Send + Sync {
    fn query_messages(&self, since: Millis) -> Result<Vec<MessageRow>, HostError>;
}

/// Registration of live host callbacks per domain.
pub trait EventFeed: Send + Sync {
    fn subscribe(&self, domain: Domain, sink: EventSink) -> Result<(), HostError>;
    fn unsubscribe(&self, domain: Domain) -> Result<(), HostError>;
}

/// Resolves a persisted resume token back to a runnable entry point.
pub trait EntryPointResolver: Send + Sync {
    fn resolve(&self, token: i64) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticePriority {
    Low,
    Min,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub title: String,
    pub text: String,
    pub priority: NoticePriority,
}

/// Persistent low-priority notice shown while collection runs.
pub trait LivenessIndicator: Send + Sync {
    fn post(&self, notice: &Notice);
    fn withdraw(&self);
}

pub trait MediaSource: Send + Sync {
    fn screen_frame(&self) -> Result<DynamicImage, HostError>;
    fn camera_frame(&self, front: bool) -> Result<DynamicImage, HostError>;
    /// Blocks until `samples` mono samples at `sample_rate` are available.
    fn audio_chunk(&self, sample_rate: u32, samples: usize) -> Result<Vec<i16>, HostError>;
}

/// Bundle of host facades handed to every component at wiring time.
#[derive(Clone)]
pub struct HostServices {
    pub permissions: Arc<dyn PermissionProbe>,
    pub labels: Arc<dyn LabelResolver>,
    pub usage: Arc<dyn UsageLog>,
    pub calls: Arc<dyn CallLog>,
    pub messages: Arc<dyn MessageStore>,
    pub feed: Arc<dyn EventFeed>,
    pub entry_points: Arc<dyn EntryPointResolver>,
    pub indicator: Arc<dyn LivenessIndicator>,
    pub media: Arc<dyn MediaSource>,
    pub clock: Arc<dyn Clock>,
}

impl HostServices {
    pub fn simulated(host: Arc<SimulatedHost>) -> Self {
        Self {
            permissions: host.clone(),
            labels: host.clone(),
            usage: host.clone(),
            calls: host.clone(),
            messages: host.clone(),
            feed: host.clone(),
            entry_points: host.clone(),
            indicator: host.clone(),
            media: host.clone(),
            clock: host,
        }
    }
}
