//! Command/query boundary.
//!
//! No operation here returns an error to the consumer: permission problems
//! come back as `false`, failed queries as empty vectors, failed captures as
//! `None`. Live events are delivered through `subscribe`, at most once and
//! without replay.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::capture::{CaptureRequest, CaptureWorker, DEFAULT_AUDIO_SECONDS};
use crate::collectors::{CollectorRegistry, CollectorState, Domain, Record};
use crate::host::PermissionProbe;
use crate::kernel::event::PushEvent;
use crate::kernel::lifecycle::LifecycleCoordinator;
use crate::kernel::prefs::NotificationMode;
use crate::kernel::time::Millis;

/// A named invocation, as it arrives from the consumer's method channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub args: Value,
}

impl MethodCall {
    pub fn new(method: &str, args: Value) -> Self {
        Self { method: method.to_string(), args }
    }

    fn domain(&self) -> Option<Domain> {
        self.args.get("domain").and_then(Value::as_str).and_then(Domain::parse)
    }

    fn i64_arg(&self, key: &str) -> Option<i64> {
        self.args.get(key).and_then(Value::as_i64)
    }

    fn bool_arg(&self, key: &str) -> Option<bool> {
        self.args.get(key).and_then(Value::as_bool)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MethodResult {
    Success(Value),
    NotImplemented,
}

#[derive(Clone)]
pub struct Gateway {
    permissions: Arc<dyn PermissionProbe>,
    registry: Arc<CollectorRegistry>,
    coordinator: Arc<LifecycleCoordinator>,
    capture: Arc<CaptureWorker>,
    push: broadcast::Sender<PushEvent>,
}

impl Gateway {
    pub fn new(
        permissions: Arc<dyn PermissionProbe>,
        coordinator: Arc<LifecycleCoordinator>,
        capture: Arc<CaptureWorker>,
        push: broadcast::Sender<PushEvent>,
    ) -> Self {
        Self {
            permissions,
            registry: coordinator.registry().clone(),
            coordinator,
            capture,
            push,
        }
    }

    pub fn check_permission(&self, domain: Domain) -> bool {
        self.permissions.is_granted(domain)
    }

    pub fn request_permission(&self, domain: Domain) {
        self.permissions.request(domain);
    }

    pub fn start_tracking(&self, domain: Domain) -> bool {
        self.registry.start_one(domain)
    }

    pub fn stop_tracking(&self, domain: Domain) -> bool {
        self.registry.stop_one(domain)
    }

    pub fn fetch_since(&self, domain: Domain, since: Millis) -> Vec<Record> {
        self.registry.fetch_since(domain, since)
    }

    pub fn start_service(&self, token: i64) -> bool {
        self.coordinator.start(token)
    }

    pub fn stop_service(&self) -> bool {
        self.coordinator.stop()
    }

    pub fn is_service_running(&self) -> bool {
        self.coordinator.is_running()
    }

    pub fn collector_states(&self) -> Vec<CollectorState> {
        self.registry.states()
    }

    pub fn set_notification_mode(&self, mode: NotificationMode) -> bool {
        self.coordinator.set_notification_mode(mode)
    }

    pub fn set_auto_start(&self, enabled: bool) -> bool {
        self.coordinator.set_auto_start(enabled)
    }

    /// Asks the consumer side to synchronise its stored data. The request is
    /// relayed on the push channel; true once it has been handed to at least
    /// one subscriber.
    pub fn request_data_sync(&self) -> bool {
        match self.push.send(PushEvent::SyncRequested) {
            Ok(_) => true,
            Err(_) => {
                debug!("Data sync requested with no subscriber listening");
                false
            }
        }
    }

    /// Live push channel. Only events sent after this call are seen.
    pub fn subscribe(&self) -> broadcast::Receiver<PushEvent> {
        self.push.subscribe()
    }

    /// Runs a capture on the worker thread. `None` on missing permission,
    /// host failure, or a service stop while the capture was in flight.
    pub async fn capture(&self, request: CaptureRequest) -> Option<PathBuf> {
        if !self.permissions.is_granted(Domain::Media) {
            debug!("Capture {:?} refused: media permission missing", request);
            return None;
        }
        let reply = self.capture.submit(request, self.coordinator.stop_signal());
        reply.await.ok().flatten()
    }

    /// Name-based dispatch for the consumer's method channel.
    pub async fn invoke(&self, call: MethodCall) -> MethodResult {
        let value = match call.method.as_str() {
            "checkPermission" => json!(call.domain().map(|d| self.check_permission(d)).unwrap_or(false)),
            "requestPermission" => {
                if let Some(d) = call.domain() {
                    self.request_permission(d);
                }
                Value::Null
            }
            "startTracking" => json!(call.domain().map(|d| self.start_tracking(d)).unwrap_or(false)),
            "stopTracking" => json!(call.domain().map(|d| self.stop_tracking(d)).unwrap_or(false)),
            "fetchSince" => {
                let since = Millis(call.i64_arg("since").unwrap_or(0));
                let records = call.domain().map(|d| self.fetch_since(d, since)).unwrap_or_default();
                to_value_or(records, json!([]))
            }
            "startService" => match call.i64_arg("token") {
                Some(token) => json!(self.start_service(token)),
                None => {
                    warn!("startService called without a token");
                    json!(false)
                }
            },
            "stopService" => json!(self.stop_service()),
            "isServiceRunning" => json!(self.is_service_running()),
            "requestDataSync" => json!(self.request_data_sync()),
            "collectorStates" => to_value_or(self.collector_states(), json!([])),
            "setNotificationMode" => match call.args.get("mode").and_then(Value::as_str) {
                Some(mode) => json!(self.set_notification_mode(NotificationMode::from(mode.to_string()))),
                None => json!(false),
            },
            "setAutoStart" => match call.bool_arg("enabled") {
                Some(enabled) => json!(self.set_auto_start(enabled)),
                None => json!(false),
            },
            "captureScreenshot" => path_value(self.capture(CaptureRequest::Screenshot).await),
            "capturePhoto" => {
                let front_camera = call.bool_arg("front_camera").unwrap_or(false);
                path_value(self.capture(CaptureRequest::Photo { front_camera }).await)
            }
            "recordAudio" => {
                let duration_seconds = call
                    .i64_arg("duration_seconds")
                    .and_then(|d| u32::try_from(d).ok())
                    .unwrap_or(DEFAULT_AUDIO_SECONDS);
                path_value(self.capture(CaptureRequest::Audio { duration_seconds }).await)
            }
            _ => return MethodResult::NotImplemented,
        };
        MethodResult::Success(value)
    }
}

fn to_value_or<T: Serialize>(v: T, fallback: Value) -> Value {
    serde_json::to_value(v).unwrap_or_else(|e| {
        warn!("Failed to encode response: {}", e);
        fallback
    })
}

fn path_value(path: Option<PathBuf>) -> Value {
    match path {
        Some(p) => json!(p.to_string_lossy()),
        None => Value::Null,
    }
}
