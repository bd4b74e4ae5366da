use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError, TryLockError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::cancel::RunCancellation;
use super::prefs::{NotificationMode, PreferenceStore, ResumeConfig};
use super::telemetry::event::TelemetryEvent;
use super::telemetry::metrics::TelemetrySnapshot;
use super::telemetry::recorder::TelemetryRecorder;
use crate::collectors::CollectorRegistry;
use crate::host::{EntryPointResolver, HostServices, LivenessIndicator, Notice, NoticePriority};

/// Lifecycle of the collection process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ServiceState {
    Dormant = 0,
    Starting = 1,
    Running = 2,
    Stopping = 3,
}

impl Default for ServiceState {
    fn default() -> Self {
        Self::Dormant
    }
}

impl ServiceState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => ServiceState::Starting,
            2 => ServiceState::Running,
            3 => ServiceState::Stopping,
            _ => ServiceState::Dormant,
        }
    }
}

/// Requests that drive the lifecycle graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleRequest {
    Start,
    TokenRejected,
    Activated,
    Stop,
    TeardownComplete,
}

pub struct LifecycleGraph;

impl LifecycleGraph {
    /// Pure function: (Current State, Request) -> New State.
    /// None means the request does not apply in this state.
    pub fn transition(current: ServiceState, request: LifecycleRequest) -> Option<ServiceState> {
        use LifecycleRequest::*;
        use ServiceState::*;

        match (current, request) {
            (Dormant, Start) => Some(Starting),
            (Starting, TokenRejected) => Some(Dormant),
            (Starting, Activated) => Some(Running),
            (Running, Stop) => Some(Stopping),
            (Stopping, TeardownComplete) => Some(Dormant),
            _ => None,
        }
    }
}

/// Why the coordinator is being asked to resume on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootTrigger {
    /// Host environment finished booting.
    HostBoot,
    /// The process was recreated by the host rather than launched by the user.
    ProcessRecreated,
}

impl Notice {
    pub fn for_mode(mode: &NotificationMode) -> Self {
        match mode {
            NotificationMode::Visible => Notice {
                title: "Hostwatch".to_string(),
                text: "Collection active".to_string(),
                priority: NoticePriority::Low,
            },
            // The notice stays posted; only its content collapses.
            NotificationMode::Hidden => Notice {
                title: String::new(),
                text: String::new(),
                priority: NoticePriority::Min,
            },
            NotificationMode::Minimized | NotificationMode::Other(_) => Notice {
                title: "Service".to_string(),
                text: "Service running".to_string(),
                priority: NoticePriority::Low,
            },
        }
    }
}

/// Owns the service state, the persisted resume config, the run's stop
/// signal and the liveness notice. Transitions are serialized by one writer
/// lock; a request arriving while another transition is in flight is a
/// no-op that reports the current state.
pub struct LifecycleCoordinator {
    state: AtomicU8,
    transition: Mutex<()>,
    prefs: Arc<dyn PreferenceStore>,
    registry: Arc<CollectorRegistry>,
    entry_points: Arc<dyn EntryPointResolver>,
    indicator: Arc<dyn LivenessIndicator>,
    run: RunCancellation,
    telemetry: Mutex<TelemetryRecorder>,
}

impl LifecycleCoordinator {
    pub fn new(prefs: Arc<dyn PreferenceStore>, registry: Arc<CollectorRegistry>, host: &HostServices) -> Self {
        Self {
            state: AtomicU8::new(ServiceState::Dormant as u8),
            transition: Mutex::new(()),
            prefs,
            registry,
            entry_points: host.entry_points.clone(),
            indicator: host.indicator.clone(),
            run: RunCancellation::new(),
            telemetry: Mutex::new(TelemetryRecorder::new()),
        }
    }

    pub fn state(&self) -> ServiceState {
        ServiceState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Non-blocking read, safe from any thread.
    pub fn is_running(&self) -> bool {
        self.state() == ServiceState::Running
    }

    pub fn registry(&self) -> &Arc<CollectorRegistry> {
        &self.registry
    }

    /// Token for work that must be discarded when the service stops.
    pub fn stop_signal(&self) -> CancellationToken {
        self.run.token()
    }

    pub fn telemetry_snapshot(&self) -> TelemetrySnapshot {
        self.telemetry.lock().unwrap_or_else(PoisonError::into_inner).snapshot()
    }

    /// Persists `token`, then activates collectors. Idempotent while RUNNING.
    pub fn start(&self, token: i64) -> bool {
        let Some(_guard) = self.begin_transition() else {
            return self.is_running();
        };

        if self.state() == ServiceState::Running {
            debug!("Start requested while running; nothing to do");
            return true;
        }

        // Written before activation so a crash mid-start can still resume.
        // An empty token never overwrites a stored one.
        let mut config = self.load_config();
        if token != 0 && config.resume_token != token {
            config.resume_token = token;
            self.persist(&config);
        }

        if !self.advance(LifecycleRequest::Start) {
            return false;
        }

        if token == 0 || !self.entry_points.resolve(token) {
            warn!("Resume token {} is absent or unknown; staying dormant", token);
            self.advance(LifecycleRequest::TokenRejected);
            return false;
        }

        let activated = self.registry.activate_all();

        // Mode is read once per RUNNING entry.
        self.indicator.post(&Notice::for_mode(&config.notification_mode));
        self.advance(LifecycleRequest::Activated);

        if !config.is_configured {
            config.is_configured = true;
            self.persist(&config);
        }

        info!("Collection running with {} active collector(s)", activated.len());
        true
    }

    /// Deactivates every collector and withdraws the notice. Idempotent while DORMANT.
    pub fn stop(&self) -> bool {
        let Some(_guard) = self.begin_transition() else {
            return self.state() == ServiceState::Dormant;
        };

        if self.state() == ServiceState::Dormant {
            return true;
        }

        if !self.advance(LifecycleRequest::Stop) {
            return false;
        }

        self.run.cancel_and_renew();

        let failures = self.registry.deactivate_all();
        {
            let mut telemetry = self.telemetry.lock().unwrap_or_else(PoisonError::into_inner);
            for (domain, _) in &failures {
                telemetry.record(TelemetryEvent::CollectorStopFailed { domain: *domain });
            }
        }

        self.indicator.withdraw();
        self.advance(LifecycleRequest::TeardownComplete);
        info!("Collection stopped");
        true
    }

    /// Auto-resume. The only path that starts collection without an
    /// external command. Reads the preference store once.
    pub fn on_boot(&self, trigger: BootTrigger) -> bool {
        let config = match self.prefs.load() {
            Ok(config) => config,
            Err(e) => {
                warn!("Skipping auto-resume, preferences unreadable: {}", e);
                return false;
            }
        };

        let eligible = config.auto_start_enabled
            && config.has_token()
            && (trigger == BootTrigger::HostBoot || config.is_configured);

        if !eligible {
            debug!("Auto-resume skipped for {:?}: not configured", trigger);
            return false;
        }

        info!("Auto-resuming collection after {:?}", trigger);
        self.start(config.resume_token)
    }

    pub fn resume_config(&self) -> ResumeConfig {
        self.load_config()
    }

    pub fn set_auto_start(&self, enabled: bool) -> bool {
        self.update_config(|c| c.auto_start_enabled = enabled)
    }

    /// Takes effect at the next RUNNING entry.
    pub fn set_notification_mode(&self, mode: NotificationMode) -> bool {
        self.update_config(|c| c.notification_mode = mode)
    }

    fn begin_transition(&self) -> Option<std::sync::MutexGuard<'_, ()>> {
        match self.transition.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(p)) => Some(p.into_inner()),
            Err(TryLockError::WouldBlock) => {
                let current = self.state();
                debug!("Transition already in flight; staying {:?}", current);
                self.record(TelemetryEvent::TransitionRejected { current });
                None
            }
        }
    }

    fn advance(&self, request: LifecycleRequest) -> bool {
        let from = self.state();
        match LifecycleGraph::transition(from, request) {
            Some(to) => {
                self.state.store(to as u8, Ordering::SeqCst);
                debug!("Lifecycle {:?} -> {:?}", from, to);
                self.record(TelemetryEvent::Transition { from, to });
                true
            }
            None => {
                warn!("Ignoring {:?} in state {:?}", request, from);
                false
            }
        }
    }

    fn load_config(&self) -> ResumeConfig {
        self.prefs.load().unwrap_or_else(|e| {
            warn!("Preferences unreadable, using defaults: {}", e);
            ResumeConfig::default()
        })
    }

    fn persist(&self, config: &ResumeConfig) -> bool {
        match self.prefs.save(config) {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to persist resume config: {}", e);
                false
            }
        }
    }

    fn update_config(&self, f: impl FnOnce(&mut ResumeConfig)) -> bool {
        let mut config = self.load_config();
        f(&mut config);
        self.persist(&config)
    }

    fn record(&self, event: TelemetryEvent) {
        self.telemetry.lock().unwrap_or_else(PoisonError::into_inner).record(event);
    }
}
