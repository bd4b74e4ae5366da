use anyhow::Context;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::capture::{CaptureWorker, Capturer};
use crate::collectors::{
    CallsCollector, CollectorRegistry, MessagesCollector, UnlockCollector, UnlockJournal, UsageCollector,
};
use crate::config::AgentConfig;
use crate::gateway::Gateway;
use crate::host::HostServices;
use crate::kernel::ingest;
use crate::kernel::lifecycle::LifecycleCoordinator;
use crate::kernel::prefs::{FilePreferenceStore, PreferenceStore};
use crate::kernel::reactor::Reactor;

/// Fully wired agent: gateway for the consumer, coordinator for boot hooks,
/// reactor to be driven by the caller's runtime.
pub struct Agent {
    pub gateway: Gateway,
    pub coordinator: Arc<LifecycleCoordinator>,
    pub reactor: Reactor,
}

impl Agent {
    /// Wires the agent with a file-backed preference store under `state_dir`.
    pub fn build(config: &AgentConfig, host: HostServices) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.state_dir)
            .with_context(|| format!("creating state dir {}", config.state_dir.display()))?;
        let prefs = Arc::new(FilePreferenceStore::new(config.preferences_path()));
        Self::with_store(config, host, prefs)
    }

    pub fn with_store(config: &AgentConfig, host: HostServices, prefs: Arc<dyn PreferenceStore>) -> anyhow::Result<Self> {
        let (queue, receiver) = ingest::channel(config.ingest_capacity);
        let (push, _) = broadcast::channel(config.push_capacity.max(1));
        let journal = UnlockJournal::new(config.unlock_journal_capacity);

        let mut registry = CollectorRegistry::new();
        registry.register(Arc::new(UsageCollector::new(host.clone(), queue.clone(), config.excluded_prefixes.clone())));
        registry.register(Arc::new(CallsCollector::new(host.clone(), queue.clone())));
        registry.register(Arc::new(MessagesCollector::new(host.clone(), queue.clone())));
        registry.register(Arc::new(UnlockCollector::new(host.clone(), queue, journal.clone())));
        let registry = Arc::new(registry);

        let coordinator = Arc::new(LifecycleCoordinator::new(prefs, registry, &host));

        let capturer = Capturer::new(host.media.clone(), host.clock.clone(), config.capture_dir.clone());
        let capture = Arc::new(CaptureWorker::spawn(capturer).context("spawning capture worker")?);

        let reactor = Reactor::new(receiver, host.labels.clone(), push.clone(), journal, config.reactor());
        let gateway = Gateway::new(host.permissions.clone(), coordinator.clone(), capture, push);

        Ok(Self { gateway, coordinator, reactor })
    }
}
