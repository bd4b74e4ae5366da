use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{Collector, CollectorState, Domain, Record};
use crate::host::HostError;
use crate::kernel::time::Millis;

/// Uniform set of collectors, at most one per domain.
#[derive(Default)]
pub struct CollectorRegistry {
    collectors: Vec<Arc<dyn Collector>>,
}

impl CollectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a collector, replacing any existing one for the same domain.
    pub fn register(&mut self, collector: Arc<dyn Collector>) {
        let domain = collector.domain();
        self.collectors.retain(|c| c.domain() != domain);
        self.collectors.push(collector);
    }

    pub fn get(&self, domain: Domain) -> Option<&Arc<dyn Collector>> {
        self.collectors.iter().find(|c| c.domain() == domain)
    }

    pub fn domains(&self) -> Vec<Domain> {
        self.collectors.iter().map(|c| c.domain()).collect()
    }

    pub fn states(&self) -> Vec<CollectorState> {
        self.collectors.iter().map(|c| c.state()).collect()
    }

    /// Starts every collector whose permission is granted right now. Missing
    /// permissions are skipped silently and not retried; a fresh start
    /// command is needed once granted. Returns the domains now active.
    pub fn activate_all(&self) -> Vec<Domain> {
        let mut activated = Vec::new();
        for collector in &self.collectors {
            let domain = collector.domain();
            if !collector.check_permission() {
                debug!("Skipping {:?} collector: permission not granted", domain);
                continue;
            }
            match collector.start() {
                Ok(()) => activated.push(domain),
                Err(e) => warn!("{:?} collector failed to start: {}", domain, e),
            }
        }
        info!("Collectors active: {:?}", activated);
        activated
    }

    /// Stops every collector. A failure in one never prevents the others
    /// from being stopped; failures are logged and handed back.
    pub fn deactivate_all(&self) -> Vec<(Domain, HostError)> {
        let mut failures = Vec::new();
        for collector in &self.collectors {
            if let Err(e) = collector.stop() {
                warn!("{:?} collector failed to stop cleanly: {}", collector.domain(), e);
                failures.push((collector.domain(), e));
            }
        }
        failures
    }

    /// Single-domain start. False when the domain is unknown, permission is
    /// missing, or the host refused the subscription.
    pub fn start_one(&self, domain: Domain) -> bool {
        let Some(collector) = self.get(domain) else {
            return false;
        };
        if !collector.check_permission() {
            return false;
        }
        match collector.start() {
            Ok(()) => true,
            Err(e) => {
                warn!("{:?} collector failed to start: {}", domain, e);
                false
            }
        }
    }

    pub fn stop_one(&self, domain: Domain) -> bool {
        let Some(collector) = self.get(domain) else {
            return false;
        };
        if let Err(e) = collector.stop() {
            warn!("{:?} collector failed to stop cleanly: {}", domain, e);
        }
        true
    }

    pub fn fetch_since(&self, domain: Domain, since: Millis) -> Vec<Record> {
        self.get(domain).map(|c| c.fetch_since(since)).unwrap_or_default()
    }
}
