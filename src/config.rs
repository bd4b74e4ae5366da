use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::collectors::unlock::DEFAULT_JOURNAL_CAPACITY;
use crate::kernel::reactor::{ReactorConfig, DEFAULT_CADENCE_MS};
use crate::kernel::telemetry::recorder::MAX_EVENTS;
use crate::kernel::session::DEFAULT_EXCLUDED_PREFIXES;

pub const CONFIG_ENV: &str = "HOSTWATCH_CONFIG";

/// Agent settings. Every field has a default so a partial (or missing)
/// config file is fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Holds `preferences.json`.
    pub state_dir: PathBuf,
    pub capture_dir: PathBuf,
    /// Bound of the host -> reactor event queue.
    pub ingest_capacity: usize,
    pub push_capacity: usize,
    pub unlock_journal_capacity: usize,
    pub excluded_prefixes: Vec<String>,
    pub cadence_ms: u64,
    /// Ring size of the reactor's telemetry recorder.
    pub telemetry_capacity: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from("hostwatch-state"),
            capture_dir: PathBuf::from("hostwatch-state/captures"),
            ingest_capacity: 1024,
            push_capacity: 256,
            unlock_journal_capacity: DEFAULT_JOURNAL_CAPACITY,
            excluded_prefixes: DEFAULT_EXCLUDED_PREFIXES.iter().map(|p| p.to_string()).collect(),
            cadence_ms: DEFAULT_CADENCE_MS,
            telemetry_capacity: MAX_EVENTS,
        }
    }
}

impl AgentConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Reads the file named by `HOSTWATCH_CONFIG`, or defaults when unset.
    pub fn from_env() -> anyhow::Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    /// Same settings rooted under `dir`. Used by tests and the demo.
    pub fn rooted_at(dir: &Path) -> Self {
        Self {
            state_dir: dir.to_path_buf(),
            capture_dir: dir.join("captures"),
            ..Self::default()
        }
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.state_dir.join("preferences.json")
    }

    pub fn reactor(&self) -> ReactorConfig {
        ReactorConfig {
            cadence_ms: self.cadence_ms,
            excluded_prefixes: self.excluded_prefixes.clone(),
            telemetry_capacity: self.telemetry_capacity,
        }
    }
}
