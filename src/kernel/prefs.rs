use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("preference store io: {0}")]
    Io(#[from] std::io::Error),
    #[error("preference store is corrupt: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Liveness notice verbosity. Persisted as the host's upper-case strings;
/// anything unrecognised is kept verbatim and rendered like `Minimized`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationMode {
    Visible,
    Minimized,
    Hidden,
    Other(String),
}

impl Default for NotificationMode {
    fn default() -> Self {
        NotificationMode::Visible
    }
}

impl From<String> for NotificationMode {
    fn from(s: String) -> Self {
        match s.as_str() {
            "VISIBLE" => NotificationMode::Visible,
            "MINIMIZED" => NotificationMode::Minimized,
            "HIDDEN" => NotificationMode::Hidden,
            _ => NotificationMode::Other(s),
        }
    }
}

impl From<NotificationMode> for String {
    fn from(m: NotificationMode) -> Self {
        match m {
            NotificationMode::Visible => "VISIBLE".to_string(),
            NotificationMode::Minimized => "MINIMIZED".to_string(),
            NotificationMode::Hidden => "HIDDEN".to_string(),
            NotificationMode::Other(s) => s,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Everything that must survive process death. Only the lifecycle
/// coordinator writes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeConfig {
    /// 0 means no token.
    #[serde(default)]
    pub resume_token: i64,
    #[serde(default = "default_true")]
    pub auto_start_enabled: bool,
    #[serde(default)]
    pub notification_mode: NotificationMode,
    #[serde(default)]
    pub is_configured: bool,
}

impl Default for ResumeConfig {
    fn default() -> Self {
        Self {
            resume_token: 0,
            auto_start_enabled: true,
            notification_mode: NotificationMode::Visible,
            is_configured: false,
        }
    }
}

impl ResumeConfig {
    pub fn has_token(&self) -> bool {
        self.resume_token != 0
    }
}

pub trait PreferenceStore: Send + Sync {
    fn load(&self) -> Result<ResumeConfig, StoreError>;
    fn save(&self, config: &ResumeConfig) -> Result<(), StoreError>;
}

/// JSON key-value file. Writes go to a sibling temp file and are renamed
/// into place so a crash mid-write leaves the previous state readable.
pub struct FilePreferenceStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FilePreferenceStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path, write_lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn load(&self) -> Result<ResumeConfig, StoreError> {
        if !self.path.exists() {
            return Ok(ResumeConfig::default());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(ResumeConfig::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, config: &ResumeConfig) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(config)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryPreferenceStore {
    config: Mutex<ResumeConfig>,
    writes: Mutex<usize>,
}

impl InMemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ResumeConfig) -> Self {
        Self { config: Mutex::new(config), writes: Mutex::new(0) }
    }

    pub fn writes(&self) -> usize {
        *self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PreferenceStore for InMemoryPreferenceStore {
    fn load(&self) -> Result<ResumeConfig, StoreError> {
        Ok(self.config.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, config: &ResumeConfig) -> Result<(), StoreError> {
        *self.config.lock().unwrap_or_else(PoisonError::into_inner) = config.clone();
        *self.writes.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }
}
