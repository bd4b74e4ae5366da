use std::path::PathBuf;

use hostwatch::config::AgentConfig;
use hostwatch::host::{Notice, NoticePriority};
use hostwatch::kernel::prefs::{FilePreferenceStore, NotificationMode, PreferenceStore, ResumeConfig};

fn scratch_file() -> PathBuf {
    std::env::temp_dir()
        .join(format!("hostwatch-prefs-{}", uuid::Uuid::new_v4()))
        .join("preferences.json")
}

#[test]
fn test_missing_file_yields_defaults() {
    let store = FilePreferenceStore::new(scratch_file());
    let config = store.load().unwrap();

    assert_eq!(config.resume_token, 0);
    assert!(config.auto_start_enabled, "Auto-start defaults to enabled");
    assert_eq!(config.notification_mode, NotificationMode::Visible);
    assert!(!config.is_configured);
    assert!(!config.has_token());
}

#[test]
fn test_save_then_load() {
    let store = FilePreferenceStore::new(scratch_file());
    let config = ResumeConfig {
        resume_token: 31337,
        auto_start_enabled: false,
        notification_mode: NotificationMode::Minimized,
        is_configured: true,
    };
    store.save(&config).unwrap();

    // A second handle on the same file simulates a process restart.
    let reopened = FilePreferenceStore::new(store.path().clone());
    assert_eq!(reopened.load().unwrap(), config);

    let raw = std::fs::read_to_string(store.path()).unwrap();
    assert!(raw.contains("\"MINIMIZED\""), "Mode stored as upper-case string: {}", raw);
}

#[test]
fn test_partial_and_unknown_values() {
    let path = scratch_file();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, r#"{"resume_token": 5, "notification_mode": "WEIRD"}"#).unwrap();

    let config = FilePreferenceStore::new(path).load().unwrap();
    assert_eq!(config.resume_token, 5);
    assert!(config.auto_start_enabled);
    assert_eq!(config.notification_mode, NotificationMode::Other("WEIRD".to_string()));

    let notice = Notice::for_mode(&config.notification_mode);
    assert_eq!(notice, Notice::for_mode(&NotificationMode::Minimized), "Unknown mode renders as minimized");
}

#[test]
fn test_corrupt_file_is_an_error() {
    let path = scratch_file();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "{not json").unwrap();

    assert!(FilePreferenceStore::new(path).load().is_err());
}

#[test]
fn test_notice_texts() {
    let visible = Notice::for_mode(&NotificationMode::Visible);
    assert_eq!(visible.title, "Hostwatch");
    assert_eq!(visible.text, "Collection active");
    assert_eq!(visible.priority, NoticePriority::Low);

    let minimized = Notice::for_mode(&NotificationMode::Minimized);
    assert_eq!(minimized.title, "Service");
    assert_eq!(minimized.text, "Service running");

    let hidden = Notice::for_mode(&NotificationMode::Hidden);
    assert!(hidden.title.is_empty() && hidden.text.is_empty());
    assert_eq!(hidden.priority, NoticePriority::Min);
}

#[test]
fn test_agent_config_partial_file() {
    let path = scratch_file().with_file_name("agent.json");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, r#"{"cadence_ms": 10, "excluded_prefixes": ["com.vendor"]}"#).unwrap();

    let config = AgentConfig::load(&path).unwrap();
    assert_eq!(config.cadence_ms, 10);
    assert_eq!(config.reactor().excluded_prefixes, vec!["com.vendor".to_string()]);
    assert_eq!(config.ingest_capacity, AgentConfig::default().ingest_capacity);

    let rooted = AgentConfig::rooted_at(path.parent().unwrap());
    assert_eq!(rooted.preferences_path(), path.with_file_name("preferences.json"));
}
