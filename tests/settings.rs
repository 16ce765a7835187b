use serde_json::json;
use std::path::PathBuf;
use tempfile::tempdir;
use widget_dashboard::dashboard::widgets::WeatherWidget;
use widget_dashboard::dashboard::{Dashboard, WidgetRegistry};
use widget_dashboard::settings::Settings;
use widget_dashboard::storage::MemoryStore;
use widget_dashboard::tasks::TaskQueue;

#[test]
fn missing_or_empty_file_gives_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    let s = Settings::load(path.to_str().unwrap()).unwrap();
    assert!(!s.debug_logging);
    assert!(s.enable_toasts);
    assert_eq!(s.toast_duration, 5.0);
    assert_eq!(s.window_size, Some((1100, 720)));

    std::fs::write(&path, "  \n").unwrap();
    let s = Settings::load(path.to_str().unwrap()).unwrap();
    assert_eq!(s.autosave_interval_secs, 30);
    assert!(s.restore_on_start);
}

#[test]
fn partial_file_fills_in_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, r#"{"debug_logging": true, "autosave_interval_secs": 0}"#).unwrap();
    let s = Settings::load(path.to_str().unwrap()).unwrap();
    assert!(s.debug_logging);
    assert!(s.autosave_interval().is_none());
    assert!(s.background_fetch);
    assert!(s.widget_defaults.is_empty());
}

#[test]
fn malformed_file_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(Settings::load(path.to_str().unwrap()).is_err());
}

#[test]
fn save_and_load_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    let path = path.to_str().unwrap();
    let mut s = Settings::default();
    s.window_size = Some((800, 600));
    s.log_file = Some("dashboard.log".into());
    s.widget_defaults
        .insert("weather".into(), json!({"city": "Oslo", "api_key": "k"}));
    s.save(path).unwrap();

    let loaded = Settings::load(path).unwrap();
    assert_eq!(loaded.window_size, Some((800, 600)));
    assert_eq!(loaded.log_file.as_deref(), Some("dashboard.log"));
    assert_eq!(loaded.widget_defaults["weather"]["city"], json!("Oslo"));
}

#[test]
fn storage_dir_overrides_platform_location() {
    let mut s = Settings::default();
    s.storage_dir = Some("/tmp/dash-data".into());
    assert_eq!(s.storage_path(), PathBuf::from("/tmp/dash-data"));
    s.storage_dir = Some("   ".into());
    assert_ne!(s.storage_path(), PathBuf::from("   "));
}

#[test]
fn widget_defaults_reach_new_widgets() {
    let mut s = Settings::default();
    s.widget_defaults.insert("weather".into(), json!({"city": "Lisbon"}));
    let mut dashboard = Dashboard::new(
        WidgetRegistry::from_settings(&s),
        std::sync::Arc::new(MemoryStore::new()),
        std::sync::Arc::new(NoNetwork),
        TaskQueue::inline(),
    );
    let id = dashboard
        .add_widget("weather", json!({}))
        .unwrap()
        .id()
        .to_string();
    assert_eq!(dashboard.widget_as::<WeatherWidget>(&id).unwrap().city(), "Lisbon");

    let id = dashboard
        .add_widget("weather", json!({"city": "Porto"}))
        .unwrap()
        .id()
        .to_string();
    assert_eq!(dashboard.widget_as::<WeatherWidget>(&id).unwrap().city(), "Porto");
}

struct NoNetwork;

impl widget_dashboard::net::Transport for NoNetwork {
    fn get_json(
        &self,
        _url: &str,
    ) -> Result<serde_json::Value, widget_dashboard::net::TransportError> {
        Err(widget_dashboard::net::TransportError::Request("offline".into()))
    }
}
