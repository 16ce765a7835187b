use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Settings {
    /// When enabled the application initialises the logger at debug level.
    /// Defaults to `false` when the field is missing in the settings file.
    #[serde(default)]
    pub debug_logging: bool,
    /// Also write log output to this file.
    #[serde(default)]
    pub log_file: Option<String>,
    /// Last known window size. If absent, a default size is used.
    #[serde(default)]
    pub window_size: Option<(i32, i32)>,
    /// Enable toast notifications in the UI.
    #[serde(default = "default_toasts")]
    pub enable_toasts: bool,
    /// Duration of toast notifications in seconds.
    #[serde(default = "default_toast_duration")]
    pub toast_duration: f32,
    /// Seconds between automatic saves of the dashboard.
    #[serde(default = "default_autosave_interval")]
    pub autosave_interval_secs: u64,
    /// Directory for dashboard and widget records. If `None`, the platform
    /// data directory is used.
    #[serde(default)]
    pub storage_dir: Option<String>,
    /// Run fetches on worker threads. When false they block the UI thread.
    #[serde(default = "default_background_fetch")]
    pub background_fetch: bool,
    /// Restore the previous dashboard on start.
    #[serde(default = "default_restore_on_start")]
    pub restore_on_start: bool,
    /// Per widget type overlays applied to the built-in default settings,
    /// e.g. `{"weather": {"api_key": "...", "city": "Oslo"}}`.
    #[serde(default)]
    pub widget_defaults: BTreeMap<String, Value>,
}

fn default_toasts() -> bool {
    true
}

fn default_toast_duration() -> f32 {
    5.0
}

fn default_autosave_interval() -> u64 {
    30
}

fn default_background_fetch() -> bool {
    true
}

fn default_restore_on_start() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug_logging: false,
            log_file: None,
            window_size: Some((1100, 720)),
            enable_toasts: default_toasts(),
            toast_duration: default_toast_duration(),
            autosave_interval_secs: default_autosave_interval(),
            storage_dir: None,
            background_fetch: default_background_fetch(),
            restore_on_start: default_restore_on_start(),
            widget_defaults: BTreeMap::new(),
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Where the dashboard keeps its records.
    pub fn storage_path(&self) -> PathBuf {
        if let Some(dir) = self.storage_dir.as_deref().filter(|d| !d.trim().is_empty()) {
            return PathBuf::from(dir);
        }
        dirs_next::data_dir()
            .map(|d| d.join("widget_dashboard"))
            .unwrap_or_else(|| {
                std::env::current_dir()
                    .unwrap_or_else(|_| std::env::temp_dir())
                    .join("widget_dashboard_data")
            })
    }

    pub fn autosave_interval(&self) -> Option<std::time::Duration> {
        (self.autosave_interval_secs > 0)
            .then(|| std::time::Duration::from_secs(self.autosave_interval_secs))
    }
}
