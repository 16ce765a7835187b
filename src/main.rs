use std::path::Path;
use std::sync::Arc;

use eframe::egui;
use widget_dashboard::dashboard::{Dashboard, WidgetRegistry};
use widget_dashboard::gui::DashboardApp;
use widget_dashboard::logging;
use widget_dashboard::net::HttpTransport;
use widget_dashboard::settings::Settings;
use widget_dashboard::storage::{FileStore, KeyValueStore, MemoryStore};
use widget_dashboard::tasks::TaskQueue;

const SETTINGS_FILE: &str = "settings.json";

fn open_store(settings: &Settings) -> Arc<dyn KeyValueStore> {
    let dir = settings.storage_path();
    match FileStore::new(&dir) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!(dir = %dir.display(), "storage unavailable, changes will not persist: {e}");
            Arc::new(MemoryStore::new())
        }
    }
}

fn main() -> anyhow::Result<()> {
    let settings = Settings::load(SETTINGS_FILE)?;
    logging::init(settings.debug_logging, settings.log_file.as_deref().map(Path::new));
    tracing::info!("starting dashboard");

    let tasks = if settings.background_fetch {
        TaskQueue::threaded()
    } else {
        TaskQueue::inline()
    };
    let mut dashboard = Dashboard::new(
        WidgetRegistry::from_settings(&settings),
        open_store(&settings),
        Arc::new(HttpTransport::new()?),
        tasks,
    );
    if settings.restore_on_start {
        dashboard.load_from_storage();
    }

    let (w, h) = settings.window_size.unwrap_or((1100, 720));
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([w as f32, h as f32])
            .with_min_inner_size([480.0, 320.0]),
        ..Default::default()
    };
    let app = DashboardApp::new(dashboard, &settings, SETTINGS_FILE.to_string());
    eframe::run_native(
        "Widget Dashboard",
        native_options,
        Box::new(move |_cc| Box::new(app)),
    )
    .map_err(|e| anyhow::anyhow!("failed to run the dashboard window: {e}"))
}
