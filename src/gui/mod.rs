mod confirmation_modal;
mod notification_log;
pub mod painter;

pub use confirmation_modal::{ConfirmationModal, ConfirmationResult, DestructiveAction};
pub use notification_log::NotificationLogDialog;

use crate::dashboard::{CardOutcome, Dashboard, WidgetKind};
use crate::settings::Settings;
use crate::toast_log::append_toast_log;
use eframe::egui;
use egui_toast::{Toast, ToastKind, ToastOptions, Toasts};
use painter::UiEvent;
use serde_json::json;
use std::time::{Duration, Instant};

/// Upper bound between frames while fetches may be in flight.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

fn push_toast(toasts: &mut Toasts, toast: Toast) {
    append_toast_log(toast.text.text());
    toasts.add(toast);
}

pub struct DashboardApp {
    dashboard: Dashboard,
    settings_path: String,
    toasts: Toasts,
    enable_toasts: bool,
    toast_duration: f32,
    autosave: Option<Duration>,
    last_save: Instant,
    confirm: ConfirmationModal,
    log_dialog: NotificationLogDialog,
    window_size: (i32, i32),
}

impl DashboardApp {
    pub fn new(dashboard: Dashboard, settings: &Settings, settings_path: String) -> Self {
        let mut app = Self {
            dashboard,
            settings_path,
            toasts: Toasts::new().anchor(egui::Align2::RIGHT_TOP, [10.0, 10.0]),
            enable_toasts: settings.enable_toasts,
            toast_duration: settings.toast_duration,
            autosave: settings.autosave_interval(),
            last_save: Instant::now(),
            confirm: ConfirmationModal::default(),
            log_dialog: NotificationLogDialog::default(),
            window_size: settings.window_size.unwrap_or((1100, 720)),
        };
        app.welcome();
        app
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub fn notify(&mut self, kind: ToastKind, text: impl Into<String>) {
        let text = text.into();
        if !self.enable_toasts {
            append_toast_log(&text);
            return;
        }
        push_toast(
            &mut self.toasts,
            Toast {
                text: text.into(),
                kind,
                options: ToastOptions::default().duration_in_seconds(self.toast_duration as f64),
            },
        );
    }

    fn welcome(&mut self) {
        let total = self.dashboard.get_stats().total_widgets;
        if total == 0 {
            self.notify(
                ToastKind::Info,
                "Welcome! Add widgets to start using the dashboard.",
            );
        } else {
            self.notify(
                ToastKind::Success,
                format!("Dashboard loaded. Active widgets: {total}"),
            );
        }
    }

    pub fn add_widget(&mut self, kind: WidgetKind) {
        let result = self
            .dashboard
            .add_widget(kind.as_str(), json!({}))
            .map(|card| card.title().to_string());
        match result {
            Ok(title) => {
                self.save();
                self.notify(ToastKind::Success, format!("Widget \"{title}\" added"));
            }
            Err(e) => {
                tracing::error!(kind = %kind, "failed to add widget: {e}");
                self.notify(ToastKind::Error, format!("Failed to add widget: {e}"));
            }
        }
    }

    pub fn request_clear(&mut self) {
        if self.dashboard.is_empty() {
            self.notify(ToastKind::Info, "The dashboard is already empty");
            return;
        }
        if !self.confirm.is_open() {
            self.confirm.open_for(DestructiveAction::ClearDashboard);
        }
    }

    fn save(&mut self) {
        self.last_save = Instant::now();
        if let Err(e) = self.dashboard.save_to_storage() {
            tracing::warn!("failed to save dashboard: {e}");
        }
    }

    fn autosave(&mut self, now: Instant) {
        if let Some(every) = self.autosave {
            if now.duration_since(self.last_save) >= every {
                self.save();
            }
        }
    }

    fn apply_events(&mut self, events: Vec<UiEvent>) {
        for event in events {
            match event {
                UiEvent::Edit { node, value } => {
                    self.dashboard.document_mut().set_value(node, &value);
                }
                UiEvent::Fire { node, kind, value } => {
                    let title = self
                        .dashboard
                        .document()
                        .binding_for(node, kind)
                        .and_then(|b| self.dashboard.get_widget(&b.widget))
                        .map(|card| card.title().to_string());
                    let outcome = self.dashboard.dispatch(node, kind, value.as_deref());
                    if outcome == CardOutcome::Close {
                        self.save();
                        self.notify(
                            ToastKind::Info,
                            format!("Widget \"{}\" removed", title.unwrap_or_default()),
                        );
                    }
                }
            }
        }
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        let (new_todo, escape) = ctx.input(|i| {
            (
                i.modifiers.command && i.key_pressed(egui::Key::N),
                i.key_pressed(egui::Key::Escape),
            )
        });
        if new_todo {
            self.add_widget(WidgetKind::Todo);
        }
        if escape && !self.confirm.is_open() {
            self.request_clear();
        }
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal_wrapped(|ui| {
            ui.heading("Dashboard");
            ui.separator();
            for kind in self.dashboard.registry().kinds() {
                if ui
                    .button(format!("{} {}", kind.emoji(), kind.label()))
                    .clicked()
                {
                    self.add_widget(kind);
                }
            }
            ui.separator();
            if ui.button("🗑 Clear all").clicked() {
                self.request_clear();
            }
            if ui.button("🔔 Notifications").clicked() {
                self.log_dialog.open();
            }
            ui.separator();
            let stats = self.dashboard.get_stats();
            let by_type = stats
                .widgets_by_type
                .iter()
                .map(|(kind, n)| format!("{kind}: {n}"))
                .collect::<Vec<_>>()
                .join(", ");
            ui.weak(format!("Widgets: {} {by_type}", stats.total_widgets));
        });
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        self.dashboard.run_pending(now);
        if self.enable_toasts {
            self.toasts.show(ctx);
        }
        if let Some(rect) = ctx.input(|i| i.viewport().inner_rect) {
            self.window_size = (rect.width() as i32, rect.height() as i32);
        }
        self.handle_shortcuts(ctx);

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| self.toolbar(ui));
        let events = egui::CentralPanel::default()
            .show(ctx, |ui| painter::paint_dashboard(ui, &self.dashboard))
            .inner;
        self.apply_events(events);

        if self.confirm.ui(ctx) == ConfirmationResult::Confirmed {
            if let Some(DestructiveAction::ClearDashboard) = self.confirm.take_confirmed() {
                self.dashboard.clear_all();
                self.save();
                self.notify(ToastKind::Success, "All widgets removed");
            }
        }
        self.log_dialog.ui(ctx);
        self.autosave(now);

        let wait = self
            .dashboard
            .next_deadline(Instant::now())
            .map_or(POLL_INTERVAL, |d| d.min(POLL_INTERVAL));
        ctx.request_repaint_after(wait);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.save();
        if let Ok(mut settings) = Settings::load(&self.settings_path) {
            settings.window_size = Some(self.window_size);
            if let Err(e) = settings.save(&self.settings_path) {
                tracing::warn!("failed to save settings: {e}");
            }
        }
        tracing::info!("dashboard closed");
    }
}
