use crate::toast_log::{read_recent, TOAST_LOG_FILE};
use eframe::egui;
use std::path::Path;

const SHOWN_LINES: usize = 20;

#[derive(Default)]
pub struct NotificationLogDialog {
    pub open: bool,
    lines: Vec<String>,
}

impl NotificationLogDialog {
    pub fn open(&mut self) {
        self.lines = read_recent(Path::new(TOAST_LOG_FILE), SHOWN_LINES);
        self.open = true;
    }

    pub fn ui(&mut self, ctx: &egui::Context) {
        if !self.open {
            return;
        }
        let mut close = false;
        let mut refresh = false;
        egui::Window::new("Notifications")
            .resizable(true)
            .default_size((360.0, 200.0))
            .open(&mut self.open)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    if self.lines.is_empty() {
                        ui.weak("No notifications yet");
                    }
                    for line in &self.lines {
                        ui.label(line);
                    }
                });
                ui.horizontal(|ui| {
                    refresh = ui.button("Refresh").clicked();
                    close = ui.button("Close").clicked();
                });
            });
        if refresh {
            self.lines = read_recent(Path::new(TOAST_LOG_FILE), SHOWN_LINES);
        }
        if close {
            self.open = false;
        }
    }
}
