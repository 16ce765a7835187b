use eframe::egui;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationResult {
    None,
    Confirmed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestructiveAction {
    ClearDashboard,
}

impl DestructiveAction {
    pub fn label(self) -> &'static str {
        match self {
            Self::ClearDashboard => "Remove every widget from the dashboard?",
        }
    }

    pub fn warning(self) -> &'static str {
        "This action cannot be undone."
    }
}

#[derive(Debug, Clone)]
pub struct ConfirmationModal {
    open: bool,
    pending: Option<DestructiveAction>,
    title: String,
    description: String,
    warning: String,
}

impl Default for ConfirmationModal {
    fn default() -> Self {
        Self {
            open: false,
            pending: None,
            title: "Confirm destructive action".into(),
            description: String::new(),
            warning: "This action cannot be undone.".into(),
        }
    }
}

impl ConfirmationModal {
    pub fn open_for(&mut self, kind: DestructiveAction) {
        self.description = kind.label().into();
        self.warning = kind.warning().into();
        self.pending = Some(kind);
        self.open = true;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn ui(&mut self, ctx: &egui::Context) -> ConfirmationResult {
        if !self.open {
            return ConfirmationResult::None;
        }
        let mut result = ConfirmationResult::None;
        let mut open = true;
        egui::Window::new(self.title.clone())
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .open(&mut open)
            .show(ctx, |ui| {
                if !self.description.is_empty() {
                    ui.label(&self.description);
                }
                ui.colored_label(egui::Color32::YELLOW, &self.warning);
                ui.horizontal(|ui| {
                    if ui.button("Confirm").clicked() {
                        result = ConfirmationResult::Confirmed;
                    }
                    if ui.button("Cancel").clicked() {
                        result = ConfirmationResult::Cancelled;
                    }
                });
            });
        if !open && result == ConfirmationResult::None {
            result = ConfirmationResult::Cancelled;
        }
        if result != ConfirmationResult::None {
            self.open = false;
        }
        if result == ConfirmationResult::Cancelled {
            self.pending = None;
        }
        result
    }

    /// Hand over the confirmed action, clearing it.
    pub fn take_confirmed(&mut self) -> Option<DestructiveAction> {
        if self.open {
            return None;
        }
        self.pending.take()
    }
}
