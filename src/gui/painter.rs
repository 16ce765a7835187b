//! Paints the dashboard document with egui.
//!
//! Painting only reads the document. Interactions are collected as
//! [`UiEvent`]s and applied by the app once the frame is laid out.

use crate::dashboard::{layout, Dashboard};
use crate::dom::{Document, EventKind, NodeId};
use eframe::egui::{self, Color32, RichText};

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// A text input was edited.
    Edit { node: NodeId, value: String },
    /// A listener should fire, optionally setting the control value first.
    Fire {
        node: NodeId,
        kind: EventKind,
        value: Option<String>,
    },
}

pub fn paint_dashboard(ui: &mut egui::Ui, dashboard: &Dashboard) -> Vec<UiEvent> {
    let mut events = Vec::new();
    let Some(host) = dashboard.host() else {
        return events;
    };
    let doc = dashboard.document();
    let cards: Vec<NodeId> = doc
        .children(host)
        .iter()
        .copied()
        .filter(|n| !doc.is_hidden(*n))
        .collect();
    let columns = dashboard.columns().max(1);
    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui| {
            for row in layout::rows(&cards, columns) {
                ui.columns(columns, |cols| {
                    for (col, node) in cols.iter_mut().zip(row) {
                        paint_node(col, doc, *node, &mut events);
                    }
                });
                ui.add_space(8.0);
            }
        });
    events
}

pub fn paint_node(ui: &mut egui::Ui, doc: &Document, node: NodeId, events: &mut Vec<UiEvent>) {
    if doc.is_hidden(node) {
        return;
    }
    let Some(tag) = doc.tag(node) else {
        if let Some(text) = doc.text(node).filter(|t| !t.trim().is_empty()) {
            ui.label(styled(doc, node, text));
        }
        return;
    };
    match tag {
        "button" => {
            let text = doc.text_content(node);
            let resp = ui.add_enabled(!doc.is_disabled(node), egui::Button::new(text));
            if let Some(title) = doc.attr(node, "title") {
                resp.clone().on_hover_text(title);
            }
            if resp.clicked() {
                events.push(UiEvent::Fire {
                    node,
                    kind: EventKind::Click,
                    value: None,
                });
            }
        }
        "input" if doc.attr(node, "type") == Some("checkbox") => {
            let mut checked = doc.is_checked(node);
            if ui.checkbox(&mut checked, "").changed() {
                events.push(UiEvent::Fire {
                    node,
                    kind: EventKind::Change,
                    value: None,
                });
            }
        }
        "input" => paint_text_input(ui, doc, node, events),
        "select" => paint_select(ui, doc, node, events),
        "h3" => {
            ui.heading(doc.text_content(node));
        }
        "h4" => {
            ui.label(RichText::new(doc.text_content(node)).strong());
        }
        "small" => {
            ui.label(styled(doc, node, &doc.text_content(node)).small());
        }
        _ if is_plain_text(doc, node) && tag != "div" => {
            let text = doc.text_content(node);
            if !text.trim().is_empty() {
                ui.label(styled(doc, node, &text));
            }
        }
        _ => paint_container(ui, doc, node, events),
    }
}

fn paint_container(ui: &mut egui::Ui, doc: &Document, node: NodeId, events: &mut Vec<UiEvent>) {
    let children = doc.children(node).to_vec();
    let body = |ui: &mut egui::Ui, events: &mut Vec<UiEvent>| {
        if doc.attr(node, "data-layout") == Some("row") {
            ui.horizontal_wrapped(|ui| {
                for child in &children {
                    paint_node(ui, doc, *child, events);
                }
            });
        } else {
            ui.vertical(|ui| {
                for child in &children {
                    paint_node(ui, doc, *child, events);
                }
            });
        }
    };
    if doc.has_class(node, "widget") {
        egui::Frame::group(ui.style()).show(ui, |ui| {
            ui.set_width(ui.available_width());
            body(ui, events);
        });
    } else {
        body(ui, events);
    }
}

fn paint_text_input(ui: &mut egui::Ui, doc: &Document, node: NodeId, events: &mut Vec<UiEvent>) {
    let mut text = doc.value(node).to_string();
    let mut edit = egui::TextEdit::singleline(&mut text)
        .id(egui::Id::new(("dashboard-input", node)))
        .desired_width(160.0);
    if let Some(hint) = doc.attr(node, "placeholder") {
        edit = edit.hint_text(hint);
    }
    if let Some(max) = doc.attr(node, "maxlength").and_then(|m| m.parse().ok()) {
        edit = edit.char_limit(max);
    }
    let resp = ui.add(edit);
    if resp.changed() {
        events.push(UiEvent::Edit {
            node,
            value: text.clone(),
        });
    }
    if resp.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
        events.push(UiEvent::Fire {
            node,
            kind: EventKind::Submit,
            value: Some(text),
        });
    }
}

fn paint_select(ui: &mut egui::Ui, doc: &Document, node: NodeId, events: &mut Vec<UiEvent>) {
    let current = doc.value(node).to_string();
    let options: Vec<(String, String)> = doc
        .children(node)
        .iter()
        .filter(|c| doc.tag(**c) == Some("option"))
        .map(|c| {
            let value = doc.attr(*c, "value").unwrap_or_default().to_string();
            (value, doc.text_content(*c))
        })
        .collect();
    let selected = options
        .iter()
        .find(|(v, _)| *v == current)
        .map(|(_, label)| label.clone())
        .unwrap_or_else(|| current.clone());
    egui::ComboBox::from_id_source(("dashboard-select", node))
        .selected_text(selected)
        .show_ui(ui, |ui| {
            for (value, label) in &options {
                if ui.selectable_label(*value == current, label).clicked() && *value != current {
                    events.push(UiEvent::Fire {
                        node,
                        kind: EventKind::Change,
                        value: Some(value.clone()),
                    });
                }
            }
        });
}

fn is_plain_text(doc: &Document, node: NodeId) -> bool {
    doc.descendants(node)
        .into_iter()
        .all(|id| !matches!(doc.tag(id), Some("button" | "input" | "select")))
}

fn styled(doc: &Document, node: NodeId, text: &str) -> RichText {
    let owner = match doc.tag(node) {
        Some(_) => Some(node),
        None => doc.parent(node),
    };
    let has_suffix = |suffix: &str| {
        owner.is_some_and(|n| doc.classes(n).iter().any(|c| c.ends_with(suffix)))
    };
    let text = RichText::new(text);
    if has_suffix("--positive") {
        text.color(Color32::from_rgb(40, 167, 69))
    } else if has_suffix("--negative") || has_suffix("__error-message") {
        text.color(Color32::from_rgb(220, 53, 69))
    } else if has_suffix("__temperature") {
        text.size(28.0).strong()
    } else if has_suffix("__text") {
        text.italics()
    } else {
        text
    }
}
