use super::{Widget, WidgetContext, WidgetEvent, WidgetKind};
use crate::dashboard::error::DashboardError;
use crate::dom::{el, EventKind, Markup};
use crate::storage::{load_json, save_json, KeyValueStore};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::any::Any;
use std::sync::Arc;

fn default_max_length() -> usize {
    100
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: u64,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodoConfig {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default = "default_max_length")]
    pub max_length: usize,
}

impl Default for TodoConfig {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            max_length: default_max_length(),
        }
    }
}

/// Per-widget record kept under `todo-widget-<id>`.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TodoRecord {
    #[serde(default)]
    tasks: Vec<Task>,
    #[serde(default)]
    next_id: u64,
}

pub fn storage_key(widget_id: &str) -> String {
    format!("todo-widget-{widget_id}")
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub struct TodoWidget {
    tasks: Vec<Task>,
    next_id: u64,
    max_length: usize,
    store: Option<(Arc<dyn KeyValueStore>, String)>,
}

impl TodoWidget {
    pub fn new(cfg: TodoConfig) -> Result<Self, DashboardError> {
        if cfg.max_length == 0 {
            return Err(DashboardError::invalid_config(
                WidgetKind::Todo,
                "max_length must be positive",
            ));
        }
        let next_id = next_id_after(&cfg.tasks);
        Ok(Self {
            tasks: cfg.tasks,
            next_id,
            max_length: cfg.max_length,
            store: None,
        })
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.completed).count()
    }

    pub fn pending_count(&self) -> usize {
        self.tasks.iter().filter(|t| !t.completed).count()
    }

    /// Add a task. Blank text is rejected, long text is cut to the maximum
    /// input length. Returns the new task id.
    pub fn add_task(&mut self, text: &str) -> Option<u64> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let text: String = text.chars().take(self.max_length).collect();
        let id = self.next_id;
        self.next_id += 1;
        self.tasks.push(Task {
            id,
            text,
            completed: false,
            created_at: timestamp(),
            completed_at: None,
        });
        self.persist();
        Some(id)
    }

    pub fn remove_task(&mut self, id: u64) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        let removed = before != self.tasks.len();
        if removed {
            self.persist();
        }
        removed
    }

    pub fn toggle_task(&mut self, id: u64) -> bool {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            return false;
        };
        task.completed = !task.completed;
        task.completed_at = task.completed.then(timestamp);
        self.persist();
        true
    }

    pub fn clear_completed(&mut self) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| !t.completed);
        let removed = before - self.tasks.len();
        if removed > 0 {
            self.persist();
        }
        removed
    }

    fn persist(&self) {
        let Some((store, key)) = &self.store else {
            return;
        };
        let record = TodoRecord {
            tasks: self.tasks.clone(),
            next_id: self.next_id,
        };
        if let Err(e) = save_json(store.as_ref(), key, &record) {
            tracing::warn!(key = %key, "failed to save tasks: {e}");
        }
    }

    fn render_task(&self, task: &Task) -> Markup {
        el("div")
            .class("todo-widget__task")
            .class_if(task.completed, "todo-widget__task--completed")
            .attr("data-task-id", task.id.to_string())
            .row()
            .child(
                el("input")
                    .class("todo-widget__checkbox")
                    .attr("type", "checkbox")
                    .attr_if(task.completed, "checked", "checked")
                    .on(EventKind::Change, "toggle-task")
                    .arg(task.id),
            )
            .child(
                el("span")
                    .class("todo-widget__task-text")
                    .text(task.text.as_str()),
            )
            .child(
                el("button")
                    .class("todo-widget__delete-btn")
                    .attr("title", "Delete task")
                    .on(EventKind::Click, "remove-task")
                    .arg(task.id)
                    .text("🗑️"),
            )
            .into()
    }
}

fn next_id_after(tasks: &[Task]) -> u64 {
    tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1
}

impl Widget for TodoWidget {
    fn kind(&self) -> WidgetKind {
        WidgetKind::Todo
    }

    fn render_content(&self) -> Markup {
        let list: Markup = if self.tasks.is_empty() {
            el("div")
                .class("todo-widget__empty")
                .text("No tasks yet. Add the first one!")
                .into()
        } else {
            self.tasks
                .iter()
                .map(|t| self.render_task(t))
                .collect::<Vec<_>>()
                .into()
        };
        let stat = |label: &str, n: usize| {
            el("span")
                .class("todo-widget__stat")
                .text(format!("{label}: "))
                .child(el("strong").text(n.to_string()))
        };
        el("div")
            .class("todo-widget")
            .child(
                el("div")
                    .class("todo-widget__input")
                    .row()
                    .child(
                        el("input")
                            .class("todo-widget__input-field")
                            .attr("type", "text")
                            .attr("name", "task")
                            .attr("value", "")
                            .attr("placeholder", "Add a new task...")
                            .attr("maxlength", self.max_length.to_string())
                            .on(EventKind::Submit, "add-task"),
                    )
                    .child(
                        el("button")
                            .class("todo-widget__add-btn btn btn--primary")
                            .on(EventKind::Click, "add-task")
                            .text("Add"),
                    ),
            )
            .child(
                el("div")
                    .class("todo-widget__stats")
                    .row()
                    .child(stat("Total", self.tasks.len()))
                    .child(stat("Done", self.completed_count()))
                    .child(stat("Left", self.pending_count())),
            )
            .child(el("div").class("todo-widget__list").child(list))
            .child(if self.tasks.is_empty() {
                Markup::empty()
            } else {
                el("div")
                    .class("todo-widget__actions")
                    .child(
                        el("button")
                            .class("todo-widget__clear-btn btn btn--secondary")
                            .on(EventKind::Click, "clear-completed")
                            .text("Clear completed"),
                    )
                    .into()
            })
            .into()
    }

    fn initialize(&mut self, ctx: &mut WidgetContext<'_>) -> Result<(), DashboardError> {
        let key = storage_key(ctx.id());
        match load_json::<TodoRecord>(ctx.store().as_ref(), &key) {
            Ok(Some(record)) => {
                self.next_id = record.next_id.max(next_id_after(&record.tasks));
                self.tasks = record.tasks;
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(widget = %ctx.id(), "ignoring stored tasks: {e}"),
        }
        self.store = Some((Arc::clone(ctx.store()), key));
        Ok(())
    }

    fn handle_event(&mut self, event: &WidgetEvent, _ctx: &mut WidgetContext<'_>) -> bool {
        match event.action.as_str() {
            "add-task" => self.add_task(event.field("task").unwrap_or_default()).is_some(),
            "toggle-task" => event.arg_as::<u64>().is_some_and(|id| self.toggle_task(id)),
            "remove-task" => event.arg_as::<u64>().is_some_and(|id| self.remove_task(id)),
            "clear-completed" => self.clear_completed() > 0,
            _ => false,
        }
    }

    fn saved_config(&self) -> Value {
        json!({ "tasks": self.tasks })
    }

    fn on_destroy(&mut self, _ctx: &mut WidgetContext<'_>) {
        if let Some((store, key)) = self.store.take() {
            if let Err(e) = store.remove(&key) {
                tracing::warn!(key = %key, "failed to remove tasks: {e}");
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
