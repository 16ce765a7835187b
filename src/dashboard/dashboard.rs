use crate::dashboard::config::{DashboardState, SavedWidget};
use crate::dashboard::error::DashboardError;
use crate::dashboard::layout;
use crate::dashboard::widgets::{
    CardOutcome, WidgetCard, WidgetEnv, WidgetEvent, WidgetKind, WidgetRegistry,
};
use crate::dom::{el, Document, EventKind, NodeId};
use crate::net::Transport;
use crate::storage::KeyValueStore;
use crate::tasks::{Scheduler, TaskQueue};
use chrono::Utc;
use hashlink::LinkedHashMap;
use rand::Rng;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

const EMPTY_MESSAGE: &str = "Add widgets to get started";

/// Snapshot returned by [`Dashboard::get_stats`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_widgets: usize,
    pub widgets_by_type: BTreeMap<String, usize>,
}

/// Services lent to widgets. Kept apart from the document and the widget map
/// so both can be borrowed alongside it.
struct Runtime {
    store: Arc<dyn KeyValueStore>,
    transport: Arc<dyn Transport>,
    tasks: TaskQueue,
    scheduler: Scheduler,
}

impl Runtime {
    fn env(&mut self, now: Instant) -> WidgetEnv<'_> {
        WidgetEnv::new(
            &self.store,
            &self.transport,
            &self.tasks,
            &mut self.scheduler,
            now,
        )
    }
}

/// Container that mounts widget cards under one host node, lays them out and
/// persists them.
pub struct Dashboard {
    document: Document,
    host: Option<NodeId>,
    placeholder: Option<NodeId>,
    widgets: LinkedHashMap<String, WidgetCard>,
    counter: u64,
    columns: usize,
    registry: WidgetRegistry,
    runtime: Runtime,
}

impl Dashboard {
    pub fn new(
        registry: WidgetRegistry,
        store: Arc<dyn KeyValueStore>,
        transport: Arc<dyn Transport>,
        tasks: TaskQueue,
    ) -> Self {
        let mut document = Document::new();
        let host = document.create_element("div");
        document.add_class(host, "dashboard");
        let mut dashboard = Self {
            document,
            host: Some(host),
            placeholder: None,
            widgets: LinkedHashMap::new(),
            counter: 0,
            columns: 1,
            registry,
            runtime: Runtime {
                store,
                transport,
                tasks,
                scheduler: Scheduler::new(),
            },
        };
        dashboard.update_layout();
        dashboard.sync_placeholder();
        dashboard
    }

    /// Create, mount and initialize a widget of type `type_tag`.
    ///
    /// A `config.id` marks the restore path: the id is kept and the title
    /// counter is left alone. On failure nothing stays registered or mounted.
    pub fn add_widget(
        &mut self,
        type_tag: &str,
        config: Value,
    ) -> Result<&WidgetCard, DashboardError> {
        let Some(host) = self.host else {
            return Err(DashboardError::Destroyed);
        };
        let kind: WidgetKind = type_tag.parse()?;
        let mut config = match config {
            Value::Object(map) => map,
            _ => Default::default(),
        };
        let restored_id = config
            .remove("id")
            .and_then(|v| v.as_str().map(str::to_string))
            .filter(|id| !id.is_empty());
        let title = config
            .remove("title")
            .and_then(|v| v.as_str().map(str::to_string))
            .filter(|t| !t.trim().is_empty());
        let restoring = restored_id.is_some();
        let id = match restored_id {
            Some(id) if self.widgets.contains_key(&id) => {
                return Err(DashboardError::DuplicateWidgetId(id))
            }
            Some(id) => id,
            None => self.generate_id(),
        };
        let title = title.unwrap_or_else(|| kind.default_title(self.counter + 1));

        let widget = self.registry.create(kind.as_str(), &Value::Object(config))?;
        let mut card = WidgetCard::new(id.clone(), title, widget);
        let root = card
            .render(&mut self.document)
            .ok_or(DashboardError::Destroyed)?;
        self.document.append_child(host, root);
        self.hide_placeholder();

        let mut env = self.runtime.env(Instant::now());
        if let Err(e) = card.initialize(&mut self.document, &mut env) {
            card.destroy(&mut self.document, &mut env);
            self.sync_placeholder();
            tracing::warn!(widget = %id, kind = %kind, "widget failed to initialize: {e}");
            return Err(e);
        }

        if !restoring {
            self.counter += 1;
        }
        self.columns = layout::apply(&mut self.document, host, self.widgets.len() + 1);
        tracing::info!(widget = %id, kind = %kind, restoring, "widget added");
        // vacant: duplicates were rejected before mounting
        let card: &WidgetCard = self.widgets.entry(id).or_insert(card);
        Ok(card)
    }

    /// Destroy and unregister `id`. False if there is no such widget.
    pub fn remove_widget(&mut self, id: &str) -> bool {
        let Some(mut card) = self.widgets.remove(id) else {
            tracing::warn!(widget = %id, "remove requested for unknown widget");
            return false;
        };
        let mut env = self.runtime.env(Instant::now());
        card.destroy(&mut self.document, &mut env);
        self.update_layout();
        self.sync_placeholder();
        tracing::info!(widget = %id, kind = %card.kind(), "widget removed");
        true
    }

    /// Recompute the grid for the current widget count.
    pub fn update_layout(&mut self) -> usize {
        self.columns = match self.host {
            Some(host) => layout::apply(&mut self.document, host, self.widgets.len()),
            None => layout::column_count(self.widgets.len()),
        };
        self.columns
    }

    pub fn save_to_storage(&self) -> Result<(), DashboardError> {
        let state = DashboardState {
            widgets: self
                .widgets
                .values()
                .map(|card| SavedWidget {
                    id: card.id().to_string(),
                    kind: card.kind().as_str().to_string(),
                    title: card.title().to_string(),
                    config: card.saved_config(),
                })
                .collect(),
            counter: self.counter,
        };
        state.save(self.runtime.store.as_ref())?;
        tracing::debug!(widgets = state.widgets.len(), "dashboard saved");
        Ok(())
    }

    /// Restore the saved widgets in order. Returns how many came back.
    pub fn load_from_storage(&mut self) -> usize {
        if self.host.is_none() {
            return 0;
        }
        let Some(state) = DashboardState::load(self.runtime.store.as_ref()) else {
            tracing::debug!("no saved dashboard");
            return 0;
        };
        self.counter = state.counter;
        let mut restored = 0;
        for saved in &state.widgets {
            match self.add_widget(&saved.kind, saved.restore_config()) {
                Ok(_) => restored += 1,
                Err(e) => {
                    tracing::warn!(widget = %saved.id, kind = %saved.kind, "skipping saved widget: {e}")
                }
            }
        }
        tracing::info!(restored, saved = state.widgets.len(), "dashboard restored");
        restored
    }

    pub fn get_stats(&self) -> DashboardStats {
        let mut widgets_by_type = BTreeMap::new();
        for card in self.widgets.values() {
            *widgets_by_type
                .entry(card.kind().as_str().to_string())
                .or_insert(0) += 1;
        }
        DashboardStats {
            total_widgets: self.widgets.len(),
            widgets_by_type,
        }
    }

    pub fn clear_all(&mut self) {
        let ids: Vec<String> = self.widgets.keys().cloned().collect();
        for id in ids {
            self.remove_widget(&id);
        }
    }

    /// Remove every widget and release the host node. Idempotent.
    pub fn destroy(&mut self) {
        let Some(host) = self.host else {
            return;
        };
        self.clear_all();
        self.document.remove(host);
        self.host = None;
        self.placeholder = None;
        tracing::debug!("dashboard destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.host.is_none()
    }

    pub fn get_widget(&self, id: &str) -> Option<&WidgetCard> {
        self.widgets.get(id)
    }

    /// Cards in insertion order.
    pub fn widgets(&self) -> impl Iterator<Item = &WidgetCard> {
        self.widgets.values()
    }

    pub fn widgets_by_type(&self, kind: WidgetKind) -> Vec<&WidgetCard> {
        self.widgets.values().filter(|c| c.kind() == kind).collect()
    }

    pub fn widget_as<T: 'static>(&self, id: &str) -> Option<&T> {
        self.widgets.get(id)?.widget_as::<T>()
    }

    /// Run `f` against the concrete widget and re-render its card.
    pub fn with_widget<T: 'static, R>(&mut self, id: &str, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let card = self.widgets.get_mut(id)?;
        let out = f(card.widget_as_mut::<T>()?);
        card.update(&mut self.document);
        Some(out)
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    pub fn counter(&self) -> u64 {
        self.counter
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn host(&self) -> Option<NodeId> {
        self.host
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Mutable access for front ends that edit input values in place.
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn registry(&self) -> &WidgetRegistry {
        &self.registry
    }

    pub fn toggle_minimize(&mut self, id: &str) -> Option<bool> {
        let card = self.widgets.get_mut(id)?;
        card.toggle_minimize(&mut self.document);
        Some(card.is_minimized())
    }

    /// Deliver `event` straight to the widget `id`.
    pub fn send_event(&mut self, id: &str, event: &WidgetEvent) -> CardOutcome {
        let Some(card) = self.widgets.get_mut(id) else {
            tracing::warn!(widget = %id, action = %event.action, "event for unknown widget");
            return CardOutcome::Ignored;
        };
        let mut env = self.runtime.env(Instant::now());
        card.handle_event(event, &mut self.document, &mut env)
    }

    /// Route a UI event on `node` to the widget owning the listener. `value`
    /// is written to the node first, the way a form control would.
    pub fn dispatch(&mut self, node: NodeId, kind: EventKind, value: Option<&str>) -> CardOutcome {
        if let Some(value) = value {
            self.document.set_value(node, value);
        }
        let Some(binding) = self.document.binding_for(node, kind).cloned() else {
            return CardOutcome::Ignored;
        };
        let Some(card) = self.widgets.get_mut(&binding.widget) else {
            return CardOutcome::Ignored;
        };
        let mut env = self.runtime.env(Instant::now());
        let outcome = card.handle(&binding, &mut self.document, &mut env);
        if outcome == CardOutcome::Close {
            self.remove_widget(&binding.widget);
        }
        outcome
    }

    /// Hand finished fetches to their widgets. Returns how many were
    /// delivered.
    pub fn poll(&mut self) -> usize {
        let mut delivered = 0;
        for done in self.runtime.tasks.drain() {
            let Some(card) = self.widgets.get_mut(&done.widget) else {
                tracing::debug!(widget = %done.widget, "dropping result for removed widget");
                continue;
            };
            let mut env = self.runtime.env(Instant::now());
            card.on_completion(done, &mut self.document, &mut env);
            delivered += 1;
        }
        delivered
    }

    /// Fire refresh timers due at `now`.
    pub fn tick(&mut self, now: Instant) -> usize {
        let due = self.runtime.scheduler.due(now);
        let fired = due.len();
        for (owner, handle) in due {
            if let Some(card) = self.widgets.get_mut(&owner) {
                let mut env = self.runtime.env(now);
                card.on_timer(handle, &mut self.document, &mut env);
            }
        }
        fired
    }

    /// Timers then completions; what a frame loop calls once per frame.
    pub fn run_pending(&mut self, now: Instant) -> usize {
        let fired = self.tick(now);
        fired + self.poll()
    }

    /// Time until the next refresh timer is due.
    pub fn next_deadline(&self, now: Instant) -> Option<Duration> {
        self.runtime.scheduler.next_deadline(now)
    }

    pub fn active_timers(&self) -> usize {
        self.runtime.scheduler.len()
    }

    fn generate_id(&self) -> String {
        const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
        let mut rng = rand::thread_rng();
        loop {
            let suffix: String = (0..9)
                .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
                .collect();
            let id = format!("widget-{}-{suffix}", Utc::now().timestamp_millis());
            if !self.widgets.contains_key(&id) {
                return id;
            }
        }
    }

    fn hide_placeholder(&mut self) {
        if let Some(node) = self.placeholder.take() {
            self.document.remove(node);
        }
    }

    fn sync_placeholder(&mut self) {
        let Some(host) = self.host else {
            return;
        };
        if !self.widgets.is_empty() {
            self.hide_placeholder();
            return;
        }
        if self.placeholder.is_some() {
            return;
        }
        let built = self
            .document
            .build(&el("div").class("dashboard__empty").text(EMPTY_MESSAGE).into());
        if let Some(node) = built.into_iter().next() {
            self.document.append_child(host, node);
            self.placeholder = Some(node);
        }
    }
}
