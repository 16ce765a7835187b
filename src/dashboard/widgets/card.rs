use super::{Widget, WidgetContext, WidgetEnv, WidgetEvent, WidgetKind};
use crate::dashboard::error::DashboardError;
use crate::dom::{el, Binding, Document, EventKind, NodeId};
use crate::tasks::{CancelToken, Completion, TaskHandle};

/// What the dashboard has to do after a card handled an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardOutcome {
    Handled,
    /// The close control was used; the dashboard should remove the card.
    Close,
    Ignored,
}

/// The chrome around a widget: root node, header controls and the content
/// region the widget renders into.
pub struct WidgetCard {
    id: String,
    title: String,
    kind: WidgetKind,
    root: Option<NodeId>,
    content: Option<NodeId>,
    minimize_btn: Option<NodeId>,
    minimized: bool,
    destroyed: bool,
    cancel: CancelToken,
    widget: Box<dyn Widget>,
}

impl WidgetCard {
    pub fn new(id: String, title: String, widget: Box<dyn Widget>) -> Self {
        Self {
            id,
            title,
            kind: widget.kind(),
            root: None,
            content: None,
            minimize_btn: None,
            minimized: false,
            destroyed: false,
            cancel: CancelToken::new(),
            widget,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn kind(&self) -> WidgetKind {
        self.kind
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn content(&self) -> Option<NodeId> {
        self.content
    }

    pub fn is_mounted(&self, doc: &Document) -> bool {
        self.root.is_some_and(|r| doc.parent(r).is_some())
    }

    pub fn is_minimized(&self) -> bool {
        self.minimized
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn widget(&self) -> &dyn Widget {
        self.widget.as_ref()
    }

    pub fn widget_as<T: 'static>(&self) -> Option<&T> {
        self.widget.as_any().downcast_ref::<T>()
    }

    pub(crate) fn widget_as_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.widget.as_any_mut().downcast_mut::<T>()
    }

    /// Build the card subtree on first call; later calls return the same root.
    pub fn render(&mut self, doc: &mut Document) -> Option<NodeId> {
        if self.destroyed {
            return None;
        }
        if let Some(root) = self.root {
            return Some(root);
        }
        let shell = el("div")
            .class("widget")
            .class(&format!("widget--{}", self.kind))
            .attr("data-widget-id", self.id.as_str())
            .attr("data-type", self.kind.as_str())
            .child(
                el("div")
                    .class("widget__header")
                    .row()
                    .child(el("h3").class("widget__title").text(self.title.as_str()))
                    .child(
                        el("div")
                            .class("widget__controls")
                            .row()
                            .child(
                                el("button")
                                    .class("widget__btn widget__btn--minimize")
                                    .attr("title", "Minimize")
                                    .on(EventKind::Click, "minimize")
                                    .text("−"),
                            )
                            .child(
                                el("button")
                                    .class("widget__btn widget__btn--close")
                                    .attr("title", "Close")
                                    .on(EventKind::Click, "close")
                                    .text("×"),
                            ),
                    ),
            )
            .child(
                el("div")
                    .class("widget__content")
                    .child(self.widget.render_content()),
            );
        let root = doc.build(&shell.into()).into_iter().next()?;
        self.content = doc.find_by_class(root, "widget__content");
        self.minimize_btn = doc.find_by_class(root, "widget__btn--minimize");
        doc.attach_listeners(root, &self.id);
        self.root = Some(root);
        tracing::debug!(widget = %self.id, kind = %self.kind, "widget rendered");
        Some(root)
    }

    /// Re-render the content region. No-op unless mounted and expanded.
    pub fn update(&mut self, doc: &mut Document) -> bool {
        if self.destroyed || self.minimized || !self.is_mounted(doc) {
            return false;
        }
        let Some(content) = self.content else {
            return false;
        };
        doc.replace_children(content, &self.widget.render_content());
        doc.attach_listeners(content, &self.id);
        true
    }

    pub fn initialize(
        &mut self,
        doc: &mut Document,
        env: &mut WidgetEnv<'_>,
    ) -> Result<(), DashboardError> {
        if self.destroyed {
            return Err(DashboardError::Destroyed);
        }
        let mut ctx = WidgetContext::new(&self.id, &self.cancel, env);
        self.widget.initialize(&mut ctx)?;
        self.update(doc);
        Ok(())
    }

    pub fn toggle_minimize(&mut self, doc: &mut Document) {
        if self.destroyed {
            return;
        }
        self.minimized = !self.minimized;
        if let Some(content) = self.content {
            doc.set_hidden(content, self.minimized);
        }
        if let Some(btn) = self.minimize_btn {
            doc.set_text(btn, if self.minimized { "+" } else { "−" });
        }
        if let Some(root) = self.root {
            if self.minimized {
                doc.add_class(root, "widget--minimized");
            } else {
                doc.remove_class(root, "widget--minimized");
            }
        }
        if !self.minimized {
            self.update(doc);
        }
    }

    pub fn show(&mut self, doc: &mut Document) {
        if let Some(root) = self.root {
            doc.set_hidden(root, false);
        }
    }

    pub fn hide(&mut self, doc: &mut Document) {
        if let Some(root) = self.root {
            doc.set_hidden(root, true);
        }
    }

    /// Route a listener binding to the card controls or the widget.
    pub fn handle(
        &mut self,
        binding: &Binding,
        doc: &mut Document,
        env: &mut WidgetEnv<'_>,
    ) -> CardOutcome {
        if self.destroyed {
            return CardOutcome::Ignored;
        }
        match binding.action.as_str() {
            "close" => CardOutcome::Close,
            "minimize" => {
                self.toggle_minimize(doc);
                CardOutcome::Handled
            }
            action => {
                let form = self
                    .content
                    .map(|c| doc.form_values(c))
                    .unwrap_or_default();
                let event = WidgetEvent {
                    action: action.to_string(),
                    arg: binding.arg.clone(),
                    form,
                };
                self.handle_event(&event, doc, env)
            }
        }
    }

    pub fn handle_event(
        &mut self,
        event: &WidgetEvent,
        doc: &mut Document,
        env: &mut WidgetEnv<'_>,
    ) -> CardOutcome {
        if self.destroyed {
            return CardOutcome::Ignored;
        }
        let mut ctx = WidgetContext::new(&self.id, &self.cancel, env);
        if self.widget.handle_event(event, &mut ctx) {
            self.update(doc);
            CardOutcome::Handled
        } else {
            CardOutcome::Ignored
        }
    }

    pub fn on_timer(&mut self, timer: TaskHandle, doc: &mut Document, env: &mut WidgetEnv<'_>) {
        if self.destroyed {
            return;
        }
        let mut ctx = WidgetContext::new(&self.id, &self.cancel, env);
        if self.widget.on_timer(timer, &mut ctx) {
            self.update(doc);
        }
    }

    pub fn on_completion(&mut self, done: Completion, doc: &mut Document, env: &mut WidgetEnv<'_>) {
        if self.destroyed || self.cancel.is_cancelled() {
            return;
        }
        let mut ctx = WidgetContext::new(&self.id, &self.cancel, env);
        if self.widget.on_fetch_complete(done, &mut ctx) {
            self.update(doc);
        }
    }

    /// Tear the card down. Returns false if it was already destroyed.
    pub fn destroy(&mut self, doc: &mut Document, env: &mut WidgetEnv<'_>) -> bool {
        if self.destroyed {
            return false;
        }
        self.destroyed = true;
        self.cancel.cancel();
        let timers = env.scheduler.cancel_owner(&self.id);
        if let Some(root) = self.root.take() {
            doc.detach_listeners(root);
            doc.remove(root);
        }
        self.content = None;
        self.minimize_btn = None;
        let mut ctx = WidgetContext::new(&self.id, &self.cancel, env);
        self.widget.on_destroy(&mut ctx);
        tracing::debug!(widget = %self.id, timers, "widget destroyed");
        true
    }

    pub fn saved_config(&self) -> serde_json::Value {
        self.widget.saved_config()
    }
}
