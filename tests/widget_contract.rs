mod common;

use common::{add, find, harness, harness_with, root_of, FakeTransport};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use widget_dashboard::dashboard::widgets::{CryptoWidget, QuoteWidget, WidgetEnv};
use widget_dashboard::dashboard::{CardOutcome, WidgetCard, WidgetEvent, WidgetKind, WidgetRegistry};
use widget_dashboard::dom::{Document, EventKind};
use widget_dashboard::net::{Transport, TransportError};
use widget_dashboard::storage::{KeyValueStore, MemoryStore};
use widget_dashboard::tasks::{Scheduler, TaskQueue};

#[test]
fn destroy_is_idempotent_for_every_widget_type() {
    let registry = WidgetRegistry::with_defaults();
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let transport: Arc<dyn Transport> = FakeTransport::offline();
    let tasks = TaskQueue::inline();
    let mut scheduler = Scheduler::new();
    for kind in WidgetKind::ALL {
        let mut doc = Document::new();
        let host = doc.create_element("div");
        let widget = registry.create(kind.as_str(), &Value::Null).unwrap();
        let mut card = WidgetCard::new(format!("w-{kind}"), kind.default_title(1), widget);
        let root = card.render(&mut doc).unwrap();
        doc.append_child(host, root);
        let mut env = WidgetEnv::new(&store, &transport, &tasks, &mut scheduler, Instant::now());
        card.initialize(&mut doc, &mut env).unwrap();

        assert!(card.destroy(&mut doc, &mut env), "{kind}");
        assert!(!card.destroy(&mut doc, &mut env), "{kind}");
        assert!(card.is_destroyed());
        assert!(!doc.contains(root));
        assert_eq!(doc.listener_count(), 0);

        let nodes = doc.node_count();
        assert!(!card.update(&mut doc));
        assert!(card.render(&mut doc).is_none());
        assert_eq!(doc.node_count(), nodes);
        assert_eq!(scheduler.active_for(card.id()), 0);
    }
    let _ = tasks.drain();
}

#[test]
fn rerenders_keep_root_and_do_not_double_listeners() {
    let mut h = harness();
    let id = add(&mut h, "todo", json!({}));
    let listeners = h.dashboard.document().listener_count();
    let root = root_of(&h, &id);
    for _ in 0..3 {
        h.dashboard
            .send_event(&id, &WidgetEvent::new("add-task").with_field("task", "x"));
    }
    let card = h.dashboard.get_widget(&id).unwrap();
    assert_eq!(card.root(), Some(root));
    // three task rows, each with a checkbox and a delete button, plus the
    // clear button that appears once there are tasks
    assert_eq!(h.dashboard.document().listener_count(), listeners + 3 * 2 + 1);
}

#[test]
fn update_only_replaces_the_content_region() {
    let mut h = harness();
    let id = add(&mut h, "todo", json!({}));
    let root = root_of(&h, &id);
    let doc = h.dashboard.document();
    let title = find(doc, root, "widget__title");
    let content = find(doc, root, "widget__content");
    h.dashboard
        .send_event(&id, &WidgetEvent::new("add-task").with_field("task", "Buy milk"));
    let doc = h.dashboard.document();
    assert!(doc.contains(title));
    assert_eq!(find(doc, root, "widget__content"), content);
    assert!(doc.text_content(content).contains("Buy milk"));
}

#[test]
fn minimize_hides_content_and_restore_rerenders() {
    let mut h = harness();
    let id = add(&mut h, "todo", json!({}));
    let root = root_of(&h, &id);
    let (content, button) = {
        let doc = h.dashboard.document();
        (find(doc, root, "widget__content"), find(doc, root, "widget__btn--minimize"))
    };

    assert_eq!(
        h.dashboard.dispatch(button, EventKind::Click, None),
        CardOutcome::Handled
    );
    {
        let doc = h.dashboard.document();
        assert!(doc.is_hidden(content));
        assert_eq!(doc.text_content(button), "+");
        assert!(doc.has_class(root, "widget--minimized"));
    }

    h.dashboard
        .send_event(&id, &WidgetEvent::new("add-task").with_field("task", "while hidden"));
    assert!(!h.dashboard.document().text_content(content).contains("while hidden"));

    assert_eq!(h.dashboard.toggle_minimize(&id), Some(false));
    let doc = h.dashboard.document();
    assert!(!doc.is_hidden(content));
    assert_eq!(doc.text_content(button), "−");
    assert!(!doc.has_class(root, "widget--minimized"));
    assert!(doc.text_content(content).contains("while hidden"));
}

#[test]
fn render_is_idempotent_and_show_hide_toggle_the_card() {
    let mut doc = Document::new();
    let widget = WidgetRegistry::with_defaults()
        .create("quote", &json!({}))
        .unwrap();
    let mut card = WidgetCard::new("solo".into(), "Solo".into(), widget);
    let root = card.render(&mut doc).unwrap();
    let listeners = doc.listener_count();
    let nodes = doc.node_count();
    assert_eq!(card.render(&mut doc), Some(root));
    assert_eq!(doc.listener_count(), listeners);
    assert_eq!(doc.node_count(), nodes);
    assert!(!card.is_mounted(&doc));

    card.hide(&mut doc);
    assert!(doc.is_hidden(root));
    card.show(&mut doc);
    assert!(!doc.is_hidden(root));
}

/// Transport that reports each request it sees and always fails.
struct Counting(std::sync::Mutex<usize>);

impl Transport for Counting {
    fn get_json(&self, _url: &str) -> Result<Value, TransportError> {
        *self.0.lock().unwrap() += 1;
        Err(TransportError::Status(503))
    }
}

#[test]
fn triggers_while_loading_are_discarded() {
    let counting = Arc::new(Counting(Default::default()));
    let mut dashboard = widget_dashboard::Dashboard::new(
        WidgetRegistry::with_defaults(),
        Arc::new(MemoryStore::new()),
        counting.clone(),
        TaskQueue::inline(),
    );
    let id = dashboard
        .add_widget("crypto", json!({}))
        .unwrap()
        .id()
        .to_string();
    // first fetch is still undelivered: the widget counts as loading
    assert!(dashboard.widget_as::<CryptoWidget>(&id).unwrap().is_loading());
    dashboard.send_event(&id, &WidgetEvent::new("refresh"));
    dashboard.send_event(&id, &WidgetEvent::new("refresh"));
    assert_eq!(*counting.0.lock().unwrap(), 1);

    assert_eq!(dashboard.poll(), 1);
    let crypto = dashboard.widget_as::<CryptoWidget>(&id).unwrap();
    assert!(!crypto.is_loading());
    assert_eq!(crypto.error(), Some("http status 503"));

    dashboard.send_event(&id, &WidgetEvent::new("refresh"));
    assert_eq!(*counting.0.lock().unwrap(), 2);
}

#[test]
fn completions_after_removal_are_dropped() {
    let mut h = harness();
    let id = h.dashboard.add_widget("quote", json!({})).unwrap().id().to_string();
    assert!(h.dashboard.remove_widget(&id));
    assert_eq!(h.dashboard.poll(), 0);
}

#[test]
fn refresh_timers_fire_through_tick() {
    let transport = FakeTransport::offline();
    let mut h = harness_with(Arc::new(MemoryStore::new()), transport.clone());
    let id = add(&mut h, "quote", json!({"refresh_secs": 60, "mock_data": "never"}));
    assert_eq!(transport.calls().len(), 1);

    let start = Instant::now();
    assert_eq!(h.dashboard.tick(start), 0);
    assert_eq!(h.dashboard.run_pending(start + Duration::from_secs(61)), 2);
    assert_eq!(transport.calls().len(), 2);
    assert!(h.dashboard.widget_as::<QuoteWidget>(&id).unwrap().error().is_some());

    h.dashboard.remove_widget(&id);
    assert_eq!(h.dashboard.tick(start + Duration::from_secs(600)), 0);
    assert_eq!(transport.calls().len(), 2);
}
