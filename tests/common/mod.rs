#![allow(dead_code)]

use serde_json::Value;
use std::sync::{Arc, Mutex};
use widget_dashboard::dashboard::{Dashboard, WidgetRegistry};
use widget_dashboard::dom::{Document, NodeId};
use widget_dashboard::net::{Transport, TransportError};
use widget_dashboard::storage::{KeyValueStore, MemoryStore};
use widget_dashboard::tasks::TaskQueue;

/// Transport answering from a list of `(url fragment, response)` routes.
/// Unrouted URLs fail like an unreachable host.
#[derive(Default)]
pub struct FakeTransport {
    routes: Mutex<Vec<(String, Result<Value, TransportError>)>>,
    calls: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn offline() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, fragment: &str, response: Result<Value, TransportError>) {
        self.routes
            .lock()
            .unwrap()
            .insert(0, (fragment.to_string(), response));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Transport for FakeTransport {
    fn get_json(&self, url: &str) -> Result<Value, TransportError> {
        self.calls.lock().unwrap().push(url.to_string());
        self.routes
            .lock()
            .unwrap()
            .iter()
            .find(|(fragment, _)| url.contains(fragment.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| Err(TransportError::Request("connection refused".into())))
    }
}

pub struct Harness {
    pub dashboard: Dashboard,
    pub store: Arc<MemoryStore>,
    pub transport: Arc<FakeTransport>,
}

pub fn harness() -> Harness {
    harness_with(Arc::new(MemoryStore::new()), FakeTransport::offline())
}

pub fn harness_with(store: Arc<MemoryStore>, transport: Arc<FakeTransport>) -> Harness {
    let dashboard = Dashboard::new(
        WidgetRegistry::with_defaults(),
        store.clone() as Arc<dyn KeyValueStore>,
        transport.clone() as Arc<dyn Transport>,
        TaskQueue::inline(),
    );
    Harness {
        dashboard,
        store,
        transport,
    }
}

/// Add a widget and deliver its first fetch. Returns the new id.
pub fn add(h: &mut Harness, tag: &str, config: Value) -> String {
    let id = h.dashboard.add_widget(tag, config).unwrap().id().to_string();
    h.dashboard.poll();
    id
}

pub fn root_of(h: &Harness, id: &str) -> NodeId {
    h.dashboard.get_widget(id).unwrap().root().unwrap()
}

pub fn find(doc: &Document, root: NodeId, class: &str) -> NodeId {
    doc.find_by_class(root, class)
        .unwrap_or_else(|| panic!("no .{class} under the widget"))
}

pub fn text_of(h: &Harness, id: &str) -> String {
    h.dashboard.document().text_content(root_of(h, id))
}
