//! Arena backed document tree that widgets render into.
//!
//! Nodes live in a [`Slab`]; a [`NodeId`] stays valid until the node (or one
//! of its ancestors) is removed. Listeners are declared in [`Markup`] through
//! `data-on-*` attributes and registered per `(node, event)` pair, so
//! attaching the same subtree twice never produces duplicate handlers.

mod markup;

pub use markup::{el, Element, Markup};

use slab::Slab;
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Click,
    Change,
    Submit,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [EventKind::Click, EventKind::Change, EventKind::Submit];

    pub fn attr_name(self) -> &'static str {
        match self {
            EventKind::Click => "data-on-click",
            EventKind::Change => "data-on-change",
            EventKind::Submit => "data-on-submit",
        }
    }
}

/// Listener registered on a node: which widget handles it and with what.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub widget: String,
    pub action: String,
    pub arg: Option<String>,
}

#[derive(Debug, Clone)]
enum NodeData {
    Element {
        tag: String,
        classes: Vec<String>,
        attrs: BTreeMap<String, String>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    hidden: bool,
}

#[derive(Default)]
pub struct Document {
    nodes: Slab<Node>,
    listeners: HashMap<(NodeId, EventKind), Binding>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        NodeId(self.nodes.insert(Node {
            data: NodeData::Element {
                tag: tag.to_string(),
                classes: Vec::new(),
                attrs: BTreeMap::new(),
            },
            parent: None,
            children: Vec::new(),
            hidden: false,
        }))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        NodeId(self.nodes.insert(Node {
            data: NodeData::Text(text.to_string()),
            parent: None,
            children: Vec::new(),
            hidden: false,
        }))
    }

    /// Materialise markup as detached nodes. A fragment yields several roots.
    pub fn build(&mut self, markup: &Markup) -> Vec<NodeId> {
        match markup {
            Markup::Text(text) => vec![self.create_text(text)],
            Markup::Element(element) => {
                let id = NodeId(self.nodes.insert(Node {
                    data: NodeData::Element {
                        tag: element.tag.clone(),
                        classes: element.classes.clone(),
                        attrs: element.attrs.clone(),
                    },
                    parent: None,
                    children: Vec::new(),
                    hidden: element.hidden,
                }));
                for child in &element.children {
                    for built in self.build(child) {
                        self.link(id, built);
                    }
                }
                vec![id]
            }
            Markup::Fragment(items) => items.iter().flat_map(|m| self.build(m)).collect(),
        }
    }

    fn link(&mut self, parent: NodeId, child: NodeId) {
        if let Some(node) = self.nodes.get_mut(child.0) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.nodes.get_mut(parent.0) {
            node.children.push(child);
        }
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(node.0)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Append `child` to `parent`, moving it if it is already attached.
    /// Returns false for unknown nodes or when the move would create a cycle.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if !self.contains(parent) || !self.contains(child) || parent == child {
            return false;
        }
        if self.is_ancestor(child, parent) {
            return false;
        }
        self.detach(child);
        self.link(parent, child);
        true
    }

    fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Unlink a node from its parent without freeing it.
    pub fn detach(&mut self, node: NodeId) -> bool {
        let Some(parent) = self.parent(node) else {
            return false;
        };
        if let Some(p) = self.nodes.get_mut(parent.0) {
            p.children.retain(|c| *c != node);
        }
        if let Some(n) = self.nodes.get_mut(node.0) {
            n.parent = None;
        }
        true
    }

    /// Detach a node and free it together with its subtree and listeners.
    pub fn remove(&mut self, node: NodeId) -> bool {
        if !self.contains(node) {
            return false;
        }
        self.detach(node);
        let doomed = self.descendants(node);
        self.free(&doomed);
        true
    }

    fn free(&mut self, doomed: &[NodeId]) {
        let set: HashSet<NodeId> = doomed.iter().copied().collect();
        self.listeners.retain(|(node, _), _| !set.contains(node));
        for id in doomed {
            if self.nodes.contains(id.0) {
                self.nodes.remove(id.0);
            }
        }
    }

    /// Replace every child of `node` with freshly built markup, the
    /// equivalent of assigning `innerHTML`. The node itself keeps its id.
    pub fn replace_children(&mut self, node: NodeId, markup: &Markup) -> bool {
        if !self.contains(node) {
            return false;
        }
        let old: Vec<NodeId> = self.children(node).to_vec();
        for child in old {
            self.remove(child);
        }
        for built in self.build(markup) {
            self.link(node, built);
        }
        true
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0).and_then(|n| n.parent)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(node.0)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        match &self.nodes.get(node.0)?.data {
            NodeData::Element { tag, .. } => Some(tag),
            NodeData::Text(_) => None,
        }
    }

    /// Text of a text node.
    pub fn text(&self, node: NodeId) -> Option<&str> {
        match &self.nodes.get(node.0)?.data {
            NodeData::Text(text) => Some(text),
            NodeData::Element { .. } => None,
        }
    }

    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        for id in self.descendants(node) {
            if let Some(text) = self.text(id) {
                out.push_str(text);
            }
        }
        out
    }

    pub fn set_text(&mut self, node: NodeId, text: &str) -> bool {
        let old: Vec<NodeId> = self.children(node).to_vec();
        if self.tag(node).is_none() {
            return false;
        }
        for child in old {
            self.remove(child);
        }
        let text_node = self.create_text(text);
        self.link(node, text_node);
        true
    }

    pub fn classes(&self, node: NodeId) -> &[String] {
        match self.nodes.get(node.0).map(|n| &n.data) {
            Some(NodeData::Element { classes, .. }) => classes,
            _ => &[],
        }
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.classes(node).iter().any(|c| c == class)
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) {
        if let Some(Node {
            data: NodeData::Element { classes, .. },
            ..
        }) = self.nodes.get_mut(node.0)
        {
            if !classes.iter().any(|c| c == class) {
                classes.push(class.to_string());
            }
        }
    }

    pub fn remove_class(&mut self, node: NodeId, class: &str) {
        if let Some(Node {
            data: NodeData::Element { classes, .. },
            ..
        }) = self.nodes.get_mut(node.0)
        {
            classes.retain(|c| c != class);
        }
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.nodes.get(node.0)?.data {
            NodeData::Element { attrs, .. } => attrs.get(name).map(String::as_str),
            NodeData::Text(_) => None,
        }
    }

    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(Node {
            data: NodeData::Element { attrs, .. },
            ..
        }) = self.nodes.get_mut(node.0)
        {
            attrs.insert(name.to_string(), value.to_string());
        }
    }

    pub fn remove_attr(&mut self, node: NodeId, name: &str) {
        if let Some(Node {
            data: NodeData::Element { attrs, .. },
            ..
        }) = self.nodes.get_mut(node.0)
        {
            attrs.remove(name);
        }
    }

    /// Current value of an input-like element.
    pub fn value(&self, node: NodeId) -> &str {
        self.attr(node, "value").unwrap_or("")
    }

    pub fn set_value(&mut self, node: NodeId, value: &str) {
        self.set_attr(node, "value", value);
    }

    pub fn is_checked(&self, node: NodeId) -> bool {
        self.attr(node, "checked").is_some()
    }

    pub fn set_checked(&mut self, node: NodeId, checked: bool) {
        if checked {
            self.set_attr(node, "checked", "checked");
        } else {
            self.remove_attr(node, "checked");
        }
    }

    pub fn is_disabled(&self, node: NodeId) -> bool {
        self.attr(node, "disabled").is_some()
    }

    pub fn set_hidden(&mut self, node: NodeId, hidden: bool) {
        if let Some(n) = self.nodes.get_mut(node.0) {
            n.hidden = hidden;
        }
    }

    pub fn is_hidden(&self, node: NodeId) -> bool {
        self.nodes.get(node.0).map(|n| n.hidden).unwrap_or(true)
    }

    /// True when neither the node nor any ancestor is hidden.
    pub fn is_displayed(&self, node: NodeId) -> bool {
        if !self.contains(node) {
            return false;
        }
        let mut current = Some(node);
        while let Some(id) = current {
            if self.is_hidden(id) {
                return false;
            }
            current = self.parent(id);
        }
        true
    }

    /// Pre-order walk of `root` and everything beneath it.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.contains(root) {
            return out;
        }
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            for child in self.children(id).iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    pub fn find_by_class(&self, root: NodeId, class: &str) -> Option<NodeId> {
        self.descendants(root)
            .into_iter()
            .find(|id| self.has_class(*id, class))
    }

    pub fn find_all_by_class(&self, root: NodeId, class: &str) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|id| self.has_class(*id, class))
            .collect()
    }

    /// Values of every named element under `root`, keyed by `name`.
    pub fn form_values(&self, root: NodeId) -> BTreeMap<String, String> {
        self.descendants(root)
            .into_iter()
            .filter_map(|id| {
                let name = self.attr(id, "name")?;
                Some((name.to_string(), self.value(id).to_string()))
            })
            .collect()
    }

    /// Register every `data-on-*` declaration under `root` for `widget`.
    /// Returns how many listeners were newly added.
    pub fn attach_listeners(&mut self, root: NodeId, widget: &str) -> usize {
        let mut added = 0;
        for id in self.descendants(root) {
            let arg = self.attr(id, "data-arg").map(str::to_string);
            for kind in EventKind::ALL {
                let Some(action) = self.attr(id, kind.attr_name()).map(str::to_string) else {
                    continue;
                };
                let binding = Binding {
                    widget: widget.to_string(),
                    action,
                    arg: arg.clone(),
                };
                if self.listeners.insert((id, kind), binding).is_none() {
                    added += 1;
                }
            }
        }
        added
    }

    /// Drop every listener registered under `root`.
    pub fn detach_listeners(&mut self, root: NodeId) -> usize {
        let set: HashSet<NodeId> = self.descendants(root).into_iter().collect();
        let before = self.listeners.len();
        self.listeners.retain(|(node, _), _| !set.contains(node));
        before - self.listeners.len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Listener that handles `kind` on `node`, bubbling to ancestors.
    pub fn binding_for(&self, node: NodeId, kind: EventKind) -> Option<&Binding> {
        let mut current = Some(node);
        while let Some(id) = current {
            if let Some(binding) = self.listeners.get(&(id, kind)) {
                return Some(binding);
            }
            current = self.parent(id);
        }
        None
    }
}
