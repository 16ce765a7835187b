use super::EventKind;
use std::collections::BTreeMap;

/// Detached content produced by a widget's `render_content`.
///
/// Markup is a plain value; it only becomes part of a [`super::Document`]
/// when a card writes it into its content region. Text is always literal,
/// there is no HTML parsing step and therefore nothing to escape.
#[derive(Debug, Clone, PartialEq)]
pub enum Markup {
    Element(Element),
    Text(String),
    Fragment(Vec<Markup>),
}

impl Markup {
    pub fn text(text: impl Into<String>) -> Self {
        Markup::Text(text.into())
    }

    pub fn empty() -> Self {
        Markup::Fragment(Vec::new())
    }

    /// Concatenated text of this fragment, mostly useful in tests.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Markup::Text(t) => out.push_str(t),
            Markup::Element(el) => {
                for child in &el.children {
                    child.collect_text(out);
                }
            }
            Markup::Fragment(items) => {
                for item in items {
                    item.collect_text(out);
                }
            }
        }
    }
}

impl From<Element> for Markup {
    fn from(el: Element) -> Self {
        Markup::Element(el)
    }
}

impl From<&str> for Markup {
    fn from(text: &str) -> Self {
        Markup::Text(text.to_string())
    }
}

impl From<String> for Markup {
    fn from(text: String) -> Self {
        Markup::Text(text)
    }
}

impl From<Vec<Markup>> for Markup {
    fn from(items: Vec<Markup>) -> Self {
        Markup::Fragment(items)
    }
}

/// Builder for a single element.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub(crate) tag: String,
    pub(crate) classes: Vec<String>,
    pub(crate) attrs: BTreeMap<String, String>,
    pub(crate) hidden: bool,
    pub(crate) children: Vec<Markup>,
}

/// Shorthand for [`Element::new`].
pub fn el(tag: &str) -> Element {
    Element::new(tag)
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    /// Adds one or more whitespace separated classes.
    pub fn class(mut self, class: &str) -> Self {
        for c in class.split_whitespace() {
            if !self.classes.iter().any(|existing| existing == c) {
                self.classes.push(c.to_string());
            }
        }
        self
    }

    pub fn class_if(self, cond: bool, class: &str) -> Self {
        if cond {
            self.class(class)
        } else {
            self
        }
    }

    pub fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attrs.insert(name.to_string(), value.into());
        self
    }

    pub fn attr_if(self, cond: bool, name: &str, value: impl Into<String>) -> Self {
        if cond {
            self.attr(name, value)
        } else {
            self
        }
    }

    /// Declares a listener; it is wired up when the owning card attaches
    /// listeners for the subtree.
    pub fn on(self, kind: EventKind, action: &str) -> Self {
        self.attr(kind.attr_name(), action)
    }

    /// Argument passed along with any listener declared on this element.
    pub fn arg(self, arg: impl ToString) -> Self {
        self.attr("data-arg", arg.to_string())
    }

    /// Lay children out horizontally.
    pub fn row(self) -> Self {
        self.attr("data-layout", "row")
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Markup::Text(text.into()));
        self
    }

    pub fn child(mut self, child: impl Into<Markup>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<I, M>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<Markup>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}
