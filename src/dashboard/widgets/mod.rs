use crate::dashboard::error::DashboardError;
use crate::dom::Markup;
use crate::net::Transport;
use crate::settings::Settings;
use crate::storage::KeyValueStore;
use crate::tasks::{CancelToken, Completion, FetchResult, RequestId, Scheduler, TaskHandle, TaskQueue};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

mod card;
mod crypto;
mod quote;
pub(crate) mod remote;
mod todo;
mod weather;

pub use card::{CardOutcome, WidgetCard};
pub use crypto::{CryptoConfig, CryptoWidget, Currency};
pub use quote::{fallback_quotes, Quote, QuoteConfig, QuoteWidget};
pub use remote::MockMode;
pub use todo::{Task, TodoConfig, TodoWidget};
pub use weather::{WeatherConfig, WeatherReport, WeatherWidget};

/// Closed set of widget types a dashboard can host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetKind {
    Todo,
    Quote,
    Weather,
    Crypto,
}

impl WidgetKind {
    pub const ALL: [WidgetKind; 4] = [
        WidgetKind::Todo,
        WidgetKind::Quote,
        WidgetKind::Weather,
        WidgetKind::Crypto,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WidgetKind::Todo => "todo",
            WidgetKind::Quote => "quote",
            WidgetKind::Weather => "weather",
            WidgetKind::Crypto => "crypto",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            WidgetKind::Todo => "📝",
            WidgetKind::Quote => "💭",
            WidgetKind::Weather => "🌤️",
            WidgetKind::Crypto => "💰",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WidgetKind::Todo => "To-do list",
            WidgetKind::Quote => "Quote",
            WidgetKind::Weather => "Weather",
            WidgetKind::Crypto => "Crypto",
        }
    }

    /// Title given to the `n`-th widget created on a dashboard.
    pub fn default_title(self, n: u64) -> String {
        format!("{} {} #{n}", self.emoji(), self.label())
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WidgetKind {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_lowercase();
        WidgetKind::ALL
            .into_iter()
            .find(|k| k.as_str() == tag)
            .ok_or_else(|| DashboardError::UnknownWidgetType(s.to_string()))
    }
}

/// A user interaction routed to a widget.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WidgetEvent {
    pub action: String,
    pub arg: Option<String>,
    /// Values of the named inputs in the widget's content region.
    pub form: BTreeMap<String, String>,
}

impl WidgetEvent {
    pub fn new(action: &str) -> Self {
        Self {
            action: action.to_string(),
            ..Default::default()
        }
    }

    pub fn with_arg(mut self, arg: impl ToString) -> Self {
        self.arg = Some(arg.to_string());
        self
    }

    pub fn with_field(mut self, name: &str, value: &str) -> Self {
        self.form.insert(name.to_string(), value.to_string());
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.form.get(name).map(String::as_str)
    }

    pub fn arg_as<T: FromStr>(&self) -> Option<T> {
        self.arg.as_deref()?.parse().ok()
    }
}

/// Services the dashboard lends to its widgets for the duration of a call.
pub struct WidgetEnv<'a> {
    pub store: &'a Arc<dyn KeyValueStore>,
    pub transport: &'a Arc<dyn Transport>,
    pub tasks: &'a TaskQueue,
    pub scheduler: &'a mut Scheduler,
    pub now: Instant,
}

impl<'a> WidgetEnv<'a> {
    pub fn new(
        store: &'a Arc<dyn KeyValueStore>,
        transport: &'a Arc<dyn Transport>,
        tasks: &'a TaskQueue,
        scheduler: &'a mut Scheduler,
        now: Instant,
    ) -> Self {
        Self {
            store,
            transport,
            tasks,
            scheduler,
            now,
        }
    }
}

/// Per-widget view of [`WidgetEnv`]: fetches and timers started through it
/// are owned by the widget and die with it.
pub struct WidgetContext<'a> {
    id: &'a str,
    cancel: &'a CancelToken,
    store: &'a Arc<dyn KeyValueStore>,
    transport: &'a Arc<dyn Transport>,
    tasks: &'a TaskQueue,
    scheduler: &'a mut Scheduler,
    now: Instant,
}

impl<'a> WidgetContext<'a> {
    pub(crate) fn new(id: &'a str, cancel: &'a CancelToken, env: &'a mut WidgetEnv<'_>) -> Self {
        Self {
            id,
            cancel,
            store: env.store,
            transport: env.transport,
            tasks: env.tasks,
            scheduler: &mut *env.scheduler,
            now: env.now,
        }
    }

    pub fn id(&self) -> &str {
        self.id
    }

    pub fn now(&self) -> Instant {
        self.now
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        self.store
    }

    /// Run `job` off the UI thread. The result comes back through
    /// [`Widget::on_fetch_complete`] unless the widget is destroyed first.
    pub fn spawn_fetch<F>(&mut self, job: F) -> RequestId
    where
        F: FnOnce(&dyn Transport) -> FetchResult + Send + 'static,
    {
        let transport = Arc::clone(self.transport);
        self.tasks
            .spawn(self.id, self.cancel.clone(), move || job(transport.as_ref()))
    }

    pub fn start_interval(&mut self, period: Duration) -> TaskHandle {
        self.scheduler.every(self.id, period, self.now)
    }

    pub fn cancel_interval(&mut self, handle: TaskHandle) -> bool {
        self.scheduler.cancel(handle)
    }
}

/// Widget trait implemented by all dashboard widgets.
///
/// A widget only describes its content; the surrounding card (header,
/// minimize/close controls, mounting) is handled by [`WidgetCard`]. Methods
/// returning `bool` report whether the content needs to be re-rendered.
pub trait Widget: Send {
    fn kind(&self) -> WidgetKind;

    /// Content region markup. Must be a pure function of the widget state.
    fn render_content(&self) -> Markup;

    /// Called once after the card is first mounted.
    fn initialize(&mut self, _ctx: &mut WidgetContext<'_>) -> Result<(), DashboardError> {
        Ok(())
    }

    fn handle_event(&mut self, _event: &WidgetEvent, _ctx: &mut WidgetContext<'_>) -> bool {
        false
    }

    fn on_timer(&mut self, _timer: TaskHandle, _ctx: &mut WidgetContext<'_>) -> bool {
        false
    }

    fn on_fetch_complete(&mut self, _done: Completion, _ctx: &mut WidgetContext<'_>) -> bool {
        false
    }

    /// Subset of the state worth persisting with the dashboard.
    fn saved_config(&self) -> Value {
        json!({})
    }

    fn on_destroy(&mut self, _ctx: &mut WidgetContext<'_>) {}

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

type Ctor = dyn Fn(&Value) -> Result<Box<dyn Widget>, DashboardError> + Send + Sync;

/// Descriptor for building widgets from JSON settings.
#[derive(Clone)]
pub struct WidgetDescriptor {
    kind: WidgetKind,
    ctor: Arc<Ctor>,
    default_settings: Arc<dyn Fn() -> Value + Send + Sync>,
    overrides: Value,
}

pub type WidgetFactory = WidgetDescriptor;

impl WidgetDescriptor {
    pub fn new<T, C>(kind: WidgetKind, build: fn(C) -> Result<T, DashboardError>) -> Self
    where
        T: Widget + 'static,
        C: DeserializeOwned + Serialize + Default + 'static,
    {
        Self {
            kind,
            ctor: Arc::new(move |v: &Value| {
                let cfg = serde_json::from_value::<C>(v.clone())
                    .map_err(|e| DashboardError::invalid_config(kind, e.to_string()))?;
                Ok(Box::new(build(cfg)?) as Box<dyn Widget>)
            }),
            default_settings: Arc::new(|| {
                serde_json::to_value(C::default()).unwrap_or_else(|_| json!({}))
            }),
            overrides: json!({}),
        }
    }

    /// Layer `overrides` on top of the built-in defaults.
    pub fn with_overrides(mut self, overrides: &Value) -> Self {
        self.overrides = merge_json(&self.overrides, overrides);
        self
    }

    pub fn kind(&self) -> WidgetKind {
        self.kind
    }

    pub fn default_settings(&self) -> Value {
        merge_json(&(self.default_settings)(), &self.overrides)
    }

    /// Build a widget from `settings` merged over the defaults. No side
    /// effects: nothing is mounted or fetched.
    pub fn create(&self, settings: &Value) -> Result<Box<dyn Widget>, DashboardError> {
        let settings = if settings.is_null() {
            self.default_settings()
        } else {
            merge_json(&self.default_settings(), settings)
        };
        (self.ctor)(&settings)
    }
}

#[derive(Clone, Default)]
pub struct WidgetRegistry {
    map: HashMap<WidgetKind, WidgetDescriptor>,
}

impl WidgetRegistry {
    pub fn with_defaults() -> Self {
        let mut reg = Self::default();
        reg.register(WidgetFactory::new(WidgetKind::Todo, TodoWidget::new));
        reg.register(WidgetFactory::new(WidgetKind::Quote, QuoteWidget::new));
        reg.register(WidgetFactory::new(WidgetKind::Weather, WeatherWidget::new));
        reg.register(WidgetFactory::new(WidgetKind::Crypto, CryptoWidget::new));
        reg
    }

    /// Built-in widgets with the per-type overlays from `settings` applied.
    pub fn from_settings(settings: &Settings) -> Self {
        let mut reg = Self::with_defaults();
        for (tag, overrides) in &settings.widget_defaults {
            let Ok(kind) = tag.parse::<WidgetKind>() else {
                tracing::warn!(widget = %tag, "ignoring defaults for unknown widget type");
                continue;
            };
            if let Some(descriptor) = reg.map.remove(&kind) {
                reg.register(descriptor.with_overrides(overrides));
            }
        }
        reg
    }

    pub fn register(&mut self, factory: WidgetFactory) {
        self.map.insert(factory.kind(), factory);
    }

    pub fn contains(&self, kind: WidgetKind) -> bool {
        self.map.contains_key(&kind)
    }

    pub fn kinds(&self) -> Vec<WidgetKind> {
        let mut kinds: Vec<WidgetKind> = self.map.keys().copied().collect();
        kinds.sort();
        kinds
    }

    /// Resolve `tag` (case-insensitive) and build a widget from `settings`.
    pub fn create(&self, tag: &str, settings: &Value) -> Result<Box<dyn Widget>, DashboardError> {
        let kind: WidgetKind = tag.parse()?;
        let descriptor = self
            .map
            .get(&kind)
            .ok_or_else(|| DashboardError::UnknownWidgetType(tag.to_string()))?;
        descriptor.create(settings)
    }

    pub fn default_settings(&self, kind: WidgetKind) -> Option<Value> {
        self.map.get(&kind).map(|f| f.default_settings())
    }

    pub fn descriptor(&self, kind: WidgetKind) -> Option<&WidgetDescriptor> {
        self.map.get(&kind)
    }
}

pub(crate) fn merge_json(base: &Value, updates: &Value) -> Value {
    match (base, updates) {
        (Value::Object(a), Value::Object(b)) => {
            let mut merged = a.clone();
            for (k, v) in b {
                merged.insert(k.clone(), v.clone());
            }
            Value::Object(merged)
        }
        _ => updates.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_json_preserves_unknown_fields() {
        let base = json!({"known": 1, "extra": {"keep": true}});
        let updates = json!({"known": 2});
        let merged = merge_json(&base, &updates);
        assert_eq!(merged["known"], json!(2));
        assert_eq!(merged["extra"], json!({"keep": true}));
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("ToDo".parse::<WidgetKind>().unwrap(), WidgetKind::Todo);
        assert_eq!(" CRYPTO ".parse::<WidgetKind>().unwrap(), WidgetKind::Crypto);
        assert!(matches!(
            "clock".parse::<WidgetKind>(),
            Err(DashboardError::UnknownWidgetType(t)) if t == "clock"
        ));
    }

    #[test]
    fn default_titles_are_numbered() {
        assert_eq!(WidgetKind::Quote.default_title(3), "💭 Quote #3");
    }

    #[test]
    fn registry_rejects_unknown_tags() {
        let reg = WidgetRegistry::with_defaults();
        assert!(matches!(
            reg.create("news", &json!({})),
            Err(DashboardError::UnknownWidgetType(_))
        ));
        assert_eq!(reg.kinds(), WidgetKind::ALL.to_vec());
    }

    #[test]
    fn overrides_flow_into_defaults() {
        let mut settings = Settings::default();
        settings
            .widget_defaults
            .insert("weather".into(), json!({"city": "Oslo"}));
        settings
            .widget_defaults
            .insert("stocks".into(), json!({"ticker": "X"}));
        let reg = WidgetRegistry::from_settings(&settings);
        let defaults = reg.default_settings(WidgetKind::Weather).unwrap();
        assert_eq!(defaults["city"], json!("Oslo"));
        let widget = reg.create("weather", &json!({})).unwrap();
        let weather = widget.as_any().downcast_ref::<WeatherWidget>().unwrap();
        assert_eq!(weather.city(), "Oslo");
    }

    #[test]
    fn bad_config_is_reported_as_invalid() {
        let reg = WidgetRegistry::with_defaults();
        let err = match reg.create("crypto", &json!({"currency": "jpy"})) {
            Err(e) => e,
            Ok(_) => panic!("expected an error"),
        };
        assert!(matches!(
            err,
            DashboardError::InvalidConfig { kind: WidgetKind::Crypto, .. }
        ));
    }
}
