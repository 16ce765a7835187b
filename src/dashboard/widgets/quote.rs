use super::remote::{self, FetchState, MockMode};
use super::{Widget, WidgetContext, WidgetEvent, WidgetKind};
use crate::dashboard::error::DashboardError;
use crate::dom::{el, Markup};
use crate::net::TransportError;
use crate::tasks::{Completion, TaskHandle};
use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::any::Any;
use std::time::Duration;

const PREFIX: &str = "quote-widget";

fn default_url() -> String {
    "https://api.quotable.io/random".into()
}

fn default_mock_data() -> MockMode {
    MockMode::OnFailure
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub content: String,
    pub author: String,
}

static FALLBACK_QUOTES: Lazy<Vec<Quote>> = Lazy::new(|| {
    [
        (
            "Life is what happens to you while you're busy making other plans.",
            "John Lennon",
        ),
        (
            "The only way to do great work is to love what you do.",
            "Steve Jobs",
        ),
        (
            "The future belongs to those who believe in the beauty of their dreams.",
            "Eleanor Roosevelt",
        ),
        (
            "Success is stumbling from failure to failure with no loss of enthusiasm.",
            "Winston Churchill",
        ),
        (
            "Don't be afraid to give up the good to go for the great.",
            "John D. Rockefeller",
        ),
    ]
    .into_iter()
    .map(|(content, author)| Quote {
        content: content.into(),
        author: author.into(),
    })
    .collect()
});

pub fn fallback_quotes() -> &'static [Quote] {
    &FALLBACK_QUOTES
}

fn random_fallback() -> Quote {
    FALLBACK_QUOTES
        .choose(&mut rand::thread_rng())
        .cloned()
        .unwrap_or_else(|| Quote {
            content: String::new(),
            author: String::new(),
        })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_mock_data")]
    pub mock_data: MockMode,
    /// Fetch a new quote periodically. Off unless set.
    #[serde(default)]
    pub refresh_secs: Option<u64>,
    #[serde(default)]
    pub latency_ms: u64,
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            mock_data: default_mock_data(),
            refresh_secs: None,
            latency_ms: 0,
        }
    }
}

pub struct QuoteWidget {
    cfg: QuoteConfig,
    quote: Option<Quote>,
    fetch: FetchState,
    timer: Option<TaskHandle>,
}

impl QuoteWidget {
    pub fn new(cfg: QuoteConfig) -> Result<Self, DashboardError> {
        if cfg.refresh_secs == Some(0) {
            return Err(DashboardError::invalid_config(
                WidgetKind::Quote,
                "refresh_secs must be positive",
            ));
        }
        Ok(Self {
            cfg,
            quote: None,
            fetch: FetchState::default(),
            timer: None,
        })
    }

    pub fn quote(&self) -> Option<&Quote> {
        self.quote.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.fetch.is_loading()
    }

    pub fn is_demo(&self) -> bool {
        self.fetch.demo
    }

    pub fn error(&self) -> Option<&str> {
        self.fetch.error.as_deref()
    }

    /// Ask for a new quote. Ignored while a request is in flight.
    pub fn load(&mut self, ctx: &mut WidgetContext<'_>) -> bool {
        let mode = self.cfg.mock_data;
        let latency = Duration::from_millis(self.cfg.latency_ms);
        let url = self.cfg.url.clone();
        self.fetch.begin(|| {
            remote::spawn_request(ctx, mode, latency, Ok(url), || {
                json!(random_fallback())
            })
        })
    }

    fn parse(value: &Value) -> Result<Quote, TransportError> {
        Ok(Quote {
            content: remote::str_field(value, "content")?,
            author: remote::str_field(value, "author")?,
        })
    }

    fn render_body(&self) -> Markup {
        if self.fetch.is_loading() {
            return remote::loading(PREFIX, "Fetching an inspiring quote...").into();
        }
        if let Some(err) = &self.fetch.error {
            return remote::error_block(PREFIX, err).into();
        }
        match &self.quote {
            Some(q) => el("blockquote")
                .class("quote-widget__quote")
                .child(
                    el("p")
                        .class("quote-widget__text")
                        .text(format!("\"{}\"", q.content)),
                )
                .child(
                    el("footer")
                        .class("quote-widget__author")
                        .text("— ")
                        .child(el("cite").text(q.author.as_str())),
                )
                .into(),
            None => el("div")
                .class("quote-widget__placeholder")
                .child(el("p").text("Press \"New quote\" for some inspiration!"))
                .into(),
        }
    }
}

impl Widget for QuoteWidget {
    fn kind(&self) -> WidgetKind {
        WidgetKind::Quote
    }

    fn render_content(&self) -> Markup {
        el("div")
            .class(PREFIX)
            .child(el("div").class("quote-widget__content").child(self.render_body()))
            .child(remote::demo_badge(PREFIX, self.fetch.demo))
            .child(
                el("div").class("quote-widget__actions").child(remote::refresh_button(
                    PREFIX,
                    "🔄 New quote",
                    self.fetch.is_loading(),
                    true,
                )),
            )
            .child(
                el("div")
                    .class("quote-widget__info")
                    .child(el("small").text("Quotes provided by Quotable API")),
            )
            .into()
    }

    fn initialize(&mut self, ctx: &mut WidgetContext<'_>) -> Result<(), DashboardError> {
        self.load(ctx);
        if let Some(secs) = self.cfg.refresh_secs {
            self.timer = Some(ctx.start_interval(Duration::from_secs(secs)));
        }
        Ok(())
    }

    fn handle_event(&mut self, event: &WidgetEvent, ctx: &mut WidgetContext<'_>) -> bool {
        match event.action.as_str() {
            "refresh" | "retry" => self.load(ctx),
            _ => false,
        }
    }

    fn on_timer(&mut self, timer: TaskHandle, ctx: &mut WidgetContext<'_>) -> bool {
        self.timer == Some(timer) && self.load(ctx)
    }

    fn on_fetch_complete(&mut self, done: Completion, _ctx: &mut WidgetContext<'_>) -> bool {
        if !self.fetch.settle(done.request) {
            return false;
        }
        let demo = self.cfg.mock_data == MockMode::Always;
        match done.result.and_then(|v| Self::parse(&v)) {
            Ok(quote) => {
                self.quote = Some(quote);
                self.fetch.succeeded(demo);
            }
            Err(e) if self.cfg.mock_data.substitutes_on_failure() => {
                tracing::warn!("quote service unavailable, using a local quote: {e}");
                self.quote = Some(random_fallback());
                self.fetch.succeeded(true);
            }
            Err(e) => {
                tracing::warn!("failed to load quote: {e}");
                self.fetch.failed(&e);
            }
        }
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_before_first_quote() {
        let w = QuoteWidget::new(QuoteConfig::default()).unwrap();
        assert!(w.render_content().text_content().contains("New quote"));
        assert!(w.quote().is_none());
    }

    #[test]
    fn parse_requires_both_fields() {
        assert!(QuoteWidget::parse(&json!({"content": "x"})).is_err());
        let q = QuoteWidget::parse(&json!({"content": "x", "author": "y", "tags": []})).unwrap();
        assert_eq!(q.author, "y");
    }

    #[test]
    fn zero_refresh_interval_is_invalid() {
        let cfg = QuoteConfig {
            refresh_secs: Some(0),
            ..Default::default()
        };
        assert!(QuoteWidget::new(cfg).is_err());
    }

    #[test]
    fn there_are_five_fallback_quotes() {
        assert_eq!(fallback_quotes().len(), 5);
        assert!(fallback_quotes().contains(&random_fallback()));
    }
}
