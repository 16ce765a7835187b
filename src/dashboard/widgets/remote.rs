//! Pieces shared by the widgets that poll a remote service.

use super::WidgetContext;
use crate::dom::{el, Element, EventKind, Markup};
use crate::net::{Transport, TransportError};
use crate::tasks::RequestId;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// When a widget substitutes locally generated data for the remote response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MockMode {
    /// Always show the remote result or an error.
    Never,
    /// Substitute local data when the request fails.
    #[default]
    OnFailure,
    /// Never touch the network.
    Always,
}

impl MockMode {
    pub fn substitutes_on_failure(self) -> bool {
        !matches!(self, MockMode::Never)
    }
}

/// Loading guard plus the bookkeeping every remote widget renders.
#[derive(Debug, Default)]
pub struct FetchState {
    in_flight: Option<RequestId>,
    pub last_update: Option<DateTime<Local>>,
    pub error: Option<String>,
    /// The data on screen was generated locally.
    pub demo: bool,
}

impl FetchState {
    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Start a request unless one is already in flight; triggers that arrive
    /// while loading are dropped.
    pub fn begin(&mut self, start: impl FnOnce() -> RequestId) -> bool {
        if self.in_flight.is_some() {
            return false;
        }
        self.in_flight = Some(start());
        true
    }

    /// Accept the completion of `request` if it is the one in flight.
    pub fn settle(&mut self, request: RequestId) -> bool {
        if self.in_flight != Some(request) {
            return false;
        }
        self.in_flight = None;
        true
    }

    pub fn succeeded(&mut self, demo: bool) {
        self.error = None;
        self.demo = demo;
        self.last_update = Some(Local::now());
    }

    pub fn failed(&mut self, err: &TransportError) {
        self.error = Some(err.to_string());
        self.demo = false;
    }
}

/// Spawn a fetch of `url` honouring `mode`. In [`MockMode::Always`] the job
/// only waits `latency` and returns `mock()`.
pub fn spawn_request<M>(
    ctx: &mut WidgetContext<'_>,
    mode: MockMode,
    latency: Duration,
    url: Result<String, TransportError>,
    mock: M,
) -> RequestId
where
    M: FnOnce() -> Value + Send + 'static,
{
    match mode {
        MockMode::Always => ctx.spawn_fetch(move |_| {
            if !latency.is_zero() {
                std::thread::sleep(latency);
            }
            Ok(mock())
        }),
        MockMode::Never | MockMode::OnFailure => {
            ctx.spawn_fetch(move |transport: &dyn Transport| transport.get_json(&url?))
        }
    }
}

pub fn loading(prefix: &str, message: &str) -> Element {
    el("div")
        .class(&format!("{prefix}__loading"))
        .child(el("div").class(&format!("{prefix}__spinner")))
        .child(el("p").text(message))
}

pub fn error_block(prefix: &str, message: &str) -> Element {
    el("div")
        .class(&format!("{prefix}__error"))
        .child(el("div").class(&format!("{prefix}__error-icon")).text("⚠️"))
        .child(
            el("div")
                .class(&format!("{prefix}__error-message"))
                .text(message),
        )
        .child(
            el("button")
                .class(&format!("{prefix}__retry-btn btn btn--secondary"))
                .on(EventKind::Click, "retry")
                .text("Try again"),
        )
}

pub fn refresh_button(prefix: &str, label: &str, loading: bool, primary: bool) -> Element {
    el("button")
        .class(&format!("{prefix}__refresh-btn btn"))
        .class(if primary { "btn--primary" } else { "btn--secondary" })
        .attr_if(loading, "disabled", "disabled")
        .on(EventKind::Click, "refresh")
        .text(if loading { "⏳ Loading..." } else { label })
}

pub fn demo_badge(prefix: &str, demo: bool) -> Markup {
    if demo {
        el("small")
            .class(&format!("{prefix}__demo"))
            .text("Demo data")
            .into()
    } else {
        Markup::empty()
    }
}

pub fn updated_footer(prefix: &str, at: Option<DateTime<Local>>, format: &str) -> Markup {
    match at {
        Some(at) => el("div")
            .class(&format!("{prefix}__info"))
            .child(el("small").text(format!("Updated: {}", at.format(format))))
            .into(),
        None => Markup::empty(),
    }
}

/// Extract a string field, reporting a shape mismatch otherwise.
pub fn str_field(value: &Value, key: &str) -> Result<String, TransportError> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| TransportError::Decode(format!("missing field '{key}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn begin_discards_while_loading() {
        let mut state = FetchState::default();
        assert!(state.begin(|| RequestId(1)));
        assert!(!state.begin(|| RequestId(2)));
        assert!(state.is_loading());
        assert!(!state.settle(RequestId(2)));
        assert!(state.settle(RequestId(1)));
        assert!(!state.is_loading());
    }

    #[test]
    fn failure_clears_demo_flag() {
        let mut state = FetchState::default();
        state.succeeded(true);
        assert!(state.demo && state.last_update.is_some());
        state.failed(&TransportError::RateLimited);
        assert!(!state.demo);
        assert_eq!(
            state.error.as_deref(),
            Some("too many requests, try again in a minute")
        );
    }

    #[test]
    fn mock_mode_uses_snake_case() {
        let mode: MockMode = serde_json::from_value(json!("on_failure")).unwrap();
        assert_eq!(mode, MockMode::OnFailure);
        assert!(!MockMode::Never.substitutes_on_failure());
    }

    #[test]
    fn str_field_reports_missing_keys() {
        let v = json!({"content": "x"});
        assert_eq!(str_field(&v, "content").unwrap(), "x");
        assert!(matches!(str_field(&v, "author"), Err(TransportError::Decode(_))));
    }
}
