use super::remote::{self, FetchState, MockMode};
use super::{Widget, WidgetContext, WidgetEvent, WidgetKind};
use crate::dashboard::error::DashboardError;
use crate::dom::{el, EventKind, Markup};
use crate::net::{with_query, TransportError};
use crate::tasks::{Completion, TaskHandle};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::any::Any;
use std::time::Duration;

const PREFIX: &str = "weather-widget";

fn default_city() -> String {
    "Moscow".into()
}

fn default_url() -> String {
    "https://api.openweathermap.org/data/2.5/weather".into()
}

fn default_units() -> String {
    "metric".into()
}

fn default_mock_data() -> MockMode {
    MockMode::OnFailure
}

fn default_refresh_secs() -> u64 {
    600
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default = "default_city")]
    pub city: String,
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_units")]
    pub units: String,
    #[serde(default = "default_mock_data")]
    pub mock_data: MockMode,
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,
    #[serde(default)]
    pub latency_ms: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            city: default_city(),
            url: default_url(),
            api_key: None,
            units: default_units(),
            mock_data: default_mock_data(),
            refresh_secs: default_refresh_secs(),
            latency_ms: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Readings {
    pub temp: f64,
    pub feels_like: f64,
    pub humidity: f64,
    pub pressure: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub main: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub speed: f64,
}

/// Subset of the current-weather response the widget displays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub main: Readings,
    pub weather: Vec<Condition>,
    pub wind: Wind,
    #[serde(default)]
    pub name: Option<String>,
}

impl WeatherReport {
    pub fn condition(&self) -> Option<&Condition> {
        self.weather.first()
    }

    /// Pressure converted from hPa to mmHg.
    pub fn pressure_mmhg(&self) -> i64 {
        (self.main.pressure * 0.75).round() as i64
    }
}

pub fn weather_emoji(main: &str) -> &'static str {
    match main {
        "Clear" => "☀️",
        "Clouds" => "☁️",
        "Rain" => "🌧️",
        "Snow" => "❄️",
        "Thunderstorm" => "⛈️",
        "Drizzle" => "🌦️",
        "Mist" | "Fog" => "🌫️",
        _ => "🌤️",
    }
}

/// Rounded for display; small negatives come out as `0`, not `-0`.
fn whole(x: f64) -> i64 {
    x.round() as i64
}

fn city_seed(city: &str) -> u64 {
    city.trim()
        .to_lowercase()
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325, |h, b| {
            (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
        })
}

/// Plausible report derived from the city name; the same city always gets
/// the same numbers.
pub fn simulated_report(city: &str) -> WeatherReport {
    const CONDITIONS: [(&str, &str); 4] = [
        ("Clear", "clear sky"),
        ("Clouds", "overcast clouds"),
        ("Rain", "light rain"),
        ("Snow", "light snow"),
    ];
    let mut rng = StdRng::seed_from_u64(city_seed(city));
    let temp = rng.gen_range(-10..=20) as f64;
    let (main, description) = CONDITIONS[rng.gen_range(0..CONDITIONS.len())];
    WeatherReport {
        main: Readings {
            temp,
            feels_like: temp + rng.gen_range(-3..=1) as f64,
            humidity: rng.gen_range(40..=80) as f64,
            pressure: rng.gen_range(1000..=1050) as f64,
        },
        weather: vec![Condition {
            main: main.into(),
            description: description.into(),
        }],
        wind: Wind {
            speed: rng.gen_range(0..=10) as f64,
        },
        name: Some(city.trim().to_string()),
    }
}

pub struct WeatherWidget {
    cfg: WeatherConfig,
    report: Option<WeatherReport>,
    fetch: FetchState,
    timer: Option<TaskHandle>,
}

impl WeatherWidget {
    pub fn new(mut cfg: WeatherConfig) -> Result<Self, DashboardError> {
        cfg.city = cfg.city.trim().to_string();
        if cfg.city.is_empty() {
            return Err(DashboardError::invalid_config(
                WidgetKind::Weather,
                "city must not be empty",
            ));
        }
        if cfg.refresh_secs == 0 {
            return Err(DashboardError::invalid_config(
                WidgetKind::Weather,
                "refresh_secs must be positive",
            ));
        }
        Ok(Self {
            cfg,
            report: None,
            fetch: FetchState::default(),
            timer: None,
        })
    }

    pub fn city(&self) -> &str {
        &self.cfg.city
    }

    pub fn report(&self) -> Option<&WeatherReport> {
        self.report.as_ref()
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

    fn request_url(&self) -> Result<String, TransportError> {
        let key = self
            .cfg
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(TransportError::MissingCredential)?;
        Ok(with_query(
            &self.cfg.url,
            &[
                ("q", self.cfg.city.as_str()),
                ("appid", key),
                ("units", self.cfg.units.as_str()),
            ],
        ))
    }

    pub fn load(&mut self, ctx: &mut WidgetContext<'_>) -> bool {
        let mode = self.cfg.mock_data;
        let latency = Duration::from_millis(self.cfg.latency_ms);
        let url = self.request_url();
        let city = self.cfg.city.clone();
        self.fetch.begin(|| {
            remote::spawn_request(ctx, mode, latency, url, move || {
                json!(simulated_report(&city))
            })
        })
    }

    /// Switch to `city` and reload. Blank or unchanged input is ignored.
    pub fn search(&mut self, city: &str, ctx: &mut WidgetContext<'_>) -> bool {
        let city = city.trim();
        if city.is_empty() || city == self.cfg.city {
            return false;
        }
        self.cfg.city = city.to_string();
        self.report = None;
        self.load(ctx);
        true
    }

    fn render_report(&self) -> Markup {
        let Some(report) = &self.report else {
            return el("div")
                .class("weather-widget__placeholder")
                .child(el("p").text("Press \"Refresh\" to get the weather"))
                .into();
        };
        let (emoji, description) = report
            .condition()
            .map(|c| (weather_emoji(&c.main), c.description.as_str()))
            .unwrap_or(("🌤️", ""));
        let detail = |label: &str, value: String| {
            el("div")
                .class("weather-widget__detail")
                .row()
                .child(el("span").class("weather-widget__label").text(label))
                .child(el("span").class("weather-widget__value").text(value))
        };
        Markup::Fragment(vec![
            el("div")
                .class("weather-widget__main")
                .child(
                    el("div")
                        .class("weather-widget__temperature")
                        .text(format!("{}°C", whole(report.main.temp))),
                )
                .child(
                    el("div")
                        .class("weather-widget__description")
                        .text(format!("{emoji} {description}")),
                )
                .into(),
            el("div")
                .class("weather-widget__details")
                .child(detail(
                    "Feels like:",
                    format!("{}°C", whole(report.main.feels_like)),
                ))
                .child(detail(
                    "Humidity:",
                    format!("{}%", whole(report.main.humidity)),
                ))
                .child(detail(
                    "Pressure:",
                    format!("{} mmHg", report.pressure_mmhg()),
                ))
                .child(detail("Wind:", format!("{} m/s", whole(report.wind.speed))))
                .into(),
        ])
    }
}

impl Widget for WeatherWidget {
    fn kind(&self) -> WidgetKind {
        WidgetKind::Weather
    }

    fn render_content(&self) -> Markup {
        let body: Markup = if self.fetch.is_loading() {
            remote::loading(PREFIX, "Fetching the weather...").into()
        } else if let Some(err) = &self.fetch.error {
            remote::error_block(PREFIX, err).into()
        } else {
            self.render_report()
        };
        el("div")
            .class(PREFIX)
            .child(
                el("div")
                    .class("weather-widget__location")
                    .row()
                    .child(
                        el("input")
                            .class("weather-widget__city-input")
                            .attr("type", "text")
                            .attr("name", "city")
                            .attr("placeholder", "Enter a city")
                            .attr("maxlength", "50")
                            .attr("value", self.cfg.city.as_str())
                            .on(EventKind::Submit, "search"),
                    )
                    .child(
                        el("button")
                            .class("weather-widget__search-btn btn btn--primary")
                            .on(EventKind::Click, "search")
                            .text("🔍"),
                    ),
            )
            .child(el("div").class("weather-widget__content").child(body))
            .child(remote::demo_badge(PREFIX, self.fetch.demo))
            .child(
                el("div").class("weather-widget__actions").child(remote::refresh_button(
                    PREFIX,
                    "🔄 Refresh",
                    self.fetch.is_loading(),
                    false,
                )),
            )
            .child(remote::updated_footer(PREFIX, self.fetch.last_update, "%H:%M"))
            .into()
    }

    fn initialize(&mut self, ctx: &mut WidgetContext<'_>) -> Result<(), DashboardError> {
        self.load(ctx);
        self.timer = Some(ctx.start_interval(Duration::from_secs(self.cfg.refresh_secs)));
        Ok(())
    }

    fn handle_event(&mut self, event: &WidgetEvent, ctx: &mut WidgetContext<'_>) -> bool {
        match event.action.as_str() {
            "search" => self.search(event.field("city").unwrap_or_default(), ctx),
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
        let parsed = done.result.and_then(|v: Value| {
            serde_json::from_value::<WeatherReport>(v)
                .map_err(|e| TransportError::Decode(e.to_string()))
        });
        match parsed {
            Ok(report) => {
                self.report = Some(report);
                self.fetch.succeeded(demo);
            }
            Err(e) if self.cfg.mock_data.substitutes_on_failure() => {
                if e != TransportError::MissingCredential {
                    tracing::warn!(city = %self.cfg.city, "weather unavailable, using simulated data: {e}");
                }
                self.report = Some(simulated_report(&self.cfg.city));
                self.fetch.succeeded(true);
            }
            Err(e) => {
                tracing::warn!(city = %self.cfg.city, "failed to load weather: {e}");
                self.report = None;
                self.fetch.failed(&e);
            }
        }
        true
    }

    fn saved_config(&self) -> Value {
        json!({ "city": self.cfg.city })
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
    fn simulated_report_is_stable_per_city() {
        assert_eq!(simulated_report("Paris"), simulated_report(" paris "));
        let r = simulated_report("Paris");
        assert!((-10.0..=20.0).contains(&r.main.temp));
        assert!((40.0..=80.0).contains(&r.main.humidity));
    }

    #[test]
    fn pressure_is_shown_in_mmhg() {
        let mut r = simulated_report("x");
        r.main.pressure = 1013.0;
        assert_eq!(r.pressure_mmhg(), 760);
    }

    #[test]
    fn readings_just_below_zero_render_as_zero() {
        let mut w = WeatherWidget::new(WeatherConfig::default()).unwrap();
        let mut r = simulated_report("x");
        r.main.temp = -0.3;
        r.main.feels_like = -0.49;
        w.report = Some(r);
        let mut doc = crate::dom::Document::new();
        let text: String = doc
            .build(&w.render_report())
            .into_iter()
            .map(|n| doc.text_content(n))
            .collect();
        assert!(text.contains("0°C"));
        assert!(!text.contains("-0"), "{text}");
        assert_eq!(whole(-2.6), -3);
    }

    #[test]
    fn emoji_table_has_a_default() {
        assert_eq!(weather_emoji("Fog"), "🌫️");
        assert_eq!(weather_emoji("Tornado"), "🌤️");
    }

    #[test]
    fn missing_key_means_no_request_url() {
        let w = WeatherWidget::new(WeatherConfig::default()).unwrap();
        assert_eq!(w.request_url(), Err(TransportError::MissingCredential));
        let w = WeatherWidget::new(WeatherConfig {
            api_key: Some("k".into()),
            city: "New York".into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            w.request_url().unwrap(),
            "https://api.openweathermap.org/data/2.5/weather?q=New%20York&appid=k&units=metric"
        );
    }

    #[test]
    fn blank_city_is_rejected() {
        let cfg = WeatherConfig {
            city: "  ".into(),
            ..Default::default()
        };
        assert!(matches!(
            WeatherWidget::new(cfg),
            Err(DashboardError::InvalidConfig { kind: WidgetKind::Weather, .. })
        ));
    }

    #[test]
    fn report_parses_api_shape() {
        let v = json!({
            "main": {"temp": 3.4, "feels_like": 1.0, "humidity": 81, "pressure": 1009},
            "weather": [{"main": "Rain", "description": "light rain"}],
            "wind": {"speed": 4.1},
            "name": "Riga"
        });
        let r: WeatherReport = serde_json::from_value(v).unwrap();
        assert_eq!(r.condition().unwrap().main, "Rain");
        assert_eq!(r.name.as_deref(), Some("Riga"));
    }
}
