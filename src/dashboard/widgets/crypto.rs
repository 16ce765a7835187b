use super::remote::{self, FetchState, MockMode};
use super::{Widget, WidgetContext, WidgetEvent, WidgetKind};
use crate::dashboard::error::DashboardError;
use crate::dom::{el, EventKind, Markup};
use crate::net::{with_query, TransportError};
use crate::tasks::{Completion, TaskHandle};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::any::Any;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

const PREFIX: &str = "crypto-widget";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    #[default]
    Usd,
    Eur,
    Rub,
}

impl Currency {
    pub const ALL: [Currency; 3] = [Currency::Usd, Currency::Eur, Currency::Rub];

    pub fn as_str(self) -> &'static str {
        match self {
            Currency::Usd => "usd",
            Currency::Eur => "eur",
            Currency::Rub => "rub",
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Currency::Usd => "$",
            Currency::Eur => "€",
            Currency::Rub => "₽",
        }
    }

    /// Formats like the usual locale for the currency: `$1,234.50`,
    /// `1.234,50 €`, `1 234,50 ₽`.
    pub fn format_price(self, price: f64) -> String {
        if !price.is_finite() {
            return "—".into();
        }
        let (group, decimal) = match self {
            Currency::Usd => (',', '.'),
            Currency::Eur => ('.', ','),
            Currency::Rub => ('\u{a0}', ','),
        };
        let cents = (price.abs() * 100.0).round() as u64;
        let whole = (cents / 100).to_string();
        let mut grouped = String::new();
        for (i, c) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                grouped.push(group);
            }
            grouped.push(c);
        }
        let sign = if price < 0.0 { "-" } else { "" };
        let number = format!("{sign}{grouped}{decimal}{:02}", cents % 100);
        match self {
            Currency::Usd => format!("{}{number}", self.symbol()),
            Currency::Eur | Currency::Rub => format!("{number}\u{a0}{}", self.symbol()),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        Currency::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unsupported currency '{s}'"))
    }
}

struct Asset {
    id: &'static str,
    name: &'static str,
    symbol: &'static str,
    icon: &'static str,
    /// Reference prices in usd/eur/rub and the spread used for simulation.
    base: [f64; 3],
    spread: [f64; 3],
    change: f64,
}

const ASSETS: [Asset; 5] = [
    Asset {
        id: "bitcoin",
        name: "Bitcoin",
        symbol: "btc",
        icon: "₿",
        base: [95_000.0, 87_000.0, 9_500_000.0],
        spread: [5_000.0, 4_000.0, 500_000.0],
        change: 10.0,
    },
    Asset {
        id: "ethereum",
        name: "Ethereum",
        symbol: "eth",
        icon: "Ξ",
        base: [3_200.0, 2_900.0, 320_000.0],
        spread: [500.0, 400.0, 30_000.0],
        change: 15.0,
    },
    Asset {
        id: "binancecoin",
        name: "BNB",
        symbol: "bnb",
        icon: "🟡",
        base: [580.0, 520.0, 58_000.0],
        spread: [100.0, 80.0, 10_000.0],
        change: 20.0,
    },
    Asset {
        id: "cardano",
        name: "Cardano",
        symbol: "ada",
        icon: "🔵",
        base: [0.65, 0.58, 65.0],
        spread: [0.2, 0.15, 10.0],
        change: 25.0,
    },
    Asset {
        id: "solana",
        name: "Solana",
        symbol: "sol",
        icon: "☀️",
        base: [180.0, 160.0, 18_000.0],
        spread: [40.0, 30.0, 4_000.0],
        change: 30.0,
    },
];

fn asset(id: &str) -> Option<&'static Asset> {
    ASSETS.iter().find(|a| a.id == id)
}

/// Price table in the same shape as the remote service returns.
/// Accept a price table only if at least one configured asset carries a
/// numeric price in `currency`.
fn check_price_table(
    table: Value,
    ids: &[String],
    currency: Currency,
) -> Result<Value, TransportError> {
    if !table.is_object() {
        return Err(TransportError::Decode("price table is not an object".into()));
    }
    let priced = ids.iter().any(|id| {
        table
            .get(id)
            .and_then(|entry| entry.get(currency.as_str()))
            .and_then(Value::as_f64)
            .is_some()
    });
    if priced {
        Ok(table)
    } else {
        Err(TransportError::Decode(format!(
            "no {currency} prices for the requested assets"
        )))
    }
}

pub fn simulated_prices(ids: &[String]) -> Value {
    let mut rng = rand::thread_rng();
    let mut out = Map::new();
    for id in ids {
        let (base, spread, change) = match asset(id) {
            Some(a) => (a.base, a.spread, a.change),
            None => ([1.0, 0.9, 90.0], [0.2, 0.2, 20.0], 10.0),
        };
        let mut entry = Map::new();
        for (i, currency) in Currency::ALL.iter().enumerate() {
            let price = base[i] + (rng.gen::<f64>() - 0.5) * spread[i];
            entry.insert(currency.as_str().into(), json!(price));
            entry.insert(
                format!("{currency}_24h_change"),
                json!((rng.gen::<f64>() - 0.3) * change),
            );
        }
        out.insert(id.clone(), Value::Object(entry));
    }
    Value::Object(out)
}

fn default_url() -> String {
    "https://api.coingecko.com/api/v3/simple/price".into()
}

fn default_ids() -> Vec<String> {
    ASSETS.iter().map(|a| a.id.to_string()).collect()
}

fn default_currency() -> String {
    Currency::Usd.as_str().into()
}

fn default_mock_data() -> MockMode {
    MockMode::Never
}

fn default_refresh_secs() -> u64 {
    300
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CryptoConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_ids")]
    pub ids: Vec<String>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_mock_data")]
    pub mock_data: MockMode,
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,
    #[serde(default)]
    pub latency_ms: u64,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            ids: default_ids(),
            currency: default_currency(),
            mock_data: default_mock_data(),
            refresh_secs: default_refresh_secs(),
            latency_ms: 0,
        }
    }
}

/// One displayed line of the price table.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRow {
    pub id: String,
    pub price: Option<f64>,
    pub change_24h: f64,
}

pub struct CryptoWidget {
    cfg: CryptoConfig,
    currency: Currency,
    prices: Option<Value>,
    fetch: FetchState,
    timer: Option<TaskHandle>,
}

impl CryptoWidget {
    pub fn new(cfg: CryptoConfig) -> Result<Self, DashboardError> {
        let currency = cfg
            .currency
            .parse::<Currency>()
            .map_err(|e| DashboardError::invalid_config(WidgetKind::Crypto, e))?;
        if cfg.ids.is_empty() {
            return Err(DashboardError::invalid_config(
                WidgetKind::Crypto,
                "ids must not be empty",
            ));
        }
        if cfg.refresh_secs == 0 {
            return Err(DashboardError::invalid_config(
                WidgetKind::Crypto,
                "refresh_secs must be positive",
            ));
        }
        Ok(Self {
            cfg,
            currency,
            prices: None,
            fetch: FetchState::default(),
            timer: None,
        })
    }

    pub fn currency(&self) -> Currency {
        self.currency
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

    /// Rows for the configured assets present in the last price table.
    pub fn rows(&self) -> Vec<PriceRow> {
        let Some(prices) = &self.prices else {
            return Vec::new();
        };
        let change_key = format!("{}_24h_change", self.currency);
        self.cfg
            .ids
            .iter()
            .filter_map(|id| {
                let entry = prices.get(id)?;
                Some(PriceRow {
                    id: id.clone(),
                    price: entry.get(self.currency.as_str()).and_then(Value::as_f64),
                    change_24h: entry.get(&change_key).and_then(Value::as_f64).unwrap_or(0.0),
                })
            })
            .collect()
    }

    fn request_url(&self) -> String {
        let ids = self.cfg.ids.join(",");
        with_query(
            &self.cfg.url,
            &[
                ("ids", ids.as_str()),
                ("vs_currencies", self.currency.as_str()),
                ("include_24hr_change", "true"),
            ],
        )
    }

    pub fn load(&mut self, ctx: &mut WidgetContext<'_>) -> bool {
        let mode = self.cfg.mock_data;
        let latency = Duration::from_millis(self.cfg.latency_ms);
        let url = self.request_url();
        let ids = self.cfg.ids.clone();
        self.fetch.begin(|| {
            remote::spawn_request(ctx, mode, latency, Ok(url), move || {
                simulated_prices(&ids)
            })
        })
    }

    pub fn set_currency(&mut self, currency: Currency, ctx: &mut WidgetContext<'_>) -> bool {
        if currency == self.currency {
            return false;
        }
        self.currency = currency;
        self.cfg.currency = currency.as_str().into();
        self.load(ctx);
        true
    }

    fn render_row(&self, row: &PriceRow) -> Markup {
        let (name, symbol, icon) = asset(&row.id)
            .map(|a| (a.name, a.symbol, a.icon))
            .unwrap_or(("Unknown", "???", "❓"));
        let positive = row.change_24h >= 0.0;
        el("div")
            .class("crypto-widget__item")
            .row()
            .child(
                el("div")
                    .class("crypto-widget__crypto-info")
                    .row()
                    .child(el("div").class("crypto-widget__crypto-icon").text(icon))
                    .child(
                        el("div")
                            .class("crypto-widget__crypto-details")
                            .child(el("div").class("crypto-widget__crypto-name").text(name))
                            .child(
                                el("div")
                                    .class("crypto-widget__crypto-symbol")
                                    .text(symbol.to_uppercase()),
                            ),
                    ),
            )
            .child(
                el("div")
                    .class("crypto-widget__crypto-price")
                    .child(el("div").class("crypto-widget__price").text(
                        row.price
                            .map(|p| self.currency.format_price(p))
                            .unwrap_or_else(|| "—".into()),
                    ))
                    .child(
                        el("div")
                            .class("crypto-widget__change")
                            .class(if positive {
                                "crypto-widget__change--positive"
                            } else {
                                "crypto-widget__change--negative"
                            })
                            .text(format!(
                                "{}{:.2}%",
                                if positive { "+" } else { "" },
                                row.change_24h
                            )),
                    ),
            )
            .into()
    }

    fn render_list(&self) -> Markup {
        if self.fetch.is_loading() {
            return remote::loading(PREFIX, "Fetching crypto prices...").into();
        }
        if let Some(err) = &self.fetch.error {
            return remote::error_block(PREFIX, err).into();
        }
        if self.prices.is_none() {
            return el("div")
                .class("crypto-widget__placeholder")
                .child(el("p").text("Press \"Refresh\" to load crypto prices"))
                .into();
        }
        self.rows()
            .iter()
            .map(|r| self.render_row(r))
            .collect::<Vec<_>>()
            .into()
    }
}

impl Widget for CryptoWidget {
    fn kind(&self) -> WidgetKind {
        WidgetKind::Crypto
    }

    fn render_content(&self) -> Markup {
        let select = Currency::ALL.iter().fold(
            el("select")
                .class("crypto-widget__currency-select")
                .attr("name", "currency")
                .attr("value", self.currency.as_str())
                .on(EventKind::Change, "set-currency"),
            |select, c| {
                select.child(
                    el("option")
                        .attr("value", c.as_str())
                        .attr_if(*c == self.currency, "selected", "selected")
                        .text(c.as_str().to_uppercase()),
                )
            },
        );
        el("div")
            .class(PREFIX)
            .child(
                el("div")
                    .class("crypto-widget__header")
                    .row()
                    .child(el("h4").text("Top cryptocurrencies"))
                    .child(el("div").class("crypto-widget__currency").child(select)),
            )
            .child(el("div").class("crypto-widget__content").child(self.render_list()))
            .child(remote::demo_badge(PREFIX, self.fetch.demo))
            .child(
                el("div").class("crypto-widget__actions").child(remote::refresh_button(
                    PREFIX,
                    "🔄 Refresh",
                    self.fetch.is_loading(),
                    true,
                )),
            )
            .child(remote::updated_footer(
                PREFIX,
                self.fetch.last_update,
                "%d.%m.%Y %H:%M:%S",
            ))
            .into()
    }

    fn initialize(&mut self, ctx: &mut WidgetContext<'_>) -> Result<(), DashboardError> {
        self.load(ctx);
        self.timer = Some(ctx.start_interval(Duration::from_secs(self.cfg.refresh_secs)));
        Ok(())
    }

    fn handle_event(&mut self, event: &WidgetEvent, ctx: &mut WidgetContext<'_>) -> bool {
        match event.action.as_str() {
            "set-currency" => {
                let requested = event
                    .field("currency")
                    .or(event.arg.as_deref())
                    .and_then(|c| c.parse::<Currency>().ok());
                match requested {
                    Some(c) => self.set_currency(c, ctx),
                    None => false,
                }
            }
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
        let parsed = done
            .result
            .and_then(|v| check_price_table(v, &self.cfg.ids, self.currency));
        match parsed {
            Ok(prices) => {
                self.prices = Some(prices);
                self.fetch.succeeded(demo);
            }
            Err(e) if self.cfg.mock_data.substitutes_on_failure() => {
                tracing::warn!(currency = %self.currency, "price service unavailable, using simulated prices: {e}");
                self.prices = Some(simulated_prices(&self.cfg.ids));
                self.fetch.succeeded(true);
            }
            Err(e) => {
                tracing::warn!(currency = %self.currency, "failed to load prices: {e}");
                self.prices = None;
                self.fetch.failed(&e);
            }
        }
        true
    }

    fn saved_config(&self) -> Value {
        json!({ "currency": self.currency })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
