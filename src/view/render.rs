//! HTML rendering of the view
//!
//! The template name ends in `.html`, so minijinja escapes every
//! interpolated value. Product names, sellers and buyers come straight from
//! the auction house and must never reach the page as markup.
//!
//! The page script reports focus and keystrokes on bid fields to `/events`,
//! which is what pauses polling while the user types. It also watches
//! `/state` and reloads once the catalog or the history changed, unless a bid
//! field has focus.
use minijinja::Environment;
use serde::Serialize;

use super::{
    Alert, CatalogView, RefreshStatus, View, EMPTY_CATALOG_MESSAGE, EMPTY_HISTORY_MESSAGE,
};
use crate::auction::format_price;

const PAGE_TEMPLATE_NAME: &str = "page.html";

/// How often the page checks `/state` for changes
const WATCH_INTERVAL_MS: u64 = 1000;

const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Live Auction</title>
</head>
<body>
<header>
  <form method="post" action="/register">
    <input type="text" id="username" name="name" placeholder="Enter your name" value="{{ username }}"{% if username_disabled %} disabled{% endif %}>
    <button type="submit"{% if username_disabled %} disabled{% endif %}>Register</button>
  </form>
  {% if user_status %}<p id="userStatus">{{ user_status }}</p>{% endif %}
  <p>
    <span class="status-indicator {{ refresh_status }}"></span>
    {% if last_update %}<span id="lastUpdate">Last updated: {{ last_update }}</span>{% endif %}
  </p>
  <form method="post" action="/refresh"><button type="submit">Refresh</button></form>
</header>
{% for alert in alerts %}
<div class="alert {{ alert.level }}">{{ alert.message }}</div>
{% endfor %}
<section id="products">
{% if catalog_state == "products" %}
{% for card in products %}
  <div class="product">
    <h3>{{ card.name }}</h3>
    <p><strong>Seller:</strong> {{ card.seller }}</p>
    <p><strong>Starting Price:</strong> {{ card.initial_price }}</p>
    <p class="price">Current Bid: {{ card.current_price }}</p>
    <form class="bid-section" method="post" action="/bid">
      <input type="hidden" name="product" value="{{ card.name }}">
      <input type="number" id="{{ card.input_key }}" name="amount" placeholder="Enter your bid (min {{ card.min_bid_label }})" min="{{ card.min_bid }}" step="0.01" value="{{ card.value }}"{% if card.focused %} autofocus{% endif %}>
      <button class="bid-button" type="submit">Place Bid</button>
    </form>
  </div>
{% endfor %}
{% elif catalog_state == "empty" %}
  <div class="empty-state">{{ empty_catalog_message }}</div>
{% else %}
  <div class="empty-state">Register to see the catalog.</div>
{% endif %}
</section>
<section id="bidHistory">
{% for entry in history %}
  <div class="bid-entry">{{ entry.text }} <small>{{ entry.time }}</small></div>
{% else %}
  <div class="empty-state">{{ empty_history_message }}</div>
{% endfor %}
</section>
<script>
const rendered = [{{ generation }}, {{ history_recorded }}];
const post = (event) => fetch("/events", {
  method: "POST",
  headers: { "Content-Type": "application/json" },
  body: JSON.stringify(event),
});
const isBidField = (element) => element instanceof HTMLInputElement && element.type === "number";
for (const input of document.querySelectorAll("input[type=number]")) {
  input.addEventListener("focus", () => post({ type: "focus_in", key: input.id }));
  input.addEventListener("blur", () => post({ type: "focus_out", key: input.id }));
  input.addEventListener("input", () => post({ type: "input", key: input.id, value: input.value }));
}
setInterval(async () => {
  const state = await (await fetch("/state")).json();
  const current = [state.catalog.generation, state.history.recorded];
  const changed = current.some((value, i) => value !== rendered[i]);
  if (changed && !isBidField(document.activeElement)) {
    location.reload();
  }
}, {{ watch_interval_ms }});
</script>
</body>
</html>
"#;

#[derive(Serialize)]
struct Page<'a> {
    username: &'a str,
    username_disabled: bool,
    user_status: Option<&'a str>,
    refresh_status: RefreshStatus,
    last_update: Option<String>,
    alerts: Vec<&'a Alert>,
    catalog_state: &'static str,
    empty_catalog_message: &'static str,
    products: Vec<Card<'a>>,
    history: Vec<HistoryLine>,
    empty_history_message: &'static str,
    generation: u64,
    history_recorded: u64,
    watch_interval_ms: u64,
}

#[derive(Serialize)]
struct Card<'a> {
    name: &'a str,
    seller: &'a str,
    initial_price: String,
    current_price: String,
    min_bid: String,
    min_bid_label: String,
    input_key: &'a str,
    value: &'a str,
    focused: bool,
}

#[derive(Serialize)]
struct HistoryLine {
    text: String,
    time: String,
}

pub struct Renderer {
    env: Environment<'static>,
}

impl Renderer {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template(PAGE_TEMPLATE_NAME, PAGE_TEMPLATE)?;
        Ok(Self { env })
    }

    pub fn render(&self, view: &View) -> Result<String, minijinja::Error> {
        let focused = view.focused.as_deref();

        let products = view
            .catalog
            .cards()
            .iter()
            .map(|card| {
                let min_bid = card.product.min_next_bid();
                Card {
                    name: &card.product.name,
                    seller: &card.product.seller,
                    initial_price: format_price(card.product.initial_price),
                    current_price: format_price(card.product.current_price),
                    min_bid: format!("{min_bid:.2}"),
                    min_bid_label: format_price(min_bid),
                    input_key: &card.bid_input.key,
                    value: &card.bid_input.value,
                    focused: focused == Some(card.bid_input.key.as_str()),
                }
            })
            .collect();

        let page = Page {
            username: &view.username.value,
            username_disabled: view.username.disabled,
            user_status: view.user_status.as_deref(),
            refresh_status: view.refresh_status,
            last_update: view
                .last_update
                .map(|at| at.format("%H:%M:%S").to_string()),
            alerts: view.alerts.iter().collect(),
            catalog_state: match view.catalog.view() {
                CatalogView::NotLoaded => "not_loaded",
                CatalogView::Empty => "empty",
                CatalogView::Products(_) => "products",
            },
            empty_catalog_message: EMPTY_CATALOG_MESSAGE,
            products,
            history: view
                .history
                .entries()
                .map(|entry| HistoryLine {
                    text: entry.describe(),
                    time: entry.timestamp.format("%H:%M:%S").to_string(),
                })
                .collect(),
            empty_history_message: EMPTY_HISTORY_MESSAGE,
            generation: view.catalog.generation(),
            history_recorded: view.history.recorded(),
            watch_interval_ms: WATCH_INTERVAL_MS,
        };

        self.env.get_template(PAGE_TEMPLATE_NAME)?.render(&page)
    }
}
