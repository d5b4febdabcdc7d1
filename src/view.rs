//! The client document
//!
//! An in-memory model of what the user sees and edits: the username field,
//! the product list with one bid input per product, the bid history, the
//! refresh indicator and alerts. Only the controller mutates it; the UI
//! server gets copies.
pub mod catalog;
pub mod history;
pub mod render;

pub use self::{catalog::*, history::*, render::*};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::auction::Product;

/// Identity of an input element, stable across catalog rebuilds
pub type InputKey = String;
pub type InputKeyRef<'s> = &'s str;

pub const USERNAME_KEY: &str = "username";
const BID_INPUT_PREFIX: &str = "bid-";

/// Alerts older than this many are dropped
pub const MAX_ALERTS: usize = 5;

pub fn bid_input_key(product: &str) -> InputKey {
    format!("{BID_INPUT_PREFIX}{product}")
}

/// Bid inputs are the numeric fields that pause polling
pub fn is_bid_input(key: InputKeyRef) -> bool {
    key.starts_with(BID_INPUT_PREFIX)
}

/// Cursor selection inside an input, in characters
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    pub fn caret(at: usize) -> Self {
        Self { start: at, end: at }
    }

    pub fn clamp(self, len: usize) -> Self {
        let end = self.end.min(len);
        Self {
            start: self.start.min(end),
            end,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TextInput {
    pub value: String,
    pub disabled: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshStatus {
    Active,
    Paused,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub level: AlertLevel,
    pub message: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct View {
    pub username: TextInput,
    pub user_status: Option<String>,
    pub catalog: Catalog,
    pub history: BidHistory,
    /// The element holding focus, if any
    pub focused: Option<InputKey>,
    pub refresh_status: RefreshStatus,
    pub last_update: Option<DateTime<Local>>,
    pub alerts: VecDeque<Alert>,
}

impl View {
    pub fn new(max_bid_history: usize) -> Self {
        Self {
            username: TextInput::default(),
            user_status: None,
            catalog: Catalog::new(),
            history: BidHistory::new(max_bid_history),
            focused: None,
            refresh_status: RefreshStatus::Active,
            last_update: None,
            alerts: VecDeque::new(),
        }
    }

    pub fn alert(&mut self, level: AlertLevel, message: impl Into<String>) {
        self.alerts.push_back(Alert {
            level,
            message: message.into(),
        });
        while self.alerts.len() > MAX_ALERTS {
            self.alerts.pop_front();
        }
    }

    /// Reconcile a fetched catalog, see [`Catalog::reconcile`]
    pub fn apply_catalog(&mut self, products: Vec<Product>) -> bool {
        self.catalog.reconcile(products, &mut self.focused)
    }

    pub fn input(&self, key: InputKeyRef) -> Option<&NumberInput> {
        self.catalog.input(key)
    }
}
