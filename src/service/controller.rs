//! Client Sync Controller
//!
//! Owns the session, the polling state, the refresh timer and the view, and
//! is the only thing that touches them. UI events, request completions and
//! pushed bid updates all arrive as [`Event`]s on one channel and are handled
//! one at a time. Requests run as spawned tasks that report back on the same
//! channel, so the loop never waits on the network.
mod polling;
mod session;

pub use self::{polling::*, session::*};

use std::future::Future;
use std::time::Instant;

use anyhow::Result;
use chrono::Local;
use futures::StreamExt;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::SharedAuctionHouseClient;
use crate::{
    auction::{
        format_price, parse_amount, AuctionHouseError, BidReceipt, BidRequest, NewProduct,
        Product, ProductName, ProductNameRef, UserName, ValidationError,
    },
    config::{Config, SyncMode},
    event::{AuctionHouseEvent, Event, EventReceiver, EventSender, Response, UiEvent},
    view::{bid_input_key, is_bid_input, AlertLevel, BidHistoryEntry, View, USERNAME_KEY},
};

const CONNECTION_ERROR_MESSAGE: &str =
    "Connection error. Make sure the auction server is running and reachable";
const BID_ERROR_MESSAGE: &str = "Error placing bid. Please try again.";

/// Why a catalog fetch was issued
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RefreshReason {
    Initial,
    Tick,
    Manual,
    AfterBid,
    AfterListing,
    BidPushed,
}

/// Numbering of catalog requests, so a slow answer can't overwrite a newer one
#[derive(Clone, Debug, Default)]
pub struct RequestSequence {
    issued: u64,
    last_applied: Option<u64>,
}

impl RequestSequence {
    pub fn issue(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    /// Whether the answer to request `seq` should be applied
    ///
    /// True when nothing newer was applied yet, in which case `seq` becomes
    /// the last applied one.
    pub fn accept(&mut self, seq: u64) -> bool {
        if self.last_applied.map(|last| seq <= last).unwrap_or(false) {
            return false;
        }
        self.last_applied = Some(seq);
        true
    }

    pub fn last_applied(&self) -> Option<u64> {
        self.last_applied
    }
}

pub struct Controller {
    client: SharedAuctionHouseClient,
    events: EventSender,
    sync_mode: SyncMode,
    session: Session,
    polling: PollingController,
    timer: PollTimer,
    catalog_requests: RequestSequence,
    bid_updates: Option<task::JoinHandle<()>>,
    view: View,
}

impl Controller {
    pub fn new(config: &Config, client: SharedAuctionHouseClient, events: EventSender) -> Self {
        Self {
            client,
            events,
            sync_mode: config.sync_mode,
            session: Session::default(),
            polling: PollingController::new(config.typing_cooldown, config.blur_grace),
            timer: PollTimer::new(config.refresh_interval),
            catalog_requests: RequestSequence::default(),
            bid_updates: None,
            view: View::new(config.max_bid_history),
        }
    }

    pub async fn run(mut self, mut events: EventReceiver, stop: CancellationToken) -> Result<()> {
        info!(mode = ?self.sync_mode, "controller started");
        loop {
            tokio::select! {
                _ = stop.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
                _ = self.timer.tick() => self.on_refresh_tick(),
            }
        }
        info!("controller stopped");
        Ok(())
    }

    pub fn handle_event(&mut self, event: Event) {
        debug!(?event, "event");
        match event {
            Event::Ui(event) => self.handle_ui_event(event),
            Event::Response(response) => self.handle_response(response),
            Event::AuctionHouse(event) => self.handle_auction_house_event(event),
            Event::Snapshot(reply) => {
                self.sync_refresh_status();
                // the requester may have given up waiting
                let _ = reply.send(self.view.clone());
            }
        }
        self.sync_refresh_status();
    }

    /// One beat of the refresh timer
    pub fn on_refresh_tick(&mut self) {
        if !self.session.is_active() {
            debug!("refresh tick without a session");
        } else if self.polling.is_paused(Instant::now()) {
            debug!("refresh tick while typing, skipping");
        } else {
            self.load_catalog(RefreshReason::Tick);
        }
        self.sync_refresh_status();
    }

    fn sync_refresh_status(&mut self) {
        let status = self.polling.status(Instant::now());
        if status != self.view.refresh_status {
            debug!(?status, "refresh status changed");
            self.view.refresh_status = status;
        }
    }

    fn handle_ui_event(&mut self, event: UiEvent) {
        let now = Instant::now();
        match event {
            UiEvent::Register { name } => {
                if !self.view.username.disabled {
                    self.view.username.value = name.clone();
                }
                self.register(&name);
            }
            UiEvent::PlaceBid { product } => self.place_bid(&product),
            UiEvent::ManualRefresh => self.manual_refresh(),
            UiEvent::AddProduct {
                product,
                initial_price,
            } => self.add_product(&product, &initial_price),
            UiEvent::LookupProduct { product } => self.lookup_product(&product),
            UiEvent::FocusIn { key } => {
                if is_bid_input(&key) {
                    self.polling.focus_in(&key);
                }
                self.view.focused = Some(key);
            }
            UiEvent::Input {
                key,
                value,
                selection,
            } => {
                if key == USERNAME_KEY {
                    if !self.view.username.disabled {
                        self.view.username.value = value;
                    }
                } else if is_bid_input(&key) {
                    self.polling.input(now);
                    match self.view.catalog.input_mut(&key) {
                        Some(input) => input.set_value(value, selection),
                        None => debug!(%key, "input on a field that is not displayed"),
                    }
                }
            }
            UiEvent::Select { key, selection } => {
                if let Some(input) = self.view.catalog.input_mut(&key) {
                    input.selection = selection.clamp(input.value.chars().count());
                }
            }
            UiEvent::FocusOut { key } => {
                if self.view.focused.as_deref() == Some(key.as_str()) {
                    self.view.focused = None;
                }
                if is_bid_input(&key) {
                    self.polling.focus_out(&key, now);
                }
            }
            UiEvent::DismissAlerts => self.view.alerts.clear(),
        }
    }

    fn handle_response(&mut self, response: Response) {
        match response {
            Response::Registered { username, result } => self.on_registered(username, result),
            Response::Catalog { seq, result } => self.on_catalog(seq, result),
            Response::BidPlaced { bid, result } => self.on_bid_placed(bid, result),
            Response::ProductAdded { product, result } => self.on_product_added(product, result),
            Response::ProductLookup { product, result } => {
                self.on_product_lookup(product, result)
            }
        }
    }

    fn handle_auction_house_event(&mut self, event: AuctionHouseEvent) {
        match event {
            AuctionHouseEvent::BidUpdate(update) => {
                self.view
                    .history
                    .record(BidHistoryEntry::new(update, Local::now()));
                if self.polling.is_paused(Instant::now()) {
                    debug!("bid pushed while typing, leaving the refresh to the timer");
                } else {
                    self.load_catalog(RefreshReason::BidPushed);
                }
            }
            AuctionHouseEvent::StreamClosed(reason) => {
                match &reason {
                    Some(e) => warn!(error = %e, "bid update stream failed"),
                    None => warn!("bid update stream ended"),
                }
                self.bid_updates = None;
                self.view
                    .alert(AlertLevel::Warning, "Live bid updates disconnected");
            }
        }
    }

    fn reject(&mut self, error: ValidationError) {
        debug!(%error, "rejected locally");
        self.view.alert(AlertLevel::Warning, error.to_string());
    }

    /// Register with the auction house under `username`
    pub fn register(&mut self, username: &str) {
        if self.session != Session::Anonymous {
            debug!(session = ?self.session, "registration already done or in flight");
            return;
        }

        let username = username.trim();
        if username.is_empty() {
            self.reject(ValidationError::EmptyUsername);
            return;
        }

        let username = username.to_owned();
        self.session = Session::Registering(username.clone());
        let client = self.client.clone();
        self.spawn_request(async move {
            let result = client.register_user(&username).await;
            Response::Registered { username, result }
        });
    }

    fn on_registered(&mut self, username: UserName, result: Result<String, AuctionHouseError>) {
        match result {
            Ok(message) => {
                info!(%username, %message, "registered");
                self.session = Session::Active(username.clone());
                self.view.username.value = username.clone();
                self.view.username.disabled = true;
                self.view.user_status = Some(format!("✓ Logged in as {username}"));

                self.load_catalog(RefreshReason::Initial);
                self.timer.start();
                if self.sync_mode == SyncMode::Streaming {
                    self.subscribe_bid_updates();
                }

                self.view
                    .alert(AlertLevel::Success, format!("Welcome, {username}!"));
            }
            Err(AuctionHouseError::Rejected(message)) => {
                info!(%username, %message, "registration rejected");
                self.session = Session::Anonymous;
                self.view
                    .alert(AlertLevel::Error, format!("Registration failed: {message}"));
            }
            Err(AuctionHouseError::Network(e)) => {
                warn!(%username, error = %e, "registration failed");
                self.session = Session::Anonymous;
                self.view.alert(AlertLevel::Error, CONNECTION_ERROR_MESSAGE);
            }
        }
    }

    fn load_catalog(&mut self, reason: RefreshReason) {
        if !self.session.is_active() {
            debug!(?reason, "no session, not loading catalog");
            return;
        }

        let seq = self.catalog_requests.issue();
        debug!(seq, ?reason, "loading catalog");
        let client = self.client.clone();
        self.spawn_request(async move {
            Response::Catalog {
                seq,
                result: client.get_catalog().await,
            }
        });
    }

    fn on_catalog(&mut self, seq: u64, result: Result<Vec<Product>, AuctionHouseError>) {
        if !self.catalog_requests.accept(seq) {
            debug!(
                seq,
                last_applied = ?self.catalog_requests.last_applied(),
                "discarding stale catalog response"
            );
            return;
        }

        match result {
            Ok(products) => {
                let count = products.len();
                if self.view.apply_catalog(products) {
                    debug!(
                        seq,
                        count,
                        generation = self.view.catalog.generation(),
                        "catalog rebuilt"
                    );
                    self.release_vanished_focus();
                } else {
                    debug!(seq, "catalog unchanged");
                }
                self.view.last_update = Some(Local::now());
            }
            // the previous catalog stays on display
            Err(e) => warn!(seq, error = %e, "failed to load catalog"),
        }
    }

    /// A bid field removed with its product can't report losing focus
    fn release_vanished_focus(&mut self) {
        let Some(key) = self.polling.focused().map(str::to_owned) else {
            return;
        };
        if self.view.input(&key).is_none() {
            debug!(%key, "focused bid field is gone");
            self.polling.focus_out(&key, Instant::now());
        }
    }

    /// Fetch the catalog now, even while the user is typing
    pub fn manual_refresh(&mut self) {
        if !self.session.is_active() {
            self.reject(ValidationError::NotRegistered);
            return;
        }
        self.load_catalog(RefreshReason::Manual);
        self.view.alert(AlertLevel::Info, "Catalog refreshed");
    }

    /// Bid whatever is typed in the product's bid field
    pub fn place_bid(&mut self, product: ProductNameRef) {
        let Some(buyer) = self.session.active_user().map(str::to_owned) else {
            self.reject(ValidationError::NotRegistered);
            return;
        };

        let amount = self
            .view
            .input(&bid_input_key(product))
            .and_then(|input| parse_amount(&input.value));
        let Some(amount) = amount else {
            self.reject(ValidationError::InvalidAmount);
            return;
        };

        let bid = BidRequest {
            buyer,
            product: product.to_owned(),
            amount,
        };
        debug!(?bid, "placing bid");
        let client = self.client.clone();
        self.spawn_request(async move {
            let result = client.place_bid(&bid).await;
            Response::BidPlaced { bid, result }
        });
    }

    fn on_bid_placed(&mut self, bid: BidRequest, result: Result<BidReceipt, AuctionHouseError>) {
        match result {
            Ok(receipt) => {
                info!(?bid, current_price = receipt.current_price, "bid accepted");
                if let Some(input) = self.view.catalog.input_mut(&bid_input_key(&bid.product)) {
                    input.clear();
                }
                // with the stream on, the auction house echoes our own bid back
                if self.sync_mode == SyncMode::Polling {
                    self.view
                        .history
                        .record(BidHistoryEntry::new(bid.into(), Local::now()));
                }
                self.load_catalog(RefreshReason::AfterBid);
                self.view.alert(
                    AlertLevel::Success,
                    format!(
                        "Bid accepted! Current price: {}",
                        format_price(receipt.current_price)
                    ),
                );
            }
            Err(AuctionHouseError::Rejected(message)) => {
                info!(?bid, %message, "bid rejected");
                self.view.alert(AlertLevel::Error, message);
            }
            Err(AuctionHouseError::Network(e)) => {
                warn!(?bid, error = %e, "bid failed");
                self.view.alert(AlertLevel::Error, BID_ERROR_MESSAGE);
            }
        }
    }

    /// Put a product up for auction, sold by the current user
    pub fn add_product(&mut self, product: ProductNameRef, initial_price: &str) {
        let Some(seller) = self.session.active_user().map(str::to_owned) else {
            self.reject(ValidationError::NotRegistered);
            return;
        };

        let product = product.trim();
        if product.is_empty() {
            self.reject(ValidationError::EmptyProductName);
            return;
        }
        let Some(initial_price) = parse_amount(initial_price) else {
            self.reject(ValidationError::InvalidStartingPrice);
            return;
        };

        let listing = NewProduct {
            seller,
            product: product.to_owned(),
            initial_price,
        };
        let client = self.client.clone();
        self.spawn_request(async move {
            let result = client.add_product(&listing).await;
            Response::ProductAdded {
                product: listing,
                result,
            }
        });
    }

    fn on_product_added(&mut self, listing: NewProduct, result: Result<String, AuctionHouseError>) {
        match result {
            Ok(message) => {
                info!(product = %listing.product, "product listed");
                self.load_catalog(RefreshReason::AfterListing);
                self.view.alert(AlertLevel::Success, message);
            }
            Err(AuctionHouseError::Rejected(message)) => {
                info!(product = %listing.product, %message, "listing rejected");
                self.view.alert(AlertLevel::Error, message);
            }
            Err(AuctionHouseError::Network(e)) => {
                warn!(product = %listing.product, error = %e, "listing failed");
                self.view.alert(AlertLevel::Error, CONNECTION_ERROR_MESSAGE);
            }
        }
    }

    pub fn lookup_product(&mut self, product: ProductNameRef) {
        let product = product.trim();
        if product.is_empty() {
            self.reject(ValidationError::EmptyProductName);
            return;
        }

        let product = product.to_owned();
        let client = self.client.clone();
        self.spawn_request(async move {
            let result = client.get_product(&product).await;
            Response::ProductLookup { product, result }
        });
    }

    fn on_product_lookup(
        &mut self,
        product: ProductName,
        result: Result<Option<Product>, AuctionHouseError>,
    ) {
        match result {
            Ok(Some(found)) => self.view.alert(
                AlertLevel::Info,
                format!(
                    "{}: sold by {}, starting at {}, currently {}",
                    found.name,
                    found.seller,
                    format_price(found.initial_price),
                    format_price(found.current_price)
                ),
            ),
            Ok(None) => self
                .view
                .alert(AlertLevel::Warning, format!("Product {product} not found")),
            Err(AuctionHouseError::Rejected(message)) => {
                self.view.alert(AlertLevel::Error, message)
            }
            Err(AuctionHouseError::Network(e)) => {
                warn!(%product, error = %e, "product lookup failed");
                self.view.alert(AlertLevel::Error, CONNECTION_ERROR_MESSAGE);
            }
        }
    }

    fn subscribe_bid_updates(&mut self) {
        if let Some(previous) = self.bid_updates.take() {
            previous.abort();
        }

        let client = self.client.clone();
        let events = self.events.clone();
        self.bid_updates = Some(tokio::spawn(async move {
            let reason = match client.bid_updates().await {
                Ok(mut updates) => loop {
                    match updates.next().await {
                        Some(Ok(update)) => {
                            let event = Event::AuctionHouse(AuctionHouseEvent::BidUpdate(update));
                            if events.send(event).is_err() {
                                return;
                            }
                        }
                        Some(Err(e)) => break Some(e),
                        None => break None,
                    }
                },
                Err(e) => Some(e),
            };
            let _ = events.send(Event::AuctionHouse(AuctionHouseEvent::StreamClosed(
                reason,
            )));
        }));
    }

    fn spawn_request<F>(&self, request: F)
    where
        F: Future<Output = Response> + Send + 'static,
    {
        let events = self.events.clone();
        tokio::spawn(async move {
            let response = request.await;
            if events.send(Event::Response(response)).is_err() {
                debug!("controller gone, dropping response");
            }
        });
    }
}

#[cfg(test)]
impl Controller {
    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Whether the refresh timer was started
    pub fn is_polling(&self) -> bool {
        self.timer.is_running()
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        if let Some(bid_updates) = self.bid_updates.take() {
            bid_updates.abort();
        }
    }
}
