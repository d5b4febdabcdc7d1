use super::*;
use futures::{stream, StreamExt};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::auction::{Amount, UserName};

const UPDATES_CAPACITY: usize = 64;

/// Fake in-memory auction house.
///
/// Useful for unit-tests, and as an offline backend. Accepts a bid when it is
/// strictly above the current price and broadcasts it to subscribers.
pub struct InMemoryAuctionHouse {
    state: Mutex<AuctionHouseState>,
    updates: broadcast::Sender<BidUpdate>,
    offline: AtomicBool,
    calls: Mutex<BTreeMap<&'static str, usize>>,
}

#[derive(Default)]
struct AuctionHouseState {
    users: BTreeSet<UserName>,
    /// In listing order
    products: Vec<Product>,
}

impl AuctionHouseState {
    fn product_mut(&mut self, name: ProductNameRef) -> Option<&mut Product> {
        self.products.iter_mut().find(|product| product.name == name)
    }
}

impl InMemoryAuctionHouse {
    pub fn new() -> Self {
        let (updates, _) = broadcast::channel(UPDATES_CAPACITY);
        Self {
            state: Mutex::new(AuctionHouseState::default()),
            updates,
            offline: AtomicBool::new(false),
            calls: Mutex::new(BTreeMap::new()),
        }
    }

    /// A few products to bid on
    pub fn with_demo_catalog() -> Self {
        let house = Self::new();
        for (seller, product, initial_price) in [
            ("John", "Laptop", 500.0),
            ("Mary", "Phone", 300.0),
            ("Peter", "Tablet", 200.0),
        ] {
            house.list(seller, product, initial_price);
        }
        house
    }

    /// Put a product on sale without going through the client interface
    pub fn list(&self, seller: &str, product: &str, initial_price: Amount) {
        self.state.lock().products.push(Product {
            name: product.to_owned(),
            seller: seller.to_owned(),
            initial_price,
            current_price: initial_price,
        });
    }

    fn enter(&self, method: &'static str) -> Result<(), AuctionHouseError> {
        *self.calls.lock().entry(method).or_default() += 1;
        if self.offline.load(Ordering::SeqCst) {
            return Err(AuctionHouseError::Network(
                "auction house unreachable".to_owned(),
            ));
        }
        Ok(())
    }

    fn accept_bid(&self, bid: BidRequest) -> Result<BidReceipt, AuctionHouseError> {
        let mut state = self.state.lock();
        let product = state.product_mut(&bid.product).ok_or_else(|| {
            AuctionHouseError::Rejected(format!("Product {} does not exist", bid.product))
        })?;

        if bid.amount <= product.current_price {
            return Err(AuctionHouseError::Rejected(format!(
                "Bid must be higher than {:.2}",
                product.current_price
            )));
        }
        product.current_price = bid.amount;
        let receipt = BidReceipt {
            message: format!("Bid accepted for {:.2}", bid.amount),
            current_price: product.current_price,
        };
        drop(state);

        debug!(buyer = %bid.buyer, product = %bid.product, amount = bid.amount, "bid accepted");
        // no subscribers is fine
        let _ = self.updates.send(bid.into());
        Ok(receipt)
    }
}

#[cfg(test)]
impl InMemoryAuctionHouse {
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Make every call fail as if the auction house was unreachable
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// How many times a method was called, by its service method name
    pub fn call_count(&self, method: &str) -> usize {
        self.calls.lock().get(method).copied().unwrap_or(0)
    }

    /// Record a bid by someone else, as if placed through another client
    pub fn accept_external_bid(&self, bid: BidRequest) -> Result<BidReceipt, AuctionHouseError> {
        self.accept_bid(bid)
    }
}

impl Default for InMemoryAuctionHouse {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuctionHouseClient for InMemoryAuctionHouse {
    async fn register_user(&self, name: UserNameRef<'_>) -> Result<String, AuctionHouseError> {
        self.enter("RegisterUser")?;
        if self.state.lock().users.insert(name.to_owned()) {
            Ok(format!("User {name} registered successfully"))
        } else {
            Err(AuctionHouseError::Rejected(format!(
                "User {name} already exists"
            )))
        }
    }

    async fn get_catalog(&self) -> Result<Vec<Product>, AuctionHouseError> {
        self.enter("GetCatalog")?;
        Ok(self.state.lock().products.clone())
    }

    async fn place_bid(&self, bid: &BidRequest) -> Result<BidReceipt, AuctionHouseError> {
        self.enter("PlaceBid")?;
        self.accept_bid(bid.clone())
    }

    async fn add_product(&self, product: &NewProduct) -> Result<String, AuctionHouseError> {
        self.enter("AddProduct")?;
        let mut state = self.state.lock();
        if state.product_mut(&product.product).is_some() {
            return Err(AuctionHouseError::Rejected(format!(
                "Product {} already exists",
                product.product
            )));
        }
        state.products.push(Product {
            name: product.product.clone(),
            seller: product.seller.clone(),
            initial_price: product.initial_price,
            current_price: product.initial_price,
        });
        Ok(format!("Product {} added successfully", product.product))
    }

    async fn get_product(
        &self,
        product: ProductNameRef<'_>,
    ) -> Result<Option<Product>, AuctionHouseError> {
        self.enter("GetProduct")?;
        Ok(self
            .state
            .lock()
            .products
            .iter()
            .find(|p| p.name == product)
            .cloned())
    }

    async fn bid_updates(&self) -> Result<BidUpdateStream, AuctionHouseError> {
        self.enter("StreamBidUpdates")?;
        let updates = self.updates.subscribe();
        Ok(stream::unfold(updates, |mut updates| async move {
            loop {
                match updates.recv().await {
                    Ok(update) => return Some((Ok(update), updates)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "bid update subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
        .boxed())
    }
}
