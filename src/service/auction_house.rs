//! The remote `auction.AuctionService`
//!
//! All bidding rules, auction state and ordering of concurrent bids live on
//! the other side of this trait. The client only forwards requests and
//! reports answers.
use std::sync::Arc;

use crate::{
    auction::{
        AuctionHouseError, BidReceipt, BidRequest, BidUpdate, NewProduct, Product,
        ProductNameRef, UserNameRef,
    },
    config::{Backend, Config},
};
use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;

mod http;
mod in_memory;
pub use self::{http::*, in_memory::*};

/// Fully qualified service name, used as the path prefix of every method
pub const SERVICE_NAME: &str = "auction.AuctionService";

pub type BidUpdateStream = BoxStream<'static, Result<BidUpdate, AuctionHouseError>>;

#[async_trait]
pub trait AuctionHouseClient: Send + Sync {
    /// Returns the auction house's welcome message
    async fn register_user(&self, name: UserNameRef<'_>) -> Result<String, AuctionHouseError>;

    async fn get_catalog(&self) -> Result<Vec<Product>, AuctionHouseError>;

    async fn place_bid(&self, bid: &BidRequest) -> Result<BidReceipt, AuctionHouseError>;

    async fn add_product(&self, product: &NewProduct) -> Result<String, AuctionHouseError>;

    async fn get_product(
        &self,
        product: ProductNameRef<'_>,
    ) -> Result<Option<Product>, AuctionHouseError>;

    /// Subscribe to accepted bids, as they happen
    async fn bid_updates(&self) -> Result<BidUpdateStream, AuctionHouseError>;
}

pub type SharedAuctionHouseClient = Arc<dyn AuctionHouseClient + Send + Sync + 'static>;

pub fn new_shared(config: &Config) -> Result<SharedAuctionHouseClient> {
    Ok(match &config.backend {
        Backend::Http { api_url } => {
            HttpAuctionHouseClient::new_shared(api_url, config.request_timeout)?
        }
        Backend::InMemory => Arc::new(InMemoryAuctionHouse::with_demo_catalog()),
    })
}
