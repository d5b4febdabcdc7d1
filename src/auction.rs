use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type ProductName = String;
pub type ProductNameRef<'s> = &'s str;
pub type UserName = String;
pub type UserNameRef<'s> = &'s str;

/// A price or a bid
///
/// The auction house speaks JSON numbers, so amounts stay floating point
/// end to end and are only rounded for display.
pub type Amount = f64;

/// Smallest step a new bid has to add on top of the current price
pub const MIN_BID_INCREMENT: Amount = 0.01;

/// A product on sale, as reported by the auction house
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "product")]
    pub name: ProductName,
    pub seller: UserName,
    pub initial_price: Amount,
    pub current_price: Amount,
}

impl Product {
    pub fn min_next_bid(&self) -> Amount {
        self.current_price + MIN_BID_INCREMENT
    }
}

/// A bid we are placing
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BidRequest {
    pub buyer: UserName,
    pub product: ProductName,
    pub amount: Amount,
}

/// An accepted bid, as pushed by the auction house to every subscriber
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BidUpdate {
    pub buyer: UserName,
    pub product: ProductName,
    pub amount: Amount,
}

impl From<BidRequest> for BidUpdate {
    fn from(bid: BidRequest) -> Self {
        Self {
            buyer: bid.buyer,
            product: bid.product,
            amount: bid.amount,
        }
    }
}

/// What the auction house says after accepting a bid
#[derive(Clone, Debug, PartialEq)]
pub struct BidReceipt {
    pub message: String,
    pub current_price: Amount,
}

/// A product we are putting up for auction
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub seller: UserName,
    pub product: ProductName,
    pub initial_price: Amount,
}

/// Input problems caught before anything is sent to the auction house
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter your name")]
    EmptyUsername,
    #[error("Please register first")]
    NotRegistered,
    #[error("Please enter a valid bid amount")]
    InvalidAmount,
    #[error("Please enter a product name")]
    EmptyProductName,
    #[error("Please enter a valid starting price")]
    InvalidStartingPrice,
}

/// Failures of a call to the auction house
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuctionHouseError {
    /// The auction house processed the request and said no
    #[error("{0}")]
    Rejected(String),
    /// The request never got a usable answer
    #[error("network failure: {0}")]
    Network(String),
}

/// Parse a user-typed amount, accepting only finite positive values
pub fn parse_amount(input: &str) -> Option<Amount> {
    input
        .trim()
        .parse::<Amount>()
        .ok()
        .filter(|amount| amount.is_finite() && *amount > 0.0)
}

pub fn format_price(amount: Amount) -> String {
    format!("${amount:.2}")
}
