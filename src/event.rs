use crate::auction::{
    AuctionHouseError, BidReceipt, BidRequest, BidUpdate, NewProduct, Product, ProductName,
    UserName,
};
use crate::view::{InputKey, Selection, View};
use serde::Deserialize;
use tokio::sync::{mpsc, oneshot};

/// Everything the controller loop reacts to, apart from its own refresh timer
#[derive(Debug)]
pub enum Event {
    Ui(UiEvent),
    Response(Response),
    AuctionHouse(AuctionHouseEvent),
    /// Someone wants a copy of the current view
    Snapshot(oneshot::Sender<View>),
}

/// User interaction with the client document
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UiEvent {
    Register {
        name: String,
    },
    PlaceBid {
        product: ProductName,
    },
    ManualRefresh,
    AddProduct {
        product: ProductName,
        initial_price: String,
    },
    LookupProduct {
        product: ProductName,
    },
    FocusIn {
        key: InputKey,
    },
    Input {
        key: InputKey,
        value: String,
        #[serde(default)]
        selection: Option<Selection>,
    },
    /// Cursor moved without the value changing
    Select {
        key: InputKey,
        selection: Selection,
    },
    FocusOut {
        key: InputKey,
    },
    DismissAlerts,
}

/// Completion of a request the controller spawned
#[derive(Debug)]
pub enum Response {
    Registered {
        username: UserName,
        result: Result<String, AuctionHouseError>,
    },
    Catalog {
        seq: u64,
        result: Result<Vec<Product>, AuctionHouseError>,
    },
    BidPlaced {
        bid: BidRequest,
        result: Result<BidReceipt, AuctionHouseError>,
    },
    ProductAdded {
        product: NewProduct,
        result: Result<String, AuctionHouseError>,
    },
    ProductLookup {
        product: ProductName,
        result: Result<Option<Product>, AuctionHouseError>,
    },
}

/// Pushed by the auction house on the bid update stream
#[derive(Debug, PartialEq)]
pub enum AuctionHouseEvent {
    BidUpdate(BidUpdate),
    /// The stream ended, with the error that ended it if any
    StreamClosed(Option<AuctionHouseError>),
}

pub type EventSender = mpsc::UnboundedSender<Event>;
pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
