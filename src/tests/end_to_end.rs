use std::sync::Arc;

use pretty_assertions::assert_eq;

use super::Harness;
use crate::{
    config::Config,
    event::UiEvent,
    service::InMemoryAuctionHouse,
    view::bid_input_key,
};

#[tokio::test]
async fn register_then_bid() {
    let house = Arc::new(InMemoryAuctionHouse::new());
    house.list("bob", "widget", 10.0);
    let mut harness = Harness::new(Config::default(), house);

    harness.register("alice").await;
    harness.ui(UiEvent::FocusIn {
        key: bid_input_key("widget"),
    });
    harness.ui(UiEvent::Input {
        key: bid_input_key("widget"),
        value: "50".to_owned(),
        selection: None,
    });
    harness.ui(UiEvent::PlaceBid {
        product: "widget".to_owned(),
    });
    harness.settle().await;

    let view = harness.view();
    assert_eq!(
        view.history.head().map(|entry| entry.describe()),
        Some("alice bid $50.00 on widget".to_owned())
    );
    let card = view.catalog.card("widget").cloned();
    assert_eq!(card.as_ref().map(|c| c.product.current_price), Some(50.0));
    assert_eq!(card.map(|c| c.bid_input.value), Some(String::new()));
    assert_eq!(harness.latest_alert(), "Bid accepted! Current price: $50.00");
}

#[tokio::test]
async fn empty_auction_house() {
    let mut harness = Harness::new(Config::default(), InMemoryAuctionHouse::new_shared());

    harness.register("alice").await;

    assert!(harness.view().catalog.cards().is_empty());
    assert_eq!(
        harness.view().catalog.view(),
        &crate::view::CatalogView::Empty
    );
    assert!(harness.view().history.is_empty());
}
