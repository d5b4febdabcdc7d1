use std::{net::SocketAddr, time::Duration};

use anyhow::Result;
use axum::{http::StatusCode, routing::post, Json, Router};
use futures::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use crate::{
    auction::{AuctionHouseError, BidRequest, BidUpdate, NewProduct},
    service::{AuctionHouseClient, HttpAuctionHouseClient, MAX_BID_UPDATE_LINE},
};

const TIMEOUT: Duration = Duration::from_secs(2);

async fn register_user(Json(body): Json<Value>) -> Json<Value> {
    let name = body["name"].as_str().unwrap_or_default();
    if name == "taken" {
        Json(json!({ "success": false, "message": "User taken already exists" }))
    } else {
        Json(json!({ "success": true, "message": format!("User {name} registered successfully") }))
    }
}

async fn get_catalog() -> Json<Value> {
    Json(json!({
        "products": [
            { "product": "Laptop", "seller": "John", "initial_price": 500.0, "current_price": 510.0 },
            { "product": "Phone", "seller": "Mary", "initial_price": 300.0, "current_price": 300.0 }
        ]
    }))
}

async fn place_bid(Json(body): Json<Value>) -> Json<Value> {
    let amount = body["amount"].as_f64().unwrap_or_default();
    if body["buyer"] == "alice" && body["product"] == "Laptop" && amount > 510.0 {
        Json(json!({ "success": true, "message": "Bid accepted", "current_price": amount }))
    } else {
        Json(json!({ "success": false, "message": "Bid must be higher than 510.00" }))
    }
}

async fn add_product(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({
        "success": true,
        "message": format!("Product {} added successfully", body["product"].as_str().unwrap_or_default())
    }))
}

async fn get_product() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn stream_bid_updates() -> String {
    [
        r#"{"buyer":"alice","product":"Laptop","amount":520.0}"#,
        "",
        r#"{"buyer":"bob","product":"Phone","amount":301.5}"#,
        "",
    ]
    .join("\n")
}

/// Stand-in for the HTTP/JSON bridge, on a random local port
async fn start_bridge() -> Result<SocketAddr> {
    let app = Router::new()
        .route("/auction.AuctionService/RegisterUser", post(register_user))
        .route("/auction.AuctionService/GetCatalog", post(get_catalog))
        .route("/auction.AuctionService/PlaceBid", post(place_bid))
        .route("/auction.AuctionService/AddProduct", post(add_product))
        .route("/auction.AuctionService/GetProduct", post(get_product))
        .route(
            "/auction.AuctionService/StreamBidUpdates",
            post(stream_bid_updates),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let address = listener.local_addr()?;
    tokio::spawn(async move { axum::serve(listener, app).await });
    Ok(address)
}

/// A bridge whose bid update stream is the given body
async fn start_stream_bridge(body: String) -> Result<SocketAddr> {
    let app = Router::new().route(
        "/auction.AuctionService/StreamBidUpdates",
        post(move || async move { body }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let address = listener.local_addr()?;
    tokio::spawn(async move { axum::serve(listener, app).await });
    Ok(address)
}

async fn client() -> Result<HttpAuctionHouseClient> {
    let address = start_bridge().await?;
    HttpAuctionHouseClient::new(format!("http://{address}/"), TIMEOUT)
}

#[tokio::test]
async fn registers_users() -> Result<()> {
    let client = client().await?;

    assert_eq!(
        client.register_user("alice").await,
        Ok("User alice registered successfully".to_owned())
    );
    assert_eq!(
        client.register_user("taken").await,
        Err(AuctionHouseError::Rejected(
            "User taken already exists".to_owned()
        ))
    );

    Ok(())
}

#[tokio::test]
async fn fetches_the_catalog() -> Result<()> {
    let client = client().await?;

    let catalog = client.get_catalog().await?;

    let summary: Vec<_> = catalog
        .iter()
        .map(|p| (p.name.as_str(), p.seller.as_str(), p.current_price))
        .collect();
    assert_eq!(
        summary,
        vec![("Laptop", "John", 510.0), ("Phone", "Mary", 300.0)]
    );

    Ok(())
}

#[tokio::test]
async fn places_bids() -> Result<()> {
    let client = client().await?;
    let bid = |amount| BidRequest {
        buyer: "alice".to_owned(),
        product: "Laptop".to_owned(),
        amount,
    };

    let receipt = client.place_bid(&bid(600.0)).await?;
    assert_eq!(receipt.current_price, 600.0);
    assert_eq!(receipt.message, "Bid accepted");

    assert_eq!(
        client.place_bid(&bid(505.0)).await,
        Err(AuctionHouseError::Rejected(
            "Bid must be higher than 510.00".to_owned()
        ))
    );

    Ok(())
}

#[tokio::test]
async fn lists_products() -> Result<()> {
    let client = client().await?;

    let message = client
        .add_product(&NewProduct {
            seller: "alice".to_owned(),
            product: "Watch".to_owned(),
            initial_price: 80.0,
        })
        .await?;

    assert_eq!(message, "Product Watch added successfully");
    Ok(())
}

#[tokio::test]
async fn server_error_is_a_network_failure() -> Result<()> {
    let client = client().await?;

    let result = client.get_product("Laptop").await;

    assert!(matches!(result, Err(AuctionHouseError::Network(_))));
    Ok(())
}

#[tokio::test]
async fn unreachable_bridge_is_a_network_failure() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let address = listener.local_addr()?;
    drop(listener);
    let client = HttpAuctionHouseClient::new(format!("http://{address}"), TIMEOUT)?;

    assert!(matches!(
        client.get_catalog().await,
        Err(AuctionHouseError::Network(_))
    ));
    Ok(())
}

#[tokio::test]
async fn bid_update_stream() -> Result<()> {
    let client = client().await?;

    let updates: Vec<_> = client.bid_updates().await?.collect().await;

    assert_eq!(
        updates,
        vec![
            Ok(BidUpdate {
                buyer: "alice".to_owned(),
                product: "Laptop".to_owned(),
                amount: 520.0,
            }),
            Ok(BidUpdate {
                buyer: "bob".to_owned(),
                product: "Phone".to_owned(),
                amount: 301.5,
            }),
        ]
    );

    Ok(())
}

#[tokio::test]
async fn oversized_bid_update_line_is_refused() -> Result<()> {
    let huge = format!(
        r#"{{"buyer":"{}","product":"Laptop","amount":520.0}}"#,
        "x".repeat(MAX_BID_UPDATE_LINE)
    );
    let address = start_stream_bridge(format!("{huge}\n")).await?;
    let client = HttpAuctionHouseClient::new(format!("http://{address}"), TIMEOUT)?;

    let first = client.bid_updates().await?.next().await;

    assert!(matches!(first, Some(Err(AuctionHouseError::Network(_)))));
    Ok(())
}
