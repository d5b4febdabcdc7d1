use super::*;
use crate::auction::Amount;
use futures::{StreamExt, TryStreamExt};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{io, time::Duration};
use tokio_util::{
    codec::{FramedRead, LinesCodec},
    io::StreamReader,
};
use tracing::debug;

/// Longest accepted line on the bid update stream, in bytes
pub const MAX_BID_UPDATE_LINE: usize = 64 * 1024;

/// Client of the HTTP/JSON bridge
///
/// Every method is a `POST {api_url}/auction.AuctionService/<Method>` with a
/// JSON body. Non-2xx answers and bodies that don't decode count as network
/// failures, `success: false` answers as rejections.
#[derive(Clone, Debug)]
pub struct HttpAuctionHouseClient {
    client: Client,
    api_url: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct Empty {}

#[derive(Serialize)]
struct RegisterUserRequest<'a> {
    name: &'a str,
}

#[derive(Serialize)]
struct GetProductRequest<'a> {
    product: &'a str,
}

#[derive(Deserialize)]
struct Ack {
    success: bool,
    #[serde(default)]
    message: String,
}

impl Ack {
    fn into_result(self) -> Result<String, AuctionHouseError> {
        if self.success {
            Ok(self.message)
        } else {
            Err(AuctionHouseError::Rejected(self.message))
        }
    }
}

#[derive(Deserialize)]
struct CatalogResponse {
    products: Option<Vec<Product>>,
}

#[derive(Deserialize)]
struct PlaceBidResponse {
    success: bool,
    #[serde(default)]
    message: String,
    #[serde(default)]
    current_price: Amount,
}

#[derive(Deserialize)]
struct GetProductResponse {
    found: bool,
    product: Option<Product>,
}

impl From<reqwest::Error> for AuctionHouseError {
    fn from(e: reqwest::Error) -> Self {
        AuctionHouseError::Network(e.to_string())
    }
}

impl HttpAuctionHouseClient {
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            // the total timeout is set per unary call, it would cut the stream
            client: Client::builder().connect_timeout(timeout).build()?,
            api_url: api_url.into(),
            timeout,
        })
    }

    pub fn new_shared(api_url: &str, timeout: Duration) -> Result<SharedAuctionHouseClient> {
        Ok(Arc::new(Self::new(api_url, timeout)?))
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/{SERVICE_NAME}/{method}",
            self.api_url.trim_end_matches('/')
        )
    }

    async fn call<Req, Resp>(&self, method: &str, body: &Req) -> Result<Resp, AuctionHouseError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        debug!(method, "calling auction house");
        let response = self
            .client
            .post(self.method_url(method))
            .timeout(self.timeout)
            .json(body)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl AuctionHouseClient for HttpAuctionHouseClient {
    async fn register_user(&self, name: UserNameRef<'_>) -> Result<String, AuctionHouseError> {
        self.call::<_, Ack>("RegisterUser", &RegisterUserRequest { name })
            .await?
            .into_result()
    }

    async fn get_catalog(&self) -> Result<Vec<Product>, AuctionHouseError> {
        let response: CatalogResponse = self.call("GetCatalog", &Empty {}).await?;
        Ok(response.products.unwrap_or_default())
    }

    async fn place_bid(&self, bid: &BidRequest) -> Result<BidReceipt, AuctionHouseError> {
        let response: PlaceBidResponse = self.call("PlaceBid", bid).await?;
        if response.success {
            Ok(BidReceipt {
                message: response.message,
                current_price: response.current_price,
            })
        } else {
            Err(AuctionHouseError::Rejected(response.message))
        }
    }

    async fn add_product(&self, product: &NewProduct) -> Result<String, AuctionHouseError> {
        self.call::<_, Ack>("AddProduct", product)
            .await?
            .into_result()
    }

    async fn get_product(
        &self,
        product: ProductNameRef<'_>,
    ) -> Result<Option<Product>, AuctionHouseError> {
        let response: GetProductResponse = self
            .call("GetProduct", &GetProductRequest { product })
            .await?;
        Ok(if response.found { response.product } else { None })
    }

    /// The bridge answers `StreamBidUpdates` with a never-ending body of
    /// newline-delimited JSON bid updates
    async fn bid_updates(&self) -> Result<BidUpdateStream, AuctionHouseError> {
        debug!("subscribing to bid updates");
        let response = self
            .client
            .post(self.method_url("StreamBidUpdates"))
            .json(&Empty {})
            .send()
            .await?
            .error_for_status()?;

        let body = StreamReader::new(response.bytes_stream().map_err(io::Error::other));

        let lines = FramedRead::new(body, LinesCodec::new_with_max_length(MAX_BID_UPDATE_LINE));

        Ok(lines
            .filter_map(|line| async move {
                match line {
                    Ok(line) if line.trim().is_empty() => None,
                    Ok(line) => Some(serde_json::from_str::<BidUpdate>(&line).map_err(|e| {
                        AuctionHouseError::Network(format!("malformed bid update: {e}"))
                    })),
                    Err(e) => Some(Err(AuctionHouseError::Network(e.to_string()))),
                }
            })
            .boxed())
    }
}
