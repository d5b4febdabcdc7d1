//! Runtime configuration
//!
//! Everything comes from environment variables, each with a default.
use std::{env, fmt::Display, net::SocketAddr, str::FromStr, time::Duration};

use anyhow::{format_err, Result};
use thiserror::Error;
use tracing::info;

/// Where the auction house lives
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Backend {
    /// The HTTP/JSON bridge in front of `auction.AuctionService`
    Http { api_url: String },
    /// A local auction house with a demo catalog, no network involved
    InMemory,
}

/// How the controller learns about bids placed by others
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SyncMode {
    /// Periodic catalog fetches only
    Polling,
    /// Periodic catalog fetches plus the server-pushed bid update stream
    Streaming,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown sync mode: {0} (expected `polling` or `streaming`)")]
    UnknownSyncMode(String),
    #[error("unknown backend: {0} (expected `http` or `memory`)")]
    UnknownBackend(String),
}

impl FromStr for SyncMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "polling" => Ok(SyncMode::Polling),
            "streaming" => Ok(SyncMode::Streaming),
            other => Err(ConfigError::UnknownSyncMode(other.to_owned())),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub backend: Backend,
    pub sync_mode: SyncMode,
    pub refresh_interval: Duration,
    pub typing_cooldown: Duration,
    /// How long focus may be away from every bid field before polling resumes
    pub blur_grace: Duration,
    pub max_bid_history: usize,
    pub request_timeout: Duration,
    pub ui_address: SocketAddr,
}

pub const DEFAULT_API_URL: &str = "http://localhost:8080";

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::Http {
                api_url: DEFAULT_API_URL.to_owned(),
            },
            sync_mode: SyncMode::Polling,
            refresh_interval: Duration::from_millis(5000),
            typing_cooldown: Duration::from_millis(2000),
            blur_grace: Duration::from_millis(500),
            max_bid_history: 10,
            request_timeout: Duration::from_millis(5000),
            ui_address: SocketAddr::from(([127, 0, 0, 1], 3000)),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(|key| env::var(key).ok())
    }

    /// Build the configuration from `lookup`, which maps a variable name to
    /// its value when set
    pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let backend = match try_load::<String>(&lookup, "AUCTION_BACKEND", "http")?.as_str() {
            "http" => Backend::Http {
                api_url: try_load(&lookup, "AUCTION_API_URL", DEFAULT_API_URL)?,
            },
            "memory" => Backend::InMemory,
            other => return Err(ConfigError::UnknownBackend(other.to_owned()).into()),
        };

        Ok(Self {
            backend,
            sync_mode: try_load(&lookup, "AUCTION_SYNC_MODE", "polling")?,
            refresh_interval: load_millis(&lookup, "AUCTION_REFRESH_INTERVAL_MS", "5000")?,
            typing_cooldown: load_millis(&lookup, "AUCTION_TYPING_COOLDOWN_MS", "2000")?,
            blur_grace: load_millis(&lookup, "AUCTION_BLUR_GRACE_MS", "500")?,
            max_bid_history: load_nonzero(&lookup, "AUCTION_MAX_BID_HISTORY", "10")?,
            request_timeout: load_millis(&lookup, "AUCTION_REQUEST_TIMEOUT_MS", "5000")?,
            ui_address: try_load(&lookup, "AUCTION_UI_ADDR", "127.0.0.1:3000")?,
        })
    }
}

fn try_load<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> Result<T>
where
    T::Err: Display,
{
    let value = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_owned()
    });

    value
        .parse()
        .map_err(|e| format_err!("Invalid {key} value {value:?}: {e}"))
}

fn load_nonzero<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> Result<T>
where
    T: FromStr + Default + PartialEq,
    T::Err: Display,
{
    let value: T = try_load(lookup, key, default)?;
    if value == T::default() {
        return Err(format_err!("{key} must be greater than zero"));
    }
    Ok(value)
}

fn load_millis(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> Result<Duration> {
    Ok(Duration::from_millis(load_nonzero(lookup, key, default)?))
}
