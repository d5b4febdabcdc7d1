use std::{collections::HashMap, time::Duration};

use anyhow::Result;
use pretty_assertions::assert_eq;

use crate::config::{Backend, Config, SyncMode, DEFAULT_API_URL};

fn load(vars: &[(&str, &str)]) -> Result<Config> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    Config::load_from(|key| vars.get(key).cloned())
}

#[test]
fn defaults() -> Result<()> {
    let config = load(&[])?;

    assert_eq!(
        config.backend,
        Backend::Http {
            api_url: DEFAULT_API_URL.to_owned()
        }
    );
    assert_eq!(config.sync_mode, SyncMode::Polling);
    assert_eq!(config.refresh_interval, Duration::from_millis(5000));
    assert_eq!(config.typing_cooldown, Duration::from_millis(2000));
    assert_eq!(config.blur_grace, Duration::from_millis(500));
    assert_eq!(config.max_bid_history, 10);
    assert_eq!(config.ui_address.to_string(), "127.0.0.1:3000");

    Ok(())
}

#[test]
fn overrides() -> Result<()> {
    let config = load(&[
        ("AUCTION_BACKEND", "memory"),
        ("AUCTION_SYNC_MODE", "Streaming"),
        ("AUCTION_MAX_BID_HISTORY", "3"),
        ("AUCTION_REFRESH_INTERVAL_MS", "250"),
    ])?;

    assert_eq!(config.backend, Backend::InMemory);
    assert_eq!(config.sync_mode, SyncMode::Streaming);
    assert_eq!(config.max_bid_history, 3);
    assert_eq!(config.refresh_interval, Duration::from_millis(250));

    Ok(())
}

#[test]
fn zero_history_capacity_is_refused() {
    assert!(load(&[("AUCTION_MAX_BID_HISTORY", "0")]).is_err());
}

#[test]
fn zero_durations_are_refused() {
    for key in [
        "AUCTION_REFRESH_INTERVAL_MS",
        "AUCTION_TYPING_COOLDOWN_MS",
        "AUCTION_BLUR_GRACE_MS",
        "AUCTION_REQUEST_TIMEOUT_MS",
    ] {
        assert!(load(&[(key, "0")]).is_err(), "{key}=0 was accepted");
    }
}

#[test]
fn unknown_values_are_refused() {
    assert!(load(&[("AUCTION_SYNC_MODE", "carrier-pigeon")]).is_err());
    assert!(load(&[("AUCTION_BACKEND", "ftp")]).is_err());
    assert!(load(&[("AUCTION_MAX_BID_HISTORY", "lots")]).is_err());
}
