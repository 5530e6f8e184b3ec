//! Shared data models and runtime configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Latest observed state for a single symbol.
///
/// Exactly one snapshot exists per symbol; a newer tick replaces the
/// whole value (no field-level merge). Serialized camelCase because the
/// browser client consumes these verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub symbol: String,
    pub current_price: f64,
    pub open_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    pub volume: u64,
    pub change: f64,
    pub change_percent: f64,
    pub bid_price: f64,
    pub ask_price: f64,
    /// Percentage return derived upstream from the ask vs. a reference.
    /// Absent on the wire means the symbol is non-trading for signals.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ask_return: Option<f64>,
    /// Percentage return derived upstream from the bid vs. a reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bp_return: Option<f64>,
    /// Display timestamp of the last tick (HH:MM:SS).
    pub last_update: String,
    /// Transport state at the time of the last observation.
    pub is_connected: bool,
}

/// Runtime configuration, sourced from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// WebSocket endpoint of the upstream market feed.
    pub feed_url: String,
    /// Port for the consumer-facing HTTP API.
    pub port: u16,
    /// Fixed delay before a reconnect attempt after the transport closes.
    pub reconnect_delay: Duration,
    /// Optional pair-list selector to auto-subscribe at startup.
    pub watch_pairs: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let feed_url = std::env::var("FEED_URL")
            .unwrap_or_else(|_| "ws://localhost:8000/ws/market/feed/".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .unwrap_or(8080);

        let reconnect_delay_secs = std::env::var("RECONNECT_DELAY_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|&v| v > 0)
            .unwrap_or(3);

        let watch_pairs = std::env::var("WATCH_PAIRS").ok().filter(|v| !v.is_empty());

        Ok(Self {
            feed_url,
            port,
            reconnect_delay: Duration::from_secs(reconnect_delay_secs),
            watch_pairs,
        })
    }
}
