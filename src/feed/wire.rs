//! Wire protocol for the upstream market feed.
//!
//! Outbound frames are one JSON object per subscription:
//! `{"symbol": "<UPPERCASE>"}`. Inbound frames carry a `message` field:
//! either a subscription acknowledgment (substring "Subscribed") or a
//! tick envelope `{"message": "Received tick", "data": {"data": ...}}`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::Snapshot;

/// Substring that identifies a subscription acknowledgment.
pub const ACK_MARKER: &str = "Subscribed";

/// `message` value of a tick envelope.
pub const TICK_MESSAGE: &str = "Received tick";

/// Raw tick as the feed sends it. Field names follow the upstream
/// short-key convention (o/h/l/c, bp/ap for bid/ask, pch for percent
/// change). Returns and the display timestamp are optional upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTick {
    /// Market code.
    #[serde(default)]
    pub m: String,
    /// Instrument status flag.
    #[serde(default)]
    pub st: String,
    /// Symbol.
    pub s: String,
    /// Exchange timestamp (epoch seconds).
    #[serde(default)]
    pub t: i64,
    pub o: f64,
    pub h: f64,
    pub l: f64,
    pub c: f64,
    pub v: u64,
    /// Last day closing price.
    #[serde(default)]
    pub ldcp: f64,
    pub ch: f64,
    pub pch: f64,
    /// Best bid price / volume.
    pub bp: f64,
    #[serde(default)]
    pub bv: u64,
    /// Best ask price / volume.
    pub ap: f64,
    #[serde(default)]
    pub av: u64,
    /// Traded value.
    #[serde(default)]
    pub val: f64,
    /// Trade count.
    #[serde(default)]
    pub tr: u64,
    /// Last trade time as sent by the exchange.
    #[serde(default)]
    pub lt: Option<String>,
    #[serde(default)]
    pub ask_return: Option<f64>,
    #[serde(default)]
    pub bp_return: Option<f64>,
    #[serde(default)]
    pub formatted_time: Option<String>,
}

impl RawTick {
    /// Normalize into the canonical snapshot shape.
    ///
    /// A tick by definition arrives over a live connection, so the
    /// result always carries `is_connected = true`. When the feed omits
    /// `formatted_time`, the current wall-clock time is substituted.
    pub fn into_snapshot(self) -> Snapshot {
        let last_update = self
            .formatted_time
            .unwrap_or_else(|| chrono::Local::now().format("%H:%M:%S").to_string());

        Snapshot {
            symbol: self.s,
            current_price: self.c,
            open_price: self.o,
            high_price: self.h,
            low_price: self.l,
            volume: self.v,
            change: self.ch,
            change_percent: self.pch,
            bid_price: self.bp,
            ask_price: self.ap,
            ask_return: self.ask_return,
            bp_return: self.bp_return,
            last_update,
            is_connected: true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FeedEnvelope {
    message: String,
    #[serde(default)]
    data: Option<FeedPayload>,
}

#[derive(Debug, Deserialize)]
struct FeedPayload {
    #[serde(rename = "type", default)]
    _kind: Option<String>,
    data: RawTick,
}

/// Classified inbound frame.
#[derive(Debug)]
pub enum Inbound {
    /// Subscription acknowledgment; carries the full server message.
    Ack(String),
    /// A normalizable tick.
    Tick(Box<RawTick>),
    /// Well-formed JSON we do not recognize. Silently ignored upstream.
    Ignored,
}

/// Parse and classify an inbound text frame.
///
/// Errors only on malformed JSON; the caller logs and drops those
/// without touching the transport.
pub fn parse_inbound(text: &str) -> Result<Inbound> {
    let envelope: FeedEnvelope =
        serde_json::from_str(text).context("malformed feed frame")?;

    if envelope.message.contains(ACK_MARKER) {
        return Ok(Inbound::Ack(envelope.message));
    }

    if envelope.message == TICK_MESSAGE {
        if let Some(payload) = envelope.data {
            return Ok(Inbound::Tick(Box::new(payload.data)));
        }
    }

    Ok(Inbound::Ignored)
}

/// Outbound subscription frame for one symbol.
pub fn subscribe_frame(symbol: &str) -> String {
    serde_json::json!({ "symbol": symbol }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick_json() -> String {
        r#"{
            "message": "Received tick",
            "data": {
                "type": "tick",
                "data": {
                    "m": "REG", "st": "OPEN", "s": "OGDC", "t": 1718106000,
                    "o": 109.0, "h": 111.2, "l": 108.4, "c": 110.5,
                    "v": 1250000, "ldcp": 109.0, "ch": 1.5, "pch": 1.38,
                    "bp": 110.4, "bv": 500, "ap": 110.6, "av": 800,
                    "val": 137500000.0, "tr": 4200, "lt": null,
                    "ask_return": 0.42, "bp_return": 0.31,
                    "formatted_time": "14:03:55"
                }
            }
        }"#
        .to_string()
    }

    #[test]
    fn classifies_subscription_ack() {
        let inbound = parse_inbound(r#"{"message": "Subscribed to OGDC"}"#).unwrap();
        assert!(matches!(inbound, Inbound::Ack(msg) if msg.contains("OGDC")));
    }

    #[test]
    fn classifies_tick_envelope() {
        let inbound = parse_inbound(&tick_json()).unwrap();
        let Inbound::Tick(tick) = inbound else {
            panic!("expected tick");
        };
        assert_eq!(tick.s, "OGDC");
        assert_eq!(tick.c, 110.5);
        assert_eq!(tick.ask_return, Some(0.42));
    }

    #[test]
    fn unknown_message_is_ignored() {
        let inbound = parse_inbound(r#"{"message": "heartbeat"}"#).unwrap();
        assert!(matches!(inbound, Inbound::Ignored));
    }

    #[test]
    fn tick_message_without_payload_is_ignored() {
        let inbound = parse_inbound(r#"{"message": "Received tick"}"#).unwrap();
        assert!(matches!(inbound, Inbound::Ignored));
    }

    #[test]
    fn malformed_frame_is_an_error() {
        assert!(parse_inbound("not json").is_err());
        assert!(parse_inbound(r#"{"no_message_field": 1}"#).is_err());
    }

    #[test]
    fn normalizes_tick_into_snapshot() {
        let Inbound::Tick(tick) = parse_inbound(&tick_json()).unwrap() else {
            panic!("expected tick");
        };
        let snap = tick.into_snapshot();
        assert_eq!(snap.symbol, "OGDC");
        assert_eq!(snap.current_price, 110.5);
        assert_eq!(snap.bid_price, 110.4);
        assert_eq!(snap.ask_price, 110.6);
        assert_eq!(snap.last_update, "14:03:55");
        assert!(snap.is_connected);
    }

    #[test]
    fn missing_formatted_time_falls_back_to_wall_clock() {
        let tick: RawTick = serde_json::from_str(
            r#"{"s": "PPL", "o": 1.0, "h": 1.0, "l": 1.0, "c": 1.0,
                "v": 10, "ch": 0.0, "pch": 0.0, "bp": 0.9, "ap": 1.1}"#,
        )
        .unwrap();
        let snap = tick.into_snapshot();
        // HH:MM:SS shape.
        assert_eq!(snap.last_update.len(), 8);
        assert_eq!(snap.last_update.matches(':').count(), 2);
        assert!(snap.is_connected);
        assert_eq!(snap.ask_return, None);
    }

    #[test]
    fn subscribe_frame_shape() {
        let frame = subscribe_frame("OGDC");
        let json: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(json, serde_json::json!({ "symbol": "OGDC" }));
    }
}
