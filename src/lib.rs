//! Tickspread Backend Library
//!
//! Live market-feed subscription manager and pairwise trade signal
//! engine: a WebSocket feed client with reconnect/resubscribe, a
//! per-symbol snapshot store, and pure pairwise spread checks, fronted
//! by a small JSON API.

pub mod api;
pub mod feed;
pub mod models;
pub mod signal;
