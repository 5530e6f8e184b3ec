//! Session state machine and shared feed state.
//!
//! Everything the connection lifecycle mutates lives here, behind fast
//! locks, so the async worker stays a thin transport shim and the whole
//! lifecycle is testable without a socket.

use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::feed::wire::{self, Inbound};
use crate::models::Snapshot;

/// Error string recorded when the transport cannot be constructed.
pub const ERR_CONNECT_FAILED: &str = "Failed to connect to market feed";

/// Error string recorded on a transport-level error event.
pub const ERR_RETRYING: &str = "Connection failed. Retrying...";

/// Lifecycle of the single owned transport session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session yet; `connect` starts one.
    Idle,
    /// Transport handshake in flight.
    Connecting,
    /// Session established; frames flow.
    Open,
    /// Session lost or an attempt failed; the single reconnect slot is
    /// armed.
    ReconnectPending,
}

/// Registry and connection flags, guarded by one lock so that a
/// subscribe's insert-and-check is atomic with respect to the open
/// handshake's collect-and-publish. Without that a subscribe landing
/// mid-open could be both resubscribed and sent live, duplicating its
/// frame.
#[derive(Debug, Default)]
struct ConnState {
    registry: BTreeSet<String>,
    connected: bool,
    last_error: Option<String>,
}

/// State shared between the consumer handle and the feed worker.
///
/// The subscription registry is the authority for what gets re-sent
/// after a reconnect; it survives disconnects and only shrinks on
/// explicit unsubscribe.
#[derive(Default)]
pub struct FeedShared {
    snapshots: RwLock<HashMap<String, Snapshot>>,
    conn: RwLock<ConnState>,
}

impl FeedShared {
    /// Trim and uppercase a symbol; `None` for empty input.
    pub fn normalize_symbol(raw: &str) -> Option<String> {
        let sym = raw.trim().to_uppercase();
        if sym.is_empty() {
            None
        } else {
            Some(sym)
        }
    }

    /// Add a symbol to the registry. Returns the normalized symbol and
    /// whether the transport was connected at the moment of insertion,
    /// observed under the same lock: a `false` here guarantees the next
    /// successful open carries the symbol, so the caller must not also
    /// send it live. `None` for empty input. Idempotent.
    pub fn add_subscription(&self, raw: &str) -> Option<(String, bool)> {
        let sym = Self::normalize_symbol(raw)?;
        let mut conn = self.conn.write();
        conn.registry.insert(sym.clone());
        Some((sym, conn.connected))
    }

    /// Remove a symbol from the registry and delete its snapshot
    /// immediately, regardless of transport state. Idempotent.
    pub fn remove_subscription(&self, raw: &str) -> Option<String> {
        let sym = Self::normalize_symbol(raw)?;
        self.conn.write().registry.remove(&sym);
        self.snapshots.write().remove(&sym);
        Some(sym)
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.conn.read().registry.iter().cloned().collect()
    }

    pub fn snapshots(&self) -> HashMap<String, Snapshot> {
        self.snapshots.read().clone()
    }

    pub fn snapshot(&self, symbol: &str) -> Option<Snapshot> {
        self.snapshots.read().get(symbol).cloned()
    }

    pub fn is_connected(&self) -> bool {
        self.conn.read().connected
    }

    pub fn last_error(&self) -> Option<String> {
        self.conn.read().last_error.clone()
    }
}

/// Drives [`FeedShared`] through the session lifecycle.
///
/// Owned by the worker task; every method corresponds to one transport
/// or timer event, and events are applied strictly one at a time.
pub struct FeedCore {
    shared: Arc<FeedShared>,
    pub session: SessionState,
}

/// Outcome of applying one inbound frame, for logging and tests.
#[derive(Debug, PartialEq, Eq)]
pub enum Applied {
    Ack,
    Tick(String),
    Ignored,
    Malformed,
}

impl FeedCore {
    pub fn new(shared: Arc<FeedShared>) -> Self {
        Self {
            shared,
            session: SessionState::Idle,
        }
    }

    pub fn shared(&self) -> &Arc<FeedShared> {
        &self.shared
    }

    /// Whether a `connect` request should start a handshake. A session
    /// that is already open or connecting makes connect a no-op.
    pub fn should_connect(&self) -> bool {
        matches!(
            self.session,
            SessionState::Idle | SessionState::ReconnectPending
        )
    }

    /// Handshake started. Leaving `ReconnectPending` here disarms the
    /// pending reconnect slot.
    pub fn on_connecting(&mut self) {
        self.session = SessionState::Connecting;
    }

    /// Session established. Marks connected, clears the last error, and
    /// returns one subscription frame per registry entry; each entry is
    /// emitted exactly once per successful open. The registry snapshot
    /// and the connected flag are published in one critical section so
    /// that a concurrent subscribe is either resubscribed here or sent
    /// live, never both.
    pub fn on_open(&mut self) -> Vec<String> {
        self.session = SessionState::Open;

        let frames: Vec<String> = {
            let mut conn = self.shared.conn.write();
            conn.connected = true;
            conn.last_error = None;
            conn.registry.iter().map(|sym| wire::subscribe_frame(sym)).collect()
        };

        info!(subscriptions = frames.len(), "market feed connected");
        frames
    }

    /// Transport construction failed. Records the error string and
    /// re-arms the reconnect slot: every failed attempt is retryable,
    /// and `reconnect` remains the escape hatch for an immediate retry.
    pub fn on_connect_failure(&mut self) {
        self.session = SessionState::ReconnectPending;
        let mut conn = self.shared.conn.write();
        conn.connected = false;
        conn.last_error = Some(ERR_CONNECT_FAILED.to_string());
    }

    /// Transport-level error event. Records the error string only; the
    /// subsequent close event drives reconnection.
    pub fn on_transport_error(&mut self) {
        self.shared.conn.write().last_error = Some(ERR_RETRYING.to_string());
    }

    /// Session closed, cleanly or not. Marks disconnected, flags every
    /// existing snapshot in place (snapshots are deleted only on
    /// unsubscribe), and arms the reconnect slot. Re-entering this state
    /// replaces any pending slot rather than stacking a second one.
    pub fn on_close(&mut self) {
        self.session = SessionState::ReconnectPending;
        self.shared.conn.write().connected = false;

        let mut snapshots = self.shared.snapshots.write();
        for snapshot in snapshots.values_mut() {
            snapshot.is_connected = false;
        }

        info!("market feed disconnected");
    }

    /// Parse one inbound text frame and apply it.
    ///
    /// Ticks overwrite the symbol's snapshot wholesale. The store is
    /// updated even for symbols not in the registry: a late tick for a
    /// just-unsubscribed symbol is accepted by policy. Malformed frames
    /// are logged and dropped and never close the transport.
    pub fn apply_inbound(&mut self, text: &str) -> Applied {
        match wire::parse_inbound(text) {
            Ok(Inbound::Ack(msg)) => {
                debug!(message = %msg, "subscription confirmed");
                Applied::Ack
            }
            Ok(Inbound::Tick(tick)) => {
                let snapshot = tick.into_snapshot();
                let symbol = snapshot.symbol.clone();
                self.shared
                    .snapshots
                    .write()
                    .insert(symbol.clone(), snapshot);
                Applied::Tick(symbol)
            }
            Ok(Inbound::Ignored) => Applied::Ignored,
            Err(e) => {
                warn!(error = %e, "dropping malformed feed frame");
                Applied::Malformed
            }
        }
    }
}
