//! Market feed connection manager.
//!
//! One spawned worker task owns the WebSocket transport and applies
//! every transport event and the reconnect timer serially through
//! [`FeedCore`]. Consumers hold a cheap cloneable [`FeedHandle`] with a
//! command channel for operations that may touch the wire and direct
//! read access to the shared snapshot store.

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::feed::core::{FeedCore, FeedShared};
use crate::feed::wire;
use crate::models::{Config, Snapshot};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWrite = SplitSink<WsStream, Message>;
type WsRead = SplitStream<WsStream>;

#[derive(Debug)]
enum FeedCommand {
    /// Start a session if none is open or connecting. No-op otherwise.
    Connect,
    /// Send a subscription frame for an already-registered symbol.
    Send(String),
}

/// Consumer-facing handle to the feed worker.
///
/// Dropping every handle tears the worker down: the pending reconnect
/// slot is cancelled and the transport closed.
#[derive(Clone)]
pub struct FeedHandle {
    shared: Arc<FeedShared>,
    cmd_tx: mpsc::UnboundedSender<FeedCommand>,
}

impl FeedHandle {
    /// Register a symbol (trimmed, uppercased) and, when the transport
    /// is open, send its subscription frame immediately. Empty input is
    /// a no-op. Returns the normalized symbol.
    ///
    /// The connected flag comes from `add_subscription` itself, observed
    /// under the registry lock: if it reads disconnected the symbol is
    /// guaranteed to ride the next open's resubscription pass, so the
    /// frame is sent exactly once either way.
    pub fn subscribe(&self, symbol: &str) -> Option<String> {
        let (sym, connected) = self.shared.add_subscription(symbol)?;
        if connected {
            let _ = self.cmd_tx.send(FeedCommand::Send(sym.clone()));
        }
        Some(sym)
    }

    /// Remove a symbol from the registry and delete its snapshot
    /// synchronously, regardless of transport state. The feed protocol
    /// has no unsubscribe frame, so nothing is sent.
    pub fn unsubscribe(&self, symbol: &str) -> Option<String> {
        self.shared.remove_subscription(symbol)
    }

    /// Request a connection attempt. Idempotent while a session is open
    /// or connecting; while a reconnect is pending this replaces the
    /// pending slot and connects now.
    pub fn reconnect(&self) {
        let _ = self.cmd_tx.send(FeedCommand::Connect);
    }

    pub fn is_connected(&self) -> bool {
        self.shared.is_connected()
    }

    pub fn last_error(&self) -> Option<String> {
        self.shared.last_error()
    }

    pub fn snapshots(&self) -> HashMap<String, Snapshot> {
        self.shared.snapshots()
    }

    pub fn snapshot(&self, symbol: &str) -> Option<Snapshot> {
        self.shared.snapshot(symbol)
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.shared.subscriptions()
    }
}

pub struct FeedManager;

impl FeedManager {
    /// Spawn the feed worker and return the consumer handle. An initial
    /// connection attempt is queued immediately.
    pub fn spawn(config: &Config) -> FeedHandle {
        let shared = Arc::new(FeedShared::default());
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        let handle = FeedHandle {
            shared: shared.clone(),
            cmd_tx,
        };
        handle.reconnect();

        let url = config.feed_url.clone();
        let delay = config.reconnect_delay;
        tokio::spawn(async move {
            run(url, delay, shared, cmd_rx).await;
            debug!("feed worker stopped");
        });

        handle
    }
}

async fn run(
    url: String,
    reconnect_delay: Duration,
    shared: Arc<FeedShared>,
    mut cmd_rx: mpsc::UnboundedReceiver<FeedCommand>,
) {
    use crate::feed::core::SessionState;

    let mut core = FeedCore::new(shared);

    loop {
        match core.session {
            SessionState::Idle => match cmd_rx.recv().await {
                None => return,
                Some(FeedCommand::Connect) => {
                    if !establish(&url, &mut core, &mut cmd_rx).await {
                        return;
                    }
                }
                // Registry already holds the symbol; it goes out with
                // the next successful open.
                Some(FeedCommand::Send(_)) => {}
            },
            SessionState::ReconnectPending => {
                // Single-slot timer: the sleep exists only while this
                // state is active, so re-arming can never stack timers,
                // and dropping the worker cancels it.
                tokio::select! {
                    _ = sleep(reconnect_delay) => {
                        if !establish(&url, &mut core, &mut cmd_rx).await {
                            return;
                        }
                    }
                    cmd = cmd_rx.recv() => match cmd {
                        None => return,
                        Some(FeedCommand::Connect) => {
                            if !establish(&url, &mut core, &mut cmd_rx).await {
                                return;
                            }
                        }
                        Some(FeedCommand::Send(_)) => {}
                    }
                }
            }
            // `establish` runs the session to completion, leaving Idle
            // or ReconnectPending behind.
            SessionState::Connecting | SessionState::Open => unreachable!(),
        }
    }
}

/// Attempt one connection and, on success, run the session until it
/// ends. Returns `false` when the worker should shut down.
async fn establish(
    url: &str,
    core: &mut FeedCore,
    cmd_rx: &mut mpsc::UnboundedReceiver<FeedCommand>,
) -> bool {
    core.on_connecting();
    info!(url, "connecting to market feed");

    let stream = match connect_async(url).await {
        Ok((stream, response)) => {
            debug!(status = %response.status(), "feed transport established");
            stream
        }
        Err(e) => {
            // Leaves the reconnect slot armed; the run loop's timer
            // fires the next attempt after the fixed delay.
            warn!(error = %e, "failed to open market feed transport");
            core.on_connect_failure();
            return true;
        }
    };

    let (mut write, read) = stream.split();

    for frame in core.on_open() {
        if let Err(e) = write.send(Message::Text(frame)).await {
            warn!(error = %e, "resubscription send failed");
            core.on_transport_error();
            core.on_close();
            return true;
        }
    }

    session_loop(core, cmd_rx, write, read).await
}

/// Serve an open session. Returns `false` on teardown.
async fn session_loop(
    core: &mut FeedCore,
    cmd_rx: &mut mpsc::UnboundedReceiver<FeedCommand>,
    mut write: WsWrite,
    mut read: WsRead,
) -> bool {
    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => match cmd {
                None => {
                    let _ = write.close().await;
                    return false;
                }
                Some(FeedCommand::Connect) => {
                    debug!("connect requested while session open; ignoring");
                }
                Some(FeedCommand::Send(symbol)) => {
                    let frame = wire::subscribe_frame(&symbol);
                    if let Err(e) = write.send(Message::Text(frame)).await {
                        warn!(error = %e, symbol, "subscription send failed");
                        core.on_transport_error();
                        core.on_close();
                        return true;
                    }
                }
            },
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    core.apply_inbound(&text);
                }
                Some(Ok(Message::Ping(payload))) => {
                    let _ = write.send(Message::Pong(payload)).await;
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "market feed closed by server");
                    core.on_close();
                    return true;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "market feed transport error");
                    core.on_transport_error();
                    core.on_close();
                    return true;
                }
                None => {
                    core.on_close();
                    return true;
                }
            }
        }
    }
}
