//! Tickspread - live market feed gateway and pairwise signal API.
//!
//! Connects to the upstream tick feed, keeps per-symbol snapshots warm
//! across reconnects, and serves trade-difference signals over HTTP.

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tickspread_backend::{api, feed::FeedManager, models::Config, signal::pairs};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = Config::from_env()?;
    info!(feed_url = %config.feed_url, "starting tickspread backend");

    let feed = FeedManager::spawn(&config);

    // Warm the registry from a named pair list so signals are live from
    // the first tick.
    if let Some(selector) = config.watch_pairs.as_deref() {
        let pair_list = pairs::pairs_for(selector);
        let symbols = pairs::symbols_for(pair_list);
        info!(selector, symbols = symbols.len(), "auto-subscribing watch list");
        for symbol in &symbols {
            feed.subscribe(symbol);
        }
    }

    let app = api::create_router(feed)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;
    info!(port = config.port, "API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server error")?;

    info!("shutting down");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tickspread_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to install ctrl-c handler");
    }
}
