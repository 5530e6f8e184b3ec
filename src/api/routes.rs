//! Consumer-facing JSON API over the feed handle.
//!
//! Thin adapter: every route reads the live snapshot store or forwards
//! a subscribe/unsubscribe/reconnect call; all semantics live in the
//! feed and signal modules.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;

use crate::feed::FeedHandle;
use crate::models::Snapshot;
use crate::signal::{engine, pairs, SortOrder, TradeResult};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub feed: FeedHandle,
}

/// Create the API router
pub fn create_router(feed: FeedHandle) -> Router {
    let state = AppState { feed };

    Router::new()
        .route("/health", get(health_check))
        .route("/api/market/snapshots", get(get_snapshots))
        .route("/api/market/snapshot/:symbol", get(get_snapshot))
        .route("/api/market/subscribe", post(post_subscribe))
        .route("/api/market/unsubscribe", post(post_unsubscribe))
        .route("/api/market/reconnect", post(post_reconnect))
        .route("/api/market/differences", get(get_differences))
        .with_state(state)
}

// ===== Route Handlers =====

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        connected: state.feed.is_connected(),
        last_error: state.feed.last_error(),
    })
}

/// Full snapshot store keyed by symbol.
async fn get_snapshots(State(state): State<AppState>) -> Json<SnapshotsResponse> {
    let snapshots = state.feed.snapshots();
    Json(SnapshotsResponse {
        count: snapshots.len(),
        connected: state.feed.is_connected(),
        snapshots,
    })
}

async fn get_snapshot(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<Snapshot>, ApiError> {
    let symbol = symbol.trim().to_uppercase();
    state
        .feed
        .snapshot(&symbol)
        .map(Json)
        .ok_or(ApiError::NotFound(format!("No snapshot for {}", symbol)))
}

async fn post_subscribe(
    State(state): State<AppState>,
    Json(req): Json<SymbolRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let symbol = state
        .feed
        .subscribe(&req.symbol)
        .ok_or(ApiError::BadRequest("Symbol must not be empty".to_string()))?;
    Ok(Json(json!({ "status": "subscribed", "symbol": symbol })))
}

async fn post_unsubscribe(
    State(state): State<AppState>,
    Json(req): Json<SymbolRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let symbol = state
        .feed
        .unsubscribe(&req.symbol)
        .ok_or(ApiError::BadRequest("Symbol must not be empty".to_string()))?;
    Ok(Json(json!({ "status": "unsubscribed", "symbol": symbol })))
}

async fn post_reconnect(State(state): State<AppState>) -> Json<serde_json::Value> {
    state.feed.reconnect();
    Json(json!({ "status": "reconnect requested" }))
}

/// Evaluate a named pair list against the live store.
///
/// `type` selects the list (unknown falls back to default); `sort`
/// orders the pairs by signal difference, untradeable pairs last under
/// `desc`. Pairs without both snapshots carry a null result.
async fn get_differences(
    State(state): State<AppState>,
    Query(params): Query<DifferencesQuery>,
) -> Json<DifferencesResponse> {
    let selector = params.list.as_deref().unwrap_or("default");
    let pair_list = pairs::pairs_for(selector);

    let snapshots = state.feed.snapshots();
    let decisions = engine::evaluate_pairs(pair_list, &snapshots);

    let ordered: Vec<(&str, &str)> = match params.sort.as_deref().and_then(SortOrder::parse) {
        Some(order) => engine::sort_pairs(pair_list, &decisions, order),
        None => pair_list.to_vec(),
    };

    let pairs = ordered
        .into_iter()
        .map(|(a, b)| {
            let key = engine::pair_key(a, b);
            let result = decisions.get(&key).map(TradeResult::from);
            PairDifference {
                pair: key,
                symbols: [a.to_string(), b.to_string()],
                result,
            }
        })
        .collect::<Vec<_>>();

    Json(DifferencesResponse {
        list: selector.to_string(),
        count: pairs.len(),
        pairs,
    })
}

// ===== Request/Response Types =====

#[derive(Deserialize)]
struct SymbolRequest {
    symbol: String,
}

#[derive(Deserialize)]
struct DifferencesQuery {
    /// Pair list selector ("default", "200", "100", "65").
    #[serde(rename = "type")]
    list: Option<String>,
    /// "asc" or "desc"; omitted keeps input order.
    sort: Option<String>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    connected: bool,
    last_error: Option<String>,
}

#[derive(Serialize)]
struct SnapshotsResponse {
    count: usize,
    connected: bool,
    snapshots: HashMap<String, Snapshot>,
}

#[derive(Serialize)]
struct PairDifference {
    pair: String,
    symbols: [String; 2],
    result: Option<TradeResult>,
}

#[derive(Serialize)]
struct DifferencesResponse {
    list: String,
    count: usize,
    pairs: Vec<PairDifference>,
}

// ===== Error Handling =====

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
