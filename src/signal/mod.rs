//! Pairwise trade signal computation over live snapshots.

pub mod engine;
pub mod pairs;

pub use engine::{
    evaluate_pair, evaluate_pairs, pair_key, sort_pairs, SortOrder, TradeDecision, TradeResult,
};
