//! Pairwise trade signal engine.
//!
//! Pure functions over two snapshots. Decisions are cheap and always
//! recomputed from the live store; nothing here is cached.

use serde::Serialize;
use std::collections::HashMap;

use crate::models::Snapshot;

/// Decision for an ordered pair of snapshots `(a, b)`.
///
/// The two checks are evaluated in fixed order and the first hit wins,
/// so the result is deterministic even in the degenerate case where
/// both spreads would qualify.
#[derive(Debug, Clone, PartialEq)]
pub enum TradeDecision {
    NoTrade,
    /// `a` ask return under `b` bid return: long a, short b.
    Check1 {
        long: String,
        short: String,
        difference: f64,
    },
    /// `b` ask return under `a` bid return: long b, short a.
    Check2 {
        long: String,
        short: String,
        difference: f64,
    },
}

impl TradeDecision {
    pub fn label(&self) -> &'static str {
        match self {
            TradeDecision::NoTrade => "No Trade",
            TradeDecision::Check1 { .. } => "Check 1",
            TradeDecision::Check2 { .. } => "Check 2",
        }
    }

    pub fn long(&self) -> Option<&str> {
        match self {
            TradeDecision::NoTrade => None,
            TradeDecision::Check1 { long, .. } | TradeDecision::Check2 { long, .. } => {
                Some(long)
            }
        }
    }

    pub fn short(&self) -> Option<&str> {
        match self {
            TradeDecision::NoTrade => None,
            TradeDecision::Check1 { short, .. } | TradeDecision::Check2 { short, .. } => {
                Some(short)
            }
        }
    }

    pub fn difference(&self) -> Option<f64> {
        match self {
            TradeDecision::NoTrade => None,
            TradeDecision::Check1 { difference, .. }
            | TradeDecision::Check2 { difference, .. } => Some(*difference),
        }
    }

    /// Difference as the reported fixed 4-decimal string.
    pub fn difference_display(&self) -> Option<String> {
        self.difference().map(|d| format!("{d:.4}"))
    }
}

/// Trade decision in the consumer response shape.
#[derive(Debug, Clone, Serialize)]
pub struct TradeResult {
    pub check: String,
    pub long: Option<String>,
    pub short: Option<String>,
    pub difference: Option<String>,
}

impl From<&TradeDecision> for TradeResult {
    fn from(decision: &TradeDecision) -> Self {
        Self {
            check: decision.label().to_string(),
            long: decision.long().map(str::to_string),
            short: decision.short().map(str::to_string),
            difference: decision.difference_display(),
        }
    }
}

/// Differences are reported to 4 decimal places.
fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// Evaluate one ordered pair. Total over any two snapshots: an absent
/// return on either side makes that check false, never an error.
pub fn evaluate_pair(a: &Snapshot, b: &Snapshot) -> TradeDecision {
    if let (Some(ask), Some(bid)) = (a.ask_return, b.bp_return) {
        if ask < bid {
            return TradeDecision::Check1 {
                long: a.symbol.clone(),
                short: b.symbol.clone(),
                difference: round4(bid - ask),
            };
        }
    }

    if let (Some(ask), Some(bid)) = (b.ask_return, a.bp_return) {
        if ask < bid {
            return TradeDecision::Check2 {
                long: b.symbol.clone(),
                short: a.symbol.clone(),
                difference: round4(bid - ask),
            };
        }
    }

    TradeDecision::NoTrade
}

/// Key identifying an ordered pair in a batch result.
pub fn pair_key(a: &str, b: &str) -> String {
    format!("{a}-{b}")
}

/// Evaluate an ordered list of pairs against the current store. Pairs
/// where either symbol has no snapshot yet are omitted, not cached as
/// `NoTrade`.
pub fn evaluate_pairs(
    pairs: &[(&str, &str)],
    snapshots: &HashMap<String, Snapshot>,
) -> HashMap<String, TradeDecision> {
    let mut decisions = HashMap::with_capacity(pairs.len());
    for &(a, b) in pairs {
        if let (Some(snap_a), Some(snap_b)) = (snapshots.get(a), snapshots.get(b)) {
            decisions.insert(pair_key(a, b), evaluate_pair(snap_a, snap_b));
        }
    }
    decisions
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "asc" => Some(SortOrder::Ascending),
            "desc" => Some(SortOrder::Descending),
            _ => None,
        }
    }
}

/// Order pairs by signal difference. Pairs with no computed difference
/// (no decision, or `NoTrade`) sort as negative infinity, so descending
/// order always places them last. Tie order is unspecified.
pub fn sort_pairs<'a>(
    pairs: &[(&'a str, &'a str)],
    decisions: &HashMap<String, TradeDecision>,
    order: SortOrder,
) -> Vec<(&'a str, &'a str)> {
    let difference_of = |&(a, b): &(&str, &str)| -> f64 {
        decisions
            .get(&pair_key(a, b))
            .and_then(|d| d.difference())
            .unwrap_or(f64::NEG_INFINITY)
    };

    let mut sorted = pairs.to_vec();
    sorted.sort_by(|x, y| {
        let (dx, dy) = (difference_of(x), difference_of(y));
        let ord = dx.partial_cmp(&dy).unwrap_or(std::cmp::Ordering::Equal);
        match order {
            SortOrder::Ascending => ord,
            SortOrder::Descending => ord.reverse(),
        }
    });
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(symbol: &str, ask_return: Option<f64>, bp_return: Option<f64>) -> Snapshot {
        Snapshot {
            symbol: symbol.to_string(),
            current_price: 100.0,
            open_price: 100.0,
            high_price: 100.0,
            low_price: 100.0,
            volume: 1000,
            change: 0.0,
            change_percent: 0.0,
            bid_price: 99.9,
            ask_price: 100.1,
            ask_return,
            bp_return,
            last_update: "10:00:00".to_string(),
            is_connected: true,
        }
    }

    #[test]
    fn check1_when_a_ask_under_b_bid() {
        let a = snapshot("A", Some(1.0), None);
        let b = snapshot("B", None, Some(2.0));

        let decision = evaluate_pair(&a, &b);
        assert_eq!(decision.label(), "Check 1");
        assert_eq!(decision.long(), Some("A"));
        assert_eq!(decision.short(), Some("B"));
        assert_eq!(decision.difference_display().as_deref(), Some("1.0000"));
    }

    #[test]
    fn check2_when_b_ask_under_a_bid() {
        let a = snapshot("A", None, Some(2.0));
        let b = snapshot("B", Some(1.0), None);

        let decision = evaluate_pair(&a, &b);
        assert_eq!(decision.label(), "Check 2");
        assert_eq!(decision.long(), Some("B"));
        assert_eq!(decision.short(), Some("A"));
        assert_eq!(decision.difference_display().as_deref(), Some("1.0000"));
    }

    #[test]
    fn no_trade_when_neither_spread_qualifies() {
        let a = snapshot("A", Some(1.0), Some(0.5));
        let b = snapshot("B", Some(1.0), Some(0.5));

        let decision = evaluate_pair(&a, &b);
        assert_eq!(decision, TradeDecision::NoTrade);
        assert_eq!(decision.difference(), None);
    }

    #[test]
    fn absent_returns_mean_non_trading() {
        let a = snapshot("A", None, None);
        let b = snapshot("B", None, None);
        assert_eq!(evaluate_pair(&a, &b), TradeDecision::NoTrade);

        // One-sided absence too: the comparison never fails, it is false.
        let a = snapshot("A", Some(1.0), None);
        let b = snapshot("B", Some(1.0), None);
        assert_eq!(evaluate_pair(&a, &b), TradeDecision::NoTrade);
    }

    #[test]
    fn first_check_wins_order() {
        // Both directions qualify; the fixed check order must pick Check 1.
        let a = snapshot("A", Some(-5.0), Some(10.0));
        let b = snapshot("B", Some(-5.0), Some(10.0));

        let decision = evaluate_pair(&a, &b);
        assert_eq!(decision.label(), "Check 1");
        assert_eq!(decision.long(), Some("A"));
    }

    #[test]
    fn difference_rounds_to_four_places() {
        let a = snapshot("A", Some(0.00001), None);
        let b = snapshot("B", None, Some(1.23456));

        let decision = evaluate_pair(&a, &b);
        assert_eq!(decision.difference_display().as_deref(), Some("1.2346"));
    }

    #[test]
    fn batch_omits_pairs_with_missing_snapshots() {
        let mut store = HashMap::new();
        store.insert("A".to_string(), snapshot("A", Some(1.0), None));
        store.insert("B".to_string(), snapshot("B", None, Some(2.0)));

        let decisions = evaluate_pairs(&[("A", "B"), ("A", "MISSING")], &store);
        assert_eq!(decisions.len(), 1);
        assert!(decisions.contains_key("A-B"));
        assert!(!decisions.contains_key("A-MISSING"));
    }

    #[test]
    fn descending_sort_places_untradeable_pairs_last() {
        let mut store = HashMap::new();
        store.insert("A".to_string(), snapshot("A", Some(1.0), None));
        store.insert("B".to_string(), snapshot("B", None, Some(3.0)));
        store.insert("C".to_string(), snapshot("C", Some(1.0), None));
        store.insert("D".to_string(), snapshot("D", None, Some(1.5)));
        store.insert("E".to_string(), snapshot("E", Some(1.0), Some(1.0)));
        store.insert("F".to_string(), snapshot("F", Some(1.0), Some(1.0)));

        let pairs = [("E", "F"), ("A", "B"), ("X", "Y"), ("C", "D")];
        let decisions = evaluate_pairs(&pairs, &store);

        let sorted = sort_pairs(&pairs, &decisions, SortOrder::Descending);
        assert_eq!(sorted[0], ("A", "B")); // diff 2.0
        assert_eq!(sorted[1], ("C", "D")); // diff 0.5
        // NoTrade and the missing pair land at the tail.
        let tail: Vec<_> = sorted[2..].to_vec();
        assert!(tail.contains(&("E", "F")));
        assert!(tail.contains(&("X", "Y")));
    }

    #[test]
    fn ascending_sort_reverses() {
        let mut store = HashMap::new();
        store.insert("A".to_string(), snapshot("A", Some(1.0), None));
        store.insert("B".to_string(), snapshot("B", None, Some(3.0)));
        store.insert("C".to_string(), snapshot("C", Some(1.0), None));
        store.insert("D".to_string(), snapshot("D", None, Some(1.5)));

        let pairs = [("A", "B"), ("C", "D")];
        let decisions = evaluate_pairs(&pairs, &store);

        let sorted = sort_pairs(&pairs, &decisions, SortOrder::Ascending);
        assert_eq!(sorted, vec![("C", "D"), ("A", "B")]);
    }

    #[test]
    fn trade_result_shape() {
        let a = snapshot("A", Some(1.0), None);
        let b = snapshot("B", None, Some(2.0));
        let result = TradeResult::from(&evaluate_pair(&a, &b));

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["check"], "Check 1");
        assert_eq!(json["long"], "A");
        assert_eq!(json["short"], "B");
        assert_eq!(json["difference"], "1.0000");

        let none = TradeResult::from(&TradeDecision::NoTrade);
        let json = serde_json::to_value(&none).unwrap();
        assert_eq!(json["check"], "No Trade");
        assert_eq!(json["long"], serde_json::Value::Null);
    }
}
