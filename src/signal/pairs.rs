//! Named fixed lists of symbol pairs the difference view evaluates.
//!
//! Selected by the `type` query parameter; an unrecognized selector
//! falls back to the default list.

/// Default watch list.
pub const DEFAULT_PAIRS: &[(&str, &str)] = &[
    ("GLAXO", "UNITY"),
    ("GLAXO", "PPL"),
    ("FCEPL", "FFL"),
    ("FFL", "SNGP"),
    ("OGDC", "SYS"),
    ("CPHL", "SEARL"),
    ("FCCL", "FFL"),
    ("CNERGY", "FFL"),
    ("FCCL", "POWER"),
    ("FFL", "PAEL"),
    ("AGP", "GLAXO"),
    ("FCCL", "SNGP"),
    ("FCCL", "FEROZ"),
    ("PPL", "UNITY"),
    ("AGP", "LUCK"),
    ("FEROZ", "SNGP"),
    ("HUBC", "SAZEW"),
    ("PSO", "SYS"),
    ("DGKC", "PAEL"),
    ("SYS", "UNITY"),
    ("OGDC", "UNITY"),
    ("ATRL", "CNERGY"),
    ("FFL", "POWER"),
    ("PSO", "UNITY"),
    ("NBP", "SYS"),
];

/// Pairs cleared for 200k notional.
pub const PAIRS_200: &[(&str, &str)] = &[
    ("OGDC", "PPL"),
    ("PPL", "PSO"),
    ("NRL", "PRL"),
    ("AVN", "OCTOPUS"),
];

/// Pairs cleared for 100k notional.
pub const PAIRS_100: &[(&str, &str)] = &[
    ("PPL", "PSO"),
    ("OGDC", "PSO"),
    ("OGDC", "PPL"),
    ("GAL", "GHNI"),
    ("NRL", "PRL"),
    ("FCCL", "POWER"),
];

/// Pairs cleared for 65k notional.
pub const PAIRS_65: &[(&str, &str)] = &[
    ("PPL", "PSO"),
    ("OGDC", "PPL"),
    ("OGDC", "PSO"),
    ("GAL", "GHNI"),
    ("GLAXO", "PPL"),
    ("FCCL", "POWER"),
    ("FFL", "SNGP"),
    ("FCEPL", "FFL"),
    ("OGDC", "SYS"),
    ("FFL", "PAEL"),
    ("CNERGY", "FFL"),
    ("GLAXO", "UNITY"),
    ("AGP", "GLAXO"),
    ("CPHL", "SEARL"),
    ("DFML", "SSGC"),
    ("DGKC", "PAEL"),
    ("FEROZ", "SNGP"),
    ("NBP", "SYS"),
];

/// Resolve a selector to its pair list; unknown selectors fall back to
/// the default.
pub fn pairs_for(selector: &str) -> &'static [(&'static str, &'static str)] {
    match selector {
        "200" => PAIRS_200,
        "100" => PAIRS_100,
        "65" => PAIRS_65,
        _ => DEFAULT_PAIRS,
    }
}

/// Flatten a pair list into its symbol set, deduplicated, in first
/// appearance order. This is what gets subscribed when a list goes live.
pub fn symbols_for(pairs: &[(&str, &str)]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut symbols = Vec::new();
    for &(a, b) in pairs {
        for sym in [a, b] {
            if seen.insert(sym) {
                symbols.push(sym.to_string());
            }
        }
    }
    symbols
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_selectors_resolve() {
        assert_eq!(pairs_for("200").len(), 4);
        assert_eq!(pairs_for("100").len(), 6);
        assert_eq!(pairs_for("65").len(), 18);
        assert_eq!(pairs_for("default").len(), 25);
    }

    #[test]
    fn unknown_selector_falls_back_to_default() {
        assert_eq!(pairs_for("nonsense"), DEFAULT_PAIRS);
        assert_eq!(pairs_for(""), DEFAULT_PAIRS);
    }

    #[test]
    fn symbols_are_deduplicated_in_first_appearance_order() {
        let symbols = symbols_for(&[("A", "B"), ("B", "C"), ("C", "A")]);
        assert_eq!(symbols, vec!["A", "B", "C"]);
    }

    #[test]
    fn pair_lists_have_no_self_pairs() {
        for pairs in [DEFAULT_PAIRS, PAIRS_200, PAIRS_100, PAIRS_65] {
            assert!(pairs.iter().all(|(a, b)| a != b));
        }
    }
}
