//! Property-based invariants for the bandit, Pareto selector, and trace
//! summarizer: properties that should hold for arbitrary input, not just
//! the hand-picked scenarios in each module's unit tests.

use gepa_forge::domain::models::{Bandit, Candidate, Population, ScoreMatrix};
use gepa_forge::services::pareto_selector::pareto_select;
use gepa_forge::services::reflection::summarize_trace;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;

proptest! {
    /// Property: a bandit arm's running mean never leaves `[0, 1]` no
    /// matter what reward sequence (including out-of-range rewards) it's
    /// updated with.
    #[test]
    fn bandit_mean_stays_in_unit_interval(rewards in prop::collection::vec(-5.0f64..5.0, 0..50)) {
        let mut bandit = Bandit::new(["only-arm"]);
        for r in rewards {
            bandit.update("only-arm", r);
            let mean = bandit.stats_for("only-arm").unwrap().mean;
            prop_assert!((0.0..=1.0).contains(&mean), "mean {mean} left [0,1]");
        }
    }

    /// Property: for any non-empty population and any (possibly ragged or
    /// empty) score matrix, the selected index is always a valid index
    /// into the population.
    #[test]
    fn pareto_select_always_in_range(
        pop_size in 1usize..12,
        n_items in 0usize..6,
        seed in any::<u64>(),
        cell_seed in prop::collection::vec(0.0f64..1.0, 0..72),
    ) {
        let mut pop = Population::new(Candidate::Single("seed".to_string()));
        for i in 1..pop_size {
            pop.push(Candidate::Single(format!("c{i}")));
        }

        let mut scores = ScoreMatrix::new();
        let mut cursor = 0;
        for _ in 0..pop_size {
            let mut row = Vec::with_capacity(n_items);
            for _ in 0..n_items {
                let v = cell_seed.get(cursor % cell_seed.len().max(1)).copied().unwrap_or(0.5);
                row.push(v);
                cursor += 1;
            }
            scores.push_row(row);
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let idx = pareto_select(&pop, &scores, n_items, &mut rng);
        prop_assert!(idx < pop.len(), "index {idx} out of range for population of size {}", pop.len());
    }

    /// Property: the summarized trace is never longer than `max_size + 3`
    /// (the `"..."` ellipsis budget), for arbitrary JSON object shapes.
    #[test]
    fn trace_summary_is_length_bounded(
        max_size in 8usize..500,
        entries in prop::collection::vec((".{0,20}", ".{0,80}"), 0..30),
    ) {
        let mut map = serde_json::Map::new();
        for (i, (k, v)) in entries.into_iter().enumerate() {
            map.insert(format!("{i}-{k}"), json!(v));
        }
        let value = serde_json::Value::Object(map);

        if let Some(summary) = summarize_trace(Some(&value), max_size) {
            prop_assert!(
                summary.len() <= max_size + 3,
                "summary length {} exceeds bound {} + 3",
                summary.len(),
                max_size
            );
        }
    }
}
