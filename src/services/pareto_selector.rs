//! Pareto-based parent selection.
//!
//! Grounded in the `ParetoFrontier` reference implementation (coverage-
//! weighted sampling over a per-example dominance frontier): column-max
//! sets, strict-dominance pruning, then weighted sampling by column-max
//! membership count.

use rand::Rng;

use crate::domain::models::{Population, ScoreMatrix};

const NEG_INF_SENTINEL: f64 = f64::NEG_INFINITY;

fn cell(scores: &ScoreMatrix, k: usize, i: usize) -> f64 {
    scores.get(k, i).unwrap_or(NEG_INF_SENTINEL)
}

/// Whether candidate `a` strictly Pareto-dominates candidate `b` over
/// `n_items` columns: at least as good everywhere, strictly better
/// somewhere.
fn dominates(scores: &ScoreMatrix, a: usize, b: usize, n_items: usize) -> bool {
    let mut strictly_better_somewhere = false;
    for i in 0..n_items {
        let sa = cell(scores, a, i);
        let sb = cell(scores, b, i);
        if sa < sb {
            return false;
        }
        if sa > sb {
            strictly_better_somewhere = true;
        }
    }
    strictly_better_somewhere
}

/// Select a parent index from `population` using `scores`. Empty
/// population or zero Pareto items both return index `0`.
pub fn pareto_select<R: Rng + ?Sized>(
    population: &Population,
    scores: &ScoreMatrix,
    n_pareto_items: usize,
    rng: &mut R,
) -> usize {
    if population.is_empty() || n_pareto_items == 0 {
        return 0;
    }

    let pop_len = population.len();

    // 1. Column-max sets, 2. their union.
    let mut candidate_set: Vec<usize> = Vec::new();
    let mut membership_count = vec![0usize; pop_len];

    for i in 0..n_pareto_items {
        let col_max = (0..pop_len)
            .map(|k| cell(scores, k, i))
            .fold(NEG_INF_SENTINEL, f64::max);

        for k in 0..pop_len {
            if (cell(scores, k, i) - col_max).abs() < f64::EPSILON {
                membership_count[k] += 1;
                if membership_count[k] == 1 {
                    candidate_set.push(k);
                }
            }
        }
    }

    // 3. Remove candidates strictly dominated by another candidate in C.
    let survivors: Vec<usize> = candidate_set
        .iter()
        .copied()
        .filter(|&a| {
            !candidate_set
                .iter()
                .any(|&b| b != a && dominates(scores, b, a, n_pareto_items))
        })
        .collect();

    if survivors.is_empty() {
        return pop_len - 1;
    }

    // 4. Weight by column-max membership count; sample proportionally.
    let total_weight: usize = survivors.iter().map(|&k| membership_count[k]).sum();
    if total_weight == 0 {
        return *survivors.last().unwrap();
    }

    let mut target = rng.gen_range(0..total_weight);
    for &k in &survivors {
        let w = membership_count[k];
        if target < w {
            return k;
        }
        target -= w;
    }

    *survivors.last().unwrap()
}
