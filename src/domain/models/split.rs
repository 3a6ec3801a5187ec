//! Dataset split computation: disjoint Pareto, holdout, and feedback
//! index sets, derived once from the input size and persisted across
//! resumes.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSplit {
    pub pareto_idx: Vec<usize>,
    pub hold_idx: Vec<usize>,
    pub fb_idx: Vec<usize>,
    /// Set when the feedback set was empty and had to fall back to reusing
    /// the Pareto items.
    pub feedback_is_pareto_fallback: bool,
}

/// Compute the split for a dataset of size `n`:
///
/// ```text
/// shuffle 0..N
/// paretoEff = min(nPareto, max(1, N-1 if N>1 else N))
/// holdMax = max(0, N - paretoEff - 1)
/// holdEff = min(holdoutSize, holdMax)
/// feedback gets the remainder
/// ```
///
/// If the computed feedback set would be empty and the Pareto set is
/// non-empty, feedback falls back to reusing the Pareto indices.
pub fn compute_split<R: Rng + ?Sized>(
    n: usize,
    n_pareto: usize,
    holdout_size: usize,
    rng: &mut R,
) -> DatasetSplit {
    if n == 0 {
        return DatasetSplit {
            pareto_idx: vec![],
            hold_idx: vec![],
            fb_idx: vec![],
            feedback_is_pareto_fallback: false,
        };
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);

    let pareto_cap = if n > 1 { n - 1 } else { n };
    let pareto_eff = n_pareto.min(pareto_cap.max(1));
    let hold_max = n.saturating_sub(pareto_eff).saturating_sub(1);
    let hold_eff = holdout_size.min(hold_max);

    let pareto_idx: Vec<usize> = order[0..pareto_eff].to_vec();
    let hold_idx: Vec<usize> = order[pareto_eff..pareto_eff + hold_eff].to_vec();
    let mut fb_idx: Vec<usize> = order[pareto_eff + hold_eff..].to_vec();

    let feedback_is_pareto_fallback = fb_idx.is_empty() && !pareto_idx.is_empty();
    if feedback_is_pareto_fallback {
        fb_idx = pareto_idx.clone();
    }

    DatasetSplit {
        pareto_idx,
        hold_idx,
        fb_idx,
        feedback_is_pareto_fallback,
    }
}
