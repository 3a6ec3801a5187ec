//! UCB1 bandit over mutation strategies.
//!
//! Grounded in the teacher's `StrategyBandit` (context_arms keyed by string
//! id, `select`/`update`, serde round-trippable) but swaps Thompson Sampling
//! over Beta distributions for UCB1: `mean + c*sqrt(ln t / n)` with an
//! unpulled arm treated as having infinite upper confidence bound.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// `sqrt(2)`, the standard UCB1 exploration constant.
const EXPLORATION_CONSTANT: f64 = std::f64::consts::SQRT_2;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ArmStats {
    pub n: u64,
    pub mean: f64,
}

impl ArmStats {
    fn new() -> Self {
        Self { n: 0, mean: 0.0 }
    }
}

/// A UCB1 multi-armed bandit over a fixed set of strategy ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bandit {
    ids: Vec<String>,
    stats: HashMap<String, ArmStats>,
    t: u64,
}

/// Wire form used by [`Bandit::serialize`] / [`Bandit::deserialize`]: the
/// arm set is implicit in `stats`' keys, so resuming with a changed strategy
/// set (after a re-prefilter) is handled by the caller reconstructing a
/// fresh [`Bandit`] rather than by this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BanditState {
    pub t: u64,
    pub stats: HashMap<String, ArmStats>,
}

impl Bandit {
    /// Construct a bandit over the given strategy ids, all unpulled.
    pub fn new(ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        let stats = ids.iter().map(|id| (id.clone(), ArmStats::new())).collect();
        Self { ids, stats, t: 0 }
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn stats_for(&self, id: &str) -> Option<ArmStats> {
        self.stats.get(id).copied()
    }

    /// Pick the arm maximizing `mean + c*sqrt(ln t / n)`. An arm with `n =
    /// 0` has an infinite upper bound and is always preferred. Ties prefer
    /// the later-listed arm, per `Iterator::max_by`'s documented behavior
    /// of returning the last maximal element.
    pub fn pick(&self) -> Option<String> {
        if self.ids.is_empty() {
            return None;
        }
        // t=0 means no pulls have ever happened; ln(0) is undefined, so use
        // ln(1) = 0 for the first pick -- every arm still wins on the n=0
        // infinite-bound rule at that point anyway.
        let ln_t = (self.t.max(1) as f64).ln();

        self.ids
            .iter()
            .max_by(|a, b| {
                let score_a = self.ucb_score(a, ln_t);
                let score_b = self.ucb_score(b, ln_t);
                score_a.partial_cmp(&score_b).unwrap_or(std::cmp::Ordering::Equal)
            })
            .cloned()
    }

    fn ucb_score(&self, id: &str, ln_t: f64) -> f64 {
        let stats = self.stats.get(id).copied().unwrap_or_else(ArmStats::new);
        if stats.n == 0 {
            return f64::INFINITY;
        }
        stats.mean + EXPLORATION_CONSTANT * (ln_t / stats.n as f64).sqrt()
    }

    /// Update the arm's running mean with an incremental average, after
    /// clamping `reward` to `[0,1]`. A call for an unknown id is a no-op.
    pub fn update(&mut self, id: &str, reward: f64) {
        let reward = reward.clamp(0.0, 1.0);
        if let Some(stats) = self.stats.get_mut(id) {
            self.t += 1;
            stats.n += 1;
            stats.mean += (reward - stats.mean) / stats.n as f64;
        }
    }

    pub fn serialize(&self) -> BanditState {
        BanditState {
            t: self.t,
            stats: self.stats.clone(),
        }
    }

    /// Reconstruct a bandit over `ids`, carrying forward any matching
    /// per-arm stats from `state` (ids absent from `state.stats` start
    /// fresh).
    pub fn deserialize(ids: impl IntoIterator<Item = impl Into<String>>, state: BanditState) -> Self {
        let ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        let stats = ids
            .iter()
            .map(|id| {
                let s = state.stats.get(id).copied().unwrap_or_else(ArmStats::new);
                (id.clone(), s)
            })
            .collect();
        Self {
            ids,
            stats,
            t: state.t,
        }
    }
}
