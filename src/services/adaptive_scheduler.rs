//! Adaptive exploration scheduler: derives `exploreProb` and `noHintProb`
//! from a sliding window of recent uplift (`sigma' - sigma`).

use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExplorationRates {
    pub explore_prob: f64,
    pub no_hint_prob: f64,
}

/// A fixed-capacity sliding window over recent `sigma' - sigma` values.
#[derive(Debug, Clone)]
pub struct UpliftWindow {
    capacity: usize,
    values: VecDeque<f64>,
}

impl UpliftWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            values: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    pub fn push(&mut self, uplift: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(uplift);
    }

    /// Mean of the window's current contents, `0.0` if empty.
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            0.0
        } else {
            self.values.iter().sum::<f64>() / self.values.len() as f64
        }
    }
}

/// Compute `(exploreProb, noHintProb)` from the window mean `ubar`:
/// saturate to the max rates when stagnating (`ubar <= threshold`),
/// otherwise interpolate linearly between base and max by how close `ubar`
/// is to the threshold.
pub fn exploration_rates(
    window: &UpliftWindow,
    slowdown_threshold: f64,
    base_explore_prob: f64,
    max_explore_prob: f64,
    base_no_hint_prob: f64,
    max_no_hint_prob: f64,
) -> ExplorationRates {
    let ubar = window.mean();

    if ubar <= slowdown_threshold {
        return ExplorationRates {
            explore_prob: max_explore_prob,
            no_hint_prob: max_no_hint_prob,
        };
    }

    let ratio = (slowdown_threshold / ubar).clamp(0.0, 1.0);
    let interpolate = |base: f64, max: f64| (base + ratio * (max - base)).min(max);

    ExplorationRates {
        explore_prob: interpolate(base_explore_prob, max_explore_prob),
        no_hint_prob: interpolate(base_no_hint_prob, max_no_hint_prob),
    }
}
