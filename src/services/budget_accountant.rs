//! Budget accountant: the single authority for remaining call budget.
//! Every LLM-producing side effect in the engine is gated by `can_afford`
//! and followed by `dec`; when disabled the accountant is a transparent
//! no-op so the engine can be exercised without a cap.
//!
//! Grounded in the teacher's `BudgetTracker` for the shape of a
//! budget-owning service with tagged consumption telemetry, simplified to
//! a single counter of remaining calls (rather than a multi-window token
//! quota).

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Attribution tag for a decrement, used only for telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetTag {
    Execute,
    Muf,
    Propose,
    Pareto,
    Holdout,
    Seeding,
}

impl BudgetTag {
    pub fn as_str(self) -> &'static str {
        match self {
            BudgetTag::Execute => "execute",
            BudgetTag::Muf => "muf",
            BudgetTag::Propose => "propose",
            BudgetTag::Pareto => "pareto",
            BudgetTag::Holdout => "holdout",
            BudgetTag::Seeding => "seeding",
        }
    }
}

/// The single authority for remaining call budget.
///
/// `None` means budget tracking is disabled: `can_afford` always returns
/// `true` and `dec` is a no-op, so the engine can run unbounded for
/// exploratory or test use.
pub struct BudgetAccountant {
    remaining: Option<AtomicU64>,
}

impl BudgetAccountant {
    pub fn enabled(total: u64) -> Self {
        Self {
            remaining: Some(AtomicU64::new(total)),
        }
    }

    pub fn disabled() -> Self {
        Self { remaining: None }
    }

    /// Remaining call budget, or `u64::MAX` when disabled.
    pub fn remaining(&self) -> u64 {
        match &self.remaining {
            Some(r) => r.load(Ordering::SeqCst),
            None => u64::MAX,
        }
    }

    /// Whether `n` more calls can be afforded right now. Always `true` when
    /// disabled.
    pub fn can_afford(&self, n: u64) -> bool {
        match &self.remaining {
            Some(r) => r.load(Ordering::SeqCst) >= n,
            None => true,
        }
    }

    /// Decrement the remaining budget by `n`, attributed to `tag` for
    /// telemetry. Never panics or goes negative: callers must have already
    /// checked `can_afford`, but a saturating subtraction is used as the
    /// last line of defense since the accountant, not the caller, is
    /// source of truth.
    pub fn dec(&self, n: u64, tag: BudgetTag) {
        if let Some(r) = &self.remaining {
            let previous = r.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |cur| {
                Some(cur.saturating_sub(n))
            });
            if let Ok(previous) = previous {
                tracing::debug!(
                    tag = tag.as_str(),
                    amount = n,
                    remaining = previous.saturating_sub(n),
                    "budget decremented"
                );
            }
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_afford_respects_remaining() {
        let accountant = BudgetAccountant::enabled(2);
        assert!(accountant.can_afford(2));
        assert!(!accountant.can_afford(3));
    }

    #[test]
    fn dec_reduces_remaining() {
        let accountant = BudgetAccountant::enabled(5);
        accountant.dec(2, BudgetTag::Execute);
        assert_eq!(accountant.remaining(), 3);
    }

    #[test]
    fn dec_never_goes_negative() {
        let accountant = BudgetAccountant::enabled(1);
        accountant.dec(5, BudgetTag::Execute);
        assert_eq!(accountant.remaining(), 0);
    }

    #[test]
    fn disabled_accountant_is_transparent_noop() {
        let accountant = BudgetAccountant::disabled();
        assert!(accountant.can_afford(1_000_000));
        accountant.dec(1_000_000, BudgetTag::Execute);
        assert!(accountant.can_afford(1_000_000));
        assert_eq!(accountant.remaining(), u64::MAX);
    }

    /// Budget exhaustion mid-minibatch: budget=2, two decrements of 1 each
    /// succeed, a third can_afford check fails, and remaining never goes
    /// negative.
    #[test]
    fn budget_exhaustion_mid_minibatch() {
        let accountant = BudgetAccountant::enabled(2);
        assert!(accountant.can_afford(1));
        accountant.dec(1, BudgetTag::Execute);
        assert!(accountant.can_afford(1));
        accountant.dec(1, BudgetTag::Muf);
        assert!(!accountant.can_afford(1));
        assert_eq!(accountant.remaining(), 0);
    }
}
