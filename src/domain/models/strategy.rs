//! Mutation strategy catalog entries.
//!
//! Grounded in the teacher's `StrategyKind` catalog shape, simplified to a
//! flat `{id, hint, core?}` record since this engine's strategies are
//! free-text reflection hints rather than a closed enum of code paths.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub id: String,
    pub hint: String,
    #[serde(default)]
    pub core: bool,
}

/// Select the exploration pool for the adaptive scheduler's explore
/// override: strategies marked `core` when any exist, otherwise the
/// first `default_core_top_k` by catalog order.
pub fn core_pool(strategies: &[Strategy], default_core_top_k: usize) -> Vec<Strategy> {
    let marked: Vec<Strategy> = strategies.iter().filter(|s| s.core).cloned().collect();
    if !marked.is_empty() {
        return marked;
    }
    strategies
        .iter()
        .take(default_core_top_k)
        .cloned()
        .collect()
}
