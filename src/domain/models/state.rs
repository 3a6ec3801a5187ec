//! Versioned, resumable engine state.

use serde::{Deserialize, Serialize};

use super::bandit::BanditState;
use super::candidate::Candidate;
use super::lineage::Lineage;
use super::population::ScoreMatrix;
use super::split::DatasetSplit;

/// The current on-disk state format version this binary writes. Bump on any
/// breaking change to the shape below.
pub const STATE_VERSION: u32 = 1;

/// The full, serializable snapshot of an optimization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GepaState {
    pub version: u32,
    pub budget_left: u64,
    pub iter: u64,
    pub psystems: Vec<Candidate>,
    pub s: ScoreMatrix,
    pub split: DatasetSplit,
    pub best_idx: usize,
    pub seeded: bool,
    pub bandit: BanditState,
    pub module_index: usize,
    pub module_count: usize,
    pub lineage: Lineage,
    /// Ids of the strategies the bandit is currently operating over, so a
    /// resumed run reconstructs the right arm set before reading `bandit`.
    pub active_strategy_ids: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("state file version {found} is newer than this binary supports (max {max})")]
    UnsupportedVersion { found: u32, max: u32 },
}

impl GepaState {
    /// Reject states newer than this binary understands. Older recognized
    /// versions are accepted as-is since, today, version 1 is the only
    /// format that has ever existed.
    pub fn check_version(&self) -> Result<(), StateError> {
        if self.version > STATE_VERSION {
            return Err(StateError::UnsupportedVersion {
                found: self.version,
                max: STATE_VERSION,
            });
        }
        Ok(())
    }
}
