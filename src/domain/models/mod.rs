//! Core data model for the instruction evolution engine.

pub mod bandit;
pub mod candidate;
pub mod lineage;
pub mod population;
pub mod split;
pub mod state;
pub mod strategy;
pub mod task;

pub use bandit::{Bandit, BanditState};
pub use candidate::{Candidate, CandidateError, Module};
pub use lineage::{Lineage, LineageEntry, TriedTriplets};
pub use population::{Population, ScoreMatrix};
pub use split::{compute_split, DatasetSplit};
pub use state::{GepaState, StateError, STATE_VERSION};
pub use strategy::{core_pool, Strategy};
pub use task::TaskItem;
