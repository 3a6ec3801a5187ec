//! Domain services: the algorithms that operate on the models in
//! `domain::models` through the ports in `domain::ports`.

pub mod adaptive_scheduler;
pub mod budget_accountant;
pub mod checkpoint;
pub mod config;
pub mod engine;
pub mod pareto_selector;
pub mod reflection;
pub mod seeder;
pub mod strategy_prefilter;

pub use adaptive_scheduler::{exploration_rates, ExplorationRates, UpliftWindow};
pub use budget_accountant::{BudgetAccountant, BudgetTag};
pub use checkpoint::{CheckpointError, RunDirectory};
pub use config::{Config, ConfigError};
pub use engine::{EngineInit, IterationOutcome, OptimizationEngine};
pub use pareto_selector::pareto_select;
pub use reflection::{build_reflection_prompt, extract_rewrite, summarize_trace, ReflectionExample};
pub use seeder::{screen_set_size, seed, SeedResult};
pub use strategy_prefilter::prefilter_strategies;
