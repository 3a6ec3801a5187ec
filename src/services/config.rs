//! The `Config` schema and its cross-field validation, grounded in the
//! teacher's `services::config` module (serde, per-section
//! `#[serde(default)]`). Loading it from layered sources lives in
//! `infrastructure::config`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(String),

    #[error("invalid crossoverProbability {0}: must be in [0, 1]")]
    InvalidCrossoverProbability(f64),

    #[error("invalid epsilonHoldout {0}: must be >= 0")]
    InvalidEpsilonHoldout(f64),

    #[error("invalid minibatchSize {0}: must be >= 1")]
    InvalidMinibatchSize(usize),

    #[error(
        "strategySchedule.maxExploreProb ({0}) must be >= strategySchedule.baseExploreProb ({1})"
    )]
    InvalidExploreProbBounds(f64, f64),

    #[error(
        "strategySchedule.maxNoHintProb ({0}) must be >= strategySchedule.baseNoHintProb ({1})"
    )]
    InvalidNoHintProbBounds(f64, f64),

    #[error("invalid actor.kind '{0}': must be 'mock' or 'http'")]
    InvalidActorKind(String),

    #[error("invalid judge.kind '{0}': must be 'mock' or 'http'")]
    InvalidJudgeKind(String),

    #[error("http actor/judge requires actor.endpoint/judge.endpoint to be set")]
    MissingEndpoint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyScheduleConfig {
    pub window_size: usize,
    pub slowdown_threshold: f64,
    pub base_explore_prob: f64,
    pub max_explore_prob: f64,
    pub base_no_hint_prob: f64,
    pub max_no_hint_prob: f64,
    pub default_core_top_k: usize,
    pub prefilter_threshold: f64,
    pub prefilter_top_k: usize,
    pub reprefilter_cooldown_iters: u64,
}

impl Default for StrategyScheduleConfig {
    fn default() -> Self {
        Self {
            window_size: 20,
            slowdown_threshold: 0.1,
            base_explore_prob: 0.1,
            max_explore_prob: 0.4,
            base_no_hint_prob: 0.1,
            max_no_hint_prob: 0.3,
            default_core_top_k: 3,
            prefilter_threshold: 0.3,
            prefilter_top_k: 8,
            reprefilter_cooldown_iters: 15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CollaboratorKind {
    #[default]
    Mock,
    Http,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollaboratorConfig {
    pub kind: CollaboratorKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub timeout_secs: u64,
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        Self {
            kind: CollaboratorKind::Mock,
            endpoint: None,
            model: None,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_level: LogLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,
    pub json_logs: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_dir: None,
            json_logs: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Total affordable LLM calls for the run. `None` disables budgeting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    pub muf_costs: bool,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            total: Some(2_000),
            muf_costs: true,
        }
    }
}

/// Which scorer produces every entry of the Pareto score matrix: the
/// cheap numeric `mu` (no extra judge call) or the full feedback+score
/// `mu_f`. Applies uniformly to the seed's initial row and every accepted
/// child's row within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScoreForPareto {
    Mu,
    #[default]
    MuF,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub budget: BudgetConfig,
    pub minibatch_size: usize,
    pub pareto_size: usize,
    pub holdout_size: usize,
    pub epsilon_holdout: f64,
    pub crossover_probability: f64,
    pub score_for_pareto: ScoreForPareto,
    pub strategy_schedule: StrategyScheduleConfig,
    pub strategies_path: String,
    pub checkpoint_every_iters: u64,
    pub concurrent_evaluation: bool,
    pub actor: CollaboratorConfig,
    pub judge: CollaboratorConfig,
    pub logging: LoggingConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            budget: BudgetConfig::default(),
            minibatch_size: 4,
            pareto_size: 16,
            holdout_size: 8,
            epsilon_holdout: 0.0,
            crossover_probability: 0.1,
            score_for_pareto: ScoreForPareto::default(),
            strategy_schedule: StrategyScheduleConfig::default(),
            strategies_path: "strategies.json".to_string(),
            checkpoint_every_iters: 1,
            concurrent_evaluation: false,
            actor: CollaboratorConfig::default(),
            judge: CollaboratorConfig::default(),
            logging: LoggingConfig::default(),
            seed: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.crossover_probability) {
            return Err(ConfigError::InvalidCrossoverProbability(
                self.crossover_probability,
            ));
        }
        if self.epsilon_holdout < 0.0 {
            return Err(ConfigError::InvalidEpsilonHoldout(self.epsilon_holdout));
        }
        if self.minibatch_size < 1 {
            return Err(ConfigError::InvalidMinibatchSize(self.minibatch_size));
        }
        let sched = &self.strategy_schedule;
        if sched.max_explore_prob < sched.base_explore_prob {
            return Err(ConfigError::InvalidExploreProbBounds(
                sched.max_explore_prob,
                sched.base_explore_prob,
            ));
        }
        if sched.max_no_hint_prob < sched.base_no_hint_prob {
            return Err(ConfigError::InvalidNoHintProbBounds(
                sched.max_no_hint_prob,
                sched.base_no_hint_prob,
            ));
        }
        for (label, collaborator) in [("actor", &self.actor), ("judge", &self.judge)] {
            if collaborator.kind == CollaboratorKind::Http && collaborator.endpoint.is_none() {
                return Err(ConfigError::MissingEndpoint);
            }
            let _ = label;
        }
        Ok(())
    }
}
