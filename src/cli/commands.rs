//! `clap`-derive CLI surface, grounded in the teacher's `Cli`/`Commands`
//! pattern (`cli::types`): a top-level `Cli` with a global `--json` flag and
//! a `Commands` subcommand enum, dispatched by `main`.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::domain::models::{Candidate, Strategy, TaskItem};
use crate::domain::ports::{Actor, FeedbackJudge, NumericJudge};
use crate::infrastructure::actors::{HttpActor, MockActor};
use crate::infrastructure::config::ConfigLoader;
use crate::services::checkpoint::{CheckpointError, RunDirectory};
use crate::services::config::{CollaboratorConfig, CollaboratorKind, Config};
use crate::services::engine::{EngineInit, OptimizationEngine};

#[derive(Parser)]
#[command(name = "gepa-forge")]
#[command(about = "Budget-bounded evolutionary search over LLM instructions", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Render output as JSON instead of a human-readable table.
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start a fresh optimization run.
    Run {
        /// Path to a JSON file holding the task item array.
        #[arg(long)]
        input: PathBuf,

        /// Path to a TOML configuration file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory to hold run state, checkpoints, and iteration history.
        #[arg(long)]
        run_dir: PathBuf,

        /// Reuse `run-dir` even if it already holds a `state.json`.
        #[arg(long)]
        force: bool,

        /// Seed instruction text. Required unless `--seed-file` is given.
        #[arg(long)]
        seed: Option<String>,

        /// Path to a file holding the seed instruction text.
        #[arg(long)]
        seed_file: Option<PathBuf>,
    },

    /// Resume a run from its latest checkpoint.
    Resume {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        run_dir: PathBuf,
    },

    /// Print the best candidate and summary stats from the latest checkpoint.
    Show {
        #[arg(long)]
        run_dir: PathBuf,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    ParseFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("run requires either --seed or --seed-file")]
    MissingSeed,
    #[error(transparent)]
    Config(#[from] crate::services::config::ConfigError),
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
    #[error(transparent)]
    Engine(#[from] crate::domain::error::EngineError),
    #[error(transparent)]
    HttpConfig(#[from] crate::infrastructure::actors::HttpConfigError),
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CommandError> {
    let raw = std::fs::read_to_string(path).map_err(|e| CommandError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&raw).map_err(|e| CommandError::ParseFile {
        path: path.to_path_buf(),
        source: e,
    })
}

fn load_task_items(path: &Path) -> Result<Vec<TaskItem>, CommandError> {
    read_json(path)
}

fn load_strategy_catalog(path: &Path) -> Result<Vec<Strategy>, CommandError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    read_json(path)
}

fn load_seed(seed: Option<String>, seed_file: Option<PathBuf>) -> Result<Candidate, CommandError> {
    let text = match (seed, seed_file) {
        (Some(text), _) => text,
        (None, Some(path)) => std::fs::read_to_string(&path).map_err(|e| CommandError::ReadFile {
            path,
            source: e,
        })?,
        (None, None) => return Err(CommandError::MissingSeed),
    };
    Ok(Candidate::Single(text))
}

/// Build the actor and judges a run will use, per `config.actor`/`config.judge`.
fn build_collaborators(
    config: &Config,
) -> Result<
    (
        Box<dyn Actor>,
        Box<dyn NumericJudge>,
        Box<dyn FeedbackJudge>,
    ),
    CommandError,
> {
    let actor: Box<dyn Actor> = match config.actor.kind {
        CollaboratorKind::Mock => Box::new(MockActor::new("rewritten instruction")),
        CollaboratorKind::Http => Box::new(HttpActor::new(&config.actor)?),
    };

    // The judge role may target a different endpoint/model than the actor,
    // so it gets its own collaborator instance built from `config.judge`.
    let judge_config: &CollaboratorConfig = &config.judge;
    let numeric_judge: Box<dyn NumericJudge> = match judge_config.kind {
        CollaboratorKind::Mock => Box::new(MockActor::new("judge")),
        CollaboratorKind::Http => Box::new(HttpActor::new(judge_config)?),
    };
    let feedback_judge: Box<dyn FeedbackJudge> = match judge_config.kind {
        CollaboratorKind::Mock => Box::new(MockActor::new("judge")),
        CollaboratorKind::Http => Box::new(HttpActor::new(judge_config)?),
    };

    Ok((actor, numeric_judge, feedback_judge))
}

pub struct RunOutcome {
    pub best: Candidate,
    pub run_dir: PathBuf,
}

pub async fn handle_run(
    input: PathBuf,
    config_path: Option<PathBuf>,
    run_dir: PathBuf,
    force: bool,
    seed: Option<String>,
    seed_file: Option<PathBuf>,
) -> Result<RunOutcome, CommandError> {
    let config = ConfigLoader::load(config_path.as_deref())?;
    let task_items = load_task_items(&input)?;
    let strategy_catalog = load_strategy_catalog(Path::new(&config.strategies_path))?;
    let seed_candidate = load_seed(seed, seed_file)?;

    let (actor, numeric_judge, feedback_judge) = build_collaborators(&config)?;
    let dir = RunDirectory::create(&run_dir, force)?;

    let mut engine = OptimizationEngine::init(
        config,
        actor,
        numeric_judge,
        feedback_judge,
        Some(dir),
        EngineInit {
            task_items,
            seed_candidate,
            strategy_catalog,
        },
    )
    .await?;

    let best = engine.run().await?;
    Ok(RunOutcome { best, run_dir })
}

pub async fn handle_resume(
    input: PathBuf,
    config_path: Option<PathBuf>,
    run_dir: PathBuf,
) -> Result<RunOutcome, CommandError> {
    let config = ConfigLoader::load(config_path.as_deref())?;
    let task_items = load_task_items(&input)?;
    let strategy_catalog = load_strategy_catalog(Path::new(&config.strategies_path))?;

    let (actor, numeric_judge, feedback_judge) = build_collaborators(&config)?;
    let dir = RunDirectory::open_existing(&run_dir)?;

    let mut engine = OptimizationEngine::resume(
        config,
        actor,
        numeric_judge,
        feedback_judge,
        dir,
        task_items,
        strategy_catalog,
    )?;

    let best = engine.run().await?;
    Ok(RunOutcome { best, run_dir })
}

pub struct ShowOutcome {
    pub best: Candidate,
    pub iter: u64,
    pub budget_left: u64,
    pub population_size: usize,
}

pub fn handle_show(run_dir: PathBuf) -> Result<ShowOutcome, CommandError> {
    let dir = RunDirectory::open_existing(&run_dir)?;
    let state = dir
        .load_state()?
        .ok_or(CheckpointError::NothingToResume(run_dir))?;
    let best = state
        .psystems
        .get(state.best_idx)
        .cloned()
        .unwrap_or_else(|| state.psystems[0].clone());
    Ok(ShowOutcome {
        best,
        iter: state.iter,
        budget_left: state.budget_left,
        population_size: state.psystems.len(),
    })
}
