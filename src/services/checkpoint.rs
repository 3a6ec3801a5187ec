//! Run directory and checkpoint protocol: one directory per run holding
//! `input.json`, `config.json`, `state.json` (atomic), and
//! `iterations/iter-NNNN.json` snapshots. Grounded in the `HistoryManager`
//! reference implementation's advisory-locking discipline (`fs2::FileExt`),
//! adapted from append-only JSONL to whole-file atomic replace (write a
//! unique temp file under the same directory, then rename over the target).

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

use crate::domain::models::GepaState;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("run directory {0} is locked by another process")]
    Locked(PathBuf),

    #[error("run directory {0} already has a state.json (use --force to overwrite)")]
    AlreadyInitialized(PathBuf),

    #[error("run directory {0} has no state.json to resume from")]
    NothingToResume(PathBuf),
}

const STATE_FILE: &str = "state.json";
const INPUT_FILE: &str = "input.json";
const CONFIG_FILE: &str = "config.json";
const LOCK_FILE: &str = ".lock";
const ITERATIONS_DIR: &str = "iterations";

fn io_err(path: &Path, source: std::io::Error) -> CheckpointError {
    CheckpointError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Owns a run directory's layout and the single-writer advisory lock on it.
pub struct RunDirectory {
    root: PathBuf,
    _lock: File,
}

impl RunDirectory {
    /// Create (or open) the run directory, acquire its advisory lock, and
    /// return a handle. `force` permits reusing a directory that already
    /// has a `state.json` for a fresh run.
    pub fn create(root: impl Into<PathBuf>, force: bool) -> Result<Self, CheckpointError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| io_err(&root, e))?;
        fs::create_dir_all(root.join(ITERATIONS_DIR)).map_err(|e| io_err(&root, e))?;

        if !force && root.join(STATE_FILE).exists() {
            return Err(CheckpointError::AlreadyInitialized(root));
        }

        let lock = Self::acquire_lock(&root)?;
        Ok(Self { root, _lock: lock })
    }

    /// Open an existing run directory to resume from, requiring a
    /// `state.json` to already be present.
    pub fn open_existing(root: impl Into<PathBuf>) -> Result<Self, CheckpointError> {
        let root = root.into();
        if !root.join(STATE_FILE).exists() {
            return Err(CheckpointError::NothingToResume(root));
        }
        let lock = Self::acquire_lock(&root)?;
        Ok(Self { root, _lock: lock })
    }

    fn acquire_lock(root: &Path) -> Result<File, CheckpointError> {
        let lock_path = root.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&lock_path)
            .map_err(|e| io_err(&lock_path, e))?;
        file.try_lock_exclusive()
            .map_err(|_| CheckpointError::Locked(root.to_path_buf()))?;
        Ok(file)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `input.json` once, at run creation.
    pub fn write_input(&self, input: &serde_json::Value) -> Result<(), CheckpointError> {
        write_atomic(&self.root, INPUT_FILE, input)
    }

    /// Write `config.json` once, at run creation.
    pub fn write_config(&self, config: &impl serde::Serialize) -> Result<(), CheckpointError> {
        write_atomic(&self.root, CONFIG_FILE, config)
    }

    /// Atomically rewrite `state.json` and append the per-iteration
    /// snapshot `iterations/iter-NNNN.json`: checkpoint writes are atomic;
    /// iteration snapshots are append-only history.
    pub fn checkpoint(&self, state: &GepaState) -> Result<(), CheckpointError> {
        write_atomic(&self.root, STATE_FILE, state)?;
        let iter_name = format!("iter-{:04}.json", state.iter);
        write_atomic(&self.root.join(ITERATIONS_DIR), &iter_name, state)
    }

    /// Load `state.json`, if present.
    pub fn load_state(&self) -> Result<Option<GepaState>, CheckpointError> {
        let path = self.root.join(STATE_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        let state: GepaState = serde_json::from_str(&raw)?;
        Ok(Some(state))
    }
}

/// Write `value` to `dir/name` atomically: serialize to a unique temp file
/// in the same directory, then rename over the target so a reader never
/// observes a partially-written file.
fn write_atomic(
    dir: &Path,
    name: &str,
    value: &impl serde::Serialize,
) -> Result<(), CheckpointError> {
    let target = dir.join(name);
    let tmp_name = format!(".{name}.{}.tmp", std::process::id());
    let tmp_path = dir.join(&tmp_name);

    let payload = serde_json::to_vec_pretty(value)?;
    fs::write(&tmp_path, &payload).map_err(|e| io_err(&tmp_path, e))?;
    fs::rename(&tmp_path, &target).map_err(|e| io_err(&target, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{BanditState, Candidate, DatasetSplit, Lineage, ScoreMatrix};

    fn sample_state(iter: u64) -> GepaState {
        GepaState {
            version: crate::domain::models::STATE_VERSION,
            budget_left: 100,
            iter,
            psystems: vec![Candidate::Single("seed".into())],
            s: ScoreMatrix::new(),
            split: DatasetSplit {
                pareto_idx: vec![0],
                hold_idx: vec![],
                fb_idx: vec![],
                feedback_is_pareto_fallback: false,
            },
            best_idx: 0,
            seeded: false,
            bandit: BanditState {
                t: 0,
                stats: Default::default(),
            },
            module_index: 0,
            module_count: 1,
            lineage: Lineage::new(),
            active_strategy_ids: vec![],
        }
    }

    #[test]
    fn create_then_checkpoint_then_resume_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let run_path = dir.path().join("run1");
        {
            let run = RunDirectory::create(&run_path, false).unwrap();
            run.checkpoint(&sample_state(0)).unwrap();
        }

        let run = RunDirectory::open_existing(&run_path).unwrap();
        let loaded = run.load_state().unwrap().unwrap();
        assert_eq!(loaded.iter, 0);
        assert!(run_path.join("iterations/iter-0000.json").exists());
    }

    #[test]
    fn second_checkpoint_overwrites_state_but_keeps_iteration_history() {
        let dir = tempfile::tempdir().unwrap();
        let run_path = dir.path().join("run1");
        let run = RunDirectory::create(&run_path, false).unwrap();
        run.checkpoint(&sample_state(0)).unwrap();
        run.checkpoint(&sample_state(1)).unwrap();

        let loaded = run.load_state().unwrap().unwrap();
        assert_eq!(loaded.iter, 1);
        assert!(run_path.join("iterations/iter-0000.json").exists());
        assert!(run_path.join("iterations/iter-0001.json").exists());
    }

    #[test]
    fn create_rejects_existing_state_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let run_path = dir.path().join("run1");
        {
            let run = RunDirectory::create(&run_path, false).unwrap();
            run.checkpoint(&sample_state(0)).unwrap();
        }

        let result = RunDirectory::create(&run_path, false);
        assert!(matches!(result, Err(CheckpointError::AlreadyInitialized(_))));
    }

    #[test]
    fn create_with_force_reuses_directory() {
        let dir = tempfile::tempdir().unwrap();
        let run_path = dir.path().join("run1");
        {
            let run = RunDirectory::create(&run_path, false).unwrap();
            run.checkpoint(&sample_state(0)).unwrap();
        }

        let run = RunDirectory::create(&run_path, true).unwrap();
        assert!(run.load_state().unwrap().is_some());
    }

    #[test]
    fn resume_without_state_fails() {
        let dir = tempfile::tempdir().unwrap();
        let run_path = dir.path().join("run1");
        fs::create_dir_all(&run_path).unwrap();
        let result = RunDirectory::open_existing(&run_path);
        assert!(matches!(result, Err(CheckpointError::NothingToResume(_))));
    }
}
