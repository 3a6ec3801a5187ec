//! The actor port: the LLM that proposes new instructions and executes
//! the task under a candidate instruction. Grounded in the teacher's
//! `LlmSubstrate` trait -- a narrow async boundary with a typed error
//! enum -- collapsed to the two operations this engine actually needs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::models::{Candidate, TaskItem};

#[derive(Debug, Error)]
pub enum ActorError {
    #[error("actor unavailable: {0}")]
    Unavailable(String),
    #[error("actor request timed out after {0}s")]
    Timeout(u64),
    #[error("actor execution failed: {0}")]
    ExecutionFailed(String),
}

/// The result of executing a candidate against one task item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteOutput {
    pub output: String,
    /// Opaque execution trace (tool calls, intermediate steps, ...), if the
    /// actor surfaces one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traces: Option<serde_json::Value>,
}

/// Port trait for the actor LLM: proposes rewritten instructions and
/// executes the task under a candidate.
///
/// Implementations must be `Send + Sync` for use across concurrent
/// evaluation.
#[async_trait]
pub trait Actor: Send + Sync {
    /// Ask the actor to complete a free-form prompt (used for the
    /// reflection rewrite request). Failure is treated by the caller as a
    /// loop-terminating error when unrecoverable.
    async fn complete(&self, prompt: &str) -> Result<String, ActorError>;

    /// Execute `candidate`'s effective instruction against `item`, returning
    /// the task output and any trace the actor chooses to surface.
    async fn execute(
        &self,
        candidate: &Candidate,
        item: &TaskItem,
    ) -> Result<ExecuteOutput, ActorError>;
}
