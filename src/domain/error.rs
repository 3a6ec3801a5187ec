//! Top-level domain error kinds, grounded in the teacher's
//! `domain/error.rs` split between a fatal validation kind and recoverable
//! per-call failures.

use thiserror::Error;

/// Fatal errors that stop the engine before or during a run. Transient
/// collaborator failures are handled as iteration-failures inside the
/// engine loop and never reach this type.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] crate::services::checkpoint::CheckpointError),

    #[error("candidate error: {0}")]
    Candidate(#[from] crate::domain::models::CandidateError),

    #[error("state error: {0}")]
    State(#[from] crate::domain::models::StateError),

    #[error("configuration error: {0}")]
    Config(#[from] crate::services::config::ConfigError),
}
