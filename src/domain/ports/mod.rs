//! Collaborator ports: the narrow interfaces the core depends on without
//! knowing how they're implemented.

pub mod actor;
pub mod judge;

pub use actor::{Actor, ActorError, ExecuteOutput};
pub use judge::{
    parse_judge_reply, ChatJudge, ChatMessage, ChatOptions, ChatRole, FeedbackJudge, JudgeError,
    JudgeVerdict, NumericJudge,
};
