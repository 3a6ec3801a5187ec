//! Task items: the immutable unit of work the actor executes and the judge
//! scores.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An immutable record describing one input to the task LLM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskItem {
    /// Stable identifier, unique within the input dataset.
    pub id: String,
    /// The prompt text presented to the actor as the user turn.
    pub user: String,
    /// Opaque key-value context (golden answer, rubric, category, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl TaskItem {
    pub fn new(id: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            user: user.into(),
            meta: None,
        }
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }
}
