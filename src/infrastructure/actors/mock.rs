//! Deterministic mock actor/judge, grounded in the teacher's `MockSubstrate`
//! (per-task response overrides plus a scripted default). Used by the CLI's
//! `actor.kind = "mock"` / `judge.kind = "mock"` configuration and by tests.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::models::{Candidate, TaskItem};
use crate::domain::ports::{
    Actor, ActorError, ChatJudge, ChatMessage, ChatOptions, ExecuteOutput, FeedbackJudge,
    JudgeError, JudgeVerdict, NumericJudge,
};

/// A scripted response for one task item id.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub output: String,
    pub score: f64,
    pub feedback: String,
    pub fail: bool,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self {
            output: "mock output".to_string(),
            score: 0.5,
            feedback: String::new(),
            fail: false,
        }
    }
}

impl MockResponse {
    pub fn success(output: impl Into<String>, score: f64) -> Self {
        Self {
            output: output.into(),
            score,
            ..Default::default()
        }
    }

    pub fn failure() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }
}

/// Mock actor/judge with a per-item response table and a scripted default,
/// plus a fixed reply for `complete` (used by the reflection rewrite and
/// the strategy prefilter). Every call is deterministic and offline.
pub struct MockActor {
    default_response: MockResponse,
    overrides: RwLock<HashMap<String, MockResponse>>,
    complete_reply: String,
}

impl MockActor {
    pub fn new(complete_reply: impl Into<String>) -> Self {
        Self {
            default_response: MockResponse::default(),
            overrides: RwLock::new(HashMap::new()),
            complete_reply: complete_reply.into(),
        }
    }

    pub fn with_default_response(mut self, response: MockResponse) -> Self {
        self.default_response = response;
        self
    }

    pub fn set_response_for_item(&self, item_id: impl Into<String>, response: MockResponse) {
        self.overrides
            .write()
            .expect("mock actor lock poisoned")
            .insert(item_id.into(), response);
    }

    fn response_for(&self, item_id: &str) -> MockResponse {
        self.overrides
            .read()
            .expect("mock actor lock poisoned")
            .get(item_id)
            .cloned()
            .unwrap_or_else(|| self.default_response.clone())
    }
}

#[async_trait]
impl Actor for MockActor {
    async fn complete(&self, _prompt: &str) -> Result<String, ActorError> {
        Ok(self.complete_reply.clone())
    }

    async fn execute(
        &self,
        _candidate: &Candidate,
        item: &TaskItem,
    ) -> Result<ExecuteOutput, ActorError> {
        let response = self.response_for(&item.id);
        if response.fail {
            return Err(ActorError::ExecutionFailed(format!(
                "mock failure for item {}",
                item.id
            )));
        }
        Ok(ExecuteOutput {
            output: response.output,
            traces: None,
        })
    }
}

#[async_trait]
impl NumericJudge for MockActor {
    async fn score(&self, output: &str, _meta: Option<&serde_json::Value>) -> Result<f64, JudgeError> {
        Ok(self
            .overrides
            .read()
            .expect("mock actor lock poisoned")
            .values()
            .find(|r| r.output == output)
            .map(|r| r.score)
            .unwrap_or(self.default_response.score))
    }
}

#[async_trait]
impl FeedbackJudge for MockActor {
    async fn score_with_feedback(
        &self,
        item_id: &str,
        _output: &str,
        _meta: Option<&serde_json::Value>,
        _traces: Option<&serde_json::Value>,
    ) -> Result<JudgeVerdict, JudgeError> {
        let response = self.response_for(item_id);
        Ok(JudgeVerdict {
            score: response.score,
            feedback: response.feedback,
        })
    }
}

#[async_trait]
impl ChatJudge for MockActor {
    async fn chat(&self, _messages: &[ChatMessage], _opts: &ChatOptions) -> Result<String, JudgeError> {
        Ok(self.complete_reply.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str) -> TaskItem {
        TaskItem::new(id, "prompt")
    }

    #[tokio::test]
    async fn executes_with_default_response() {
        let actor = MockActor::new("rewritten instruction");
        let candidate = Candidate::Single("instruction".to_string());
        let out = actor.execute(&candidate, &item("a")).await.unwrap();
        assert_eq!(out.output, "mock output");
    }

    #[tokio::test]
    async fn per_item_override_wins() {
        let actor = MockActor::new("x");
        actor.set_response_for_item("a", MockResponse::success("custom", 0.9));
        let candidate = Candidate::Single("instruction".to_string());
        let out = actor.execute(&candidate, &item("a")).await.unwrap();
        assert_eq!(out.output, "custom");
    }

    #[tokio::test]
    async fn failing_override_errors() {
        let actor = MockActor::new("x");
        actor.set_response_for_item("a", MockResponse::failure());
        let candidate = Candidate::Single("instruction".to_string());
        assert!(actor.execute(&candidate, &item("a")).await.is_err());
    }

    #[tokio::test]
    async fn feedback_judge_returns_scripted_verdict() {
        let actor = MockActor::new("x");
        actor.set_response_for_item(
            "a",
            MockResponse {
                output: "out".into(),
                score: 0.7,
                feedback: "good".into(),
                fail: false,
            },
        );
        let verdict = actor
            .score_with_feedback("a", "out", None, None)
            .await
            .unwrap();
        assert_eq!(verdict.score, 0.7);
        assert_eq!(verdict.feedback, "good");
    }
}
