//! The judge ports: a chat-style judge used by the reflection prefilter,
//! a cheap numeric scorer `mu`, and a feedback+score scorer `mu_f`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("judge unavailable: {0}")]
    Unavailable(String),
    #[error("judge request timed out after {0}s")]
    Timeout(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// A tolerant, already-parsed judge verdict: `{score, feedback}`. Parse
/// failures of the judge's raw reply recover to
/// `JudgeVerdict { score: 0.0, feedback: String::new() }` at the call site,
/// never here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeVerdict {
    pub score: f64,
    #[serde(default)]
    pub feedback: String,
}

impl JudgeVerdict {
    pub fn clamp(mut self) -> Self {
        self.score = self.score.clamp(0.0, 1.0);
        self
    }
}

/// Chat-style judge used by the strategy prefilter and, optionally, by
/// `mu_f` implementations built on top of a chat model.
#[async_trait]
pub trait ChatJudge: Send + Sync {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        opts: &ChatOptions,
    ) -> Result<String, JudgeError>;
}

/// `mu`: a cheap numeric scorer with no feedback text and no extra judge
/// call.
#[async_trait]
pub trait NumericJudge: Send + Sync {
    async fn score(&self, output: &str, meta: Option<&serde_json::Value>) -> Result<f64, JudgeError>;
}

/// `mu_f`: the full feedback+score judge.
#[async_trait]
pub trait FeedbackJudge: Send + Sync {
    async fn score_with_feedback(
        &self,
        item_id: &str,
        output: &str,
        meta: Option<&serde_json::Value>,
        traces: Option<&serde_json::Value>,
    ) -> Result<JudgeVerdict, JudgeError>;
}

/// Parse a judge's raw JSON reply with a tolerant schema: missing `score`
/// defaults to 0, out-of-range scores clamp to `[0,1]`, and a missing
/// `feedback` defaults to empty. On outright parse failure, recovers to
/// `{score: 0, feedback: ""}`.
pub fn parse_judge_reply(raw: &str) -> JudgeVerdict {
    #[derive(Deserialize)]
    struct Loose {
        #[serde(default)]
        score: f64,
        #[serde(default)]
        feedback: String,
    }

    serde_json::from_str::<Loose>(raw)
        .map(|l| {
            JudgeVerdict {
                score: l.score,
                feedback: l.feedback,
            }
            .clamp()
        })
        .unwrap_or(JudgeVerdict {
            score: 0.0,
            feedback: String::new(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_reply() {
        let verdict = parse_judge_reply(r#"{"score": 0.8, "feedback": "good"}"#);
        assert_eq!(verdict, JudgeVerdict { score: 0.8, feedback: "good".into() });
    }

    #[test]
    fn clamps_out_of_range_score() {
        let verdict = parse_judge_reply(r#"{"score": 5.0, "feedback": "too high"}"#);
        assert_eq!(verdict.score, 1.0);
    }

    #[test]
    fn defaults_missing_fields() {
        let verdict = parse_judge_reply(r#"{}"#);
        assert_eq!(verdict, JudgeVerdict { score: 0.0, feedback: String::new() });
    }

    #[test]
    fn recovers_from_malformed_json() {
        let verdict = parse_judge_reply("not json at all");
        assert_eq!(verdict, JudgeVerdict { score: 0.0, feedback: String::new() });
    }
}
