//! HTTP-backed actor/judge, grounded in the teacher's `ClaudeClientImpl`
//! (reusable `reqwest::Client`, per-request timeout, exponential-backoff
//! retry of transient failures) but speaking a generic OpenAI-style chat
//! completion wire format so it targets any compatible endpoint.

use std::time::Duration;

use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use serde::{Deserialize, Serialize};

use crate::domain::models::{Candidate, TaskItem};
use crate::domain::ports::{
    Actor, ActorError, ChatJudge, ChatMessage, ChatOptions, ChatRole, ExecuteOutput,
    FeedbackJudge, JudgeError, JudgeVerdict, NumericJudge,
};
use crate::services::config::CollaboratorConfig;

#[derive(Debug, thiserror::Error)]
pub enum HttpConfigError {
    #[error("http collaborator requires an endpoint")]
    MissingEndpoint,
}

/// A `reqwest`-backed chat completion client shared by the actor and judge
/// roles; which role a given instance plays is determined by which port
/// trait the caller reaches it through.
pub struct HttpActor {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    timeout_secs: u64,
}

impl HttpActor {
    pub fn new(config: &CollaboratorConfig) -> Result<Self, HttpConfigError> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or(HttpConfigError::MissingEndpoint)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("reqwest client configuration is always valid here");
        Ok(Self {
            client,
            endpoint,
            model: config.model.clone().unwrap_or_else(|| "default".to_string()),
            timeout_secs: config.timeout_secs,
        })
    }

    async fn chat_completion(&self, messages: Vec<ChatCompletionMessage>) -> Result<String, ActorError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
        };

        let backoff = ExponentialBackoff {
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(10),
            max_elapsed_time: Some(Duration::from_secs(60)),
            ..ExponentialBackoff::default()
        };

        let response = retry(backoff, || async {
            let resp = self
                .client
                .post(&self.endpoint)
                .json(&request)
                .send()
                .await
                .map_err(|e| classify_reqwest_error(e, self.timeout_secs))?;

            if resp.status().is_server_error() || resp.status().as_u16() == 429 {
                return Err(backoff::Error::transient(ActorError::Unavailable(format!(
                    "server returned {}",
                    resp.status()
                ))));
            }
            if !resp.status().is_success() {
                return Err(backoff::Error::permanent(ActorError::ExecutionFailed(
                    format!("server returned {}", resp.status()),
                )));
            }

            resp.json::<ChatCompletionResponse>()
                .await
                .map_err(|e| backoff::Error::permanent(ActorError::ExecutionFailed(e.to_string())))
        })
        .await?;

        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ActorError::ExecutionFailed("empty choices in response".to_string()))
    }
}

fn classify_reqwest_error(err: reqwest::Error, timeout_secs: u64) -> backoff::Error<ActorError> {
    if err.is_timeout() {
        backoff::Error::transient(ActorError::Timeout(timeout_secs))
    } else if err.is_connect() {
        backoff::Error::transient(ActorError::Unavailable(err.to_string()))
    } else {
        backoff::Error::permanent(ActorError::Unavailable(err.to_string()))
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatCompletionMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatCompletionMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[async_trait]
impl Actor for HttpActor {
    async fn complete(&self, prompt: &str) -> Result<String, ActorError> {
        self.chat_completion(vec![ChatCompletionMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        }])
        .await
    }

    async fn execute(
        &self,
        candidate: &Candidate,
        item: &TaskItem,
    ) -> Result<ExecuteOutput, ActorError> {
        let output = self
            .chat_completion(vec![
                ChatCompletionMessage {
                    role: "system".to_string(),
                    content: candidate.concatenate(),
                },
                ChatCompletionMessage {
                    role: "user".to_string(),
                    content: item.user.clone(),
                },
            ])
            .await?;
        Ok(ExecuteOutput {
            output,
            traces: None,
        })
    }
}

#[async_trait]
impl NumericJudge for HttpActor {
    async fn score(&self, output: &str, meta: Option<&serde_json::Value>) -> Result<f64, JudgeError> {
        let verdict = self.score_with_feedback("", output, meta, None).await?;
        Ok(verdict.score)
    }
}

#[async_trait]
impl FeedbackJudge for HttpActor {
    async fn score_with_feedback(
        &self,
        _item_id: &str,
        output: &str,
        meta: Option<&serde_json::Value>,
        _traces: Option<&serde_json::Value>,
    ) -> Result<JudgeVerdict, JudgeError> {
        let prompt = build_judge_prompt(output, meta);
        let reply = self
            .chat_completion(vec![ChatCompletionMessage {
                role: "user".to_string(),
                content: prompt,
            }])
            .await
            .map_err(|e| JudgeError::Unavailable(e.to_string()))?;
        Ok(crate::domain::ports::parse_judge_reply(&reply))
    }
}

#[async_trait]
impl ChatJudge for HttpActor {
    async fn chat(&self, messages: &[ChatMessage], _opts: &ChatOptions) -> Result<String, JudgeError> {
        let messages = messages
            .iter()
            .map(|m| ChatCompletionMessage {
                role: role_str(m.role).to_string(),
                content: m.content.clone(),
            })
            .collect();
        self.chat_completion(messages)
            .await
            .map_err(|e| JudgeError::Unavailable(e.to_string()))
    }
}

fn role_str(role: ChatRole) -> &'static str {
    match role {
        ChatRole::System => "system",
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
    }
}

fn build_judge_prompt(output: &str, meta: Option<&serde_json::Value>) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "Score the following output in [0,1] and give brief feedback. Reply \
         with strict JSON: {\"score\": <number>, \"feedback\": \"...\"}. No \
         other text.\n\n",
    );
    prompt.push_str("Output:\n");
    prompt.push_str(output);
    if let Some(meta) = meta {
        prompt.push_str("\n\nContext:\n");
        prompt.push_str(&meta.to_string());
    }
    prompt
}
