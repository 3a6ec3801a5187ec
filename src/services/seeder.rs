//! One-shot seed expansion: generate K initial variants from the top
//! strategies, score them on a small screen set, keep the best few.
//!
//! Grounded in the same actor/judge collaboration shape the optimization
//! engine uses for its propose/execute/judge cycle, run once up front
//! instead of per-iteration.

use crate::domain::models::{Candidate, Strategy, TaskItem};
use crate::domain::ports::{Actor, FeedbackJudge};
use crate::services::reflection::{build_reflection_prompt, extract_rewrite, ReflectionExample};

/// Result of seeding: the final population (seed first, then up to 4
/// top-scoring variants) and the exact number of actor/judge calls spent,
/// so the caller's budget accountant can decrement precisely.
pub struct SeedResult {
    pub variants: Vec<Candidate>,
    pub calls_used: u64,
}

const MAX_KEPT_VARIANTS: usize = 4;

/// Screen-set size: `max(3, floor(0.1 * |feedback|))`, capped to the
/// feedback set's actual size.
pub fn screen_set_size(feedback_len: usize) -> usize {
    let computed = (feedback_len as f64 * 0.1).floor() as usize;
    computed.max(3).min(feedback_len)
}

/// Run the seeder. `allowance` is the seeding-budget cap in calls; a
/// strategy round is skipped (and seeding stops) once the remaining
/// allowance can't cover its full cost (`1` propose `+ 2 * screen.len()`
/// execute+judge calls).
pub async fn seed(
    seed_candidate: &Candidate,
    screen: &[TaskItem],
    strategies: &[Strategy],
    k: usize,
    actor: &dyn Actor,
    judge: &dyn FeedbackJudge,
    allowance: u64,
) -> SeedResult {
    let round_cost = 1 + 2 * screen.len() as u64;
    let mut remaining = allowance;
    let mut calls_used = 0u64;
    let mut scored: Vec<(Candidate, f64)> = Vec::new();

    for strategy in strategies.iter().take(k) {
        if remaining < round_cost {
            break;
        }

        let examples: Vec<ReflectionExample> = screen
            .iter()
            .map(|item| ReflectionExample {
                user: item.user.clone(),
                output: String::new(),
                feedback: "(no prior output; propose an improved instruction)".to_string(),
                trace_summary: None,
            })
            .collect();

        let prompt = build_reflection_prompt(seed_candidate, 0, Some(&strategy.hint), &examples);

        let reply = match actor.complete(&prompt).await {
            Ok(reply) => reply,
            Err(_) => {
                remaining = remaining.saturating_sub(1);
                calls_used += 1;
                continue;
            }
        };
        remaining = remaining.saturating_sub(1);
        calls_used += 1;

        let rewritten = extract_rewrite(&reply);
        let Ok(variant) = seed_candidate.set_module(0, &rewritten) else {
            continue;
        };

        let mut scores = Vec::with_capacity(screen.len());
        for item in screen {
            let output = match actor.execute(&variant, item).await {
                Ok(out) => out.output,
                Err(_) => continue,
            };
            remaining = remaining.saturating_sub(1);
            calls_used += 1;

            let verdict = match judge
                .score_with_feedback(&item.id, &output, item.meta.as_ref(), None)
                .await
            {
                Ok(v) => v,
                Err(_) => continue,
            };
            remaining = remaining.saturating_sub(1);
            calls_used += 1;

            scores.push(verdict.score);
        }

        let uplift = if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<f64>() / scores.len() as f64
        };

        scored.push((variant, uplift));
    }

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(MAX_KEPT_VARIANTS);

    let mut variants = vec![seed_candidate.clone()];
    variants.extend(scored.into_iter().map(|(c, _)| c));

    SeedResult {
        variants,
        calls_used,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{ActorError, ExecuteOutput, JudgeError, JudgeVerdict};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct CountingCollaborator {
        calls: AtomicU64,
        score: f64,
    }

    #[async_trait]
    impl Actor for CountingCollaborator {
        async fn complete(&self, _prompt: &str) -> Result<String, ActorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("```NEW_PROMPT\nrewritten instruction\n```".to_string())
        }
        async fn execute(
            &self,
            _candidate: &Candidate,
            _item: &TaskItem,
        ) -> Result<ExecuteOutput, ActorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ExecuteOutput { output: "out".into(), traces: None })
        }
    }

    #[async_trait]
    impl FeedbackJudge for CountingCollaborator {
        async fn score_with_feedback(
            &self,
            _item_id: &str,
            _output: &str,
            _meta: Option<&serde_json::Value>,
            _traces: Option<&serde_json::Value>,
        ) -> Result<JudgeVerdict, JudgeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(JudgeVerdict { score: self.score, feedback: String::new() })
        }
    }

    fn screen(n: usize) -> Vec<TaskItem> {
        (0..n).map(|i| TaskItem::new(format!("t{i}"), format!("do {i}"))).collect()
    }

    fn strategies(n: usize) -> Vec<Strategy> {
        (0..n)
            .map(|i| Strategy { id: format!("s{i}"), hint: format!("hint {i}"), core: false })
            .collect()
    }

    #[test]
    fn screen_set_size_respects_minimum_of_three() {
        assert_eq!(screen_set_size(5), 3);
        assert_eq!(screen_set_size(2), 2); // capped to feedback length
    }

    #[test]
    fn screen_set_size_scales_with_feedback_size() {
        assert_eq!(screen_set_size(100), 10);
    }

    #[tokio::test]
    async fn seeds_up_to_four_variants_plus_seed() {
        let collaborator = CountingCollaborator { calls: AtomicU64::new(0), score: 0.8 };
        let seed_candidate = Candidate::Single("seed instruction".into());
        let result = seed(
            &seed_candidate,
            &screen(3),
            &strategies(6),
            6,
            &collaborator,
            &collaborator,
            10_000,
        )
        .await;

        assert_eq!(result.variants.len(), 5); // seed + 4 kept
        assert_eq!(result.variants[0], seed_candidate);
    }

    #[tokio::test]
    async fn calls_used_matches_actual_spend() {
        let collaborator = CountingCollaborator { calls: AtomicU64::new(0), score: 0.5 };
        let result = seed(
            &Candidate::Single("seed".into()),
            &screen(2),
            &strategies(2),
            2,
            &collaborator,
            &collaborator,
            10_000,
        )
        .await;

        // Each strategy: 1 propose + 2 execute + 2 judge = 5; 2 strategies = 10.
        assert_eq!(result.calls_used, 10);
        assert_eq!(collaborator.calls.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn stops_early_when_allowance_insufficient_for_next_round() {
        let collaborator = CountingCollaborator { calls: AtomicU64::new(0), score: 0.5 };
        // round_cost = 1 + 2*2 = 5; allowance 6 covers one round but not two.
        let result = seed(
            &Candidate::Single("seed".into()),
            &screen(2),
            &strategies(5),
            5,
            &collaborator,
            &collaborator,
            6,
        )
        .await;

        assert_eq!(result.calls_used, 5);
    }
}
