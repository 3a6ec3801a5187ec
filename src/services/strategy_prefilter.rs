//! Strategy prefilter: rate the strategy catalog against a preview of
//! task texts, keep those above threshold.
//!
//! Grounded in the judge-reply tolerant-parsing discipline already used by
//! `domain::ports::judge::parse_judge_reply`, generalized from a single
//! `{score, feedback}` object to an `id -> score` map.

use std::collections::HashMap;

use serde::Deserialize;

use crate::domain::models::Strategy;
use crate::domain::ports::Actor;

const MAX_PREVIEW_ITEMS: usize = 8;

/// Rate `catalog` against up to the first [`MAX_PREVIEW_ITEMS`] of
/// `task_preview`, keeping entries scoring `>= threshold`, sorted
/// descending, optionally capped to `top_k`.
///
/// Returns an empty result without calling the actor when either input is
/// empty. On judge-reply parse failure, falls back to a loose substring
/// scan; on total actor failure, keeps the entire catalog unscored (the
/// caller is expected to log this as "prefilter failure, keeping previous
/// set").
pub async fn prefilter_strategies(
    actor: &dyn Actor,
    catalog: &[Strategy],
    task_preview: &[String],
    threshold: f64,
    top_k: Option<usize>,
) -> Vec<Strategy> {
    if catalog.is_empty() || task_preview.is_empty() {
        return Vec::new();
    }

    let preview: Vec<&String> = task_preview.iter().take(MAX_PREVIEW_ITEMS).collect();
    let prompt = build_rating_prompt(catalog, &preview);

    let reply = match actor.complete(&prompt).await {
        Ok(reply) => reply,
        Err(_) => return catalog.to_vec(),
    };

    let scores = parse_score_map(&reply, catalog);

    let mut scored: Vec<(Strategy, f64)> = catalog
        .iter()
        .cloned()
        .map(|s| {
            let score = scores.get(&s.id).copied().unwrap_or(0.0);
            (s, score)
        })
        .filter(|(_, score)| *score >= threshold)
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut kept: Vec<Strategy> = scored.into_iter().map(|(s, _)| s).collect();
    if let Some(top_k) = top_k {
        kept.truncate(top_k);
    }
    kept
}

fn build_rating_prompt(catalog: &[Strategy], preview: &[&String]) -> String {
    let mut out = String::new();
    out.push_str(
        "Rate each strategy below on how well it would help rewrite an \
         instruction for these example tasks. Reply with strict JSON: an \
         object mapping strategy id to a score in [0,1]. No other text.\n\n",
    );
    out.push_str("Strategies:\n");
    for s in catalog {
        out.push_str(&format!("- {}: {}\n", s.id, s.hint));
    }
    out.push_str("\nExample tasks:\n");
    for (i, text) in preview.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, text));
    }
    out
}

/// Parse the actor's reply as `{id: score, ...}`, ignoring extra keys and
/// clamping to `[0,1]`. On parse failure, fall back to a loose substring
/// match: for each known id, look for `"<id>": <number>` anywhere in the
/// reply text.
fn parse_score_map(raw: &str, catalog: &[Strategy]) -> HashMap<String, f64> {
    if let Ok(map) = serde_json::from_str::<HashMap<String, f64>>(raw) {
        return map
            .into_iter()
            .map(|(k, v)| (k, v.clamp(0.0, 1.0)))
            .collect();
    }

    #[derive(Deserialize)]
    struct Loose(HashMap<String, serde_json::Value>);

    if let Ok(Loose(map)) = serde_json::from_str::<Loose>(raw) {
        return map
            .into_iter()
            .filter_map(|(k, v)| v.as_f64().map(|n| (k, n.clamp(0.0, 1.0))))
            .collect();
    }

    loose_substring_scan(raw, catalog)
}

fn loose_substring_scan(raw: &str, catalog: &[Strategy]) -> HashMap<String, f64> {
    let mut out = HashMap::new();
    for s in catalog {
        let needle = format!("\"{}\"", s.id);
        if let Some(pos) = raw.find(&needle) {
            let after = &raw[pos + needle.len()..];
            if let Some(colon) = after.find(':') {
                let tail = after[colon + 1..].trim_start();
                let number: String = tail
                    .chars()
                    .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                    .collect();
                if let Ok(value) = number.parse::<f64>() {
                    out.insert(s.id.clone(), value.clamp(0.0, 1.0));
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Candidate, TaskItem};
    use crate::domain::ports::ActorError;
    use async_trait::async_trait;

    struct FixedActor(String);

    #[async_trait]
    impl Actor for FixedActor {
        async fn complete(&self, _prompt: &str) -> Result<String, ActorError> {
            Ok(self.0.clone())
        }
        async fn execute(
            &self,
            _candidate: &Candidate,
            _item: &TaskItem,
        ) -> Result<crate::domain::ports::ExecuteOutput, ActorError> {
            unimplemented!()
        }
    }

    struct FailingActor;

    #[async_trait]
    impl Actor for FailingActor {
        async fn complete(&self, _prompt: &str) -> Result<String, ActorError> {
            Err(ActorError::Unavailable("down".into()))
        }
        async fn execute(
            &self,
            _candidate: &Candidate,
            _item: &TaskItem,
        ) -> Result<crate::domain::ports::ExecuteOutput, ActorError> {
            unimplemented!()
        }
    }

    fn catalog() -> Vec<Strategy> {
        vec![
            Strategy { id: "a".into(), hint: "h1".into(), core: false },
            Strategy { id: "b".into(), hint: "h2".into(), core: false },
            Strategy { id: "c".into(), hint: "h3".into(), core: false },
        ]
    }

    #[tokio::test]
    async fn empty_catalog_skips_actor_call() {
        let actor = FailingActor;
        let result = prefilter_strategies(&actor, &[], &["x".into()], 0.5, None).await;
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn empty_preview_skips_actor_call() {
        let actor = FailingActor;
        let result = prefilter_strategies(&actor, &catalog(), &[], 0.5, None).await;
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn keeps_entries_above_threshold_sorted_descending() {
        let actor = FixedActor(r#"{"a": 0.9, "b": 0.2, "c": 0.6}"#.to_string());
        let result = prefilter_strategies(&actor, &catalog(), &["task".into()], 0.5, None).await;
        assert_eq!(
            result.iter().map(|s| s.id.clone()).collect::<Vec<_>>(),
            vec!["a", "c"]
        );
    }

    #[tokio::test]
    async fn caps_to_top_k() {
        let actor = FixedActor(r#"{"a": 0.9, "b": 0.8, "c": 0.7}"#.to_string());
        let result = prefilter_strategies(&actor, &catalog(), &["task".into()], 0.0, Some(2)).await;
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, "a");
    }

    #[tokio::test]
    async fn missing_keys_default_to_zero() {
        let actor = FixedActor(r#"{"a": 0.9}"#.to_string());
        let result = prefilter_strategies(&actor, &catalog(), &["task".into()], 0.5, None).await;
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "a");
    }

    #[tokio::test]
    async fn falls_back_to_loose_scan_on_malformed_json() {
        let actor = FixedActor("here are scores \"a\": 0.8, \"b\": 0.1 done".to_string());
        let result = prefilter_strategies(&actor, &catalog(), &["task".into()], 0.5, None).await;
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "a");
    }

    #[tokio::test]
    async fn actor_failure_keeps_entire_catalog() {
        let actor = FailingActor;
        let result = prefilter_strategies(&actor, &catalog(), &["task".into()], 0.9, None).await;
        assert_eq!(result.len(), catalog().len());
    }
}
