//! Reflection prompt construction and reply extraction.
//!
//! Grounded in the teacher's prompt-template-building services: a pure,
//! side-effect-free function from structured inputs to a single prompt
//! string, with a matching tolerant extractor on the other side.

use serde_json::Value;

use crate::domain::models::Candidate;

/// One before/after observation fed into the reflection prompt: the task
/// text, the candidate's output (if any), judge feedback, and an optional
/// bounded trace summary.
#[derive(Debug, Clone)]
pub struct ReflectionExample {
    pub user: String,
    pub output: String,
    pub feedback: String,
    pub trace_summary: Option<String>,
}

const NEW_PROMPT_BLOCK_START: &str = "```NEW_PROMPT";
const NEW_PROMPT_BLOCK_END: &str = "```";

/// Build the reflection meta-prompt that asks the actor to rewrite module
/// `target_index` of `candidate`. For a `Single` candidate, `target_index`
/// is always `0` and there is nothing else to enumerate.
pub fn build_reflection_prompt(
    candidate: &Candidate,
    target_index: usize,
    hint: Option<&str>,
    examples: &[ReflectionExample],
) -> String {
    let mut out = String::new();
    out.push_str("# REWRITE\n\n");
    out.push_str(
        "You are improving the instruction given to an assistant. Rewrite the \
         marked section to perform better on the examples below, while \
         preserving every unmarked section verbatim.\n\n",
    );

    match candidate {
        Candidate::Single(text) => {
            out.push_str("## Current instruction\n\n```\n");
            out.push_str(text);
            out.push_str("\n```\n\n");
        }
        Candidate::Modular { modules } => {
            out.push_str("## Current modules\n\n");
            for (i, module) in modules.iter().enumerate() {
                if i == target_index {
                    out.push_str(&format!("### >>> MODULE {} ({}) — REWRITE THIS <<<\n\n", i, module.id));
                } else {
                    out.push_str(&format!("### MODULE {} ({}) — keep verbatim\n\n", i, module.id));
                }
                out.push_str("```\n");
                out.push_str(&module.prompt);
                out.push_str("\n```\n\n");
            }
        }
    }

    if let Some(hint) = hint {
        out.push_str("## Strategy hint\n\n");
        out.push_str(hint);
        out.push_str("\n\n");
    }

    if !examples.is_empty() {
        out.push_str("## Examples\n\n");
        for (i, ex) in examples.iter().enumerate() {
            out.push_str(&format!("### Example {}\n", i + 1));
            out.push_str(&format!("user: {}\n", ex.user));
            out.push_str(&format!("assistant: {}\n", ex.output));
            out.push_str(&format!("feedback: {}\n", ex.feedback));
            if let Some(trace) = &ex.trace_summary {
                out.push_str(&format!("trace: {trace}\n"));
            }
            out.push('\n');
        }
    }

    out.push_str("## Reply format\n\n");
    out.push_str(&format!(
        "Reply with the rewritten text in a fenced block starting with \
         `{NEW_PROMPT_BLOCK_START}` and ending with `{NEW_PROMPT_BLOCK_END}`. \
         Do not include anything else inside the block.\n"
    ));

    out
}

/// Extract the rewritten instruction from the actor's raw reply. Accepts
/// the canonical `NEW_PROMPT` fence, a bare triple-backtick fence,
/// or falls back to the trimmed raw reply. Strips a leading "new ... prompt"
/// marker line the actor may have echoed ahead of the real content.
pub fn extract_rewrite(raw: &str) -> String {
    let candidates = [
        extract_fenced(raw, NEW_PROMPT_BLOCK_START, NEW_PROMPT_BLOCK_END),
        extract_fenced(raw, "```", "```"),
    ];

    let body = candidates
        .into_iter()
        .flatten()
        .next()
        .unwrap_or_else(|| raw.trim().to_string());

    strip_leading_marker(&body)
}

fn extract_fenced(raw: &str, start: &str, end: &str) -> Option<String> {
    let start_idx = raw.find(start)?;
    let after_start = start_idx + start.len();
    let rest = &raw[after_start..];
    let rest = rest.strip_prefix('\n').unwrap_or(rest);
    let end_idx = rest.find(end)?;
    Some(rest[..end_idx].trim().to_string())
}

fn strip_leading_marker(body: &str) -> String {
    let mut lines = body.lines();
    if let Some(first) = lines.clone().next() {
        let lowered = first.to_lowercase();
        if lowered.contains("new") && lowered.contains("prompt") && first.len() < 80 {
            lines.next();
            return lines.collect::<Vec<_>>().join("\n").trim().to_string();
        }
    }
    body.trim().to_string()
}

/// Produce a deterministic, size-bounded summary of an opaque trace map.
/// `null`/non-object inputs return `None`. Keys are sorted
/// lexicographically; the body is indented JSON truncated at the last
/// structural boundary (`,`, `}`, `\n`) within the high-80% region of
/// `max_size`, falling back to a hard cut at `max_size - 3` with an
/// ellipsis appended.
pub fn summarize_trace(value: Option<&Value>, max_size: usize) -> Option<String> {
    let value = value?;
    let Value::Object(map) = value else {
        return None;
    };

    let mut sorted: Vec<(&String, &Value)> = map.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let ordered = serde_json::Map::from_iter(sorted.into_iter().map(|(k, v)| (k.clone(), v.clone())));
    let rendered = serde_json::to_string_pretty(&Value::Object(ordered)).unwrap_or_default();

    Some(truncate_bounded(&rendered, max_size))
}

fn truncate_bounded(s: &str, max_size: usize) -> String {
    if s.len() <= max_size {
        return s.to_string();
    }

    let high_region_start = (max_size * 80) / 100;
    let search_region = &s[high_region_start.min(s.len())..max_size.min(s.len())];

    let boundary = search_region
        .rfind([',', '}', '\n'])
        .map(|idx| high_region_start + idx + 1);

    match boundary {
        Some(cut) if cut <= max_size => format!("{}...", &s[..cut]),
        _ => {
            let hard_cut = max_size.saturating_sub(3).min(s.len());
            format!("{}...", &s[..hard_cut])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_new_prompt_fence() {
        let raw = "some preamble\n```NEW_PROMPT\nrewritten text\n```\ntrailing";
        assert_eq!(extract_rewrite(raw), "rewritten text");
    }

    #[test]
    fn extracts_bare_fence_when_no_canonical_marker() {
        let raw = "```\nrewritten text\n```";
        assert_eq!(extract_rewrite(raw), "rewritten text");
    }

    #[test]
    fn falls_back_to_trimmed_raw_reply() {
        let raw = "  just the text, no fences  ";
        assert_eq!(extract_rewrite(raw), "just the text, no fences");
    }

    #[test]
    fn strips_leading_new_prompt_marker_line() {
        let raw = "```\nNew rewritten prompt:\nthe actual instruction\n```";
        assert_eq!(extract_rewrite(raw), "the actual instruction");
    }

    #[test]
    fn prompt_marks_target_module_for_modular_candidate() {
        let candidate = Candidate::Modular {
            modules: vec![
                crate::domain::models::Module { id: "a".into(), prompt: "p1".into() },
                crate::domain::models::Module { id: "b".into(), prompt: "p2".into() },
            ],
        };
        let prompt = build_reflection_prompt(&candidate, 1, Some("be concise"), &[]);
        assert!(prompt.contains(">>> MODULE 1 (b) — REWRITE THIS <<<"));
        assert!(prompt.contains("MODULE 0 (a) — keep verbatim"));
        assert!(prompt.contains("be concise"));
    }

    /// Trace truncation scenario 3: small map fits entirely under a large
    /// cap, sorted lexicographically.
    #[test]
    fn trace_truncation_scenario_fits_under_large_cap() {
        let value = json!({"b": 2, "a": 1, "c": 3});
        let summary = summarize_trace(Some(&value), 1000).unwrap();
        assert_eq!(summary, "{\n  \"a\": 1,\n  \"b\": 2,\n  \"c\": 3\n}");
    }

    #[test]
    fn trace_truncation_scenario_truncates_under_small_cap() {
        let value = json!({"b": 2, "a": 1, "c": 3});
        let summary = summarize_trace(Some(&value), 10).unwrap();
        assert!(summary.ends_with("..."));
        assert!(summary.len() <= 13);
    }

    #[test]
    fn null_trace_is_absent() {
        assert_eq!(summarize_trace(Some(&Value::Null), 100), None);
        assert_eq!(summarize_trace(None, 100), None);
    }

    #[test]
    fn non_object_trace_is_absent() {
        assert_eq!(summarize_trace(Some(&json!("a string")), 100), None);
        assert_eq!(summarize_trace(Some(&json!(42)), 100), None);
        assert_eq!(summarize_trace(Some(&json!(true)), 100), None);
        assert_eq!(summarize_trace(Some(&json!([1, 2, 3])), 100), None);
    }

    #[test]
    fn trace_summarization_is_deterministic() {
        let value = json!({"z": 1, "a": 2, "m": [1, 2, 3]});
        let a = summarize_trace(Some(&value), 500);
        let b = summarize_trace(Some(&value), 500);
        assert_eq!(a, b);
    }
}
