//! The candidate instruction model.
//!
//! A [`Candidate`] is the unit the search operates over: either a single
//! instruction string, or an ordered bundle of named prompt modules. Both
//! variants share the same operation surface (clone, validate, concatenate,
//! serialize, merge) so the rest of the engine never has to branch on shape
//! except inside this module.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single named prompt fragment within a [`Candidate::Modular`] candidate.
///
/// Ids may repeat across modules of the same candidate; only positional
/// index is load-bearing for merge and mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub id: String,
    pub prompt: String,
}

/// A proposed instruction (or bundle of instruction modules) for the
/// downstream task LLM.
///
/// A candidate is constructed once as either `Single` or `Modular` and never
/// changes shape afterward; every descendant produced by mutation or
/// crossover keeps its ancestor's variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Candidate {
    Single(String),
    Modular { modules: Vec<Module> },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CandidateError {
    #[error("single candidate instruction must not be empty")]
    EmptySingle,
    #[error("modular candidate must have at least one module")]
    EmptyModules,
    #[error("module {0} has an empty id")]
    EmptyModuleId(usize),
    #[error("module {0} has an empty prompt")]
    EmptyModulePrompt(usize),
    #[error("cannot merge candidates of different structure")]
    StructureMismatch,
    #[error("cannot merge modular candidates with different module counts")]
    ModuleCountMismatch,
    #[error("module index {0} out of range (candidate has {1} modules)")]
    ModuleIndexOutOfRange(usize, usize),
}

impl Candidate {
    /// Validate the structural invariants: a `Single` candidate must carry
    /// a non-empty instruction; a `Modular` candidate must be non-empty
    /// and every module must have a non-empty id and prompt.
    pub fn validate(&self) -> Result<(), CandidateError> {
        match self {
            Candidate::Single(text) => {
                if text.trim().is_empty() {
                    return Err(CandidateError::EmptySingle);
                }
                Ok(())
            }
            Candidate::Modular { modules } => {
                if modules.is_empty() {
                    return Err(CandidateError::EmptyModules);
                }
                for (i, m) in modules.iter().enumerate() {
                    if m.id.trim().is_empty() {
                        return Err(CandidateError::EmptyModuleId(i));
                    }
                    if m.prompt.trim().is_empty() {
                        return Err(CandidateError::EmptyModulePrompt(i));
                    }
                }
                Ok(())
            }
        }
    }

    /// The number of modules: 1 for `Single`, `len(modules)` for `Modular`.
    pub fn get_module_count(&self) -> usize {
        match self {
            Candidate::Single(_) => 1,
            Candidate::Modular { modules } => modules.len(),
        }
    }

    /// Produce the "effective instruction" used whenever a flat prompt is
    /// needed: the raw string for `Single`, or module prompts joined with a
    /// blank line for `Modular`.
    pub fn concatenate(&self) -> String {
        match self {
            Candidate::Single(text) => text.clone(),
            Candidate::Modular { modules } => modules
                .iter()
                .map(|m| m.prompt.as_str())
                .collect::<Vec<_>>()
                .join("\n\n"),
        }
    }

    /// Return a new candidate with module `i` replaced by `new_prompt`.
    /// For `Single`, `i = 0` replaces the whole instruction.
    pub fn set_module(&self, i: usize, new_prompt: &str) -> Result<Candidate, CandidateError> {
        match self {
            Candidate::Single(_) => {
                if i != 0 {
                    return Err(CandidateError::ModuleIndexOutOfRange(i, 1));
                }
                Ok(Candidate::Single(new_prompt.to_string()))
            }
            Candidate::Modular { modules } => {
                if i >= modules.len() {
                    return Err(CandidateError::ModuleIndexOutOfRange(i, modules.len()));
                }
                let mut modules = modules.clone();
                modules[i].prompt = new_prompt.to_string();
                Ok(Candidate::Modular { modules })
            }
        }
    }

    /// Module id at index `i`, or `None` for `Single` or out-of-range `i`.
    pub fn module_id(&self, i: usize) -> Option<&str> {
        match self {
            Candidate::Single(_) => None,
            Candidate::Modular { modules } => modules.get(i).map(|m| m.id.as_str()),
        }
    }

    /// Module prompt at index `i`: the whole instruction for `Single` at
    /// `i = 0`, the module's prompt for `Modular`.
    pub fn module_prompt(&self, i: usize) -> Option<&str> {
        match self {
            Candidate::Single(text) => (i == 0).then_some(text.as_str()),
            Candidate::Modular { modules } => modules.get(i).map(|m| m.prompt.as_str()),
        }
    }

    /// Merge two candidates of matching structure, producing a crossover
    /// child. `changed_a`/`changed_b` are the sets of module
    /// indices each parent altered relative to their own shared ancestor
    /// (from lineage); `score_a`/`score_b` are each parent's average score.
    ///
    /// - `Single`: the higher-scoring parent wins outright.
    /// - `Modular`, per index: changed in exactly one parent -> take that
    ///   parent's module; changed in both -> take the higher-scoring
    ///   parent's; changed in neither -> take from `a`. Ties default to `a`.
    pub fn merge(
        a: &Candidate,
        b: &Candidate,
        changed_a: &[usize],
        changed_b: &[usize],
        score_a: f64,
        score_b: f64,
    ) -> Result<Candidate, CandidateError> {
        match (a, b) {
            (Candidate::Single(ta), Candidate::Single(tb)) => {
                if score_b > score_a {
                    Ok(Candidate::Single(tb.clone()))
                } else {
                    Ok(Candidate::Single(ta.clone()))
                }
            }
            (Candidate::Modular { modules: ma }, Candidate::Modular { modules: mb }) => {
                if ma.len() != mb.len() {
                    return Err(CandidateError::ModuleCountMismatch);
                }
                let mut merged = Vec::with_capacity(ma.len());
                for i in 0..ma.len() {
                    let in_a = changed_a.contains(&i);
                    let in_b = changed_b.contains(&i);
                    let chosen = match (in_a, in_b) {
                        (true, false) => &ma[i],
                        (false, true) => &mb[i],
                        (true, true) => {
                            if score_b > score_a {
                                &mb[i]
                            } else {
                                &ma[i]
                            }
                        }
                        (false, false) => &ma[i],
                    };
                    merged.push(chosen.clone());
                }
                Ok(Candidate::Modular { modules: merged })
            }
            _ => Err(CandidateError::StructureMismatch),
        }
    }

    /// Whether `child` represents a genuinely novel recombination of `a` and
    /// `b` rather than a copy of one parent (the crossover novelty check).
    pub fn is_novel_merge(child: &Candidate, a: &Candidate, b: &Candidate) -> bool {
        child != a && child != b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn modular(prompts: &[&str]) -> Candidate {
        Candidate::Modular {
            modules: prompts
                .iter()
                .enumerate()
                .map(|(i, p)| Module {
                    id: format!("m{i}"),
                    prompt: p.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn validate_rejects_empty_single() {
        assert_eq!(
            Candidate::Single(String::new()).validate(),
            Err(CandidateError::EmptySingle)
        );
    }

    #[test]
    fn validate_rejects_empty_modules() {
        assert_eq!(
            Candidate::Modular { modules: vec![] }.validate(),
            Err(CandidateError::EmptyModules)
        );
    }

    #[test]
    fn validate_rejects_empty_module_prompt() {
        let c = Candidate::Modular {
            modules: vec![Module {
                id: "a".into(),
                prompt: "  ".into(),
            }],
        };
        assert_eq!(c.validate(), Err(CandidateError::EmptyModulePrompt(0)));
    }

    #[test]
    fn concatenate_joins_modules_with_blank_line() {
        let c = modular(&["p1", "p2", "p3"]);
        assert_eq!(c.concatenate(), "p1\n\np2\n\np3");
    }

    #[test]
    fn concatenate_single_is_identity() {
        let c = Candidate::Single("do the thing".into());
        assert_eq!(c.concatenate(), "do the thing");
    }

    #[test]
    fn module_count() {
        assert_eq!(Candidate::Single("x".into()).get_module_count(), 1);
        assert_eq!(modular(&["a", "b"]).get_module_count(), 2);
    }

    #[test]
    fn set_module_single_replaces_whole_instruction() {
        let c = Candidate::Single("old".into());
        let new = c.set_module(0, "new").unwrap();
        assert_eq!(new, Candidate::Single("new".into()));
    }

    #[test]
    fn set_module_single_out_of_range() {
        let c = Candidate::Single("old".into());
        assert!(c.set_module(1, "new").is_err());
    }

    #[test]
    fn set_module_modular_replaces_one_index() {
        let c = modular(&["p1", "p2"]);
        let new = c.set_module(1, "p2-new").unwrap();
        assert_eq!(new, modular(&["p1", "p2-new"]));
    }

    // -- merge (disjoint changes) --------------------------------------------

    #[test]
    fn merge_modular_disjoint_changes() {
        let a = modular(&["p1", "p2", "p3"]);
        let b = modular(&["q1", "q2", "q3"]);
        let merged = Candidate::merge(&a, &b, &[0], &[1], 0.5, 0.5).unwrap();
        assert_eq!(merged, modular(&["p1", "q2", "p3"]));
    }

    #[test]
    fn merge_modular_both_changed_picks_higher_score() {
        let a = modular(&["p1"]);
        let b = modular(&["q1"]);
        let merged = Candidate::merge(&a, &b, &[0], &[0], 0.4, 0.9).unwrap();
        assert_eq!(merged, modular(&["q1"]));
    }

    #[test]
    fn merge_modular_neither_changed_defaults_to_a() {
        let a = modular(&["p1"]);
        let b = modular(&["q1"]);
        let merged = Candidate::merge(&a, &b, &[], &[], 0.9, 0.9).unwrap();
        assert_eq!(merged, modular(&["p1"]));
    }

    #[test]
    fn merge_modular_tie_defaults_to_a() {
        let a = modular(&["p1"]);
        let b = modular(&["q1"]);
        let merged = Candidate::merge(&a, &b, &[0], &[0], 0.5, 0.5).unwrap();
        assert_eq!(merged, modular(&["p1"]));
    }

    #[test]
    fn merge_single_copies_higher_scoring_parent() {
        let a = Candidate::Single("a".into());
        let b = Candidate::Single("b".into());
        assert_eq!(
            Candidate::merge(&a, &b, &[], &[], 0.3, 0.7).unwrap(),
            Candidate::Single("b".into())
        );
        assert_eq!(
            Candidate::merge(&a, &b, &[], &[], 0.7, 0.3).unwrap(),
            Candidate::Single("a".into())
        );
    }

    #[test]
    fn merge_rejects_structure_mismatch() {
        let a = Candidate::Single("a".into());
        let b = modular(&["q1"]);
        assert_eq!(
            Candidate::merge(&a, &b, &[], &[], 0.5, 0.5),
            Err(CandidateError::StructureMismatch)
        );
    }

    #[test]
    fn merge_rejects_module_count_mismatch() {
        let a = modular(&["p1"]);
        let b = modular(&["q1", "q2"]);
        assert_eq!(
            Candidate::merge(&a, &b, &[], &[], 0.5, 0.5),
            Err(CandidateError::ModuleCountMismatch)
        );
    }

    /// Merge (Modular, same counts) is idempotent on identical parents.
    #[test]
    fn merge_idempotent_on_identical_parents() {
        let a = modular(&["p1", "p2", "p3"]);
        let merged = Candidate::merge(&a, &a, &[0, 2], &[0, 2], 0.5, 0.5).unwrap();
        assert_eq!(merged, a);
    }

    #[test]
    fn is_novel_merge_detects_copies() {
        let a = modular(&["p1", "p2"]);
        let b = modular(&["q1", "q2"]);
        assert!(!Candidate::is_novel_merge(&a, &a, &b));
        assert!(!Candidate::is_novel_merge(&b, &a, &b));
        let child = modular(&["p1", "q2"]);
        assert!(Candidate::is_novel_merge(&child, &a, &b));
    }

    // -- serialize/deserialize round trip ------------------------------------

    #[test]
    fn single_serializes_as_raw_string() {
        let c = Candidate::Single("hello".into());
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, "\"hello\"");
        let back: Candidate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn modular_serializes_as_tagged_object() {
        let c = modular(&["p1", "p2"]);
        let json = serde_json::to_string(&c).unwrap();
        let back: Candidate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn deserialize_falls_back_to_single_for_bare_string() {
        let back: Candidate = serde_json::from_str("\"bare instruction\"").unwrap();
        assert_eq!(back, Candidate::Single("bare instruction".into()));
    }
}
