//! Lineage and tried-triplet tracking.
//!
//! Lineage is a DAG keyed by integer indices into the population, stored as
//! a flat append-only sequence with an optional parent index rather than a
//! back-pointer graph -- there is never a cycle to worry about because a
//! candidate can only reference indices strictly less than its own.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// One entry per accepted candidate, recording which modules changed
/// relative to its parent (or the union of both parents' changes, for a
/// crossover child) and who that parent was.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineageEntry {
    pub candidate_index: usize,
    pub changed_modules: Vec<usize>,
    pub parent_index: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Lineage {
    entries: Vec<LineageEntry>,
}

impl Lineage {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, entry: LineageEntry) {
        self.entries.push(entry);
    }

    pub fn entry_for(&self, candidate_index: usize) -> Option<&LineageEntry> {
        self.entries
            .iter()
            .find(|e| e.candidate_index == candidate_index)
    }

    /// The module indices this candidate changed relative to its recorded
    /// parent. The seed (no lineage entry) changed nothing.
    pub fn changed_modules(&self, candidate_index: usize) -> &[usize] {
        self.entry_for(candidate_index)
            .map(|e| e.changed_modules.as_slice())
            .unwrap_or(&[])
    }

    pub fn parent_of(&self, candidate_index: usize) -> Option<usize> {
        self.entry_for(candidate_index).and_then(|e| e.parent_index)
    }

    /// Full ancestor chain of `k`, nearest first, not including `k` itself.
    pub fn ancestors(&self, k: usize) -> Vec<usize> {
        let mut chain = Vec::new();
        let mut current = self.parent_of(k);
        let mut guard = 0usize;
        while let Some(p) = current {
            chain.push(p);
            current = self.parent_of(p);
            guard += 1;
            if guard > self.entries.len() + 1 {
                break; // defensive: lineage indices are strictly decreasing, this cannot trigger
            }
        }
        chain
    }

    /// Whether `maybe_ancestor` appears anywhere in `k`'s ancestor chain.
    pub fn is_ancestor(&self, maybe_ancestor: usize, k: usize) -> bool {
        self.ancestors(k).contains(&maybe_ancestor)
    }

    /// Whether `a` and `b` are direct relatives: either is an ancestor of
    /// the other.
    pub fn are_direct_relatives(&self, a: usize, b: usize) -> bool {
        a == b || self.is_ancestor(a, b) || self.is_ancestor(b, a)
    }

    /// The most recent common ancestor of `a` and `b`, found by walking
    /// both ancestor chains (nearest-first) and returning the first shared
    /// index. `None` if the chains never meet.
    pub fn most_recent_common_ancestor(&self, a: usize, b: usize) -> Option<usize> {
        let chain_a: HashSet<usize> = self.ancestors(a).into_iter().collect();
        self.ancestors(b).into_iter().find(|p| chain_a.contains(p))
    }
}

/// An unordered pair of candidate indices plus the crossover's shared
/// ancestor, used to avoid repeating an identical crossover attempt within
/// a run. Not persisted across resumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TriedTriplet {
    pair: (usize, usize),
    ancestor: usize,
}

impl TriedTriplet {
    pub fn new(a: usize, b: usize, ancestor: usize) -> Self {
        let pair = if a <= b { (a, b) } else { (b, a) };
        Self { pair, ancestor }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TriedTriplets {
    seen: HashSet<TriedTriplet>,
}

impl TriedTriplets {
    pub fn new() -> Self {
        Self {
            seen: HashSet::new(),
        }
    }

    pub fn contains(&self, a: usize, b: usize, ancestor: usize) -> bool {
        self.seen.contains(&TriedTriplet::new(a, b, ancestor))
    }

    pub fn record(&mut self, a: usize, b: usize, ancestor: usize) {
        self.seen.insert(TriedTriplet::new(a, b, ancestor));
    }
}
