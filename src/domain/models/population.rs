//! Population and score matrix.
//!
//! `Population` is an append-only, never-deleted sequence of candidates;
//! an index into it is a candidate's stable identity for the run. `ScoreMatrix`
//! is the ragged table `S[k][i]` of candidate `k`'s score on Pareto item `i`,
//! with missing cells treated as `-inf` for dominance purposes only by the
//! Pareto selector -- elsewhere a missing cell is simply absent.

use serde::{Deserialize, Serialize};

use super::candidate::Candidate;

/// An ordered, append-only sequence of candidates. Index 0 is always the
/// seed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Population {
    candidates: Vec<Candidate>,
}

impl Population {
    pub fn new(seed: Candidate) -> Self {
        Self {
            candidates: vec![seed],
        }
    }

    pub fn from_vec(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn get(&self, k: usize) -> Option<&Candidate> {
        self.candidates.get(k)
    }

    /// Append a candidate, returning its new stable index.
    pub fn push(&mut self, candidate: Candidate) -> usize {
        self.candidates.push(candidate);
        self.candidates.len() - 1
    }

    pub fn as_slice(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter()
    }
}

/// The ragged score matrix `S[k][i]`. Rows are appended in lockstep with
/// [`Population::push`]; a row may be shorter than `|Dpareto|` if a
/// candidate hasn't been scored on every item (never expected in practice,
/// but tolerated).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreMatrix {
    rows: Vec<Vec<f64>>,
}

impl ScoreMatrix {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a new row (one score per Pareto item) for the next candidate.
    pub fn push_row(&mut self, row: Vec<f64>) {
        self.rows.push(row);
    }

    pub fn row(&self, k: usize) -> Option<&[f64]> {
        self.rows.get(k).map(Vec::as_slice)
    }

    /// `S[k][i]`, or `None` if either index is out of range.
    pub fn get(&self, k: usize, i: usize) -> Option<f64> {
        self.rows.get(k).and_then(|row| row.get(i)).copied()
    }

    /// Mean of row `k`'s present entries. Empty row scores `0.0` (there is
    /// nothing to average, and no candidate is ever scored on zero items in
    /// practice once Pareto set is non-empty).
    pub fn avg(&self, k: usize) -> f64 {
        match self.rows.get(k) {
            Some(row) if !row.is_empty() => row.iter().sum::<f64>() / row.len() as f64,
            _ => 0.0,
        }
    }

    /// `argmax_k avg(S[k])`. `None` if the matrix has no rows.
    pub fn best_index(&self) -> Option<usize> {
        (0..self.rows.len())
            .max_by(|&a, &b| {
                self.avg(a)
                    .partial_cmp(&self.avg(b))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_index_picks_highest_average() {
        let mut s = ScoreMatrix::new();
        s.push_row(vec![0.5, 0.4, 0.6]);
        s.push_row(vec![0.9, 0.9, 0.9]);
        s.push_row(vec![0.1, 0.1]);
        assert_eq!(s.best_index(), Some(1));
    }

    #[test]
    fn best_index_empty_matrix() {
        assert_eq!(ScoreMatrix::new().best_index(), None);
    }

    #[test]
    fn get_missing_cell_is_none() {
        let mut s = ScoreMatrix::new();
        s.push_row(vec![0.5]);
        assert_eq!(s.get(0, 5), None);
        assert_eq!(s.get(5, 0), None);
    }

    #[test]
    fn population_index_0_is_seed() {
        let pop = Population::new(Candidate::Single("seed".into()));
        assert_eq!(pop.get(0), Some(&Candidate::Single("seed".into())));
    }

    #[test]
    fn population_push_returns_stable_index() {
        let mut pop = Population::new(Candidate::Single("seed".into()));
        let idx = pop.push(Candidate::Single("child".into()));
        assert_eq!(idx, 1);
        assert_eq!(pop.len(), 2);
    }
}
