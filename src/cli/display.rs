//! Output rendering: a `comfy-table` human view or raw JSON, mirroring the
//! teacher's `cli::display` (`CommandOutput` trait, `output()` dispatcher,
//! `list_table` preset).

use comfy_table::{presets, Cell, CellAlignment, ContentArrangement, Table};
use serde::Serialize;

use crate::cli::commands::{RunOutcome, ShowOutcome};
use crate::domain::models::Candidate;

/// A result that can render as either a human-readable table or JSON.
pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;
    fn to_json(&self) -> serde_json::Value;
}

/// Dispatch rendering on the CLI's global `--json` flag.
pub fn render<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!(
            "{}",
            serde_json::to_string_pretty(&result.to_json()).unwrap_or_default()
        );
    } else {
        println!("{}", result.to_human());
    }
}

fn summary_table(rows: &[(&str, String)]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("FIELD").set_alignment(CellAlignment::Left),
            Cell::new("VALUE").set_alignment(CellAlignment::Left),
        ]);
    for (field, value) in rows {
        table.add_row(vec![*field, value.as_str()]);
    }
    table
}

fn candidate_preview(candidate: &Candidate) -> String {
    let text = candidate.concatenate();
    const MAX_LEN: usize = 400;
    if text.len() <= MAX_LEN {
        text
    } else {
        format!("{}\u{2026}", &text[..MAX_LEN])
    }
}

#[derive(Serialize)]
pub struct RunOutcomeView<'a> {
    #[serde(skip)]
    inner: &'a RunOutcome,
}

impl<'a> RunOutcomeView<'a> {
    pub fn new(inner: &'a RunOutcome) -> Self {
        Self { inner }
    }
}

impl<'a> CommandOutput for RunOutcomeView<'a> {
    fn to_human(&self) -> String {
        let table = summary_table(&[
            ("run_dir", self.inner.run_dir.display().to_string()),
            ("best_candidate", candidate_preview(&self.inner.best)),
        ]);
        table.to_string()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "run_dir": self.inner.run_dir,
            "best_candidate": self.inner.best,
        })
    }
}

#[derive(Serialize)]
pub struct ShowOutcomeView<'a> {
    #[serde(skip)]
    inner: &'a ShowOutcome,
}

impl<'a> ShowOutcomeView<'a> {
    pub fn new(inner: &'a ShowOutcome) -> Self {
        Self { inner }
    }
}

impl<'a> CommandOutput for ShowOutcomeView<'a> {
    fn to_human(&self) -> String {
        let table = summary_table(&[
            ("iteration", self.inner.iter.to_string()),
            ("budget_left", self.inner.budget_left.to_string()),
            ("population_size", self.inner.population_size.to_string()),
            ("best_candidate", candidate_preview(&self.inner.best)),
        ]);
        table.to_string()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "iter": self.inner.iter,
            "budget_left": self.inner.budget_left,
            "population_size": self.inner.population_size,
            "best_candidate": self.inner.best,
        })
    }
}
