//! A budget-bounded evolutionary search over textual instructions for a
//! downstream LLM task: propose, evaluate, and selectively accept candidate
//! rewrites of a seed instruction against a Pareto-tracked population.

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;
