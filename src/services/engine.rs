//! The optimization engine: dataset split, main propose-evaluate-accept
//! loop, mutate-vs-crossover choice, holdout gate, lineage, and
//! checkpoints. This is the component the rest of the crate exists to
//! support; every other service is a collaborator it orchestrates.

use futures::future::join_all;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::domain::error::EngineError;
use crate::domain::models::{
    core_pool, Bandit, Candidate, DatasetSplit, Lineage, LineageEntry, Population, ScoreMatrix,
    Strategy, TaskItem, TriedTriplets,
};
use crate::domain::ports::{Actor, ActorError, FeedbackJudge, JudgeError, NumericJudge};
use crate::services::adaptive_scheduler::{exploration_rates, UpliftWindow};
use crate::services::budget_accountant::{BudgetAccountant, BudgetTag};
use crate::services::checkpoint::RunDirectory;
use crate::services::config::{Config, ScoreForPareto};
use crate::services::pareto_selector::pareto_select;
use crate::services::reflection::{build_reflection_prompt, extract_rewrite, summarize_trace, ReflectionExample};
use crate::services::seeder::{screen_set_size, seed as run_seeder};
use crate::services::strategy_prefilter::prefilter_strategies;

const TRACE_MAX_SIZE: usize = 2_000;
const CROSSOVER_PARTNER_ATTEMPTS: usize = 5;

/// Whether a main-loop iteration completed normally or the budget ran out
/// mid-minibatch, terminating the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationOutcome {
    Completed,
    BudgetExhausted,
}

enum ScoreError {
    BudgetExhausted,
    CollaboratorFailure,
}

struct ItemScore {
    score: f64,
    feedback: String,
    output: String,
    trace_summary: Option<String>,
}

/// Everything the engine needs to start a fresh run.
pub struct EngineInit {
    pub task_items: Vec<TaskItem>,
    pub seed_candidate: Candidate,
    pub strategy_catalog: Vec<Strategy>,
}

pub struct OptimizationEngine {
    config: Config,
    budget: BudgetAccountant,
    actor: Box<dyn Actor>,
    numeric_judge: Box<dyn NumericJudge>,
    feedback_judge: Box<dyn FeedbackJudge>,
    run_dir: Option<RunDirectory>,
    rng: StdRng,

    task_items: Vec<TaskItem>,
    population: Population,
    scores: ScoreMatrix,
    split: DatasetSplit,
    lineage: Lineage,
    tried_triplets: TriedTriplets,
    bandit: Bandit,
    active_strategies: Vec<Strategy>,
    full_catalog: Vec<Strategy>,
    uplift_window: UpliftWindow,

    iter: u64,
    seeded: bool,
    module_index: usize,
    module_count: usize,
    best_idx: usize,
    last_prefilter_iter: u64,
}

impl OptimizationEngine {
    /// Initialize a fresh run: validate the seed, compute the dataset
    /// split, score the seed's Pareto row, prefilter strategies, run the
    /// seeder, and persist the initial checkpoint.
    pub async fn init(
        config: Config,
        actor: Box<dyn Actor>,
        numeric_judge: Box<dyn NumericJudge>,
        feedback_judge: Box<dyn FeedbackJudge>,
        run_dir: Option<RunDirectory>,
        init: EngineInit,
    ) -> Result<Self, EngineError> {
        init.seed_candidate
            .validate()
            .map_err(|e| EngineError::Validation(e.to_string()))?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let split = crate::domain::models::compute_split(
            init.task_items.len(),
            config.pareto_size,
            config.holdout_size,
            &mut rng,
        );

        let budget = match config.budget.total {
            Some(total) => BudgetAccountant::enabled(total),
            None => BudgetAccountant::disabled(),
        };

        let module_count = init.seed_candidate.get_module_count();
        let population = Population::new(init.seed_candidate.clone());

        let mut engine = Self {
            config,
            budget,
            actor,
            numeric_judge,
            feedback_judge,
            run_dir,
            rng,
            task_items: init.task_items,
            population,
            scores: ScoreMatrix::new(),
            split,
            lineage: Lineage::new(),
            tried_triplets: TriedTriplets::new(),
            bandit: Bandit::new(Vec::<String>::new()),
            active_strategies: Vec::new(),
            full_catalog: init.strategy_catalog,
            uplift_window: UpliftWindow::new(20),
            iter: 0,
            seeded: false,
            module_index: 0,
            module_count,
            best_idx: 0,
            last_prefilter_iter: 0,
        };

        engine.uplift_window = UpliftWindow::new(engine.config.strategy_schedule.window_size);

        let seed_row = engine
            .score_pareto_row(&init.seed_candidate, BudgetTag::Pareto)
            .await
            .map_err(|_| {
                EngineError::Validation("failed to score the seed candidate over the Pareto set".to_string())
            })?;
        engine.scores.push_row(seed_row);
        engine.best_idx = engine.scores.best_index().unwrap_or(0);

        let preview: Vec<String> = engine
            .feedback_items()
            .iter()
            .take(8)
            .map(|item| item.user.clone())
            .collect();
        engine.active_strategies = prefilter_strategies(
            engine.actor.as_ref(),
            &engine.full_catalog,
            &preview,
            engine.config.strategy_schedule.prefilter_threshold,
            Some(engine.config.strategy_schedule.prefilter_top_k),
        )
        .await;
        if engine.active_strategies.is_empty() {
            engine.active_strategies = engine.full_catalog.clone();
        }
        engine.bandit = Bandit::new(engine.active_strategies.iter().map(|s| s.id.clone()));

        if !engine.seeded {
            engine.run_seeding().await;
            engine.seeded = true;
        }

        if let Some(dir) = &engine.run_dir {
            let input_json = serde_json::json!({ "items": engine.task_items });
            dir.write_input(&input_json)?;
            dir.write_config(&engine.config)?;
        }
        engine.checkpoint()?;

        Ok(engine)
    }

    /// Resume from an existing run directory's `state.json`.
    pub fn resume(
        config: Config,
        actor: Box<dyn Actor>,
        numeric_judge: Box<dyn NumericJudge>,
        feedback_judge: Box<dyn FeedbackJudge>,
        run_dir: RunDirectory,
        task_items: Vec<TaskItem>,
        strategy_catalog: Vec<Strategy>,
    ) -> Result<Self, EngineError> {
        let state = run_dir
            .load_state()?
            .ok_or_else(|| EngineError::Validation("no state.json to resume from".into()))?;
        state
            .check_version()
            .map_err(|e| EngineError::Validation(e.to_string()))?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let budget = match config.budget.total {
            Some(_) => BudgetAccountant::enabled(state.budget_left),
            None => BudgetAccountant::disabled(),
        };

        let active_strategies: Vec<Strategy> = strategy_catalog
            .iter()
            .filter(|s| state.active_strategy_ids.contains(&s.id))
            .cloned()
            .collect();
        let bandit = Bandit::deserialize(state.active_strategy_ids.clone(), state.bandit.clone());

        let uplift_window = UpliftWindow::new(config.strategy_schedule.window_size);

        Ok(Self {
            iter: state.iter,
            seeded: state.seeded,
            module_index: state.module_index,
            module_count: state.module_count,
            best_idx: state.best_idx,
            last_prefilter_iter: state.iter,
            population: Population::from_vec(state.psystems),
            scores: state.s,
            split: state.split,
            lineage: state.lineage,
            config,
            budget,
            actor,
            numeric_judge,
            feedback_judge,
            run_dir: Some(run_dir),
            rng,
            task_items,
            tried_triplets: TriedTriplets::new(),
            bandit,
            active_strategies,
            full_catalog: strategy_catalog,
            uplift_window,
        })
    }

    /// Run the main loop until the budget is exhausted, returning the best
    /// candidate found.
    pub async fn run(&mut self) -> Result<Candidate, EngineError> {
        loop {
            if self.budget.is_exhausted() {
                break;
            }
            if self.run_iteration().await? == IterationOutcome::BudgetExhausted {
                break;
            }
        }
        Ok(self
            .population
            .get(self.best_idx)
            .cloned()
            .unwrap_or_else(|| self.population.get(0).cloned().unwrap()))
    }

    fn feedback_items(&self) -> Vec<TaskItem> {
        self.split
            .fb_idx
            .iter()
            .filter_map(|&i| self.task_items.get(i).cloned())
            .collect()
    }

    async fn run_seeding(&mut self) {
        let feedback = self.feedback_items();
        let screen_len = screen_set_size(feedback.len());
        let screen: Vec<TaskItem> = feedback.into_iter().take(screen_len).collect();
        if screen.is_empty() {
            return;
        }

        let allowance = self.budget.remaining();
        let seed_candidate = self.population.get(0).cloned().unwrap();
        let result = run_seeder(
            &seed_candidate,
            &screen,
            &self.active_strategies,
            self.active_strategies.len(),
            self.actor.as_ref(),
            self.feedback_judge.as_ref(),
            allowance,
        )
        .await;

        self.budget.dec(result.calls_used, BudgetTag::Seeding);

        for variant in result.variants.into_iter().skip(1) {
            match self.score_pareto_row(&variant, BudgetTag::Seeding).await {
                Ok(row) => {
                    self.population.push(variant);
                    self.scores.push_row(row);
                }
                Err(ScoreError::BudgetExhausted) => break,
                Err(ScoreError::CollaboratorFailure) => continue,
            }
        }
        self.best_idx = self.scores.best_index().unwrap_or(self.best_idx);
    }

    /// Score `candidate` over the Pareto set, per the configured scorer
    /// mode: every entry in a run comes from the same scorer, the seed's
    /// initial row and every accepted child's row alike. Takes the
    /// candidate by value rather than a population index so a caller can
    /// score a not-yet-accepted child before committing it to the
    /// population, keeping a collaborator failure from leaving a
    /// degenerate row alongside a candidate that was never actually scored.
    async fn score_pareto_row(&mut self, candidate: &Candidate, tag: BudgetTag) -> Result<Vec<f64>, ScoreError> {
        let pareto_items: Vec<TaskItem> = self
            .split
            .pareto_idx
            .iter()
            .filter_map(|&i| self.task_items.get(i).cloned())
            .collect();
        let use_mu_f = matches!(self.config.score_for_pareto, ScoreForPareto::MuF);

        let scores = self
            .compute_scores(candidate, &pareto_items, tag, tag, use_mu_f)
            .await?;
        Ok(scores.into_iter().map(|s| s.score).collect())
    }

    /// Execute `candidate` against `items` and score each output, gated by
    /// the budget accountant. Dispatches to the sequential or concurrent
    /// evaluator per `config.concurrent_evaluation`.
    async fn compute_scores(
        &mut self,
        candidate: &Candidate,
        items: &[TaskItem],
        execute_tag: BudgetTag,
        judge_tag: BudgetTag,
        use_mu_f: bool,
    ) -> Result<Vec<ItemScore>, ScoreError> {
        if self.config.concurrent_evaluation {
            self.compute_scores_concurrent(candidate, items, execute_tag, judge_tag, use_mu_f)
                .await
        } else {
            self.compute_scores_sequential(candidate, items, execute_tag, judge_tag, use_mu_f)
                .await
        }
    }

    async fn compute_scores_sequential(
        &mut self,
        candidate: &Candidate,
        items: &[TaskItem],
        execute_tag: BudgetTag,
        judge_tag: BudgetTag,
        use_mu_f: bool,
    ) -> Result<Vec<ItemScore>, ScoreError> {
        let muf_costs = self.config.budget.muf_costs;
        let mut out = Vec::with_capacity(items.len());

        for item in items {
            if !self.budget.can_afford(1) {
                return Err(ScoreError::BudgetExhausted);
            }
            let exec = self
                .actor
                .execute(candidate, item)
                .await
                .map_err(|_: ActorError| ScoreError::CollaboratorFailure)?;
            self.budget.dec(1, execute_tag);

            let trace_summary = summarize_trace(exec.traces.as_ref(), TRACE_MAX_SIZE);

            let (score, feedback) = if use_mu_f {
                if muf_costs && !self.budget.can_afford(1) {
                    return Err(ScoreError::BudgetExhausted);
                }
                let verdict = self
                    .feedback_judge
                    .score_with_feedback(&item.id, &exec.output, item.meta.as_ref(), exec.traces.as_ref())
                    .await
                    .map_err(|_: JudgeError| ScoreError::CollaboratorFailure)?;
                if muf_costs {
                    self.budget.dec(1, judge_tag);
                }
                (verdict.score, verdict.feedback)
            } else {
                let score = self
                    .numeric_judge
                    .score(&exec.output, item.meta.as_ref())
                    .await
                    .map_err(|_: JudgeError| ScoreError::CollaboratorFailure)?;
                (score, String::new())
            };

            out.push(ItemScore {
                score,
                feedback,
                output: exec.output,
                trace_summary,
            });
        }

        Ok(out)
    }

    /// Same contract as `compute_scores_sequential`, but fans the per-item
    /// execute+judge futures out with `join_all` instead of awaiting them
    /// one at a time. Budget is committed up front for the whole batch
    /// (`can_afford(n)` / unconditional `dec(n)`) since individual items no
    /// longer complete in an order the accountant can gate on.
    async fn compute_scores_concurrent(
        &mut self,
        candidate: &Candidate,
        items: &[TaskItem],
        execute_tag: BudgetTag,
        judge_tag: BudgetTag,
        use_mu_f: bool,
    ) -> Result<Vec<ItemScore>, ScoreError> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let n = items.len() as u64;
        let muf_costs = self.config.budget.muf_costs;

        if !self.budget.can_afford(n) {
            return Err(ScoreError::BudgetExhausted);
        }
        self.budget.dec(n, execute_tag);

        let actor = &self.actor;
        let exec_results = join_all(items.iter().map(|item| actor.execute(candidate, item))).await;

        if use_mu_f && muf_costs {
            if !self.budget.can_afford(n) {
                return Err(ScoreError::BudgetExhausted);
            }
            self.budget.dec(n, judge_tag);
        }

        let feedback_judge = &self.feedback_judge;
        let numeric_judge = &self.numeric_judge;
        let judged = join_all(items.iter().zip(exec_results.into_iter()).map(
            |(item, exec_result)| async move {
                let exec = exec_result.map_err(|_: ActorError| ScoreError::CollaboratorFailure)?;
                let trace_summary = summarize_trace(exec.traces.as_ref(), TRACE_MAX_SIZE);
                let (score, feedback) = if use_mu_f {
                    let verdict = feedback_judge
                        .score_with_feedback(&item.id, &exec.output, item.meta.as_ref(), exec.traces.as_ref())
                        .await
                        .map_err(|_: JudgeError| ScoreError::CollaboratorFailure)?;
                    (verdict.score, verdict.feedback)
                } else {
                    let score = numeric_judge
                        .score(&exec.output, item.meta.as_ref())
                        .await
                        .map_err(|_: JudgeError| ScoreError::CollaboratorFailure)?;
                    (score, String::new())
                };
                Ok(ItemScore {
                    score,
                    feedback,
                    output: exec.output,
                    trace_summary,
                })
            },
        ))
        .await;

        let mut out = Vec::with_capacity(items.len());
        for item_score in judged {
            out.push(item_score?);
        }
        Ok(out)
    }

    fn sample_minibatch(&mut self) -> Vec<TaskItem> {
        let source = if self.split.fb_idx.is_empty() {
            &self.split.pareto_idx
        } else {
            &self.split.fb_idx
        };
        let b = self.config.minibatch_size.min(source.len());
        let picked: Vec<usize> = source.choose_multiple(&mut self.rng, b).copied().collect();
        picked
            .into_iter()
            .filter_map(|i| self.task_items.get(i).cloned())
            .collect()
    }

    async fn run_iteration(&mut self) -> Result<IterationOutcome, EngineError> {
        let k = pareto_select(&self.population, &self.scores, self.split.pareto_idx.len(), &mut self.rng);
        let parent = self.population.get(k).cloned().unwrap();
        let minibatch = self.sample_minibatch();

        let before = match self
            .compute_scores(&parent, &minibatch, BudgetTag::Execute, BudgetTag::Muf, true)
            .await
        {
            Ok(scores) => scores,
            Err(ScoreError::BudgetExhausted) => return Ok(IterationOutcome::BudgetExhausted),
            Err(ScoreError::CollaboratorFailure) => {
                self.checkpoint()?;
                return Ok(IterationOutcome::Completed);
            }
        };
        let sigma = mean_score(&before);

        let Some(proposal) = self.propose_child(k, &parent, &minibatch, &before).await? else {
            self.checkpoint()?;
            return Ok(IterationOutcome::Completed);
        };

        let after = match self
            .compute_scores(&proposal.child, &minibatch, BudgetTag::Execute, BudgetTag::Muf, true)
            .await
        {
            Ok(scores) => scores,
            Err(ScoreError::BudgetExhausted) => return Ok(IterationOutcome::BudgetExhausted),
            Err(ScoreError::CollaboratorFailure) => {
                self.checkpoint()?;
                return Ok(IterationOutcome::Completed);
            }
        };
        let sigma_prime = mean_score(&after);

        let reward = ((sigma_prime - sigma + 1.0) / 2.0).clamp(0.0, 1.0);
        if let (false, Some(id)) = (proposal.no_hint, &proposal.chosen_strategy_id) {
            self.bandit.update(id, reward);
        }
        self.uplift_window.push(sigma_prime - sigma);
        self.maybe_reprefilter().await;

        let holdout_passed = if !self.split.hold_idx.is_empty() {
            let hold_items: Vec<TaskItem> = self
                .split
                .hold_idx
                .iter()
                .filter_map(|&i| self.task_items.get(i).cloned())
                .collect();
            let parent_hold = match self
                .compute_scores(&parent, &hold_items, BudgetTag::Holdout, BudgetTag::Holdout, true)
                .await
            {
                Ok(scores) => mean_score(&scores),
                Err(ScoreError::BudgetExhausted) => return Ok(IterationOutcome::BudgetExhausted),
                Err(ScoreError::CollaboratorFailure) => {
                    self.checkpoint()?;
                    return Ok(IterationOutcome::Completed);
                }
            };
            let child_hold = match self
                .compute_scores(&proposal.child, &hold_items, BudgetTag::Holdout, BudgetTag::Holdout, true)
                .await
            {
                Ok(scores) => mean_score(&scores),
                Err(ScoreError::BudgetExhausted) => return Ok(IterationOutcome::BudgetExhausted),
                Err(ScoreError::CollaboratorFailure) => {
                    self.checkpoint()?;
                    return Ok(IterationOutcome::Completed);
                }
            };
            child_hold + self.config.epsilon_holdout >= parent_hold
        } else {
            true
        };

        let accepted = sigma_prime > sigma && holdout_passed;

        if accepted {
            let row = match self.score_pareto_row(&proposal.child, BudgetTag::Pareto).await {
                Ok(row) => row,
                Err(ScoreError::BudgetExhausted) => return Ok(IterationOutcome::BudgetExhausted),
                Err(ScoreError::CollaboratorFailure) => {
                    self.checkpoint()?;
                    return Ok(IterationOutcome::Completed);
                }
            };
            let child_idx = self.population.push(proposal.child.clone());
            self.scores.push_row(row);
            self.best_idx = self.scores.best_index().unwrap_or(self.best_idx);
            self.lineage.push(LineageEntry {
                candidate_index: child_idx,
                changed_modules: proposal.changed_modules,
                parent_index: Some(k),
            });
        }

        self.iter += 1;
        self.checkpoint()?;
        Ok(IterationOutcome::Completed)
    }

    /// Attempt crossover, falling back to mutation on any abort condition.
    /// Returns `None` only if mutation's propose call was refused by the
    /// budget accountant.
    async fn propose_child(
        &mut self,
        k: usize,
        parent: &Candidate,
        minibatch: &[TaskItem],
        before: &[ItemScore],
    ) -> Result<Option<ChildProposal>, EngineError> {
        if self.population.len() > 1
            && self.rng.gen::<f64>() < self.config.crossover_probability
        {
            if let Some(proposal) = self.try_crossover(k)? {
                return Ok(Some(proposal));
            }
        }
        self.try_mutation(parent, minibatch, before).await
    }

    fn try_crossover(&mut self, k: usize) -> Result<Option<ChildProposal>, EngineError> {
        let mut partner = None;
        for _ in 0..CROSSOVER_PARTNER_ATTEMPTS {
            let candidate_k = pareto_select(&self.population, &self.scores, self.split.pareto_idx.len(), &mut self.rng);
            if candidate_k != k {
                partner = Some(candidate_k);
                break;
            }
        }
        let Some(kp) = partner else { return Ok(None) };

        if self.lineage.are_direct_relatives(k, kp) {
            return Ok(None);
        }
        let Some(ancestor) = self.lineage.most_recent_common_ancestor(k, kp) else {
            return Ok(None);
        };
        if self.tried_triplets.contains(k, kp, ancestor) {
            return Ok(None);
        }

        let a = self.population.get(k).unwrap().clone();
        let b = self.population.get(kp).unwrap().clone();
        let changed_a = self.lineage.changed_modules(k).to_vec();
        let changed_b = self.lineage.changed_modules(kp).to_vec();
        let score_a = self.scores.avg(k);
        let score_b = self.scores.avg(kp);

        let child = Candidate::merge(&a, &b, &changed_a, &changed_b, score_a, score_b)?;
        if !Candidate::is_novel_merge(&child, &a, &b) {
            return Ok(None);
        }

        self.tried_triplets.record(k, kp, ancestor);

        let mut changed_modules: Vec<usize> = changed_a.iter().chain(changed_b.iter()).copied().collect();
        changed_modules.sort_unstable();
        changed_modules.dedup();

        Ok(Some(ChildProposal {
            child,
            changed_modules,
            chosen_strategy_id: None,
            no_hint: true,
        }))
    }

    async fn try_mutation(
        &mut self,
        parent: &Candidate,
        minibatch: &[TaskItem],
        before: &[ItemScore],
    ) -> Result<Option<ChildProposal>, EngineError> {
        let sched = &self.config.strategy_schedule;
        let rates = exploration_rates(
            &self.uplift_window,
            sched.slowdown_threshold,
            sched.base_explore_prob,
            sched.max_explore_prob,
            sched.base_no_hint_prob,
            sched.max_no_hint_prob,
        );

        let mut chosen_id = self.bandit.pick();
        if self.rng.gen::<f64>() < rates.explore_prob {
            let pool = core_pool(&self.active_strategies, sched.default_core_top_k);
            chosen_id = pool.choose(&mut self.rng).map(|s| s.id.clone()).or(chosen_id);
        }

        let no_hint = self.rng.gen::<f64>() < rates.no_hint_prob;
        let hint = if no_hint {
            None
        } else {
            chosen_id
                .as_ref()
                .and_then(|id| self.active_strategies.iter().find(|s| &s.id == id))
                .map(|s| s.hint.clone())
        };

        let target_index = self.module_index;
        let examples: Vec<ReflectionExample> = before
            .iter()
            .zip(minibatch.iter())
            .map(|(score, item)| ReflectionExample {
                user: item.user.clone(),
                output: score.output.clone(),
                feedback: score.feedback.clone(),
                trace_summary: score.trace_summary.clone(),
            })
            .collect();

        let prompt = build_reflection_prompt(parent, target_index, hint.as_deref(), &examples);

        if !self.budget.can_afford(1) {
            return Ok(None);
        }
        let reply = match self.actor.complete(&prompt).await {
            Ok(reply) => reply,
            Err(_) => {
                self.budget.dec(1, BudgetTag::Propose);
                return Ok(None);
            }
        };
        self.budget.dec(1, BudgetTag::Propose);

        let rewritten = extract_rewrite(&reply);
        let child = parent.set_module(target_index, &rewritten)?;

        self.module_index = (self.module_index + 1) % self.module_count.max(1);

        Ok(Some(ChildProposal {
            child,
            changed_modules: vec![target_index],
            chosen_strategy_id: chosen_id,
            no_hint,
        }))
    }

    async fn maybe_reprefilter(&mut self) {
        let sched = &self.config.strategy_schedule;
        let stagnating = self.uplift_window.mean() <= sched.slowdown_threshold;
        let cooldown_elapsed = self.iter.saturating_sub(self.last_prefilter_iter) >= sched.reprefilter_cooldown_iters;
        if !stagnating || !cooldown_elapsed {
            return;
        }

        let preview: Vec<String> = self.feedback_items().iter().take(8).map(|t| t.user.clone()).collect();
        let refreshed = prefilter_strategies(
            self.actor.as_ref(),
            &self.full_catalog,
            &preview,
            sched.prefilter_threshold,
            Some(sched.prefilter_top_k),
        )
        .await;

        if !refreshed.is_empty() {
            self.active_strategies = refreshed;
            self.bandit = Bandit::new(self.active_strategies.iter().map(|s| s.id.clone()));
        }
        self.last_prefilter_iter = self.iter;
    }

    fn checkpoint(&self) -> Result<(), crate::services::checkpoint::CheckpointError> {
        let Some(dir) = &self.run_dir else { return Ok(()) };
        let state = crate::domain::models::GepaState {
            version: crate::domain::models::STATE_VERSION,
            budget_left: self.budget.remaining(),
            iter: self.iter,
            psystems: self.population.as_slice().to_vec(),
            s: self.scores.clone(),
            split: self.split.clone(),
            best_idx: self.best_idx,
            seeded: self.seeded,
            bandit: self.bandit.serialize(),
            module_index: self.module_index,
            module_count: self.module_count,
            lineage: self.lineage.clone(),
            active_strategy_ids: self.active_strategies.iter().map(|s| s.id.clone()).collect(),
        };
        dir.checkpoint(&state)
    }
}

struct ChildProposal {
    child: Candidate,
    changed_modules: Vec<usize>,
    chosen_strategy_id: Option<String>,
    no_hint: bool,
}

fn mean_score(scores: &[ItemScore]) -> f64 {
    if scores.is_empty() {
        0.0
    } else {
        scores.iter().map(|s| s.score).sum::<f64>() / scores.len() as f64
    }
}
