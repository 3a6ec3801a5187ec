//! End-to-end optimization run against the mock collaborator: a handful of
//! task items, a tiny budget, and an assertion that the engine terminates
//! with a usable candidate rather than panicking or hanging.

use gepa_forge::domain::models::{Candidate, TaskItem};
use gepa_forge::infrastructure::actors::mock::{MockActor, MockResponse};
use gepa_forge::services::config::Config;
use gepa_forge::services::engine::{EngineInit, OptimizationEngine};

fn task_items() -> Vec<TaskItem> {
    (0..6)
        .map(|i| TaskItem::new(format!("item-{i}"), format!("prompt {i}")))
        .collect()
}

#[tokio::test]
async fn run_to_completion_on_exhausted_budget() {
    let mut config = Config::default();
    config.budget.total = Some(20);
    config.minibatch_size = 2;
    config.pareto_size = 4;
    config.holdout_size = 2;
    config.seed = Some(42);

    let actor = Box::new(MockActor::new("rewritten instruction"));
    let numeric_judge = Box::new(MockActor::new("judge"));
    let feedback_judge = Box::new(MockActor::new("judge"));

    let init = EngineInit {
        task_items: task_items(),
        seed_candidate: Candidate::Single("answer concisely".to_string()),
        strategy_catalog: Vec::new(),
    };

    let mut engine = OptimizationEngine::init(config, actor, numeric_judge, feedback_judge, None, init)
        .await
        .expect("engine should initialize against a well-formed seed");

    let best = engine.run().await.expect("run should complete once the budget is exhausted");
    match best {
        Candidate::Single(text) => assert!(!text.is_empty()),
        Candidate::Modular { modules } => assert!(!modules.is_empty()),
    }
}

#[tokio::test]
async fn run_reports_a_higher_scoring_candidate_when_one_exists() {
    let mut config = Config::default();
    config.budget.total = Some(40);
    config.minibatch_size = 3;
    config.pareto_size = 6;
    config.holdout_size = 0;
    config.seed = Some(7);

    let actor = Box::new(MockActor::new("rewritten instruction"));
    let numeric_judge = Box::new(MockActor::new("judge"));
    let feedback_judge =
        Box::new(MockActor::new("judge").with_default_response(MockResponse::success("ok", 0.8)));

    let init = EngineInit {
        task_items: task_items(),
        seed_candidate: Candidate::Single("answer concisely".to_string()),
        strategy_catalog: Vec::new(),
    };

    let mut engine = OptimizationEngine::init(config, actor, numeric_judge, feedback_judge, None, init)
        .await
        .expect("engine should initialize against a well-formed seed");

    let best = engine.run().await.expect("run should complete");
    assert!(!best.concatenate().is_empty());
}

#[tokio::test]
async fn resume_continues_from_a_saved_checkpoint() {
    use gepa_forge::services::checkpoint::RunDirectory;

    let tmp = tempfile::tempdir().expect("tempdir");
    let run_dir = tmp.path().join("run");

    let mut config = Config::default();
    config.budget.total = Some(10);
    config.minibatch_size = 2;
    config.pareto_size = 4;
    config.holdout_size = 1;
    config.seed = Some(1);

    let dir = RunDirectory::create(&run_dir, false).expect("fresh run dir");
    let init = EngineInit {
        task_items: task_items(),
        seed_candidate: Candidate::Single("answer concisely".to_string()),
        strategy_catalog: Vec::new(),
    };
    let mut engine = OptimizationEngine::init(
        config.clone(),
        Box::new(MockActor::new("rewritten instruction")),
        Box::new(MockActor::new("judge")),
        Box::new(MockActor::new("judge")),
        Some(dir),
        init,
    )
    .await
    .expect("engine should initialize");
    let _ = engine.run().await.expect("first run should complete");

    // A fresh engine resuming from the same directory should pick back up
    // without re-running the seeder or failing to find a checkpoint.
    let dir2 = RunDirectory::open_existing(&run_dir).expect("checkpoint should exist");
    let resumed = OptimizationEngine::resume(
        config,
        Box::new(MockActor::new("rewritten instruction")),
        Box::new(MockActor::new("judge")),
        Box::new(MockActor::new("judge")),
        dir2,
        task_items(),
        Vec::new(),
    )
    .expect("resume should succeed from a valid checkpoint");
    let _ = resumed;
}
