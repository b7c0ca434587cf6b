use gauntlet_core::model::{ComponentScores, RunStatus, TaskResult, TaskType};
use gauntlet_core::storage::{NewRun, Store};

fn open_store() -> Store {
    let store = Store::open_in_memory().unwrap();
    store.init_schema().unwrap();
    store
}

fn insert_run(store: &Store, competitor_id: i64) -> i64 {
    store
        .insert_run(&NewRun {
            competitor_id,
            target: "http://localhost:8000/v1".into(),
            suite: "core".into(),
            model: "m".into(),
            subset_percent: 100,
            seed: 1,
            progress_total: 2,
            metadata: serde_json::json!({"trigger": "test"}),
        })
        .unwrap()
}

fn task_result(run_id: i64, task_id: &str) -> TaskResult {
    TaskResult {
        run_id,
        task_id: task_id.into(),
        benchmark: "bench".into(),
        task_type: TaskType::ChatQuality,
        success: true,
        response_text: "hello".into(),
        error: None,
        quality_score: 0.8,
        latency_seconds: 1.5,
        ttft_seconds: Some(0.2),
        tokens_per_second: Some(20.0),
        prompt_tokens: 10,
        completion_tokens: 30,
        total_tokens: 40,
        cost_usd: 0.01,
        continuity_score: None,
        max_gap_seconds: 0.0,
        stream_metrics: serde_json::json!({"chunk_count": 0}),
        metadata: serde_json::json!(null),
    }
}

#[test]
fn file_backed_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gauntlet.db");

    let run_id = {
        let store = Store::open(&path).unwrap();
        store.init_schema().unwrap();
        let competitor = store.upsert_competitor("acme").unwrap();
        let run_id = insert_run(&store, competitor);
        store.insert_task_result(&task_result(run_id, "a")).unwrap();
        run_id
    };

    let store = Store::open(&path).unwrap();
    store.init_schema().unwrap();
    let run = store.get_run(run_id).unwrap().unwrap();
    assert_eq!(run.suite, "core");
    assert_eq!(run.status, RunStatus::Pending);
    assert_eq!(store.list_task_results(run_id).unwrap().len(), 1);
}

#[test]
fn run_roundtrip_preserves_fields() {
    let store = open_store();
    let competitor = store.upsert_competitor("acme").unwrap();
    let run_id = insert_run(&store, competitor);

    let run = store.get_run(run_id).unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Pending);
    assert_eq!(run.competitor_id, competitor);
    assert_eq!(run.suite, "core");
    assert_eq!(run.subset_percent, 100);
    assert_eq!(run.progress_total, 2);
    assert_eq!(run.progress_current, 0);
    assert!(run.composite_score.is_none());
    assert!(run.started_at.is_none());
    assert_eq!(run.metadata["trigger"], "test");
}

#[test]
fn status_transitions_are_monotonic() {
    let store = open_store();
    let competitor = store.upsert_competitor("acme").unwrap();
    let run_id = insert_run(&store, competitor);

    assert!(store.mark_running(run_id).unwrap());
    // a second pending->running transition is a no-op
    assert!(!store.mark_running(run_id).unwrap());

    let scores = ComponentScores {
        quality: Some(80.0),
        ..Default::default()
    };
    assert!(store.mark_completed(run_id, &scores, Some(80.0)).unwrap());

    // terminal runs never resurrect
    assert!(!store.mark_cancelled(run_id).unwrap());
    assert!(!store.mark_failed(run_id, "late error").unwrap());
    assert!(!store.mark_completed(run_id, &scores, Some(99.0)).unwrap());

    let run = store.get_run(run_id).unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.composite_score, Some(80.0));
    assert!(run.completed_at.is_some());
}

#[test]
fn cancelled_run_cannot_complete() {
    let store = open_store();
    let competitor = store.upsert_competitor("acme").unwrap();
    let run_id = insert_run(&store, competitor);
    store.mark_running(run_id).unwrap();
    assert!(store.mark_cancelled(run_id).unwrap());
    assert!(!store
        .mark_completed(run_id, &ComponentScores::default(), Some(50.0))
        .unwrap());
    let run = store.get_run(run_id).unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Cancelled);
    assert!(run.composite_score.is_none());
}

#[test]
fn task_results_roundtrip_and_progress() {
    let store = open_store();
    let competitor = store.upsert_competitor("acme").unwrap();
    let run_id = insert_run(&store, competitor);

    store.insert_task_result(&task_result(run_id, "a")).unwrap();
    store.increment_progress(run_id).unwrap();
    store.insert_task_result(&task_result(run_id, "b")).unwrap();
    store.increment_progress(run_id).unwrap();

    let results = store.list_task_results(run_id).unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].task_id, "a");
    assert_eq!(results[0].quality_score, 0.8);
    assert_eq!(results[0].ttft_seconds, Some(0.2));
    assert_eq!(results[0].stream_metrics["chunk_count"], 0);

    let run = store.get_run(run_id).unwrap().unwrap();
    assert_eq!(run.progress_current, 2);
}

#[test]
fn deleting_a_run_cascades_to_results() {
    let store = open_store();
    let competitor = store.upsert_competitor("acme").unwrap();
    let run_id = insert_run(&store, competitor);
    store.insert_task_result(&task_result(run_id, "a")).unwrap();

    store.delete_run(run_id).unwrap();
    assert!(store.get_run(run_id).unwrap().is_none());
    assert!(store.list_task_results(run_id).unwrap().is_empty());
}

#[test]
fn record_best_is_a_conditional_update() {
    let store = open_store();
    let competitor = store.upsert_competitor("acme").unwrap();

    assert!(store.record_best(competitor, 1, 70.0).unwrap());
    // a worse score loses the compare
    assert!(!store.record_best(competitor, 2, 60.0).unwrap());
    // a better one wins
    assert!(store.record_best(competitor, 3, 80.0).unwrap());

    let board = store.leaderboard().unwrap();
    assert_eq!(board[0].best_composite_score, Some(80.0));
    assert_eq!(board[0].best_run_id, Some(3));
}

#[test]
fn leaderboard_orders_best_desc_nulls_last() {
    let store = open_store();
    let a = store.upsert_competitor("alpha").unwrap();
    let b = store.upsert_competitor("beta").unwrap();
    store.upsert_competitor("gamma").unwrap();
    store.record_best(a, 1, 55.0).unwrap();
    store.record_best(b, 2, 88.0).unwrap();

    let board = store.leaderboard().unwrap();
    let names: Vec<&str> = board.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["beta", "alpha", "gamma"]);
    assert!(board[2].best_composite_score.is_none());
}

#[test]
fn upsert_competitor_is_idempotent() {
    let store = open_store();
    let first = store.upsert_competitor("acme").unwrap();
    let second = store.upsert_competitor("acme").unwrap();
    assert_eq!(first, second);
}
