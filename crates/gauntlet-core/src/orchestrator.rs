use crate::composite::score_run;
use crate::config::OrchestratorConfig;
use crate::errors::AdmissionError;
use crate::executor::TargetFactory;
use crate::leaderboard::LeaderboardAggregator;
use crate::model::{Competitor, RunRecord, RunRequest, TaskResult};
use crate::progress::{self, ProgressSnapshot};
use crate::runner::{SuiteRunner, TaskPolicy};
use crate::scoring::QualityCheck;
use crate::storage::{NewRun, Store};
use crate::suite::{sample_tasks, Suite, TaskSpec};
use anyhow::Context;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch, OwnedSemaphorePermit, Semaphore};

/// Sliding-window rate limiter keyed by client identity. A single lock
/// guards the whole admission decision so concurrent requests cannot
/// slip past the limit together.
pub struct RateLimiter {
    limit: usize,
    window: Duration,
    clients: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn try_acquire(&self, client: &str) -> bool {
        let now = Instant::now();
        let mut clients = self.clients.lock().unwrap();
        let stamps = clients.entry(client.to_string()).or_default();
        while stamps
            .front()
            .is_some_and(|t| now.duration_since(*t) >= self.window)
        {
            stamps.pop_front();
        }
        if stamps.len() < self.limit {
            stamps.push_back(now);
            true
        } else {
            false
        }
    }
}

/// Owns the RunRecord lifecycle: admission, execution, persistence,
/// cancellation, progress streaming. The suite runner only reports
/// outcomes back here; all persistent state transitions happen in this
/// module.
#[derive(Clone)]
pub struct Orchestrator {
    store: Store,
    config: Arc<OrchestratorConfig>,
    suites: Arc<RwLock<HashMap<String, Suite>>>,
    targets: Arc<dyn TargetFactory>,
    checks: Vec<Arc<dyn QualityCheck>>,
    run_slots: Arc<Semaphore>,
    rate_limiter: Arc<RateLimiter>,
    aggregator: LeaderboardAggregator,
    active: Arc<Mutex<HashMap<i64, Arc<watch::Sender<bool>>>>>,
}

impl Orchestrator {
    pub fn new(
        store: Store,
        config: OrchestratorConfig,
        targets: Arc<dyn TargetFactory>,
        checks: Vec<Arc<dyn QualityCheck>>,
    ) -> Self {
        let run_slots = Arc::new(Semaphore::new(config.max_concurrent_runs));
        let rate_limiter = Arc::new(RateLimiter::new(
            config.rate_limit_requests,
            Duration::from_secs(config.rate_limit_window_secs),
        ));
        Self {
            aggregator: LeaderboardAggregator::new(store.clone()),
            store,
            config: Arc::new(config),
            suites: Arc::new(RwLock::new(HashMap::new())),
            targets,
            checks,
            run_slots,
            rate_limiter,
            active: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn register_suite(&self, suite: Suite) {
        self.suites
            .write()
            .unwrap()
            .insert(suite.suite.clone(), suite);
    }

    /// Admission: rate limit, then a non-blocking grab of a run slot.
    /// Rejection is immediate; callers retry rather than queue, so
    /// target-capacity exhaustion stays visible to them.
    pub fn create_run(&self, req: RunRequest) -> Result<RunRecord, AdmissionError> {
        let suite = self
            .suites
            .read()
            .unwrap()
            .get(&req.suite)
            .cloned()
            .ok_or_else(|| AdmissionError::InvalidSuite(req.suite.clone()))?;

        if !self.rate_limiter.try_acquire(&req.client_id) {
            return Err(AdmissionError::RateLimited(req.client_id));
        }

        let permit = self
            .run_slots
            .clone()
            .try_acquire_owned()
            .map_err(|_| AdmissionError::ConcurrencyExceeded)?;

        let tasks = sample_tasks(&suite, req.subset_percent, req.seed);
        let competitor_id = self.store.upsert_competitor(&req.competitor)?;
        let run_id = self.store.insert_run(&NewRun {
            competitor_id,
            target: req.target.clone(),
            suite: req.suite.clone(),
            model: req.model.clone(),
            subset_percent: req.subset_percent,
            seed: req.seed,
            progress_total: tasks.len() as u32,
            metadata: req.metadata.clone(),
        })?;
        let run = self
            .store
            .get_run(run_id)?
            .context("run vanished right after insert")?;

        let (cancel_tx, cancel_rx) = watch::channel(false);
        self.active
            .lock()
            .unwrap()
            .insert(run_id, Arc::new(cancel_tx));

        let benchmark = req
            .benchmark
            .clone()
            .or_else(|| suite.benchmark.clone())
            .unwrap_or_else(|| suite.suite.clone());
        let this = self.clone();
        let spawn_run = run.clone();
        tokio::spawn(async move {
            this.execute_run(spawn_run, benchmark, tasks, permit, cancel_rx)
                .await;
        });

        tracing::info!(run_id, suite = %req.suite, competitor = %req.competitor, "run admitted");
        Ok(run)
    }

    async fn execute_run(
        self,
        run: RunRecord,
        benchmark: String,
        tasks: Vec<TaskSpec>,
        permit: OwnedSemaphorePermit,
        cancel: watch::Receiver<bool>,
    ) {
        let run_id = run.id;
        let outcome = self.drive_run(&run, benchmark, tasks, cancel.clone()).await;
        // the slot frees only after the terminal transition below
        let _permit = permit;

        match outcome {
            Ok(results) => {
                if *cancel.borrow() {
                    if let Err(e) = self.store.mark_cancelled(run_id) {
                        tracing::error!(run_id, error = %e, "failed to persist cancellation");
                    }
                    tracing::info!(run_id, kept = results.len(), "run cancelled");
                } else {
                    self.finalize_completed(run_id, &results);
                }
            }
            Err(e) => {
                tracing::error!(run_id, error = %e, "run failed");
                if let Err(persist) = self.store.mark_failed(run_id, &format!("{e:#}")) {
                    tracing::error!(run_id, error = %persist, "failed to persist run failure");
                }
            }
        }
        self.active.lock().unwrap().remove(&run_id);
    }

    fn finalize_completed(&self, run_id: i64, results: &[TaskResult]) {
        let (scores, composite) = score_run(results, &self.config.weights, &self.config.reference);
        match self.store.mark_completed(run_id, &scores, composite) {
            Ok(true) => match self.store.get_run(run_id) {
                Ok(Some(run)) => {
                    if let Err(e) = self.aggregator.on_run_completed(&run) {
                        tracing::error!(run_id, error = %e, "leaderboard update failed");
                    }
                    tracing::info!(run_id, composite = ?composite, "run completed");
                }
                Ok(None) => {}
                Err(e) => tracing::error!(run_id, error = %e, "failed to reload completed run"),
            },
            // a cancel raced the finish; the cancelled state wins
            Ok(false) => tracing::info!(run_id, "completion superseded by terminal state"),
            Err(e) => tracing::error!(run_id, error = %e, "failed to persist completion"),
        }
    }

    async fn drive_run(
        &self,
        run: &RunRecord,
        benchmark: String,
        tasks: Vec<TaskSpec>,
        cancel: watch::Receiver<bool>,
    ) -> anyhow::Result<Vec<TaskResult>> {
        if !self.store.mark_running(run.id)? {
            anyhow::bail!("run {} is no longer pending", run.id);
        }

        let runner = Arc::new(SuiteRunner {
            client: self.targets.client(&run.target, &run.model),
            checks: self.checks.clone(),
            policy: TaskPolicy::from_config(&self.config),
        });
        let (tx, mut rx) = mpsc::channel(16);
        let handle = tokio::spawn(runner.run(run.id, benchmark, tasks, tx, cancel.clone()));

        let deadline =
            tokio::time::Instant::now() + Duration::from_secs_f64(self.config.run_timeout_secs);
        let mut results = Vec::new();
        loop {
            tokio::select! {
                maybe = rx.recv() => match maybe {
                    Some(result) => {
                        // persist each task as it lands so partial
                        // progress survives a crash mid-run
                        self.store.insert_task_result(&result)?;
                        self.store.increment_progress(run.id)?;
                        results.push(result);
                    }
                    None => break,
                },
                _ = tokio::time::sleep_until(deadline) => {
                    self.signal_cancel(run.id);
                    handle.abort();
                    anyhow::bail!("run timed out after {:.0}s", self.config.run_timeout_secs);
                }
            }
        }

        match handle.await {
            Ok(Ok(())) => Ok(results),
            Ok(Err(e)) => Err(e),
            Err(e) => Err(anyhow::anyhow!("suite runner panicked: {e}")),
        }
    }

    fn signal_cancel(&self, run_id: i64) -> bool {
        let sender = self.active.lock().unwrap().get(&run_id).cloned();
        match sender {
            Some(tx) => {
                let _ = tx.send(true);
                true
            }
            None => false,
        }
    }

    /// Idempotent: cancelling a terminal run is a no-op success.
    /// In-flight tasks are signalled to stop; results already persisted
    /// are retained and scores stay null.
    pub fn cancel_run(&self, run_id: i64) -> anyhow::Result<()> {
        if self.signal_cancel(run_id) {
            return Ok(());
        }
        match self.store.get_run(run_id)? {
            Some(run) if run.status.is_terminal() => Ok(()),
            Some(_) => {
                // admitted but its worker is gone (e.g. process restart)
                self.store.mark_cancelled(run_id)?;
                Ok(())
            }
            None => anyhow::bail!("run {run_id} not found"),
        }
    }

    /// Cancels if needed, then removes the run and (by cascade) its
    /// task results.
    pub fn delete_run(&self, run_id: i64) -> anyhow::Result<()> {
        self.signal_cancel(run_id);
        self.store.delete_run(run_id)
    }

    pub fn get_run(&self, run_id: i64) -> anyhow::Result<Option<RunRecord>> {
        self.store.get_run(run_id)
    }

    pub fn get_results(&self, run_id: i64) -> anyhow::Result<Vec<TaskResult>> {
        self.store.list_task_results(run_id)
    }

    pub fn leaderboard(&self) -> anyhow::Result<Vec<Competitor>> {
        self.aggregator.leaderboard()
    }

    pub fn watch_run(&self, run_id: i64) -> mpsc::Receiver<ProgressSnapshot> {
        progress::watch(
            self.store.clone(),
            run_id,
            Duration::from_secs_f64(self.config.poll_interval_secs),
        )
    }
}
