use crate::config::{CostRates, OrchestratorConfig};
use crate::executor::{execute_with_retry, RawMeasurement, RetryPolicy, TargetClient};
use crate::model::TaskResult;
use crate::scoring::{continuity, cost_usd, heuristic_quality, tokens_per_second, QualityCheck};
use crate::suite::TaskSpec;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Semaphore};

/// Per-task execution knobs, distilled from the orchestrator config.
#[derive(Debug, Clone)]
pub struct TaskPolicy {
    pub workers: usize,
    pub retry: RetryPolicy,
    pub gap_threshold_secs: f64,
    pub rates: CostRates,
}

impl TaskPolicy {
    pub fn from_config(cfg: &OrchestratorConfig) -> Self {
        Self {
            workers: cfg.task_workers.max(1),
            retry: RetryPolicy {
                retries: cfg.task_retries,
                backoff_base_secs: cfg.retry_backoff_base_secs,
                task_timeout_secs: cfg.task_timeout_secs,
            },
            gap_threshold_secs: cfg.gap_threshold_secs,
            rates: cfg.rates.clone(),
        }
    }
}

/// Iterates one run's task set with bounded concurrency. Every task is
/// attempted and its outcome emitted over `results_tx` as soon as it
/// finishes; the runner never writes persistent state itself.
pub struct SuiteRunner {
    pub client: Arc<dyn TargetClient>,
    pub checks: Vec<Arc<dyn QualityCheck>>,
    pub policy: TaskPolicy,
}

impl SuiteRunner {
    pub async fn run(
        self: Arc<Self>,
        run_id: i64,
        benchmark: String,
        tasks: Vec<TaskSpec>,
        results_tx: mpsc::Sender<TaskResult>,
        cancel: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        let sem = Arc::new(Semaphore::new(self.policy.workers));
        let mut handles = Vec::new();

        for task in tasks {
            // cooperative cancellation: stop scheduling as soon as the
            // token flips, in-flight tasks are raced below
            if *cancel.borrow() {
                break;
            }
            let permit = sem.clone().acquire_owned().await?;
            // re-check: the token may have flipped while we waited for
            // a worker slot
            if *cancel.borrow() {
                break;
            }
            let this = self.clone();
            let tx = results_tx.clone();
            let mut cancel = cancel.clone();
            let benchmark = benchmark.clone();
            let task_id = task.id.clone();
            let h = tokio::spawn(async move {
                let _permit = permit;
                let outcome = tokio::select! {
                    _ = cancel.wait_for(|c| *c) => None,
                    result = this.run_task(run_id, &benchmark, &task) => Some(result),
                };
                if let Some(result) = outcome {
                    // receiver gone means the run is being torn down
                    let _ = tx.send(result).await;
                }
            });
            handles.push((task_id, h));
        }
        drop(results_tx);

        for (task_id, h) in handles {
            if let Err(e) = h.await {
                tracing::warn!(run_id, task = %task_id, error = %e, "task worker panicked");
            }
        }
        Ok(())
    }

    async fn run_task(&self, run_id: i64, benchmark: &str, task: &TaskSpec) -> TaskResult {
        let m = execute_with_retry(self.client.as_ref(), task, self.policy.retry).await;

        if !m.success {
            tracing::debug!(run_id, task = %task.id, error = ?m.error, "task failed");
            return self.build_result(run_id, benchmark, task, m, 0.0);
        }

        let quality = self.quality_of(task, &m).await;
        self.build_result(run_id, benchmark, task, m, quality)
    }

    async fn quality_of(&self, task: &TaskSpec, m: &RawMeasurement) -> f64 {
        for check in &self.checks {
            if !check.supports(task.task_type) {
                continue;
            }
            match check.score(task, m).await {
                Ok(score) => return score.clamp(0.0, 1.0),
                Err(e) => {
                    tracing::warn!(
                        task = %task.id,
                        check = check.name(),
                        error = %e,
                        "quality check failed, falling back to heuristic"
                    );
                    return heuristic_quality(task, m);
                }
            }
        }
        heuristic_quality(task, m)
    }

    fn build_result(
        &self,
        run_id: i64,
        benchmark: &str,
        task: &TaskSpec,
        m: RawMeasurement,
        quality: f64,
    ) -> TaskResult {
        let (continuity_score, max_gap) = if task.streaming {
            let c = continuity(&m.chunk_offsets, m.latency_seconds, self.policy.gap_threshold_secs);
            (Some(c.score), c.max_gap_seconds)
        } else {
            (None, 0.0)
        };

        let sandbox_seconds = task
            .metadata
            .as_ref()
            .and_then(|meta| meta.get("sandbox"))
            .and_then(|v| v.as_bool())
            .filter(|&sandboxed| sandboxed)
            .map(|_| m.latency_seconds)
            .unwrap_or(0.0);

        let stream_metrics = serde_json::json!({
            "chunk_count": m.chunk_offsets.len(),
            "first_offset": m.chunk_offsets.first(),
            "last_offset": m.chunk_offsets.last(),
            "max_gap_seconds": max_gap,
        });

        TaskResult {
            run_id,
            task_id: task.id.clone(),
            benchmark: benchmark.to_string(),
            task_type: task.task_type,
            success: m.success,
            error: m.error.clone(),
            quality_score: quality,
            latency_seconds: m.latency_seconds,
            ttft_seconds: m.ttft_seconds,
            tokens_per_second: tokens_per_second(&m),
            prompt_tokens: m.prompt_tokens,
            completion_tokens: m.completion_tokens,
            total_tokens: m.total_tokens,
            cost_usd: cost_usd(&m, sandbox_seconds, &self.policy.rates),
            continuity_score,
            max_gap_seconds: max_gap,
            stream_metrics,
            metadata: task.metadata.clone().unwrap_or(serde_json::Value::Null),
            response_text: m.response_text,
        }
    }
}
