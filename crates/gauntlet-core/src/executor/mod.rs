use crate::suite::TaskSpec;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

pub mod http;

pub use http::{HttpTarget, HttpTargetFactory};

/// Raw measurement of one task attempt against the target. Scoring is
/// derived from this shape only; the executor never interprets quality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMeasurement {
    pub success: bool,
    pub response_text: String,
    pub error: Option<String>,
    pub latency_seconds: f64,
    /// Time to first content-bearing chunk. For non-streaming requests
    /// this equals the full response latency.
    pub ttft_seconds: Option<f64>,
    /// Arrival offsets (seconds from request start) of each streamed
    /// content chunk. Empty for non-streaming requests.
    pub chunk_offsets: Vec<f64>,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl RawMeasurement {
    pub fn failure(error: String, latency_seconds: f64) -> Self {
        Self {
            success: false,
            response_text: String::new(),
            error: Some(error),
            latency_seconds,
            ttft_seconds: None,
            chunk_offsets: Vec::new(),
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 0,
        }
    }
}

#[derive(Debug, Error)]
pub enum TargetError {
    #[error("request timed out after {0:.1}s")]
    Timeout(f64),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("target returned server error {0}")]
    Server(u16),

    /// 4xx-class rejection: the request itself is malformed, retrying
    /// cannot help.
    #[error("target rejected request ({0}): {1}")]
    Rejected(u16, String),
}

impl TargetError {
    pub fn is_transient(&self) -> bool {
        !matches!(self, TargetError::Rejected(_, _))
    }
}

#[async_trait]
pub trait TargetClient: Send + Sync {
    async fn execute(&self, task: &TaskSpec) -> Result<RawMeasurement, TargetError>;
    fn provider_name(&self) -> &'static str;
}

/// Builds a client for a run's target endpoint. The seam exists so the
/// suite runner can be driven against stub targets in tests.
pub trait TargetFactory: Send + Sync {
    fn client(&self, target: &str, model: &str) -> Arc<dyn TargetClient>;
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub retries: u32,
    pub backoff_base_secs: f64,
    pub task_timeout_secs: f64,
}

/// Runs one task with the retry/timeout policy applied. Failure is
/// encoded in the returned measurement rather than an error so a bad
/// task can never abort its suite.
pub async fn execute_with_retry(
    client: &dyn TargetClient,
    task: &TaskSpec,
    policy: RetryPolicy,
) -> RawMeasurement {
    let task_timeout = Duration::from_secs_f64(policy.task_timeout_secs.max(0.001));
    let started = std::time::Instant::now();

    for attempt in 0..=policy.retries {
        let outcome = timeout(task_timeout, client.execute(task)).await;
        let err = match outcome {
            Ok(Ok(m)) => return m,
            Ok(Err(e)) => e,
            Err(_) => TargetError::Timeout(policy.task_timeout_secs),
        };

        if err.is_transient() && attempt < policy.retries {
            let backoff = policy.backoff_base_secs * 2f64.powi(attempt as i32);
            tracing::debug!(
                task = %task.id,
                attempt,
                backoff_secs = backoff,
                error = %err,
                "retrying task after transient failure"
            );
            tokio::time::sleep(Duration::from_secs_f64(backoff)).await;
            continue;
        }
        return RawMeasurement::failure(err.to_string(), started.elapsed().as_secs_f64());
    }
    // loop always returns; retries == u32::MAX would be a config bug
    RawMeasurement::failure("retry budget exhausted".into(), started.elapsed().as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaskType;
    use crate::suite::ExpectedCheck;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn task() -> TaskSpec {
        TaskSpec {
            id: "t".into(),
            task_type: TaskType::ChatQuality,
            prompt: "p".into(),
            streaming: false,
            expected: ExpectedCheck::None,
            max_tokens: 16,
            metadata: None,
        }
    }

    struct FlakyTarget {
        calls: AtomicU32,
        fail_first: u32,
    }

    #[async_trait]
    impl TargetClient for FlakyTarget {
        async fn execute(&self, _task: &TaskSpec) -> Result<RawMeasurement, TargetError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                Err(TargetError::Server(503))
            } else {
                Ok(RawMeasurement {
                    success: true,
                    response_text: "ok".into(),
                    error: None,
                    latency_seconds: 0.01,
                    ttft_seconds: Some(0.01),
                    chunk_offsets: vec![],
                    prompt_tokens: 1,
                    completion_tokens: 1,
                    total_tokens: 2,
                })
            }
        }

        fn provider_name(&self) -> &'static str {
            "flaky"
        }
    }

    struct RejectingTarget;

    #[async_trait]
    impl TargetClient for RejectingTarget {
        async fn execute(&self, _task: &TaskSpec) -> Result<RawMeasurement, TargetError> {
            Err(TargetError::Rejected(400, "bad request".into()))
        }

        fn provider_name(&self) -> &'static str {
            "rejecting"
        }
    }

    fn fast_policy(retries: u32) -> RetryPolicy {
        RetryPolicy {
            retries,
            backoff_base_secs: 0.001,
            task_timeout_secs: 0.2,
        }
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let target = FlakyTarget {
            calls: AtomicU32::new(0),
            fail_first: 2,
        };
        let m = execute_with_retry(&target, &task(), fast_policy(2)).await;
        assert!(m.success);
        assert_eq!(target.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_budget_exhaustion_reports_failure() {
        let target = FlakyTarget {
            calls: AtomicU32::new(0),
            fail_first: 10,
        };
        let m = execute_with_retry(&target, &task(), fast_policy(1)).await;
        assert!(!m.success);
        assert!(m.error.as_deref().unwrap().contains("server error"));
        assert_eq!(target.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn rejection_is_not_retried() {
        let target = RejectingTarget;
        let m = execute_with_retry(&target, &task(), fast_policy(3)).await;
        assert!(!m.success);
        assert!(m.error.as_deref().unwrap().contains("rejected"));
    }

    struct HangingTarget;

    #[async_trait]
    impl TargetClient for HangingTarget {
        async fn execute(&self, _task: &TaskSpec) -> Result<RawMeasurement, TargetError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            unreachable!()
        }

        fn provider_name(&self) -> &'static str {
            "hanging"
        }
    }

    #[tokio::test]
    async fn timeout_is_reported_after_retries() {
        let m = execute_with_retry(&HangingTarget, &task(), fast_policy(1)).await;
        assert!(!m.success);
        assert!(m.error.as_deref().unwrap().contains("timed out"));
    }
}
