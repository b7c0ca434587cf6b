use crate::config::CostRates;
use crate::executor::RawMeasurement;
use crate::model::TaskType;
use crate::suite::{ExpectedCheck, TaskSpec};
use async_trait::async_trait;

/// Pluggable correctness check. Implementations live in
/// `gauntlet-scoring`; the runner picks the first check that supports a
/// task's type and falls back to [`heuristic_quality`] otherwise.
#[async_trait]
pub trait QualityCheck: Send + Sync {
    fn name(&self) -> &'static str;
    fn supports(&self, task_type: TaskType) -> bool;
    /// Normalized quality in [0,1].
    async fn score(&self, task: &TaskSpec, measurement: &RawMeasurement) -> anyhow::Result<f64>;
}

/// Fallback quality when no check applies or a check degrades (judge
/// unreachable). "Ran but produced nothing" scores 0, not an error.
pub fn heuristic_quality(task: &TaskSpec, measurement: &RawMeasurement) -> f64 {
    let text = measurement.response_text.trim();
    if text.is_empty() {
        return 0.0;
    }
    match &task.expected {
        ExpectedCheck::MustContain { must_contain } if !must_contain.is_empty() => {
            let hits = must_contain.iter().filter(|s| text.contains(s.as_str())).count();
            hits as f64 / must_contain.len() as f64
        }
        _ => 0.5,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Continuity {
    pub score: f64,
    pub max_gap_seconds: f64,
}

/// Streaming smoothness from inter-chunk arrival gaps. Gap time above
/// the threshold is charged against the total duration, so one long
/// stall on a short response hurts more than the same stall on a long
/// one.
pub fn continuity(chunk_offsets: &[f64], total_duration: f64, gap_threshold_secs: f64) -> Continuity {
    if chunk_offsets.len() < 2 {
        return Continuity {
            score: 1.0,
            max_gap_seconds: 0.0,
        };
    }
    let mut max_gap = 0f64;
    let mut excess = 0f64;
    for pair in chunk_offsets.windows(2) {
        let gap = (pair[1] - pair[0]).max(0.0);
        max_gap = max_gap.max(gap);
        excess += (gap - gap_threshold_secs).max(0.0);
    }
    let duration = total_duration.max(f64::EPSILON);
    Continuity {
        score: (1.0 - excess / duration).clamp(0.0, 1.0),
        max_gap_seconds: max_gap,
    }
}

pub fn cost_usd(measurement: &RawMeasurement, sandbox_seconds: f64, rates: &CostRates) -> f64 {
    measurement.prompt_tokens as f64 / 1000.0 * rates.prompt_per_1k
        + measurement.completion_tokens as f64 / 1000.0 * rates.completion_per_1k
        + sandbox_seconds * rates.sandbox_per_second
}

pub fn tokens_per_second(measurement: &RawMeasurement) -> Option<f64> {
    if measurement.latency_seconds > 0.0 && measurement.completion_tokens > 0 {
        Some(measurement.completion_tokens as f64 / measurement.latency_seconds)
    } else {
        None
    }
}
