use crate::config::{CompositeWeights, ReferenceTargets};
use crate::model::{ComponentScores, TaskResult, TaskType};

/// Reduces a run's TaskResults into component scores and the weighted
/// composite. Pure aggregation over the set: completion order does not
/// matter.
pub fn score_run(
    results: &[TaskResult],
    weights: &CompositeWeights,
    reference: &ReferenceTargets,
) -> (ComponentScores, Option<f64>) {
    let scores = ComponentScores {
        quality: quality_component(results),
        speed: speed_component(results, reference),
        cost: cost_component(results, reference),
        streaming: streaming_component(results),
        multimodal: multimodal_component(results),
    };
    let composite = composite_of(&scores, weights);
    (scores, composite)
}

/// Weighted blend over the components that are present; weights are
/// renormalized so an absent component is excluded from numerator and
/// denominator alike (never an implicit zero).
pub fn composite_of(scores: &ComponentScores, weights: &CompositeWeights) -> Option<f64> {
    let parts = [
        (scores.quality, weights.quality),
        (scores.speed, weights.speed),
        (scores.cost, weights.cost),
        (scores.streaming, weights.streaming),
        (scores.multimodal, weights.multimodal),
    ];
    let mut num = 0.0;
    let mut denom = 0.0;
    for (score, weight) in parts {
        if let Some(s) = score {
            num += weight * s;
            denom += weight;
        }
    }
    if denom > 0.0 {
        Some(num / denom)
    } else {
        None
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let mut sum = 0.0;
    let mut n = 0usize;
    for v in values {
        sum += v;
        n += 1;
    }
    if n > 0 {
        Some(sum / n as f64)
    } else {
        None
    }
}

fn quality_component(results: &[TaskResult]) -> Option<f64> {
    mean(
        results
            .iter()
            .filter(|r| r.task_type.counts_toward_quality())
            .map(|r| r.quality_score),
    )
    .map(|m| m * 100.0)
}

/// Lower TTFT and higher tokens/sec relative to the reference targets
/// both help, half-weighted each. Meeting a reference exactly earns
/// full marks on that half; the curve is monotonic and clamped.
fn speed_component(results: &[TaskResult], reference: &ReferenceTargets) -> Option<f64> {
    let ok = || results.iter().filter(|r| r.success);
    let mean_ttft = mean(ok().filter_map(|r| r.ttft_seconds))?;
    let ttft_part = if mean_ttft <= reference.ttft_secs {
        1.0
    } else {
        (reference.ttft_secs / mean_ttft).clamp(0.0, 1.0)
    };
    let tps_part = mean(ok().filter_map(|r| r.tokens_per_second))
        .map(|m| (m / reference.tokens_per_second).clamp(0.0, 1.0))
        .unwrap_or(0.0);
    Some((0.5 * ttft_part + 0.5 * tps_part) * 100.0)
}

/// Zero spend scores 100; spending the full reference budget (or more)
/// floors at 0, linear in between.
fn cost_component(results: &[TaskResult], reference: &ReferenceTargets) -> Option<f64> {
    if results.is_empty() {
        return None;
    }
    let total: f64 = results.iter().map(|r| r.cost_usd).sum();
    let budget = reference.budget_usd.max(f64::EPSILON);
    Some(((1.0 - total / budget) * 100.0).clamp(0.0, 100.0))
}

fn streaming_component(results: &[TaskResult]) -> Option<f64> {
    mean(
        results
            .iter()
            .filter(|r| r.task_type == TaskType::Streaming)
            .map(|r| r.continuity_score.unwrap_or(0.0)),
    )
    .map(|m| m * 100.0)
}

fn multimodal_component(results: &[TaskResult]) -> Option<f64> {
    mean(
        results
            .iter()
            .filter(|r| r.task_type == TaskType::Multimodal)
            .map(|r| r.quality_score),
    )
    .map(|m| m * 100.0)
}
