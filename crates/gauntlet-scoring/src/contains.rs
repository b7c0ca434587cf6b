use async_trait::async_trait;
use gauntlet_core::executor::RawMeasurement;
use gauntlet_core::model::TaskType;
use gauntlet_core::scoring::{heuristic_quality, QualityCheck};
use gauntlet_core::suite::{ExpectedCheck, TaskSpec};

/// String-containment check for chat-style tasks. Quality is the
/// fraction of expected substrings present, so a partially correct
/// answer earns partial credit.
pub struct ContainsCheck;

#[async_trait]
impl QualityCheck for ContainsCheck {
    fn name(&self) -> &'static str {
        "contains"
    }

    fn supports(&self, task_type: TaskType) -> bool {
        matches!(
            task_type,
            TaskType::ChatQuality | TaskType::Streaming | TaskType::Cost
        )
    }

    async fn score(&self, task: &TaskSpec, m: &RawMeasurement) -> anyhow::Result<f64> {
        let text = m.response_text.trim();
        if text.is_empty() {
            return Ok(0.0);
        }
        let ExpectedCheck::MustContain { must_contain } = &task.expected else {
            return Ok(heuristic_quality(task, m));
        };
        if must_contain.is_empty() {
            return Ok(1.0);
        }
        let hits = must_contain
            .iter()
            .filter(|s| text.contains(s.as_str()))
            .count();
        Ok(hits as f64 / must_contain.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(expected: ExpectedCheck) -> TaskSpec {
        TaskSpec {
            id: "t".into(),
            task_type: TaskType::ChatQuality,
            prompt: "p".into(),
            streaming: false,
            expected,
            max_tokens: 64,
            metadata: None,
        }
    }

    fn measurement(text: &str) -> RawMeasurement {
        RawMeasurement {
            success: true,
            response_text: text.into(),
            error: None,
            latency_seconds: 0.1,
            ttft_seconds: Some(0.1),
            chunk_offsets: vec![],
            prompt_tokens: 1,
            completion_tokens: 1,
            total_tokens: 2,
        }
    }

    #[tokio::test]
    async fn partial_credit_for_partial_matches() {
        let t = task(ExpectedCheck::MustContain {
            must_contain: vec!["Paris".into(), "France".into()],
        });
        let score = ContainsCheck.score(&t, &measurement("Paris it is")).await.unwrap();
        assert_eq!(score, 0.5);
    }

    #[tokio::test]
    async fn empty_response_scores_zero() {
        let t = task(ExpectedCheck::MustContain {
            must_contain: vec!["x".into()],
        });
        let score = ContainsCheck.score(&t, &measurement("")).await.unwrap();
        assert_eq!(score, 0.0);
    }

    #[tokio::test]
    async fn full_match_scores_one() {
        let t = task(ExpectedCheck::MustContain {
            must_contain: vec!["42".into()],
        });
        let score = ContainsCheck
            .score(&t, &measurement("the answer is 42"))
            .await
            .unwrap();
        assert_eq!(score, 1.0);
    }
}
