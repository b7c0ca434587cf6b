use async_trait::async_trait;
use gauntlet_core::executor::RawMeasurement;
use gauntlet_core::model::TaskType;
use gauntlet_core::scoring::QualityCheck;
use gauntlet_core::suite::{ExpectedCheck, TaskSpec};

/// Heuristic check for coding tasks: required fragments must appear in
/// the answer, and the answer should actually contain a code block.
pub struct CodingCheck;

#[async_trait]
impl QualityCheck for CodingCheck {
    fn name(&self) -> &'static str {
        "coding"
    }

    fn supports(&self, task_type: TaskType) -> bool {
        task_type == TaskType::Coding
    }

    async fn score(&self, task: &TaskSpec, m: &RawMeasurement) -> anyhow::Result<f64> {
        let text = m.response_text.trim();
        if text.is_empty() {
            return Ok(0.0);
        }
        let has_code = text.contains("```") || text.contains("fn ") || text.contains("def ");
        let fragment_score = match &task.expected {
            ExpectedCheck::CodeContains { code_contains } if !code_contains.is_empty() => {
                let hits = code_contains
                    .iter()
                    .filter(|s| text.contains(s.as_str()))
                    .count();
                hits as f64 / code_contains.len() as f64
            }
            _ => 1.0,
        };
        // a correct-looking snippet without a code block is still worth
        // most of the credit
        let block_score = if has_code { 1.0 } else { 0.5 };
        Ok(fragment_score * block_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(fragments: Vec<&str>) -> TaskSpec {
        TaskSpec {
            id: "t".into(),
            task_type: TaskType::Coding,
            prompt: "p".into(),
            streaming: false,
            expected: ExpectedCheck::CodeContains {
                code_contains: fragments.into_iter().map(String::from).collect(),
            },
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
    async fn fenced_code_with_fragments_scores_one() {
        let t = task(vec!["sorted"]);
        let m = measurement("```python\nreturn sorted(xs)\n```");
        assert_eq!(CodingCheck.score(&t, &m).await.unwrap(), 1.0);
    }

    #[tokio::test]
    async fn prose_answer_is_discounted() {
        let t = task(vec!["sorted"]);
        let m = measurement("just call sorted on the list");
        assert_eq!(CodingCheck.score(&t, &m).await.unwrap(), 0.5);
    }

    #[tokio::test]
    async fn missing_fragments_lose_credit() {
        let t = task(vec!["sorted", "reverse=True"]);
        let m = measurement("```python\nreturn sorted(xs)\n```");
        assert_eq!(CodingCheck.score(&t, &m).await.unwrap(), 0.5);
    }
}
