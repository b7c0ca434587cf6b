use async_trait::async_trait;
use gauntlet_core::config::JudgeConfig;
use gauntlet_core::executor::{HttpTarget, RawMeasurement, TargetClient};
use gauntlet_core::model::TaskType;
use gauntlet_core::scoring::{heuristic_quality, QualityCheck};
use gauntlet_core::suite::{ExpectedCheck, TaskSpec};
use std::sync::Arc;

/// LLM-judge grading for open-ended research tasks. The judge is a
/// capability, not a requirement: with no endpoint configured, or on
/// any transport/parse failure, grading degrades to the heuristic and
/// the task is never failed because of the judge.
pub struct JudgeCheck {
    client: Option<Arc<dyn TargetClient>>,
}

impl JudgeCheck {
    pub fn from_config(config: Option<&JudgeConfig>) -> Self {
        let client = config.map(|cfg| {
            Arc::new(HttpTarget::new(
                cfg.endpoint.clone(),
                cfg.model.clone(),
                cfg.api_key.clone(),
            )) as Arc<dyn TargetClient>
        });
        Self { client }
    }

    pub fn with_client(client: Arc<dyn TargetClient>) -> Self {
        Self {
            client: Some(client),
        }
    }

    async fn grade(&self, task: &TaskSpec, m: &RawMeasurement) -> Option<f64> {
        let client = self.client.as_ref()?;
        let rubric = match &task.expected {
            ExpectedCheck::JudgeRubric { rubric } => rubric.as_str(),
            _ => "accuracy, depth and relevance of the answer",
        };
        let grading_task = TaskSpec {
            id: format!("judge:{}", task.id),
            task_type: TaskType::Research,
            prompt: format!(
                "You are grading a benchmark answer.\nRubric: {}\nQuestion: {}\nAnswer: {}\n\
                 Reply with a single number between 0.0 and 1.0.",
                rubric, task.prompt, m.response_text
            ),
            streaming: false,
            expected: ExpectedCheck::None,
            max_tokens: 16,
            metadata: None,
        };
        match client.execute(&grading_task).await {
            Ok(reply) => parse_grade(&reply.response_text),
            Err(e) => {
                tracing::warn!(task = %task.id, error = %e, "judge call failed");
                None
            }
        }
    }
}

#[async_trait]
impl QualityCheck for JudgeCheck {
    fn name(&self) -> &'static str {
        "judge"
    }

    fn supports(&self, task_type: TaskType) -> bool {
        task_type == TaskType::Research
    }

    async fn score(&self, task: &TaskSpec, m: &RawMeasurement) -> anyhow::Result<f64> {
        if m.response_text.trim().is_empty() {
            return Ok(0.0);
        }
        match self.grade(task, m).await {
            Some(grade) => Ok(grade.clamp(0.0, 1.0)),
            None => Ok(heuristic_quality(task, m)),
        }
    }
}

/// First number in the reply, treating values in (1, 100] as percent.
fn parse_grade(text: &str) -> Option<f64> {
    for token in text.split(|c: char| !(c.is_ascii_digit() || c == '.')) {
        if token.is_empty() || token == "." {
            continue;
        }
        if let Ok(v) = token.parse::<f64>() {
            if v <= 1.0 {
                return Some(v);
            }
            if v <= 100.0 {
                return Some(v / 100.0);
            }
            return None;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use gauntlet_core::executor::TargetError;

    fn task() -> TaskSpec {
        TaskSpec {
            id: "r".into(),
            task_type: TaskType::Research,
            prompt: "why is the sky blue".into(),
            streaming: false,
            expected: ExpectedCheck::JudgeRubric {
                rubric: "physics accuracy".into(),
            },
            max_tokens: 256,
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

    struct FixedJudge(&'static str);

    #[async_trait]
    impl TargetClient for FixedJudge {
        async fn execute(&self, _task: &TaskSpec) -> Result<RawMeasurement, TargetError> {
            Ok(measurement(self.0))
        }

        fn provider_name(&self) -> &'static str {
            "fixed-judge"
        }
    }

    struct BrokenJudge;

    #[async_trait]
    impl TargetClient for BrokenJudge {
        async fn execute(&self, _task: &TaskSpec) -> Result<RawMeasurement, TargetError> {
            Err(TargetError::Server(502))
        }

        fn provider_name(&self) -> &'static str {
            "broken-judge"
        }
    }

    #[test]
    fn grade_parsing() {
        assert_eq!(parse_grade("0.85"), Some(0.85));
        assert_eq!(parse_grade("Score: 0.7 overall"), Some(0.7));
        assert_eq!(parse_grade("85"), Some(0.85));
        assert_eq!(parse_grade("no number here"), None);
    }

    #[tokio::test]
    async fn judge_grade_is_used_when_available() {
        let check = JudgeCheck::with_client(Arc::new(FixedJudge("0.9")));
        let score = check
            .score(&task(), &measurement("rayleigh scattering"))
            .await
            .unwrap();
        assert_eq!(score, 0.9);
    }

    #[tokio::test]
    async fn judge_failure_degrades_to_heuristic() {
        let check = JudgeCheck::with_client(Arc::new(BrokenJudge));
        let score = check
            .score(&task(), &measurement("rayleigh scattering"))
            .await
            .unwrap();
        // heuristic for a non-empty answer, never an error
        assert_eq!(score, 0.5);
    }

    #[tokio::test]
    async fn no_judge_configured_uses_heuristic() {
        let check = JudgeCheck::from_config(None);
        let score = check
            .score(&task(), &measurement("rayleigh scattering"))
            .await
            .unwrap();
        assert_eq!(score, 0.5);
    }

    #[tokio::test]
    async fn unparseable_judge_reply_degrades() {
        let check = JudgeCheck::with_client(Arc::new(FixedJudge("as an AI I cannot grade")));
        let score = check
            .score(&task(), &measurement("rayleigh scattering"))
            .await
            .unwrap();
        assert_eq!(score, 0.5);
    }
}
