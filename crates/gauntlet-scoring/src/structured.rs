use async_trait::async_trait;
use gauntlet_core::executor::RawMeasurement;
use gauntlet_core::model::TaskType;
use gauntlet_core::scoring::{heuristic_quality, QualityCheck};
use gauntlet_core::suite::{ExpectedCheck, TaskSpec};

/// Structured-output check for tool-use tasks: the response must carry
/// a JSON object with the expected top-level fields. The object may be
/// embedded in surrounding prose.
pub struct StructuredCheck;

#[async_trait]
impl QualityCheck for StructuredCheck {
    fn name(&self) -> &'static str {
        "structured"
    }

    fn supports(&self, task_type: TaskType) -> bool {
        task_type == TaskType::ToolUse
    }

    async fn score(&self, task: &TaskSpec, m: &RawMeasurement) -> anyhow::Result<f64> {
        let ExpectedCheck::JsonFields { json_fields } = &task.expected else {
            return Ok(heuristic_quality(task, m));
        };
        let Some(obj) = extract_json_object(&m.response_text) else {
            return Ok(0.0);
        };
        if json_fields.is_empty() {
            return Ok(1.0);
        }
        let hits = json_fields
            .iter()
            .filter(|f| obj.get(f.as_str()).is_some())
            .count();
        Ok(hits as f64 / json_fields.len() as f64)
    }
}

fn extract_json_object(text: &str) -> Option<serde_json::Map<String, serde_json::Value>> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(&text[start..=end]) {
        Ok(serde_json::Value::Object(obj)) => Some(obj),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(fields: Vec<&str>) -> TaskSpec {
        TaskSpec {
            id: "t".into(),
            task_type: TaskType::ToolUse,
            prompt: "p".into(),
            streaming: false,
            expected: ExpectedCheck::JsonFields {
                json_fields: fields.into_iter().map(String::from).collect(),
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
    async fn embedded_json_is_extracted() {
        let t = task(vec!["tool", "args"]);
        let m = measurement("Calling: {\"tool\": \"search\", \"args\": {\"q\": \"x\"}} done");
        assert_eq!(StructuredCheck.score(&t, &m).await.unwrap(), 1.0);
    }

    #[tokio::test]
    async fn missing_fields_earn_partial_credit() {
        let t = task(vec!["tool", "args"]);
        let m = measurement("{\"tool\": \"search\"}");
        assert_eq!(StructuredCheck.score(&t, &m).await.unwrap(), 0.5);
    }

    #[tokio::test]
    async fn non_json_scores_zero() {
        let t = task(vec!["tool"]);
        let m = measurement("I would use the search tool");
        assert_eq!(StructuredCheck.score(&t, &m).await.unwrap(), 0.0);
    }
}
