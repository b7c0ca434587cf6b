use async_trait::async_trait;
use gauntlet_core::executor::RawMeasurement;
use gauntlet_core::model::TaskType;
use gauntlet_core::scoring::{heuristic_quality, QualityCheck};
use gauntlet_core::suite::TaskSpec;
use std::sync::Arc;

/// Prompt/response similarity from an external image model. Optional:
/// multimodal tasks are scored on text alone when no scorer is wired in.
#[async_trait]
pub trait ImageScorer: Send + Sync {
    /// Similarity in [0, 1] between the prompt's visual intent and the
    /// response.
    async fn similarity(&self, prompt: &str, response: &str) -> anyhow::Result<f64>;
}

pub struct MultimodalCheck {
    image_scorer: Option<Arc<dyn ImageScorer>>,
}

impl MultimodalCheck {
    pub fn new(image_scorer: Option<Arc<dyn ImageScorer>>) -> Self {
        Self { image_scorer }
    }
}

#[async_trait]
impl QualityCheck for MultimodalCheck {
    fn name(&self) -> &'static str {
        "multimodal"
    }

    fn supports(&self, task_type: TaskType) -> bool {
        task_type == TaskType::Multimodal
    }

    async fn score(&self, task: &TaskSpec, m: &RawMeasurement) -> anyhow::Result<f64> {
        if m.response_text.trim().is_empty() {
            return Ok(0.0);
        }
        let text_score = heuristic_quality(task, m);
        let Some(scorer) = &self.image_scorer else {
            return Ok(text_score);
        };
        match scorer.similarity(&task.prompt, &m.response_text).await {
            Ok(sim) => Ok((text_score + sim.clamp(0.0, 1.0)) / 2.0),
            Err(e) => {
                tracing::warn!(task = %task.id, error = %e, "image scorer failed");
                Ok(text_score)
            }
        }
    }
}
