use std::sync::Arc;

use gauntlet_core::config::JudgeConfig;
use gauntlet_core::scoring::QualityCheck;

mod coding;
mod contains;
mod judge;
mod multimodal;
mod structured;

pub use judge::JudgeCheck;
pub use multimodal::ImageScorer;

/// The standard check set. The judge-backed research check is included
/// only when a judge endpoint is configured; research tasks fall back
/// to the heuristic otherwise.
pub fn default_checks(judge: Option<&JudgeConfig>) -> Vec<Arc<dyn QualityCheck>> {
    vec![
        Arc::new(contains::ContainsCheck),
        Arc::new(structured::StructuredCheck),
        Arc::new(coding::CodingCheck),
        Arc::new(judge::JudgeCheck::from_config(judge)),
        Arc::new(multimodal::MultimodalCheck::new(None)),
    ]
}
